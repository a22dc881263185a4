use std::io::Cursor;

use chrono::{DateTime, Duration, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::prelude::*;

use crate::monitor::ThresholdRule;

use super::{
    error::ReportError,
    stats::GraphPoint,
    types::{is_percentage_metric, ChartGroup, ChartSettings},
};

struct ChartStyle;

impl ChartStyle {
    const MARGIN: i32 = 16;
    const CAPTION_FONT_FAMILY: &'static str = "sans-serif";
    const CAPTION_FONT_SIZE: i32 = 28;
    const X_LABEL_AREA_SIZE: u32 = 48;
    const Y_LABEL_AREA_SIZE: u32 = 64;
    const X_LABEL_COUNT: usize = 6;
    const Y_LABEL_COUNT: usize = 8;
    const Y_PADDING: f64 = 5.0;
    const MARKER_RADIUS: i32 = 4;
    const BACKGROUND: RGBColor = WHITE;
    const THRESHOLD_LINE: RGBColor = RED;
    const THRESHOLD_ALPHA: f64 = 0.6;
    const PALETTE: [RGBColor; 6] = [
        BLUE,
        GREEN,
        MAGENTA,
        CYAN,
        RGBColor(255, 140, 0),
        BLACK,
    ];

    fn series_color(idx: usize) -> RGBColor {
        Self::PALETTE[idx % Self::PALETTE.len()]
    }
}

pub(crate) struct ChartSeries {
    pub(crate) label: String,
    pub(crate) points: Vec<GraphPoint>,
}

pub(crate) fn render_chart_png(
    group: &ChartGroup,
    series: &[ChartSeries],
    rules: &[ThresholdRule],
    settings: ChartSettings,
) -> Result<Vec<u8>, ReportError> {
    let all_points = series.iter().flat_map(|item| item.points.iter());
    let (Some(first), Some(last)) = (
        all_points.clone().map(|point| point.timestamp).min(),
        all_points.clone().map(|point| point.timestamp).max(),
    ) else {
        return Err(ReportError::NoPoints);
    };

    let mut x_start: DateTime<Utc> = first;
    let mut x_end: DateTime<Utc> = last;
    if x_start == x_end {
        x_start -= Duration::seconds(1);
        x_end += Duration::seconds(1);
    }

    let limits = rules
        .iter()
        .filter(|rule| group.metrics.iter().any(|metric| rule.metric.matches(metric)))
        .map(|rule| rule.limit)
        .collect::<Vec<_>>();
    let (y_min, y_max) = y_range(group, all_points.map(|point| point.value), &limits);

    let width = settings.width_px;
    let height = settings.height_px;
    let mut rgb_buffer = vec![255u8; width as usize * height as usize * 3];

    {
        let drawing_area =
            BitMapBackend::with_buffer(&mut rgb_buffer, (width, height)).into_drawing_area();
        drawing_area
            .fill(&ChartStyle::BACKGROUND)
            .map_err(|error| ReportError::Backend(format!("background fill error: {:?}", error)))?;

        let mut chart = ChartBuilder::on(&drawing_area)
            .margin(ChartStyle::MARGIN)
            .caption(
                group.title(),
                (ChartStyle::CAPTION_FONT_FAMILY, ChartStyle::CAPTION_FONT_SIZE),
            )
            .x_label_area_size(ChartStyle::X_LABEL_AREA_SIZE)
            .y_label_area_size(ChartStyle::Y_LABEL_AREA_SIZE)
            .build_cartesian_2d(x_start..x_end, y_min..y_max)
            .map_err(|error| ReportError::Backend(format!("chart build error: {:?}", error)))?;

        chart
            .configure_mesh()
            .x_labels(ChartStyle::X_LABEL_COUNT)
            .y_labels(ChartStyle::Y_LABEL_COUNT)
            .x_label_formatter(&|timestamp: &DateTime<Utc>| {
                timestamp.format("%m-%d %H:%M").to_string()
            })
            .y_desc(group.y_desc())
            .x_desc("Date and Time (UTC)")
            .draw()
            .map_err(|error| ReportError::Backend(format!("mesh draw error: {:?}", error)))?;

        for (idx, item) in series.iter().enumerate() {
            let color = ChartStyle::series_color(idx);
            let coordinates = item
                .points
                .iter()
                .map(|point| (point.timestamp, point.value))
                .collect::<Vec<_>>();

            // a lone sample has no trend, mark it instead
            let drawn = if coordinates.len() == 1 {
                chart.draw_series(coordinates.into_iter().map(|coordinate| {
                    Circle::new(coordinate, ChartStyle::MARKER_RADIUS, color.filled())
                }))
            } else {
                chart.draw_series(LineSeries::new(coordinates, color))
            };
            let drawn = drawn
                .map_err(|error| ReportError::Backend(format!("series draw error: {:?}", error)))?;

            drawn
                .label(item.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        for limit in limits {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x_start, limit), (x_end, limit)],
                    ChartStyle::THRESHOLD_LINE.mix(ChartStyle::THRESHOLD_ALPHA),
                )))
                .map_err(|error| {
                    ReportError::Backend(format!("threshold draw error: {:?}", error))
                })?;
        }

        chart
            .configure_series_labels()
            .background_style(ChartStyle::BACKGROUND.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|error| ReportError::Backend(format!("legend draw error: {:?}", error)))?;

        drawing_area
            .present()
            .map_err(|error| ReportError::Backend(format!("present error: {:?}", error)))?;
    }

    let rgb_image = RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| ReportError::PngEncoding("image buffer conversion failed".to_string()))?;
    let mut output = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb_image)
        .write_to(&mut output, ImageFormat::Png)
        .map_err(|error| ReportError::PngEncoding(error.to_string()))?;

    Ok(output.into_inner())
}

fn y_range(
    group: &ChartGroup,
    values: impl Iterator<Item = f64>,
    limits: &[f64],
) -> (f64, f64) {
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for value in values.chain(limits.iter().copied()) {
        low = low.min(value);
        high = high.max(value);
    }

    let mut y_min = low - ChartStyle::Y_PADDING;
    let mut y_max = high + ChartStyle::Y_PADDING;
    if group.metrics.iter().all(|metric| is_percentage_metric(metric)) {
        y_min = y_min.max(0.0);
        y_max = y_max.min(100.0);
    } else if low >= 0.0 {
        y_min = y_min.max(0.0);
    }

    if y_max - y_min < 1.0 {
        y_max = y_min + 1.0;
    }
    (y_min, y_max)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{render_chart_png, y_range, ChartSeries};
    use crate::report::error::ReportError;
    use crate::report::stats::GraphPoint;
    use crate::report::types::{ChartGroup, ChartSettings};

    const CHART: ChartSettings = ChartSettings {
        width_px: 640,
        height_px: 320,
        max_points: 200,
    };

    fn group(key: &str, metrics: &[&str]) -> ChartGroup {
        ChartGroup {
            key: key.to_string(),
            metrics: metrics.iter().map(|metric| metric.to_string()).collect(),
        }
    }

    #[test]
    fn rejects_chart_without_points() {
        let series = vec![ChartSeries {
            label: "cpu".to_string(),
            points: Vec::new(),
        }];

        let result = render_chart_png(&group("system", &["cpu"]), &series, &[], CHART);
        assert!(matches!(result, Err(ReportError::NoPoints)));
    }

    #[test]
    fn percentage_axis_is_pinned_to_bounds() {
        let (low, high) = y_range(&group("disk", &["disk:/"]), [2.0, 98.0].into_iter(), &[90.0]);
        assert_eq!(low, 0.0);
        assert_eq!(high, 100.0);
    }

    #[test]
    fn temperature_axis_follows_data_and_limits() {
        let (low, high) = y_range(
            &group("temp", &["temp:Package id 0"]),
            [60.0, 104.0].into_iter(),
            &[80.0],
        );
        assert_eq!(low, 55.0);
        assert_eq!(high, 109.0);
    }

    #[test]
    fn flat_series_still_gets_a_usable_axis() {
        let (low, high) = y_range(&group("system", &["cpu"]), [0.0].into_iter(), &[]);
        assert!(high > low);
    }

    #[test]
    fn single_point_chart_does_not_panic() {
        let series = vec![ChartSeries {
            label: "cpu".to_string(),
            points: vec![GraphPoint {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                value: 42.0,
            }],
        }];

        // font availability decides between bytes and a backend error; both are fine here
        match render_chart_png(
            &group("system", &["cpu"]),
            &series,
            &[],
            CHART,
        ) {
            Ok(png) => assert!(png.starts_with(&[0x89, b'P', b'N', b'G'])),
            Err(error) => assert!(matches!(error, ReportError::Backend(_))),
        }
    }
}
