mod error;
mod render;
mod stats;
mod text;
mod types;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::history_store::History;
use crate::monitor::Breach;

use render::{render_chart_png, ChartSeries};
use stats::{downsample_points, GraphPoint};
use text::{headline_for, subject_for, summary_lines};
use types::chart_groups;

pub use types::{ChartSettings, ReportContext, ReportKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportImage {
    pub cid: String,
    pub file_name: String,
    pub title: String,
    pub png: Vec<u8>,
}

/// Rendered, disposable summary of the history. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub subject: String,
    pub headline: String,
    pub lines: Vec<String>,
    pub images: Vec<ReportImage>,
    pub notes: Vec<String>,
}

impl Report {
    pub fn text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.headline);
        out.push('\n');
        for note in &self.notes {
            out.push_str(note);
            out.push('\n');
        }
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// HTML body; images are referenced as `cid:` parts for inline mail attachments.
    pub fn html(&self) -> String {
        let mut out = String::from("<html><body>");
        out.push_str(&format!("<h2>{}</h2>", encode_text(&self.headline)));
        for note in &self.notes {
            out.push_str(&format!("<p><em>{}</em></p>", encode_text(note)));
        }
        out.push_str("<p>");
        for line in &self.lines {
            out.push_str(&encode_text(line));
            out.push_str("<br>");
        }
        out.push_str("</p>");
        for image in &self.images {
            out.push_str(&format!(
                "<h3>{}</h3><img src=\"cid:{}\" alt=\"{}\">",
                encode_text(&image.title),
                encode_double_quoted_attribute(&image.cid),
                encode_double_quoted_attribute(&image.title)
            ));
        }
        out.push_str("</body></html>");
        out
    }
}

/// Builds the report for `history`. Chart failures become notes; this never fails.
pub fn render(history: &History, breaches: &[Breach], context: &ReportContext) -> Report {
    let mut notes = context.notes.clone();
    let mut images = Vec::new();

    for group in chart_groups(history) {
        let series = group
            .metrics
            .iter()
            .map(|metric| {
                let points = history
                    .series(metric)
                    .into_iter()
                    .map(|(timestamp, value)| GraphPoint { timestamp, value })
                    .collect::<Vec<_>>();
                ChartSeries {
                    label: group.series_label(metric).to_string(),
                    points: downsample_points(&points, context.charts.max_points.max(2)),
                }
            })
            .collect::<Vec<_>>();

        match render_chart_png(&group, &series, &context.rules, context.charts) {
            Ok(png) => {
                let file_name = group.file_name();
                images.push(ReportImage {
                    cid: file_name.clone(),
                    file_name,
                    title: group.title(),
                    png,
                });
            }
            Err(error) => {
                log::warn!(
                    "report_chart_failed group={} code={} error={}",
                    group.key,
                    error.code(),
                    error
                );
                notes.push(format!("Chart \"{}\" could not be rendered: {}", group.title(), error));
            }
        }
    }

    Report {
        kind: context.kind,
        subject: subject_for(context),
        headline: headline_for(context, breaches),
        lines: summary_lines(history, breaches, &context.rules),
        images,
        notes,
    }
}

#[cfg(test)]
mod tests;
