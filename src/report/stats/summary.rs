#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MetricSummary {
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) avg: f64,
    pub(crate) count: usize,
}

pub(crate) fn compute_metric_summary(
    values: impl IntoIterator<Item = f64>,
) -> Option<MetricSummary> {
    let mut values = values.into_iter();
    let first = values.next()?;

    let mut min_value = first;
    let mut max_value = first;
    let mut sum = first;
    let mut count: usize = 1;

    for value in values {
        if value < min_value {
            min_value = value;
        }
        if value > max_value {
            max_value = value;
        }
        sum += value;
        count += 1;
    }

    Some(MetricSummary {
        min: min_value,
        max: max_value,
        avg: sum / count as f64,
        count,
    })
}
