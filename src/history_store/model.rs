use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::error::HistoryError;

/// Metric name to reading, ordered by name.
pub type MetricReadings = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub metrics: MetricReadings,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, metrics: MetricReadings) -> Self {
        Self { timestamp, metrics }
    }

    pub fn value(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}

/// Ordered samples, strictly increasing by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    samples: Vec<Sample>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Places `sample` at the end. On rejection the history is left untouched.
    pub fn append(&mut self, sample: Sample) -> Result<(), HistoryError> {
        if let Some(last) = self.samples.last()
            && sample.timestamp <= last.timestamp
        {
            return Err(HistoryError::OutOfOrderSample {
                last: last.timestamp,
                attempted: sample.timestamp,
            });
        }
        // the file format has no encoding for NaN or infinities
        if let Some((metric, value)) = sample
            .metrics
            .iter()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(HistoryError::NonFiniteReading {
                metric: metric.clone(),
                value: *value,
                timestamp: sample.timestamp,
            });
        }

        self.samples.push(sample);
        Ok(())
    }

    /// Drops the oldest samples so that at most `max_samples` remain.
    pub fn retain_latest(&mut self, max_samples: usize) -> usize {
        let excess = self.samples.len().saturating_sub(max_samples.max(1));
        if excess > 0 {
            self.samples.drain(0..excess);
        }
        excess
    }

    pub fn metric_names(&self) -> BTreeSet<&str> {
        self.samples
            .iter()
            .flat_map(|sample| sample.metrics.keys().map(String::as_str))
            .collect()
    }

    /// Timestamped values of one metric, skipping samples that did not report it.
    pub fn series(&self, metric: &str) -> Vec<(DateTime<Utc>, f64)> {
        self.samples
            .iter()
            .filter_map(|sample| sample.value(metric).map(|value| (sample.timestamp, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{History, HistoryError, MetricReadings, Sample};

    fn sample_at(minutes: i64, cpu: f64) -> Sample {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut metrics = MetricReadings::new();
        metrics.insert("cpu".to_string(), cpu);
        Sample::new(start + Duration::minutes(minutes), metrics)
    }

    #[test]
    fn append_places_sample_last() {
        let mut history = History::new();
        history.append(sample_at(0, 10.0)).expect("first append");
        history.append(sample_at(15, 20.0)).expect("second append");

        let next = sample_at(30, 30.0);
        history.append(next.clone()).expect("third append");

        assert_eq!(history.len(), 3);
        assert_eq!(history.last(), Some(&next));
    }

    #[test]
    fn append_rejects_equal_or_older_timestamps_without_mutation() {
        let mut history = History::new();
        history.append(sample_at(0, 10.0)).expect("first append");
        history.append(sample_at(15, 20.0)).expect("second append");
        let before = history.clone();

        let same = history.append(sample_at(15, 99.0));
        assert!(matches!(same, Err(HistoryError::OutOfOrderSample { .. })));

        let older = history.append(sample_at(5, 99.0));
        assert!(matches!(older, Err(HistoryError::OutOfOrderSample { .. })));

        assert_eq!(history, before);
    }

    #[test]
    fn append_rejects_non_finite_readings() {
        let mut history = History::new();
        history.append(sample_at(0, 10.0)).expect("first append");
        let before = history.clone();

        let mut metrics = MetricReadings::new();
        metrics.insert("cpu".to_string(), f64::NAN);
        metrics.insert("mem".to_string(), 3.0);
        let result = history.append(Sample::new(sample_at(15, 0.0).timestamp, metrics));

        assert!(matches!(
            result,
            Err(HistoryError::NonFiniteReading { ref metric, .. }) if metric == "cpu"
        ));
        assert_eq!(history, before);
        assert!(history.append(sample_at(30, f64::INFINITY)).is_err());
    }

    #[test]
    fn retain_latest_keeps_newest_samples() {
        let mut history = History::new();
        for idx in 0..5 {
            history.append(sample_at(idx * 15, idx as f64)).expect("append");
        }

        let dropped = history.retain_latest(2);
        assert_eq!(dropped, 3);
        assert_eq!(history.len(), 2);
        assert_eq!(history.samples()[0].value("cpu"), Some(3.0));
    }

    #[test]
    fn series_skips_samples_without_metric() {
        let mut history = History::new();
        history.append(sample_at(0, 10.0)).expect("append");
        history
            .append(Sample::new(
                sample_at(15, 0.0).timestamp,
                MetricReadings::new(),
            ))
            .expect("append empty");
        history.append(sample_at(30, 30.0)).expect("append");

        let series = history.series("cpu");
        assert_eq!(series.len(), 2);
        assert!(history.metric_names().contains("cpu"));
    }
}
