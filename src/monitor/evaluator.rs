use chrono::{DateTime, Utc};

use crate::history_store::History;

use super::rules::{Comparator, ThresholdRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachKind {
    /// The previous reading of the metric did not breach, or there was none.
    New,
    /// The metric was already breaching on its previous reading.
    Continuing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub rule_index: usize,
    pub metric: String,
    pub value: f64,
    pub limit: f64,
    pub margin: f64,
    pub comparator: Comparator,
    pub kind: BreachKind,
    /// First sample of the current breach episode.
    pub since: DateTime<Utc>,
}

impl Breach {
    pub fn is_new(&self) -> bool {
        self.kind == BreachKind::New
    }
}

/// Breaches as of the most recent sample.
pub fn evaluate(history: &History, rules: &[ThresholdRule]) -> Vec<Breach> {
    match history.len() {
        0 => Vec::new(),
        len => evaluate_at(history, rules, len - 1),
    }
}

/// Breaches as of the sample at `index`, looking only at samples up to it.
///
/// A metric absent from that sample yields nothing for its rules. When deciding new vs.
/// continuing, samples that did not report the metric are stepped over.
pub fn evaluate_at(history: &History, rules: &[ThresholdRule], index: usize) -> Vec<Breach> {
    let samples = history.samples();
    let Some(current) = samples.get(index) else {
        return Vec::new();
    };
    let earlier = &samples[..index];

    let mut breaches = Vec::new();
    for (rule_index, rule) in rules.iter().enumerate() {
        for (metric, value) in current
            .metrics
            .iter()
            .filter(|(name, _)| rule.metric.matches(name))
        {
            if !rule.is_breached(*value) {
                continue;
            }

            let mut previous = earlier.iter().rev().filter_map(|sample| {
                sample
                    .value(metric)
                    .map(|value| (sample.timestamp, value))
            });

            let mut kind = BreachKind::New;
            let mut since = current.timestamp;
            if let Some((timestamp, previous_value)) = previous.next()
                && rule.is_breached(previous_value)
            {
                kind = BreachKind::Continuing;
                since = timestamp;
                for (timestamp, earlier_value) in previous {
                    if !rule.is_breached(earlier_value) {
                        break;
                    }
                    since = timestamp;
                }
            }

            breaches.push(Breach {
                rule_index,
                metric: metric.clone(),
                value: *value,
                limit: rule.limit,
                margin: rule.margin,
                comparator: rule.comparator,
                kind,
                since,
            });
        }
    }

    breaches
}

pub fn has_new_breach(breaches: &[Breach]) -> bool {
    breaches.iter().any(Breach::is_new)
}
