use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "ge", alias = ">=")]
    GreaterOrEqual,
    #[serde(rename = "le", alias = "<=")]
    LessOrEqual,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }

    /// `margin` widens the breach band towards the safe side of `limit`.
    pub fn breaches(self, value: f64, limit: f64, margin: f64) -> bool {
        match self {
            Self::GreaterOrEqual => value >= limit - margin,
            Self::LessOrEqual => value <= limit + margin,
        }
    }

    /// `>= 80`, or `>= 80, alerting from 78` when a margin moves the trigger point.
    pub fn describe_limit(self, limit: f64, margin: f64) -> String {
        if margin == 0.0 {
            return format!("{} {}", self.symbol(), limit);
        }
        let trigger = match self {
            Self::GreaterOrEqual => limit - margin,
            Self::LessOrEqual => limit + margin,
        };
        format!("{} {}, alerting from {}", self.symbol(), limit, trigger)
    }
}

/// Exact metric name, or a `family:*` pattern matching every metric of a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricPattern {
    Exact(String),
    Family(String),
}

impl MetricPattern {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.strip_suffix('*') {
            Some(prefix) if prefix.ends_with(':') => Self::Family(prefix.to_string()),
            _ => Self::Exact(input.to_string()),
        }
    }

    pub fn matches(&self, metric: &str) -> bool {
        match self {
            Self::Exact(name) => name == metric,
            Self::Family(prefix) => metric.len() > prefix.len() && metric.starts_with(prefix),
        }
    }
}

impl fmt::Display for MetricPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Family(prefix) => write!(f, "{}*", prefix),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub metric: MetricPattern,
    pub comparator: Comparator,
    pub limit: f64,
    pub margin: f64,
}

impl ThresholdRule {
    pub fn new(metric: &str, comparator: Comparator, limit: f64) -> Self {
        Self {
            metric: MetricPattern::parse(metric),
            comparator,
            limit,
            margin: 0.0,
        }
    }

    pub fn is_breached(&self, value: f64) -> bool {
        self.comparator.breaches(value, self.limit, self.margin)
    }

    pub fn describe(&self) -> String {
        format!(
            "{} {}",
            self.metric,
            self.comparator.describe_limit(self.limit, self.margin)
        )
    }
}

/// `metric=limit` replacement for the limit of matching rules, given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitOverride {
    pub metric: String,
    pub limit: f64,
}

impl FromStr for LimitOverride {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (metric, limit) = input
            .split_once('=')
            .ok_or_else(|| format!("expected <metric>=<limit>, got {:?}", input))?;
        let metric = metric.trim();
        if metric.is_empty() {
            return Err("override metric must not be empty".to_string());
        }
        let limit = limit
            .trim()
            .parse::<f64>()
            .map_err(|error| format!("invalid override limit {:?}: {}", limit, error))?;
        if !limit.is_finite() {
            return Err("override limit must be finite".to_string());
        }

        Ok(Self {
            metric: metric.to_string(),
            limit,
        })
    }
}

/// Applies overrides to rules whose pattern text equals the override metric.
/// Returns one human-readable line per override for the report.
pub fn apply_limit_overrides(
    rules: &mut [ThresholdRule],
    overrides: &[LimitOverride],
) -> Vec<String> {
    let mut messages = Vec::new();

    for item in overrides {
        let mut matched = false;
        for rule in rules
            .iter_mut()
            .filter(|rule| rule.metric.to_string() == item.metric)
        {
            matched = true;
            if rule.limit != item.limit {
                messages.push(format!(
                    "Configured limit {} for {} was overridden to {}",
                    rule.limit, rule.metric, item.limit
                ));
                rule.limit = item.limit;
            }
        }

        if !matched {
            log::warn!("limit_override_ignored metric={} reason=no_matching_rule", item.metric);
            messages.push(format!(
                "Override for {} ignored: no threshold rule uses that metric",
                item.metric
            ));
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::{apply_limit_overrides, Comparator, LimitOverride, MetricPattern, ThresholdRule};

    #[test]
    fn comparators_include_the_limit() {
        assert!(Comparator::GreaterOrEqual.breaches(80.0, 80.0, 0.0));
        assert!(!Comparator::GreaterOrEqual.breaches(79.9, 80.0, 0.0));
        assert!(Comparator::LessOrEqual.breaches(10.0, 10.0, 0.0));
        assert!(!Comparator::LessOrEqual.breaches(10.1, 10.0, 0.0));
    }

    #[test]
    fn description_shows_margin_trigger_point() {
        let mut rule = ThresholdRule::new("temp:*", Comparator::GreaterOrEqual, 80.0);
        assert_eq!(rule.describe(), "temp:* >= 80");

        rule.margin = 2.0;
        assert_eq!(rule.describe(), "temp:* >= 80, alerting from 78");
        assert_eq!(
            Comparator::LessOrEqual.describe_limit(10.0, 2.5),
            "<= 10, alerting from 12.5"
        );
    }

    #[test]
    fn margin_opens_a_near_threshold_band() {
        assert!(Comparator::GreaterOrEqual.breaches(78.0, 80.0, 2.0));
        assert!(Comparator::LessOrEqual.breaches(12.0, 10.0, 2.0));
    }

    #[test]
    fn family_pattern_matches_members_only() {
        let pattern = MetricPattern::parse("temp:*");
        assert!(pattern.matches("temp:Package id 0"));
        assert!(!pattern.matches("temp:"));
        assert!(!pattern.matches("cpu"));
        assert_eq!(pattern.to_string(), "temp:*");

        let exact = MetricPattern::parse("disk:/home");
        assert!(exact.matches("disk:/home"));
        assert!(!exact.matches("disk:/"));
    }

    #[test]
    fn parses_override_arguments() {
        let parsed = "temp:*=85".parse::<LimitOverride>().expect("override should parse");
        assert_eq!(parsed.metric, "temp:*");
        assert_eq!(parsed.limit, 85.0);

        assert!("temp:*".parse::<LimitOverride>().is_err());
        assert!("=85".parse::<LimitOverride>().is_err());
        assert!("cpu=hot".parse::<LimitOverride>().is_err());
    }

    #[test]
    fn overrides_replace_matching_limits_and_report_unknown_metrics() {
        let mut rules = vec![
            ThresholdRule::new("temp:*", Comparator::GreaterOrEqual, 80.0),
            ThresholdRule::new("cpu", Comparator::GreaterOrEqual, 90.0),
        ];
        let overrides = vec![
            LimitOverride {
                metric: "temp:*".to_string(),
                limit: 85.0,
            },
            LimitOverride {
                metric: "gpu".to_string(),
                limit: 70.0,
            },
        ];

        let messages = apply_limit_overrides(&mut rules, &overrides);
        assert_eq!(rules[0].limit, 85.0);
        assert_eq!(rules[1].limit, 90.0);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("overridden to 85"));
        assert!(messages[1].contains("gpu"));
    }
}
