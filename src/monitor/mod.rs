mod evaluator;
mod provider;
mod rules;

pub use evaluator::{evaluate, has_new_breach, Breach, BreachKind};
#[cfg(test)]
pub(crate) use provider::MockMetricSource;
pub use provider::{
    ActiveMetricSource, MetricSource, SourceError, CPU_METRIC, DISK_FAMILY, MEMORY_METRIC, TEMPERATURE_FAMILY,
};
pub use rules::{apply_limit_overrides, Comparator, LimitOverride, ThresholdRule};
