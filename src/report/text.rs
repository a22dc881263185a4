use crate::history_store::History;
use crate::monitor::{Breach, BreachKind, ThresholdRule};

use super::stats::compute_metric_summary;
use super::types::{ReportContext, ReportKind};

pub(super) fn subject_for(context: &ReportContext) -> String {
    match context.kind {
        ReportKind::Warning => format!("Warning: Status near threshold on {}", context.server),
        ReportKind::Status => format!("Status report on {}", context.server),
        ReportKind::Alarm => format!("### ALARM ### on {}", context.server),
    }
}

pub(super) fn headline_for(context: &ReportContext, breaches: &[Breach]) -> String {
    match context.kind {
        ReportKind::Alarm => format!("Server {} is going down NOW!", context.server),
        ReportKind::Status if breaches.is_empty() => "All is fine!".to_string(),
        _ => {
            let new_count = breaches.iter().filter(|breach| breach.is_new()).count();
            format!(
                "{} metric(s) at or past their limits on {} ({} new)",
                breaches.len(),
                context.server,
                new_count
            )
        }
    }
}

pub(super) fn summary_lines(
    history: &History,
    breaches: &[Breach],
    rules: &[ThresholdRule],
) -> Vec<String> {
    let Some(latest) = history.last() else {
        return vec!["No samples recorded yet.".to_string()];
    };

    let mut lines = Vec::new();
    let first_timestamp = history
        .samples()
        .first()
        .map(|sample| sample.timestamp)
        .unwrap_or(latest.timestamp);
    lines.push(format!(
        "Latest sample: {} ({} sample(s) since {})",
        latest.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        history.len(),
        first_timestamp.format("%Y-%m-%d %H:%M UTC")
    ));

    if !breaches.is_empty() {
        lines.push("Breaches:".to_string());
        for breach in breaches {
            let label = match breach.kind {
                BreachKind::New => "NEW",
                BreachKind::Continuing => "ONGOING",
            };
            lines.push(format!(
                "[{}] {} = {:.1} (limit {}) since {}",
                label,
                breach.metric,
                breach.value,
                breach.comparator.describe_limit(breach.limit, breach.margin),
                breach.since.format("%Y-%m-%d %H:%M UTC")
            ));
        }
    }

    lines.push("Current values:".to_string());
    for (metric, value) in &latest.metrics {
        let limits = rules
            .iter()
            .filter(|rule| rule.metric.matches(metric))
            .map(|rule| rule.comparator.describe_limit(rule.limit, rule.margin))
            .collect::<Vec<_>>();
        let limit_text = if limits.is_empty() {
            String::new()
        } else {
            format!(" (limit {})", limits.join("; "))
        };

        let trend = compute_metric_summary(
            history
                .series(metric)
                .into_iter()
                .map(|(_, value)| value),
        )
        .map(|summary| {
            format!(
                " | min {:.1} max {:.1} avg {:.1} over {} sample(s)",
                summary.min, summary.max, summary.avg, summary.count
            )
        })
        .unwrap_or_default();

        lines.push(format!("{}: {:.1}{}{}", metric, value, limit_text, trend));
    }

    lines
}
