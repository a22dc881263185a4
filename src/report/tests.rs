use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::history_store::{History, MetricReadings, Sample};
use crate::monitor::{evaluate, Comparator, ThresholdRule};

use super::{render, ChartSettings, Report, ReportContext, ReportImage, ReportKind};

fn t(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(15 * n)
}

fn history_of(series: &[&[(&str, f64)]]) -> History {
    let mut history = History::new();
    for (idx, values) in series.iter().enumerate() {
        let metrics = values
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect::<MetricReadings>();
        history
            .append(Sample::new(t(idx as i64), metrics))
            .expect("ordered append");
    }
    history
}

fn context(kind: ReportKind) -> ReportContext {
    ReportContext {
        server: "atlas".to_string(),
        kind,
        rules: vec![
            ThresholdRule::new("temp:*", Comparator::GreaterOrEqual, 80.0),
            ThresholdRule::new("cpu", Comparator::GreaterOrEqual, 90.0),
        ],
        notes: Vec::new(),
        charts: ChartSettings {
            width_px: 320,
            height_px: 200,
            max_points: 50,
        },
    }
}

fn fixed_history() -> History {
    history_of(&[
        &[("cpu", 12.0), ("mem", 40.0), ("temp:Package id 0", 70.0), ("disk:/", 41.0)],
        &[("cpu", 35.0), ("mem", 42.0), ("temp:Package id 0", 82.0), ("disk:/", 41.5)],
        &[("cpu", 20.0), ("mem", 41.0), ("temp:Package id 0", 83.0), ("disk:/", 42.0)],
    ])
}

#[test]
fn empty_history_renders_text_only() {
    let report = render(&History::new(), &[], &context(ReportKind::Status));
    assert!(report.images.is_empty());
    assert!(report.notes.is_empty());
    assert_eq!(report.lines, vec!["No samples recorded yet.".to_string()]);
    assert_eq!(report.headline, "All is fine!");
}

#[test]
fn single_sample_report_never_fails() {
    let history = history_of(&[&[("cpu", 42.0), ("temp:Package id 0", 55.0)]]);
    let report = render(&history, &[], &context(ReportKind::Status));

    // one chart per family: system and temp
    let chart_notes = report
        .notes
        .iter()
        .filter(|note| note.starts_with("Chart"))
        .count();
    assert_eq!(report.images.len() + chart_notes, 2);
    assert!(report.lines.iter().any(|line| line.starts_with("cpu: 42.0 (limit >= 90)")));
}

#[test]
fn rendering_is_deterministic() {
    let history = fixed_history();
    let rules = context(ReportKind::Warning).rules;
    let breaches = evaluate(&history, &rules);

    let first = render(&history, &breaches, &context(ReportKind::Warning));
    let second = render(&history, &breaches, &context(ReportKind::Warning));
    assert_eq!(first, second);
}

#[test]
fn warning_report_lists_breaches_and_current_values() {
    let history = fixed_history();
    let rules = context(ReportKind::Warning).rules;
    let breaches = evaluate(&history, &rules);
    assert_eq!(breaches.len(), 1);

    let report = render(&history, &breaches, &context(ReportKind::Warning));
    assert_eq!(report.subject, "Warning: Status near threshold on atlas");
    assert!(report.headline.contains("(0 new)"));
    assert!(report
        .lines
        .iter()
        .any(|line| line.starts_with("[ONGOING] temp:Package id 0 = 83.0")));
    assert!(report
        .lines
        .iter()
        .any(|line| line.contains("min 70.0 max 83.0 avg 78.3 over 3 sample(s)")));
    assert!(report.lines.iter().any(|line| line.starts_with("disk:/: 42.0")));
}

#[test]
fn alarm_and_status_subjects_follow_kind() {
    let history = fixed_history();

    let alarm = render(&history, &[], &context(ReportKind::Alarm));
    assert_eq!(alarm.subject, "### ALARM ### on atlas");
    assert_eq!(alarm.headline, "Server atlas is going down NOW!");

    let status = render(&history, &[], &context(ReportKind::Status));
    assert_eq!(status.subject, "Status report on atlas");
}

#[test]
fn context_notes_and_html_are_escaped() {
    let mut ctx = context(ReportKind::Status);
    ctx.notes
        .push("Configured limit 80 for temp:* was overridden to <85>".to_string());

    let report = render(&History::new(), &[], &ctx);
    assert!(report.text().contains("overridden to <85>"));
    let html = report.html();
    assert!(html.contains("overridden to &lt;85&gt;"));
    assert!(html.starts_with("<html><body><h2>All is fine!</h2>"));
}

#[test]
fn image_attributes_are_quoted_safely() {
    let report = Report {
        kind: ReportKind::Status,
        subject: "Status report on atlas".to_string(),
        headline: "All is fine!".to_string(),
        lines: Vec::new(),
        images: vec![ReportImage {
            cid: "chart-a&b.png".to_string(),
            file_name: "chart-a&b.png".to_string(),
            title: "Disk \"root\" <main>".to_string(),
            png: Vec::new(),
        }],
        notes: Vec::new(),
    };

    let html = report.html();
    assert!(html.contains("<h3>Disk \"root\" &lt;main&gt;</h3>"));
    assert!(html.contains("src=\"cid:chart-a&amp;b.png\""));
    assert!(html.contains("alt=\"Disk &quot;root&quot; &lt;main&gt;\""));
}

#[test]
fn margin_is_shown_with_the_trigger_point() {
    let history = history_of(&[&[("temp:Package id 0", 70.0)], &[("temp:Package id 0", 78.5)]]);
    let mut ctx = context(ReportKind::Warning);
    ctx.rules = vec![ThresholdRule {
        margin: 2.0,
        ..ThresholdRule::new("temp:*", Comparator::GreaterOrEqual, 80.0)
    }];
    let breaches = evaluate(&history, &ctx.rules);
    assert_eq!(breaches.len(), 1);

    let report = render(&history, &breaches, &ctx);
    assert!(report.lines.iter().any(|line| {
        line.starts_with("[NEW] temp:Package id 0 = 78.5 (limit >= 80, alerting from 78)")
    }));
    assert!(report
        .lines
        .iter()
        .any(|line| line.starts_with("temp:Package id 0: 78.5 (limit >= 80, alerting from 78)")));
}

