mod config;
mod history_store;
mod monitor;
mod notify;
mod report;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, Config};
use crate::history_store::HistoryStore;
use crate::monitor::{apply_limit_overrides, ActiveMetricSource, LimitOverride, ThresholdRule};
use crate::notify::ActiveNotifier;
use crate::run::{RunController, RunMode, RunOutcome, RunSettings};

fn init_json_logging() {
    if let Err(error) = tracing_log::LogTracer::init() {
        eprintln!(
            "logging bridge initialization failed (continuing with existing logger): {}",
            error
        );
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

/// Samples host health once, keeps the history and mails a report when a limit is crossed.
#[derive(Debug, Parser)]
#[command(name = "kars-check", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// What this invocation may report.
    #[arg(long, value_enum, default_value_t = RunMode::Check)]
    mode: RunMode,

    /// Replace a configured limit for this run only, as `<metric>=<limit>`.
    #[arg(long = "override", value_name = "METRIC=LIMIT")]
    overrides: Vec<LimitOverride>,
}

fn build_controller(
    config: &Config,
    overrides: &[LimitOverride],
) -> RunController<ActiveMetricSource, ActiveNotifier> {
    let mut rules = config.threshold_rules();
    let notes = apply_limit_overrides(&mut rules, overrides);

    // one simulated scenario per minute
    let seed = u64::try_from(Utc::now().timestamp() / 60).unwrap_or_default();
    let source = ActiveMetricSource::from_config(&config.collector, seed);
    let notifier = ActiveNotifier::from_config(config);

    log::info!(
        "run_configured server={} rules=[{}] notifier={} simulation={}",
        config.server,
        rules
            .iter()
            .map(ThresholdRule::describe)
            .collect::<Vec<_>>()
            .join(", "),
        notifier.kind(),
        config.collector.simulation
    );

    RunController::new(
        HistoryStore::from_config(config),
        RunSettings::from_config(config, rules, notes),
        source,
        notifier,
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    init_json_logging();
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            log::error!("Configuration error: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let mut controller = build_controller(&config, &cli.overrides);
    match controller.run(cli.mode).await {
        RunOutcome::Completed(summary) => {
            tracing::info!(
                target: "run",
                mode = cli.mode.as_str(),
                breaches = summary.breaches.len(),
                new_breaches = summary.breaches.iter().filter(|breach| breach.is_new()).count(),
                delivered = ?summary.delivered,
                history_len = summary.history_len,
                "run_completed"
            );
            ExitCode::SUCCESS
        }
        RunOutcome::Skipped { reason } => {
            log::info!("run_skipped mode={} reason={}", cli.mode.as_str(), reason);
            ExitCode::SUCCESS
        }
        RunOutcome::Failed { phase, error } => {
            log::error!(
                "run_aborted mode={} phase={} error={}",
                cli.mode.as_str(),
                phase.as_str(),
                error
            );
            ExitCode::FAILURE
        }
    }
}
