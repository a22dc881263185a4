use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::history_store::{
    History, HistoryError, HistoryStore, LockError, MetricReadings, RunLock, Sample,
};
use crate::monitor::{evaluate, MetricSource, SourceError, ThresholdRule};
use crate::notify::Notifier;
use crate::report::{self, ChartSettings, ReportContext};

use super::mode::RunMode;
use super::outcome::{RunError, RunOutcome, RunPhase, RunSummary};

/// Inputs of a run that come from configuration and the command line.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub server: String,
    pub lock_path: PathBuf,
    pub stale_lock_after: Duration,
    pub max_samples: Option<usize>,
    pub rules: Vec<ThresholdRule>,
    pub charts: ChartSettings,
    /// Extra lines for every report, e.g. applied limit overrides.
    pub notes: Vec<String>,
}

impl RunSettings {
    pub fn from_config(config: &Config, rules: Vec<ThresholdRule>, notes: Vec<String>) -> Self {
        Self {
            server: config.server.clone(),
            lock_path: PathBuf::from(&config.history.lock_path),
            stale_lock_after: Duration::from_secs(config.history.stale_lock_secs),
            max_samples: config.history.max_samples,
            rules,
            charts: ChartSettings::from_config(config),
            notes,
        }
    }
}

struct PhaseTrace {
    phases: Vec<RunPhase>,
}

impl PhaseTrace {
    fn start() -> Self {
        let mut trace = Self { phases: Vec::new() };
        trace.enter(RunPhase::Idle);
        trace
    }

    fn current(&self) -> RunPhase {
        self.phases.last().copied().unwrap_or(RunPhase::Idle)
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::info!(target: "run", phase = phase.as_str(), "run_phase");
        self.phases.push(phase);
    }

    fn fail(mut self, error: impl Into<RunError>) -> RunOutcome {
        let phase = self.current();
        let error = error.into();
        log::error!("run_failed phase={} error={}", phase.as_str(), error);
        self.enter(RunPhase::Failed);
        RunOutcome::Failed { phase, error }
    }
}

/// One load, sample, evaluate, report, persist pass over the history file.
pub struct RunController<S, N> {
    store: HistoryStore,
    settings: RunSettings,
    source: S,
    notifier: N,
}

impl<S: MetricSource, N: Notifier> RunController<S, N> {
    pub fn new(store: HistoryStore, settings: RunSettings, source: S, notifier: N) -> Self {
        Self {
            store,
            settings,
            source,
            notifier,
        }
    }

    pub async fn run(&mut self, mode: RunMode) -> RunOutcome {
        self.run_at(mode, Utc::now()).await
    }

    pub async fn run_at(&mut self, mode: RunMode, now: DateTime<Utc>) -> RunOutcome {
        let mut trace = PhaseTrace::start();

        let lock = match RunLock::acquire(&self.settings.lock_path, self.settings.stale_lock_after)
        {
            Ok(lock) => lock,
            Err(LockError::Busy { path, holder }) => {
                log::warn!("run_skipped reason=lock_busy path={} holder={}", path, holder);
                return RunOutcome::Skipped {
                    reason: format!("run lock {} is held by {}", path, holder),
                };
            }
            Err(error) => return trace.fail(error),
        };
        log::debug!("run_lock_held path={} mode={}", lock.path().display(), mode.as_str());

        trace.enter(RunPhase::Loading);
        let mut history = match self.load_history(now) {
            Ok(history) => history,
            Err(error) => return trace.fail(error),
        };
        if history.is_empty() {
            log::info!("history_empty path={}", self.store.path().display());
        }

        trace.enter(RunPhase::Sampling);
        let readings = match self.source.read().await {
            Ok(readings) => finite_readings(readings),
            Err(error) => return trace.fail(error),
        };
        if readings.is_empty() {
            return trace.fail(SourceError::Unavailable(
                "metric source returned no usable readings".to_string(),
            ));
        }
        if let Err(error) = history.append(Sample::new(now, readings)) {
            return trace.fail(error);
        }

        trace.enter(RunPhase::Evaluating);
        let breaches = evaluate(&history, &self.settings.rules);
        for breach in &breaches {
            tracing::info!(
                target: "run",
                metric = %breach.metric,
                value = breach.value,
                limit = breach.limit,
                comparator = breach.comparator.symbol(),
                new = breach.is_new(),
                "threshold_breach"
            );
        }

        // trimmed after evaluation so the oldest retained sample can still be the previous one
        if let Some(max_samples) = self.settings.max_samples {
            let dropped = history.retain_latest(max_samples);
            if dropped > 0 {
                log::info!("history_trimmed dropped={} kept={}", dropped, history.len());
            }
        }

        let delivered = if mode.should_report(&breaches) {
            trace.enter(RunPhase::Reporting);
            let context = ReportContext {
                server: self.settings.server.clone(),
                kind: mode.report_kind(),
                rules: self.settings.rules.clone(),
                notes: self.settings.notes.clone(),
                charts: self.settings.charts,
            };
            let report = report::render(&history, &breaches, &context);
            match self.notifier.deliver(&report).await {
                Ok(()) => Some(true),
                Err(error) => {
                    log::warn!(
                        "report_delivery_failed code={} error={}",
                        error.code(),
                        error
                    );
                    Some(false)
                }
            }
        } else {
            None
        };

        trace.enter(RunPhase::Persisting);
        if let Err(error) = self.store.save(&history) {
            return trace.fail(error);
        }

        trace.enter(RunPhase::Done);
        RunOutcome::Completed(RunSummary {
            phases: trace.phases,
            breaches,
            delivered,
            history_len: history.len(),
        })
    }

    /// A corrupt file is moved aside and replaced by an empty history.
    fn load_history(&self, now: DateTime<Utc>) -> Result<History, HistoryError> {
        match self.store.load() {
            Ok(history) => Ok(history),
            Err(error @ HistoryError::Corrupt { .. }) => {
                log::error!(
                    "history_reset code={} error={} path={}",
                    error.code(),
                    error,
                    self.store.path().display()
                );
                match self.store.quarantine(now) {
                    Ok(moved) => log::warn!("history_quarantined to={}", moved.display()),
                    Err(error) => log::warn!("history_quarantine_failed error={}", error),
                }
                Ok(History::new())
            }
            Err(error) => Err(error),
        }
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    #[cfg(test)]
    pub(crate) fn notifier(&self) -> &N {
        &self.notifier
    }
}

fn finite_readings(mut readings: MetricReadings) -> MetricReadings {
    readings.retain(|metric, value| {
        let keep = value.is_finite();
        if !keep {
            log::warn!("reading_dropped metric={} value={} reason=not_finite", metric, value);
        }
        keep
    });
    readings
}
