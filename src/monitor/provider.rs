use std::path::Path;
use std::time::Duration;

use sysinfo::{ComponentExt, CpuExt, DiskExt, System, SystemExt};
use thiserror::Error;

use crate::config::CollectorConfig;
use crate::history_store::MetricReadings;

pub const CPU_METRIC: &str = "cpu";
pub const MEMORY_METRIC: &str = "mem";
pub const TEMPERATURE_FAMILY: &str = "temp";
pub const DISK_FAMILY: &str = "disk";

#[derive(Debug, Error, Clone)]
pub enum SourceError {
    #[error("metric source unavailable: {0}")]
    Unavailable(String),
}

pub trait MetricSource {
    async fn read(&mut self) -> Result<MetricReadings, SourceError>;
}

pub enum ActiveMetricSource {
    Real(Box<SysinfoMetricSource>),
    Simulated(SimulatedMetricSource),
}

impl ActiveMetricSource {
    pub fn from_config(collector: &CollectorConfig, seed: u64) -> Self {
        if collector.simulation {
            Self::Simulated(SimulatedMetricSource::new(collector.partitions.clone(), seed))
        } else {
            Self::Real(Box::new(SysinfoMetricSource::new(
                collector.partitions.clone(),
                Duration::from_millis(collector.cpu_sample_millis),
            )))
        }
    }
}

impl MetricSource for ActiveMetricSource {
    async fn read(&mut self) -> Result<MetricReadings, SourceError> {
        match self {
            ActiveMetricSource::Real(source) => source.read().await,
            ActiveMetricSource::Simulated(source) => source.read().await,
        }
    }
}

pub struct SysinfoMetricSource {
    system: System,
    partitions: Vec<String>,
    cpu_sample: Duration,
}

impl SysinfoMetricSource {
    pub fn new(partitions: Vec<String>, cpu_sample: Duration) -> Self {
        Self {
            system: System::new(),
            partitions,
            cpu_sample,
        }
    }
}

impl MetricSource for SysinfoMetricSource {
    async fn read(&mut self) -> Result<MetricReadings, SourceError> {
        let mut readings = MetricReadings::new();

        // cpu usage is a delta between two refreshes
        self.system.refresh_cpu();
        tokio::time::sleep(self.cpu_sample).await;
        self.system.refresh_cpu();
        insert_reading(
            &mut readings,
            CPU_METRIC.to_string(),
            f64::from(self.system.global_cpu_info().cpu_usage()),
        );

        self.system.refresh_memory();
        let total_memory = self.system.total_memory();
        if total_memory > 0 {
            let used = self.system.used_memory() as f64 / total_memory as f64 * 100.0;
            insert_reading(&mut readings, MEMORY_METRIC.to_string(), used);
        }

        self.system.refresh_disks_list();
        self.system.refresh_disks();
        for partition in &self.partitions {
            let Some(disk) = self
                .system
                .disks()
                .iter()
                .find(|disk| disk.mount_point() == Path::new(partition))
            else {
                log::warn!("metric_missing metric=disk partition={} reason=not_mounted", partition);
                continue;
            };

            let total_space = disk.total_space();
            if total_space == 0 {
                continue;
            }
            let used_space = total_space.saturating_sub(disk.available_space());
            insert_reading(
                &mut readings,
                format!("{}:{}", DISK_FAMILY, partition),
                used_space as f64 / total_space as f64 * 100.0,
            );
        }

        self.system.refresh_components_list();
        for component in self.system.components() {
            let name = format!("{}:{}", TEMPERATURE_FAMILY, component.label());
            let celsius = f64::from(component.temperature());
            // several sensors can share a label; keep the hottest
            let hottest = readings
                .get(&name)
                .map_or(celsius, |current| current.max(celsius));
            insert_reading(&mut readings, name, hottest);
        }

        if readings.is_empty() {
            return Err(SourceError::Unavailable(
                "no metric could be read from the operating system".to_string(),
            ));
        }

        Ok(readings)
    }
}

fn insert_reading(readings: &mut MetricReadings, name: String, value: f64) {
    if value.is_finite() {
        readings.insert(name, (value * 100.0).round() / 100.0);
    }
}

pub struct SimulatedMetricSource {
    tick: u64,
    partitions: Vec<String>,
}

impl SimulatedMetricSource {
    pub fn new(partitions: Vec<String>, seed: u64) -> Self {
        Self {
            tick: seed,
            partitions,
        }
    }
}

impl MetricSource for SimulatedMetricSource {
    async fn read(&mut self) -> Result<MetricReadings, SourceError> {
        self.tick = self.tick.saturating_add(1);
        let phase = self.tick as f64 / 8.0;

        let mut cpu = 45.0 + (phase.sin() * 20.0);
        let mem = 55.0 + ((phase * 0.7).sin() * 12.0);
        let mut temp = 60.0 + ((phase * 0.5).sin() * 10.0);

        if self.tick.is_multiple_of(30) {
            cpu = 95.0;
        }
        if self.tick.is_multiple_of(47) {
            temp = 88.0;
        }

        let mut readings = MetricReadings::new();
        insert_reading(&mut readings, CPU_METRIC.to_string(), cpu.clamp(0.0, 100.0));
        insert_reading(&mut readings, MEMORY_METRIC.to_string(), mem.clamp(0.0, 100.0));
        insert_reading(
            &mut readings,
            format!("{}:Package id 0", TEMPERATURE_FAMILY),
            temp,
        );
        for (idx, partition) in self.partitions.iter().enumerate() {
            let disk = 60.0 + ((phase * 0.2 + idx as f64).sin() * 5.0);
            insert_reading(
                &mut readings,
                format!("{}:{}", DISK_FAMILY, partition),
                disk.clamp(0.0, 100.0),
            );
        }

        Ok(readings)
    }
}

#[cfg(test)]
pub(crate) struct MockMetricSource {
    sequence: Vec<Result<MetricReadings, SourceError>>,
    pub(crate) reads: usize,
}

#[cfg(test)]
impl MockMetricSource {
    pub(crate) fn new(sequence: Vec<MetricReadings>) -> Self {
        Self {
            sequence: sequence.into_iter().map(Ok).collect(),
            reads: 0,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            sequence: vec![Err(SourceError::Unavailable(
                "sensors command failed".to_string(),
            ))],
            reads: 0,
        }
    }
}

#[cfg(test)]
impl MetricSource for MockMetricSource {
    async fn read(&mut self) -> Result<MetricReadings, SourceError> {
        self.reads += 1;
        if self.sequence.is_empty() {
            return Err(SourceError::Unavailable("mock readings exhausted".to_string()));
        }

        self.sequence.remove(0)
    }
}
