//! Headless run loop: load config, step the experiment, write snapshots.

use crate::model::experiment::Eincasm;
use anyhow::{Context, Result};
use eincasm_core::config::AppConfig;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides `world.steps`.
    pub steps: Option<u64>,
    /// Overrides `world.seed`.
    pub seed: Option<u64>,
    /// Final snapshot destination.
    pub snapshot: Option<PathBuf>,
    /// Also snapshot every this many steps (to the same path); 0 disables.
    pub snapshot_every: u64,
    /// Continue from this snapshot instead of a fresh world.
    pub resume: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub period: u64,
    pub capital: f64,
    pub waste: f64,
    pub interrupted: bool,
}

pub struct Runner {
    experiment: Eincasm,
    options: RunOptions,
    stop: Arc<AtomicBool>,
}

/// Reads `path` if it exists, otherwise falls back to defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    AppConfig::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
}

impl Runner {
    pub fn new(mut config: AppConfig, options: RunOptions) -> Result<Self> {
        if let Some(seed) = options.seed {
            config.world.seed = Some(seed);
        }
        if let Some(steps) = options.steps {
            config.world.steps = steps;
        }
        let experiment = match &options.resume {
            Some(path) => Eincasm::resume(config, path)?,
            None => Eincasm::new(config)?,
        };
        Ok(Self {
            experiment,
            options,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that ends the run after the current step when set.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[must_use]
    pub fn experiment(&self) -> &Eincasm {
        &self.experiment
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        let steps = self.experiment.config().world.steps;
        let mut done = 0;
        let mut interrupted = false;
        tracing::info!(steps, run_id = %self.experiment.run_id(), "Headless run started");

        while done < steps {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!(done, "Stop requested");
                interrupted = true;
                break;
            }
            self.experiment.step()?;
            done += 1;
            if self.options.snapshot_every > 0 && done % self.options.snapshot_every == 0 {
                self.write_snapshot()?;
            }
        }
        self.write_snapshot()?;

        let sim = self.experiment.sim();
        sim.metrics().log_rule_summary();
        let summary = RunSummary {
            steps: done,
            period: sim.period(),
            capital: sim.read(crate::model::ids::CAPITAL)?.sum(),
            waste: sim.read(crate::model::ids::WASTE)?.sum(),
            interrupted,
        };
        tracing::info!(
            steps = summary.steps,
            period = summary.period,
            capital = summary.capital,
            waste = summary.waste,
            "Headless run finished"
        );
        Ok(summary)
    }

    fn write_snapshot(&self) -> Result<()> {
        if let Some(path) = &self.options.snapshot {
            self.experiment
                .save_snapshot(path)
                .with_context(|| format!("writing snapshot {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> AppConfig {
        let mut config = AppConfig::default();
        config.world.width = 8;
        config.world.height = 8;
        config.world.steps = 5;
        config.ports.num_sites_range = [4, 8];
        config
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config(Path::new("definitely/not/here.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml");
        assert_eq!(load_config(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_overrides_apply() {
        let runner = Runner::new(
            tiny(),
            RunOptions {
                steps: Some(2),
                seed: Some(99),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(runner.experiment().config().world.steps, 2);
        assert_eq!(runner.experiment().sim().seed(), 99);
    }

    #[test]
    fn test_run_counts_steps() {
        let mut runner = Runner::new(tiny(), RunOptions::default()).unwrap();
        let summary = runner.run().unwrap();
        assert_eq!(summary.steps, 5);
        assert_eq!(summary.period, 5);
        assert!(!summary.interrupted);
        assert!(summary.capital >= 0.0 && summary.waste >= 0.0);
    }

    #[test]
    fn test_stop_flag_interrupts() {
        let mut runner = Runner::new(tiny(), RunOptions::default()).unwrap();
        runner.stop_handle().store(true, Ordering::SeqCst);
        let summary = runner.run().unwrap();
        assert_eq!(summary.steps, 0);
        assert!(summary.interrupted);
    }
}
