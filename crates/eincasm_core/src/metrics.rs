//! Step metrics and logging setup.
//!
//! Provides structured logging and per-rule timing for monitoring
//! simulation performance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Invocation count and cumulative time of one update rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleTiming {
    pub calls: u64,
    pub total: Duration,
}

/// Metrics collector for simulation steps.
pub struct Metrics {
    step_count: AtomicU64,
    log_interval: AtomicU64,
    rules: Mutex<HashMap<String, RuleTiming>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step_count: AtomicU64::new(0),
            log_interval: AtomicU64::new(1000),
            rules: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Steps between summary log lines; 0 disables them.
    pub fn set_log_interval(&self, interval: u64) {
        self.log_interval.store(interval, Ordering::Relaxed);
    }

    /// Records a completed step and its duration.
    pub fn record_step(&self, duration: Duration, period: u64) {
        let step = self.step_count.fetch_add(1, Ordering::Relaxed) + 1;
        let interval = self.log_interval.load(Ordering::Relaxed);
        if interval > 0 && step % interval == 0 {
            tracing::info!(
                step = step,
                period = period,
                duration_ms = duration.as_millis() as u64,
                "Simulation step"
            );
        }
    }

    pub fn record_rule(&self, name: &str, duration: Duration) {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        let entry = rules.entry(name.to_string()).or_default();
        entry.calls += 1;
        entry.total += duration;
    }

    #[must_use]
    pub fn rule_timing(&self, name: &str) -> Option<RuleTiming> {
        let rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        rules.get(name).copied()
    }

    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs cumulative per-rule timings at debug level.
    pub fn log_rule_summary(&self) {
        let rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<_> = rules.keys().collect();
        names.sort();
        for name in names {
            let t = rules[name];
            tracing::debug!(
                rule = %name,
                calls = t.calls,
                total_ms = t.total.as_millis() as u64,
                "Rule timing"
            );
        }
    }
}

/// Initialize tracing subscriber for logging. Honours `RUST_LOG`, defaults to info.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.step_count(), 0);
    }

    #[test]
    fn test_record_step() {
        let metrics = Metrics::new();
        metrics.record_step(Duration::from_millis(16), 1);
        assert_eq!(metrics.step_count(), 1);
    }

    #[test]
    fn test_record_rule_accumulates() {
        let metrics = Metrics::new();
        metrics.record_rule("flow", Duration::from_millis(2));
        metrics.record_rule("flow", Duration::from_millis(3));
        let t = metrics.rule_timing("flow").unwrap();
        assert_eq!(t.calls, 2);
        assert_eq!(t.total, Duration::from_millis(5));
        assert!(metrics.rule_timing("grow").is_none());
    }
}
