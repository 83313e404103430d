//! Global simulation state visible to update rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key under which the step counter is exposed to rule declarations.
pub const PERIOD: &str = "period";

/// Simulation-wide state. Rules read it only through keys they declare, and
/// write it only when they declare themselves state-mutating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Monotonic step counter, advanced by the period rule.
    pub period: u64,
    /// Additional named scalars.
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

impl SimulationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        key == PERIOD || self.values.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        if key == PERIOD {
            Some(self.period as f64)
        } else {
            self.values.get(key).copied()
        }
    }

    /// Sets a named value. Writing `period` truncates to a whole step count.
    pub fn set(&mut self, key: &str, value: f64) {
        if key == PERIOD {
            self.period = value.max(0.0) as u64;
        } else {
            self.values.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_always_present() {
        let mut state = SimulationState::new();
        assert!(state.has(PERIOD));
        assert_eq!(state.get(PERIOD), Some(0.0));
        state.set(PERIOD, 3.0);
        assert_eq!(state.period, 3);
    }

    #[test]
    fn test_named_values() {
        let mut state = SimulationState::new();
        assert!(!state.has("temperature"));
        state.set("temperature", 0.5);
        assert_eq!(state.get("temperature"), Some(0.5));
    }
}
