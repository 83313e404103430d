//! Error types for the substrate and update engine.

use thiserror::Error;

/// Errors raised while configuring or stepping a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Malformed setup: unknown parent, late channel registration, missing declarations.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Access to an unregistered channel id.
    #[error("Unknown channel: {0}")]
    Lookup(String),

    /// A physics checkpoint observed a conservation or sign violation.
    #[error("Invariant violated in {kernel}: {message}")]
    InvariantViolation {
        kernel: &'static str,
        message: String,
    },

    /// A rule touched a channel or metadata key outside its declaration.
    #[error("Rule '{rule}' accessed undeclared {target}")]
    UndeclaredAccess { rule: String, target: String },
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    #[must_use]
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    #[must_use]
    pub fn lookup<S: Into<String>>(id: S) -> Self {
        Self::Lookup(id.into())
    }

    #[must_use]
    pub fn invariant<S: Into<String>>(kernel: &'static str, msg: S) -> Self {
        Self::InvariantViolation {
            kernel,
            message: msg.into(),
        }
    }

    #[must_use]
    pub fn undeclared<R: Into<String>, T: Into<String>>(rule: R, target: T) -> Self {
        Self::UndeclaredAccess {
            rule: rule.into(),
            target: target.into(),
        }
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::configuration("cannot add channel after malloc");
        assert_eq!(
            err.to_string(),
            "Configuration error: cannot add channel after malloc"
        );
        let err = SimError::invariant("flow", "capital became negative");
        assert!(err.to_string().contains("flow"));
    }

    #[test]
    fn test_undeclared_display() {
        let err = SimError::undeclared("grow", "channel 'waste'");
        assert_eq!(err.to_string(), "Rule 'grow' accessed undeclared channel 'waste'");
    }
}
