//! Physics kernels and the update rules that drive them.
//!
//! Each kernel is a pure function from field contents plus configuration to
//! new field contents. Kernels check their conservation and sign laws at
//! entry and exit and report a breach as [`SimError::InvariantViolation`].

pub mod flow;
pub mod growth;
pub mod mine;
pub mod port;
pub mod regen;
pub mod rules;

pub use flow::{activate_flow_muscles, FlowOutcome};
pub use growth::{grow_muscle_csa, GrowthOutcome};
pub use mine::{activate_mine_muscles, MineOutcome};
pub use port::{activate_port_muscles, PortOutcome};
pub use regen::regen_ports;
pub use rules::{
    FlowConfig, FlowRule, GrowRule, GrowthConfig, MineConfig, MineRule, PortConfig, PortRule,
    RegenRule, StepPeriod, NUM_REGENS,
};

use crate::error::{Result, SimError};
use crate::field::Field;

/// Negative excursions smaller than this are float straddle, not a defect.
pub const NEGATIVE_TOLERANCE: f32 = 1e-4;

/// Relative slack allowed when comparing grid totals before and after a kernel.
pub const CONSERVATION_TOLERANCE: f64 = 1e-5;

/// Signed exchange a muscle performs: `sign(r) * r² * activation`.
#[inline]
#[must_use]
pub fn activate_muscle(radius: f32, activation: f32) -> f32 {
    radius.signum() * radius * radius * activation
}

/// Fails if any value is meaningfully negative.
pub(crate) fn ensure_non_negative(kernel: &'static str, what: &str, values: &[f32]) -> Result<()> {
    match values.iter().position(|&v| v < -NEGATIVE_TOLERANCE || v.is_nan()) {
        Some(i) => Err(SimError::invariant(
            kernel,
            format!("{what} is {} at cell {i}", values[i]),
        )),
        None => Ok(()),
    }
}

/// Like [`ensure_non_negative`], then snaps the remaining float straddle to zero.
pub(crate) fn settle_non_negative(
    kernel: &'static str,
    what: &str,
    values: &mut [f32],
) -> Result<()> {
    ensure_non_negative(kernel, what, values)?;
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
    Ok(())
}

/// Fails if `after` exceeds `before` by more than rounding.
pub(crate) fn ensure_not_invented(
    kernel: &'static str,
    what: &str,
    before: f64,
    after: f64,
) -> Result<()> {
    let slack = CONSERVATION_TOLERANCE * before.abs().max(1.0);
    if after - before > slack {
        return Err(SimError::invariant(
            kernel,
            format!("{what} was invented: {before} -> {after}"),
        ));
    }
    Ok(())
}

/// Ensures every field matches the first one's shape and the expected component counts.
pub(crate) fn ensure_fits(kernel: &'static str, fields: &[(&str, &Field, usize)]) -> Result<()> {
    let Some((_, first, _)) = fields.first() else {
        return Ok(());
    };
    let shape = first.shape();
    for (name, field, components) in fields {
        if field.shape() != shape || field.components() != *components {
            return Err(SimError::configuration(format!(
                "{kernel}: '{name}' is {}x{}x{}, expected {}x{}x{components}",
                field.shape().width,
                field.shape().height,
                field.components(),
                shape.width,
                shape.height,
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_muscle_keeps_radius_sign() {
        assert_eq!(activate_muscle(2.0, 1.0), 4.0);
        assert_eq!(activate_muscle(-2.0, 0.5), -2.0);
        assert_eq!(activate_muscle(-2.0, -1.0), 4.0);
        assert_eq!(activate_muscle(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_settle_snaps_straddle_and_rejects_real_negatives() {
        let mut v = vec![1.0, -1e-6, 0.0];
        settle_non_negative("test", "capital", &mut v).unwrap();
        assert_eq!(v, vec![1.0, 0.0, 0.0]);
        let mut v = vec![-0.5];
        assert!(matches!(
            settle_non_negative("test", "capital", &mut v),
            Err(SimError::InvariantViolation { kernel: "test", .. })
        ));
    }

    #[test]
    fn test_invention_check() {
        assert!(ensure_not_invented("test", "capital", 10.0, 10.0).is_ok());
        assert!(ensure_not_invented("test", "capital", 10.0, 9.0).is_ok());
        assert!(ensure_not_invented("test", "capital", 10.0, 10.1).is_err());
    }
}
