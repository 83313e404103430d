//! Mining: converting obstacle mass into waste, or packing waste back into obstacles.

use super::{activate_muscle, ensure_fits, ensure_non_negative, settle_non_negative};
use crate::error::{Result, SimError};
use crate::field::Field;

const KERNEL: &str = "mine";

#[derive(Debug, Clone, PartialEq)]
pub struct MineOutcome {
    pub capital: Field,
    pub obstacles: Field,
    pub waste: Field,
}

pub fn activate_mine_muscles(
    capital: &Field,
    obstacles: &Field,
    waste: &Field,
    radii: &Field,
    activations: &Field,
    mining_cost: f32,
) -> Result<MineOutcome> {
    ensure_fits(
        KERNEL,
        &[
            ("capital", capital, 1),
            ("obstacles", obstacles, 1),
            ("waste", waste, 1),
            ("radii", radii, 1),
            ("activations", activations, 1),
        ],
    )?;
    if !(mining_cost.is_finite() && mining_cost > 0.0) {
        return Err(SimError::configuration(format!(
            "mining_cost must be positive, got {mining_cost}"
        )));
    }
    ensure_non_negative(KERNEL, "capital before mine", capital.as_slice())?;
    ensure_non_negative(KERNEL, "obstacles before mine", obstacles.as_slice())?;
    ensure_non_negative(KERNEL, "waste before mine", waste.as_slice())?;

    let mut new_capital = capital.clone();
    let mut new_obstacles = obstacles.clone();
    let mut new_waste = waste.clone();
    let r = radii.as_slice();
    let a = activations.as_slice();
    let cells = new_capital
        .as_mut_slice()
        .iter_mut()
        .zip(new_obstacles.as_mut_slice())
        .zip(new_waste.as_mut_slice());
    for (i, ((c, o), w)) in cells.enumerate() {
        let affordable = *c / mining_cost;
        let lo = (-*w).max(-affordable);
        let hi = o.min(affordable);
        let delta = activate_muscle(r[i], a[i]).max(lo).min(hi);
        *c = (*c - delta * mining_cost).max(0.0);
        *o -= delta;
        *w += delta;
    }

    ensure_non_negative(KERNEL, "capital after mine", new_capital.as_slice())?;
    settle_non_negative(KERNEL, "obstacles after mine", new_obstacles.as_mut_slice())?;
    settle_non_negative(KERNEL, "waste after mine", new_waste.as_mut_slice())?;
    Ok(MineOutcome {
        capital: new_capital,
        obstacles: new_obstacles,
        waste: new_waste,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eincasm_data::Shape;

    fn run(capital: f32, obstacle: f32, waste: f32, radius: f32, act: f32) -> [f32; 3] {
        let shape = Shape::new(1, 1);
        let f = |v| Field::filled(shape, 1, v);
        let out = activate_mine_muscles(
            &f(capital),
            &f(obstacle),
            &f(waste),
            &f(radius),
            &f(act),
            0.2,
        )
        .unwrap();
        [
            out.capital.as_slice()[0],
            out.obstacles.as_slice()[0],
            out.waste.as_slice()[0],
        ]
    }

    #[test]
    fn test_mining_turns_obstacle_into_waste() {
        let [c, o, w] = run(5.0, 1.0, 0.0, 2.0, 1.0);
        assert!((c - 4.8).abs() < 1e-6);
        assert_eq!(o, 0.0);
        assert_eq!(w, 1.0);
    }

    #[test]
    fn test_mining_limited_by_capital() {
        let [c, o, w] = run(0.1, 1.0, 0.0, 2.0, 1.0);
        // 0.1 capital pays for 0.5 units at cost 0.2.
        assert!(c.abs() < 1e-6);
        assert!((o - 0.5).abs() < 1e-6);
        assert!((w - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_negative_mining_deposits_waste() {
        let [c, o, w] = run(5.0, 0.0, 0.5, 1.0, -1.0);
        // Redepositing 0.5 waste returns 0.5 * cost to capital.
        assert!((c - 5.1).abs() < 1e-6);
        assert!((o - 0.5).abs() < 1e-6);
        assert_eq!(w, 0.0);
    }

    #[test]
    fn test_negative_obstacles_rejected() {
        let shape = Shape::new(1, 1);
        let f = |v| Field::filled(shape, 1, v);
        assert!(matches!(
            activate_mine_muscles(&f(1.0), &f(-1.0), &f(0.0), &f(1.0), &f(1.0), 0.2),
            Err(SimError::InvariantViolation { kernel: "mine", .. })
        ));
    }
}
