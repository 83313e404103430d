//! Muscle growth and atrophy.
//!
//! A muscle's capacity is its cross-sectional area `r²`. Shrinking a muscle
//! returns area to the cell's capital at `1 - growth_cost`; growing one
//! spends capital, split pro-rata across the cell's growing muscles when
//! demand exceeds what the cell holds, at the same inefficiency.

use super::{ensure_fits, ensure_non_negative, ensure_not_invented};
use crate::error::{Result, SimError};
use crate::field::Field;

const KERNEL: &str = "grow";

/// Capital below this is snapped to zero after growth.
pub const CAPITAL_SNAP: f32 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthOutcome {
    pub radii: Field,
    pub capital: Field,
}

pub fn grow_muscle_csa(
    radii: &Field,
    deltas: &Field,
    capital: &Field,
    growth_cost: f32,
) -> Result<GrowthOutcome> {
    let k = radii.components();
    ensure_fits(
        KERNEL,
        &[("radii", radii, k), ("deltas", deltas, k), ("capital", capital, 1)],
    )?;
    if !(0.0..=1.0).contains(&growth_cost) {
        return Err(SimError::configuration(format!(
            "growth_cost must lie in [0, 1], got {growth_cost}"
        )));
    }
    ensure_non_negative(KERNEL, "capital before growth", capital.as_slice())?;

    let n = capital.shape().cells();
    let efficiency = 1.0 - growth_cost;
    let before = capital.sum() + area_sum(radii);

    // Per-cell totals of shrinking and growing area.
    let mut shrink = vec![0.0f32; n];
    let mut grow = vec![0.0f32; n];
    for c in 0..k {
        for (i, (&r, &d)) in radii.plane(c).iter().zip(deltas.plane(c)).enumerate() {
            let csa_delta = (r + d) * (r + d) - r * r;
            if csa_delta < 0.0 {
                shrink[i] += csa_delta;
            } else {
                grow[i] += csa_delta;
            }
        }
    }

    let mut new_capital = capital.clone();
    let mut gained = vec![0.0f32; n];
    for (i, cap) in new_capital.as_mut_slice().iter_mut().enumerate() {
        *cap -= shrink[i] * efficiency;
        let consumed = grow[i].min(*cap);
        *cap -= consumed;
        gained[i] = consumed * efficiency;
    }

    let mut new_radii = radii.clone();
    for c in 0..k {
        let d_plane = deltas.plane(c);
        for (i, r) in new_radii.plane_mut(c).iter_mut().enumerate() {
            let target = *r + d_plane[i];
            let csa_delta = target * target - *r * *r;
            let mut area = *r * *r;
            if csa_delta < 0.0 {
                area += csa_delta;
            } else if grow[i] > 0.0 {
                area += gained[i] * csa_delta / grow[i];
            }
            // Polarity may flip even when no capital is available.
            *r = area.max(0.0).sqrt().copysign(target);
        }
    }

    for cap in new_capital.as_mut_slice() {
        if *cap < CAPITAL_SNAP {
            *cap = 0.0;
        }
    }

    ensure_non_negative(KERNEL, "capital after growth", new_capital.as_slice())?;
    let after = new_capital.sum() + area_sum(&new_radii);
    ensure_not_invented(KERNEL, "capital + muscle area", before, after)?;

    Ok(GrowthOutcome {
        radii: new_radii,
        capital: new_capital,
    })
}

/// Total cross-sectional area of every muscle on the grid.
#[must_use]
pub fn area_sum(radii: &Field) -> f64 {
    radii
        .as_slice()
        .iter()
        .map(|&r| (r as f64) * (r as f64))
        .sum()
}
