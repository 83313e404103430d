//! Kernel-directed exchange of capital and waste between neighbouring cells.
//!
//! Flow muscle `k` of a cell pushes mass toward the neighbour at kernel
//! offset `k`. Negative flow along a direction becomes positive flow along
//! its antipode; flow toward an obstacle is suppressed. Each cell pays
//! `flow_cost` per unit moved out of its capital before anything leaves, and
//! emits capital and waste in proportion to its current waste fraction.

use super::{
    activate_muscle, ensure_fits, ensure_non_negative, ensure_not_invented, settle_non_negative,
};
use crate::error::{Result, SimError};
use crate::field::Field;
use eincasm_data::Kernel;
use rayon::prelude::*;

const KERNEL: &str = "flow";

#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutcome {
    pub capital: Field,
    pub waste: Field,
}

/// What one cell sends out this step.
#[derive(Debug, Clone, Copy, Default)]
struct Emission {
    capital_left: f32,
    waste_left: f32,
    capital_out: f32,
    waste_out: f32,
    /// Sum of directed flows, used to split the emission across directions.
    requested: f32,
}

/// `activations` carries either one component shared by every direction or
/// one component per kernel direction.
pub fn activate_flow_muscles(
    capital: &Field,
    waste: &Field,
    obstacles: &Field,
    radii: &Field,
    activations: &Field,
    kernel: &Kernel,
    flow_cost: f32,
) -> Result<FlowOutcome> {
    let kn = kernel.len();
    if radii.components() != kn {
        return Err(SimError::configuration(format!(
            "flow radii have {} components but the kernel has {kn} directions",
            radii.components()
        )));
    }
    let act_components = activations.components();
    if act_components != 1 && act_components != kn {
        return Err(SimError::configuration(format!(
            "flow activations must have 1 or {kn} components, got {act_components}"
        )));
    }
    ensure_fits(
        KERNEL,
        &[
            ("capital", capital, 1),
            ("waste", waste, 1),
            ("obstacles", obstacles, 1),
            ("radii", radii, kn),
            ("activations", activations, act_components),
        ],
    )?;
    if !(flow_cost.is_finite() && flow_cost >= 0.0) {
        return Err(SimError::configuration(format!(
            "flow_cost must be a non-negative number, got {flow_cost}"
        )));
    }
    ensure_non_negative(KERNEL, "capital before flow", capital.as_slice())?;
    ensure_non_negative(KERNEL, "waste before flow", waste.as_slice())?;

    let shape = capital.shape();
    let n = shape.cells();
    let before = capital.sum();

    // Signed flow per direction, straight from the muscles.
    let mut raw = vec![0.0f32; kn * n];
    raw.par_chunks_mut(n).enumerate().for_each(|(k, plane)| {
        let r = radii.plane(k);
        let a = activations.plane(if act_components == 1 { 0 } else { k });
        for (i, f) in plane.iter_mut().enumerate() {
            *f = activate_muscle(r[i], a[i]);
        }
    });

    // Fold negative flow onto the antipode, then close directions that end in an obstacle.
    let blocked = obstacles.plane(0);
    let mut directed = vec![0.0f32; kn * n];
    directed.par_chunks_mut(n).enumerate().for_each(|(k, plane)| {
        let own = &raw[k * n..(k + 1) * n];
        let opposite = &raw[kernel.antipode(k) * n..(kernel.antipode(k) + 1) * n];
        let (dx, dy) = kernel.offset(k);
        for (i, f) in plane.iter_mut().enumerate() {
            let flow = if k == 0 {
                own[i].abs()
            } else {
                own[i].max(0.0) - opposite[i].min(0.0)
            };
            let (x, y) = shape.coords(i);
            let open = 1.0 - blocked[shape.wrapped_index(x, y, dx, dy)].clamp(0.0, 1.0);
            *f = flow * open;
        }
    });

    let cap = capital.as_slice();
    let wst = waste.as_slice();
    let emissions: Vec<Emission> = (0..n)
        .into_par_iter()
        .map(|i| {
            let requested: f32 = (0..kn).map(|k| directed[k * n + i]).sum();
            let mut c = cap[i];
            let mut w = wst[i];
            let max_possible = (c + w).min(c / (1.0 + flow_cost));
            let total = requested.min(max_possible);
            c -= total * flow_cost;
            let mass = c + w;
            let waste_fraction = if mass > 0.0 { w / mass } else { 0.0 };
            let waste_out = waste_fraction * total;
            let capital_out = total - waste_out;
            c -= capital_out;
            w -= waste_out;
            Emission {
                capital_left: c,
                waste_left: w,
                capital_out,
                waste_out,
                requested,
            }
        })
        .collect();

    // Each cell gathers what its neighbours sent toward it.
    let received: Vec<(f32, f32)> = (0..n)
        .into_par_iter()
        .map(|p| {
            let (x, y) = shape.coords(p);
            let mut capital_in = 0.0f32;
            let mut waste_in = 0.0f32;
            for k in 0..kn {
                let (dx, dy) = kernel.offset(k);
                let src = shape.wrapped_index(x, y, -dx, -dy);
                let e = &emissions[src];
                if e.requested > 0.0 {
                    let share = directed[k * n + src] / e.requested;
                    capital_in += e.capital_out * share;
                    waste_in += e.waste_out * share;
                }
            }
            (capital_in, waste_in)
        })
        .collect();

    let mut new_capital = Field::zeros(shape, 1);
    let mut new_waste = Field::zeros(shape, 1);
    new_capital
        .as_mut_slice()
        .par_iter_mut()
        .zip(new_waste.as_mut_slice().par_iter_mut())
        .enumerate()
        .for_each(|(i, (c, w))| {
            *c = emissions[i].capital_left + received[i].0;
            *w = emissions[i].waste_left + received[i].1;
        });

    settle_non_negative(KERNEL, "capital after flow", new_capital.as_mut_slice())?;
    settle_non_negative(KERNEL, "waste after flow", new_waste.as_mut_slice())?;
    ensure_not_invented(KERNEL, "capital", before, new_capital.sum())?;

    Ok(FlowOutcome {
        capital: new_capital,
        waste: new_waste,
    })
}
