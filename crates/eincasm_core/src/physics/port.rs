//! Exchange between a cell's capital and the resource port it sits on.
//!
//! The exchange is debited from capital at `port_cost` per unit and credited
//! back with its magnitude signed like the port. Ports may hold negative
//! "poison", which moves at the same cost but drains capital instead of
//! feeding it. Capital driven negative by poison is floored at zero.

use super::{activate_muscle, ensure_fits, ensure_non_negative};
use crate::error::{Result, SimError};
use crate::field::Field;

const KERNEL: &str = "port";

#[derive(Debug, Clone, PartialEq)]
pub struct PortOutcome {
    pub capital: Field,
    pub ports: Field,
}

pub fn activate_port_muscles(
    capital: &Field,
    ports: &Field,
    radii: &Field,
    activations: &Field,
    port_cost: f32,
) -> Result<PortOutcome> {
    ensure_fits(
        KERNEL,
        &[
            ("capital", capital, 1),
            ("ports", ports, 1),
            ("radii", radii, 1),
            ("activations", activations, 1),
        ],
    )?;
    if !(port_cost.is_finite() && port_cost > 0.0) {
        return Err(SimError::configuration(format!(
            "port_cost must be positive, got {port_cost}"
        )));
    }
    ensure_non_negative(KERNEL, "capital before port", capital.as_slice())?;

    let mut new_capital = capital.clone();
    let mut new_ports = ports.clone();
    let mut drained = 0usize;
    let r = radii.as_slice();
    let a = activations.as_slice();
    for (i, (c, p)) in new_capital
        .as_mut_slice()
        .iter_mut()
        .zip(new_ports.as_mut_slice())
        .enumerate()
    {
        let lo = -*c * port_cost;
        let hi = (*c / port_cost).min(p.abs());
        let delta = activate_muscle(r[i], a[i]).max(lo).min(hi);
        let polarity = if *p >= 0.0 { 1.0 } else { -1.0 };
        *c += delta.abs().copysign(polarity) - delta * port_cost;
        *p -= delta * polarity;
        if *c < 0.0 {
            drained += 1;
            *c = 0.0;
        }
    }
    if drained > 0 {
        tracing::warn!(cells = drained, "Port exchange drove capital negative; floored at zero");
    }

    ensure_non_negative(KERNEL, "capital after port", new_capital.as_slice())?;
    Ok(PortOutcome {
        capital: new_capital,
        ports: new_ports,
    })
}
