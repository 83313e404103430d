//! Resource regeneration for port cells.
//!
//! Each resource in a [`PortLayout`] adds its regeneration amount for the
//! current period to the cells tagged with its id. Tagged cells are then
//! clamped into the ports channel limits.

use crate::error::{Result, SimError};
use crate::field::Field;
use eincasm_data::{Lims, PortLayout};

/// Adds each resource's regeneration for `period` to the cells it tags, then
/// clamps those cells into `lims`. Every resource is evaluated at the same period.
pub fn regen_ports(ports: &Field, layout: &PortLayout, period: u64, lims: Lims) -> Result<Field> {
    if ports.components() != 1 {
        return Err(SimError::configuration(format!(
            "ports must have one component, got {}",
            ports.components()
        )));
    }
    if layout.port_id_map.len() != ports.shape().cells() {
        return Err(SimError::configuration(format!(
            "port_id_map covers {} cells, grid has {}",
            layout.port_id_map.len(),
            ports.shape().cells()
        )));
    }

    let mut out = ports.clone();
    let values = out.as_mut_slice();
    for resource in &layout.resources {
        let amount = resource.regen.eval(period);
        for (v, &id) in values.iter_mut().zip(&layout.port_id_map) {
            if id != resource.id {
                continue;
            }
            if amount != 0.0 {
                *v += amount;
            }
            *v = lims.clamp(*v);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eincasm_data::{RegenFunc, Resource, Shape, NO_PORT};

    fn layout(shape: Shape, tagged: usize, amount: f32) -> PortLayout {
        let mut map = vec![NO_PORT; shape.cells()];
        map[tagged] = 1;
        PortLayout::new(map, vec![Resource::constant(1, amount)])
    }

    #[test]
    fn test_regen_adds_only_to_tagged_cells() {
        let shape = Shape::new(2, 2);
        let ports = Field::zeros(shape, 1);
        let out = regen_ports(&ports, &layout(shape, 3, 1.5), 0, Lims::new(-1.0, 10.0)).unwrap();
        assert_eq!(out.as_slice(), &[0.0, 0.0, 0.0, 1.5]);
    }

    #[test]
    fn test_regen_clamps_to_upper_limit() {
        let shape = Shape::new(2, 1);
        let ports = Field::filled(shape, 1, 9.5);
        let out = regen_ports(&ports, &layout(shape, 0, 1.0), 0, Lims::new(-1.0, 10.0)).unwrap();
        assert_eq!(out.as_slice(), &[10.0, 9.5]);
    }

    #[test]
    fn test_zero_regen_is_bit_identical() {
        let shape = Shape::new(3, 1);
        let ports = Field::from_vec(shape, 1, vec![-0.0, 0.3, 7.25]).unwrap();
        let mut l = layout(shape, 0, 0.0);
        l.port_id_map = vec![1, 1, 1];
        let out = regen_ports(&ports, &l, 12, Lims::new(-1.0, 10.0)).unwrap();
        let before: Vec<u32> = ports.as_slice().iter().map(|v| v.to_bits()).collect();
        let after: Vec<u32> = out.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_periodic_regen_uses_period() {
        let shape = Shape::new(1, 1);
        let mut l = layout(shape, 0, 0.0);
        l.resources[0].regen = RegenFunc::Periodic {
            amplitude: 2.0,
            frequency: std::f32::consts::PI,
            phase: 0.0,
        };
        let ports = Field::zeros(shape, 1);
        let out = regen_ports(&ports, &l, 0, Lims::UNBOUNDED).unwrap();
        assert!((out.as_slice()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_map_size_mismatch_rejected() {
        let ports = Field::zeros(Shape::new(2, 2), 1);
        let l = layout(Shape::new(1, 1), 0, 1.0);
        assert!(regen_ports(&ports, &l, 0, Lims::UNBOUNDED)
            .unwrap_err()
            .is_configuration());
    }
}
