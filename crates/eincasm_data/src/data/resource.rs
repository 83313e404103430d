use serde::{Deserialize, Serialize};

/// Port id stored in cells that carry no port.
pub const NO_PORT: u32 = 0;

/// Per-step regeneration amount of a resource as a function of the period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegenFunc {
    /// Same amount every step.
    Constant(f32),
    /// `amplitude * 0.5 * (1 + sin(frequency * period + phase))`
    Periodic {
        amplitude: f32,
        frequency: f32,
        phase: f32,
    },
}

impl RegenFunc {
    #[must_use]
    pub fn eval(&self, period: u64) -> f32 {
        match *self {
            RegenFunc::Constant(v) => v,
            RegenFunc::Periodic {
                amplitude,
                frequency,
                phase,
            } => {
                let t = period as f64 * frequency as f64 + phase as f64;
                (amplitude as f64 * 0.5 * (1.0 + t.sin())) as f32
            }
        }
    }
}

/// A regenerating resource tied to one port id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Port id the resource is stamped with in [`PortLayout::port_id_map`]. Never [`NO_PORT`].
    pub id: u32,
    /// Peak regeneration amount.
    pub amplitude: f32,
    /// Levy exponent used when its sites were placed.
    pub alpha: f32,
    pub regen: RegenFunc,
}

impl Resource {
    #[must_use]
    pub fn constant(id: u32, amount: f32) -> Self {
        Self {
            id,
            amplitude: amount,
            alpha: 0.0,
            regen: RegenFunc::Constant(amount),
        }
    }
}

/// Port placement produced by the ports initializer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortLayout {
    /// One entry per cell, row-major; [`NO_PORT`] where no port sits.
    pub port_id_map: Vec<u32>,
    pub resources: Vec<Resource>,
    /// Number of cells tagged by each resource, in `resources` order.
    pub port_sizes: Vec<usize>,
}

impl PortLayout {
    /// Builds a layout from an id map, recomputing `port_sizes`.
    #[must_use]
    pub fn new(port_id_map: Vec<u32>, resources: Vec<Resource>) -> Self {
        let port_sizes = resources
            .iter()
            .map(|r| port_id_map.iter().filter(|&&id| id == r.id).count())
            .collect();
        Self {
            port_id_map,
            resources,
            port_sizes,
        }
    }

    #[must_use]
    pub fn resource(&self, id: u32) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_regen_stays_within_amplitude() {
        let f = RegenFunc::Periodic {
            amplitude: 2.0,
            frequency: 0.3,
            phase: 1.0,
        };
        for period in 0..200 {
            let v = f.eval(period);
            assert!((0.0..=2.0).contains(&v), "period {period} gave {v}");
        }
    }

    #[test]
    fn test_layout_counts_sizes() {
        let map = vec![0, 1, 1, 2, 0, 1];
        let layout = PortLayout::new(
            map,
            vec![Resource::constant(1, 1.0), Resource::constant(2, 0.5)],
        );
        assert_eq!(layout.port_sizes, vec![3, 1]);
        assert_eq!(layout.resource(2).map(|r| r.amplitude), Some(0.5));
        assert!(layout.resource(7).is_none());
    }
}
