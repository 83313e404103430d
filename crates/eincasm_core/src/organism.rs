//! Controller interface.
//!
//! An [`Organism`] maps sensor channel contents to an actuator field. The
//! engine treats it as a black box with a fixed output shape: the actuator
//! field is split across the declared actuator channels in order, and each
//! channel's limits clamp what lands in it.

use crate::error::{Result, SimError};
use crate::field::Field;
use crate::registry::{Declaration, RuleContext, UpdateRule};
use crate::substrate::Substrate;
use eincasm_data::Shape;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub trait Organism: Send {
    /// Total actuator components produced by [`Organism::forward`].
    fn n_actuators(&self) -> usize;

    /// Produces `n_actuators` components for the whole grid.
    fn forward(&mut self, sensors: &[Field], shape: Shape, rng: &mut ChaCha8Rng) -> Result<Field>;
}

/// Uniform random actuation in `[-1, 1]`, ignoring every sensor.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    n_actuators: usize,
}

impl RandomAgent {
    #[must_use]
    pub fn new(n_actuators: usize) -> Self {
        Self { n_actuators }
    }
}

impl Organism for RandomAgent {
    fn n_actuators(&self) -> usize {
        self.n_actuators
    }

    fn forward(&mut self, _sensors: &[Field], shape: Shape, rng: &mut ChaCha8Rng) -> Result<Field> {
        let data = (0..self.n_actuators * shape.cells())
            .map(|_| rng.gen_range(-1.0f32..=1.0))
            .collect();
        Field::from_vec(shape, self.n_actuators, data)
    }
}

/// Runs an organism as an update rule.
pub struct OrganismRule<O> {
    decl: Declaration,
    sensors: Vec<String>,
    actuators: Vec<String>,
    organism: O,
}

impl<O: Organism> OrganismRule<O> {
    pub fn new<S: AsRef<str>>(name: &str, sensors: &[S], actuators: &[S], organism: O) -> Self {
        let sensors: Vec<String> = sensors.iter().map(|s| s.as_ref().to_string()).collect();
        let actuators: Vec<String> = actuators.iter().map(|s| s.as_ref().to_string()).collect();
        Self {
            decl: Declaration::new(name)
                .reads(sensors.iter().cloned())
                .writes(actuators.iter().cloned()),
            sensors,
            actuators,
            organism,
        }
    }

    #[must_use]
    pub fn organism(&self) -> &O {
        &self.organism
    }
}

impl<O: Organism> UpdateRule for OrganismRule<O> {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn validate(&self, substrate: &Substrate) -> Result<()> {
        let mut total = 0;
        for id in &self.actuators {
            total += substrate.channel(id)?.components();
        }
        if total != self.organism.n_actuators() {
            return Err(SimError::configuration(format!(
                "organism '{}' produces {} actuators, its actuator channels hold {total}",
                self.decl.name,
                self.organism.n_actuators()
            )));
        }
        Ok(())
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let shape = ctx.shape();
        let mut sensors = Vec::with_capacity(self.sensors.len());
        for id in &self.sensors {
            sensors.push(ctx.read(id)?);
        }
        let output = self.organism.forward(&sensors, shape, ctx.rng())?;
        if output.components() != self.organism.n_actuators() || output.shape() != shape {
            return Err(SimError::configuration(format!(
                "organism '{}' returned {} components, expected {}",
                self.decl.name,
                output.components(),
                self.organism.n_actuators()
            )));
        }

        let mut counts = Vec::with_capacity(self.actuators.len());
        for id in &self.actuators {
            counts.push(ctx.view(id)?.components());
        }
        for (id, part) in self.actuators.iter().zip(output.split(&counts)?) {
            ctx.write(id, part)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelSpec;
    use crate::metrics::Metrics;
    use crate::registry::Registry;
    use crate::state::SimulationState;
    use rand::SeedableRng;

    fn substrate() -> Substrate {
        let mut s = Substrate::new(Shape::new(3, 3));
        s.add_channel("capital", ChannelSpec::new()).unwrap();
        s.add_channel(
            "act",
            ChannelSpec::new().with_components(3).with_lims((-1.0, 1.0)),
        )
        .unwrap();
        s.add_channel("com", ChannelSpec::new().with_components(2))
            .unwrap();
        s.malloc().unwrap();
        s
    }

    #[test]
    fn test_random_agent_range_and_determinism() {
        let shape = Shape::new(4, 4);
        let mut a = RandomAgent::new(3);
        let f1 = a
            .forward(&[], shape, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        let f2 = a
            .forward(&[], shape, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        assert_eq!(f1, f2);
        assert!(f1.min() >= -1.0 && f1.max() <= 1.0);
    }

    #[test]
    fn test_actuator_count_checked_at_registration() {
        let s = substrate();
        let mut reg = Registry::new();
        let rule = OrganismRule::new("agent", &["capital"], &["act", "com"], RandomAgent::new(4));
        assert!(reg
            .register(Box::new(rule), &s, &SimulationState::new())
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_output_split_across_actuators() {
        let mut s = substrate();
        let mut state = SimulationState::new();
        let mut reg = Registry::new();
        let rule = OrganismRule::new("agent", &["capital"], &["act", "com"], RandomAgent::new(5));
        reg.register(Box::new(rule), &s, &state).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        reg.run_step(&mut s, &mut state, &mut rng, &Metrics::new())
            .unwrap();
        assert!(s.view("act").unwrap().max() > 0.0 || s.view("act").unwrap().min() < 0.0);
        assert_ne!(s.view("com").unwrap().sum(), 0.0);
        assert_eq!(s.view("capital").unwrap().sum(), 0.0);
    }
}
