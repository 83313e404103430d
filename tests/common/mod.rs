use eincasm_core::{ChannelSpec, Field, Simulation};
use eincasm_data::Shape;

type ChannelDef = Box<dyn FnOnce(&mut Simulation) -> eincasm_core::Result<()>>;

/// Builds an allocated simulation from channel definitions. Rules are added by the test afterwards.
#[allow(dead_code)]
pub struct SimulationBuilder {
    name: String,
    shape: Shape,
    seed: u64,
    channels: Vec<ChannelDef>,
}

#[allow(dead_code)]
impl SimulationBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            name: "test".to_string(),
            shape: Shape::new(width, height),
            seed: 0,
            channels: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_channel(mut self, id: &'static str, spec: ChannelSpec) -> Self {
        self.channels
            .push(Box::new(move |sim| sim.add_channel(id, spec)));
        self
    }

    pub fn with_subchannel(
        mut self,
        id: &'static str,
        parent: &'static str,
        indices: Vec<usize>,
    ) -> Self {
        self.channels
            .push(Box::new(move |sim| sim.add_subchannel(id, parent, indices)));
        self
    }

    pub fn build(self) -> Simulation {
        let mut sim = Simulation::new(&self.name, self.shape, self.seed);
        for define in self.channels {
            define(&mut sim).expect("Failed to define channel");
        }
        sim.malloc().expect("Failed to allocate substrate");
        sim
    }
}

/// Single-component field that is zero except at `(x, y)`.
#[allow(dead_code)]
pub fn spike(shape: Shape, x: usize, y: usize, value: f32) -> Field {
    let mut field = Field::zeros(shape, 1);
    field.set(0, x, y, value);
    field
}
