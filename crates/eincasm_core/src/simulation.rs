//! The simulation driver: substrate, rule registry, global state and RNG.
//!
//! Setup runs in a fixed order: register channels, [`Simulation::malloc`],
//! register update functions, [`Simulation::init_all_channels`], then
//! [`Simulation::update`] once per step. Registering update functions before
//! initialisation is fine; channel metadata requirements are checked on the
//! first step, after initializers have filled it in.

use crate::channel::ChannelSpec;
use crate::error::{Result, SimError};
use crate::field::Field;
use crate::metrics::Metrics;
use crate::registry::{AccessRecord, Declaration, FnRule, Registry, RuleContext, UpdateRule};
use crate::state::SimulationState;
use crate::substrate::Substrate;
use eincasm_data::Shape;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// A brush stroke staged for the start of the next step.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintRequest {
    pub channel: String,
    pub x: usize,
    pub y: usize,
    /// Disc radius in cells; 0 paints a single cell.
    pub radius: usize,
    /// Written to every component of every painted cell, then clamped into the channel's limits.
    pub value: f32,
}

pub struct Simulation {
    name: String,
    seed: u64,
    substrate: Substrate,
    registry: Registry,
    state: SimulationState,
    rng: ChaCha8Rng,
    metrics: Metrics,
    pending_paint: Vec<PaintRequest>,
}

impl Simulation {
    #[must_use]
    pub fn new(name: &str, shape: Shape, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            seed,
            substrate: Substrate::new(shape),
            registry: Registry::new(),
            state: SimulationState::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            metrics: Metrics::new(),
            pending_paint: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.substrate.shape()
    }

    pub fn add_channel(&mut self, id: &str, spec: ChannelSpec) -> Result<()> {
        self.substrate.add_channel(id, spec)
    }

    pub fn add_subchannel<I>(&mut self, id: &str, parent_id: &str, indices: I) -> Result<()>
    where
        I: IntoIterator<Item = usize>,
    {
        self.substrate.add_subchannel(id, parent_id, indices)
    }

    pub fn malloc(&mut self) -> Result<()> {
        self.substrate.malloc()
    }

    pub fn init_all_channels(&mut self) -> Result<()> {
        self.substrate.init_all_channels(&mut self.rng)
    }

    /// Registers a rule after checking its declaration against the substrate.
    pub fn add_update_function<R: UpdateRule + 'static>(&mut self, rule: R) -> Result<()> {
        self.registry
            .register(Box::new(rule), &self.substrate, &self.state)
    }

    /// Registers a closure as an update rule.
    pub fn add_fn<F>(&mut self, decl: Declaration, f: F) -> Result<()>
    where
        F: FnMut(&mut RuleContext<'_>) -> Result<()> + Send + 'static,
    {
        self.add_update_function(FnRule::new(decl, f))
    }

    /// Seeds a simulation-state value that rules may then declare.
    pub fn set_state_value(&mut self, key: &str, value: f64) {
        self.state.set(key, value);
    }

    /// Runs one step: pending paint, then every rule in registration order.
    pub fn update(&mut self) -> Result<()> {
        let start = Instant::now();
        self.apply_paint()?;
        self.registry.run_step(
            &mut self.substrate,
            &mut self.state,
            &mut self.rng,
            &self.metrics,
        )?;
        self.metrics.record_step(start.elapsed(), self.state.period);
        Ok(())
    }

    /// Runs `steps` updates, stopping at the first error.
    pub fn run(&mut self, steps: u64) -> Result<()> {
        tracing::info!(simulation = %self.name, steps, "Run started");
        for _ in 0..steps {
            self.update()?;
        }
        self.metrics.log_rule_summary();
        tracing::info!(
            simulation = %self.name,
            period = self.state.period,
            elapsed_ms = self.metrics.elapsed().as_millis() as u64,
            "Run finished"
        );
        Ok(())
    }

    /// Stages a paint stroke for the next step.
    pub fn paint(&mut self, request: PaintRequest) -> Result<()> {
        self.substrate.channel(&request.channel)?;
        self.pending_paint.push(request);
        Ok(())
    }

    #[must_use]
    pub fn pending_paint(&self) -> &[PaintRequest] {
        &self.pending_paint
    }

    fn apply_paint(&mut self) -> Result<()> {
        let shape = self.substrate.shape();
        for req in std::mem::take(&mut self.pending_paint) {
            let mut view = self.substrate.view_mut(&req.channel)?;
            let r = req.radius as i64;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy > r * r {
                        continue;
                    }
                    let idx = shape.wrapped_index(req.x, req.y, dx as i32, dy as i32);
                    let (x, y) = shape.coords(idx);
                    for c in 0..view.components() {
                        view.set(c, x, y, req.value);
                    }
                }
            }
            view.clamp_to_lims();
        }
        Ok(())
    }

    /// Zeroes every channel and drops pending paint.
    pub fn clear_all(&mut self) {
        self.pending_paint.clear();
        self.substrate.clear();
        tracing::info!(simulation = %self.name, "Substrate cleared");
    }

    pub fn enable_audit(&mut self) {
        self.registry.enable_audit();
    }

    #[must_use]
    pub fn take_audit(&mut self) -> Vec<AccessRecord> {
        self.registry.take_audit()
    }

    /// Copy of a channel's current contents.
    pub fn read(&self, id: &str) -> Result<Field> {
        self.substrate.read(id)
    }

    /// Overwrites a channel outside the step loop (setup and tests).
    pub fn write(&mut self, id: &str, field: &Field) -> Result<()> {
        self.substrate.write(id, field)
    }

    #[must_use]
    pub fn substrate(&self) -> &Substrate {
        &self.substrate
    }

    pub fn substrate_mut(&mut self) -> &mut Substrate {
        &mut self.substrate
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Restores global state, e.g. from a snapshot.
    pub fn restore_state(&mut self, state: SimulationState) {
        self.state = state;
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn period(&self) -> u64 {
        self.state.period
    }

    /// Fails unless the substrate is allocated; used by callers that accept external simulations.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.substrate.is_allocated() {
            Ok(())
        } else {
            Err(SimError::configuration(format!(
                "simulation '{}' has not allocated its substrate",
                self.name
            )))
        }
    }
}
