//! The EINCASM experiment: channel layout and rule pipeline.

use crate::model::ids::*;
use anyhow::Result;
use eincasm_core::config::AppConfig;
use eincasm_core::organism::{OrganismRule, RandomAgent};
use eincasm_core::pcg;
use eincasm_core::physics::{FlowRule, GrowRule, MineRule, PortRule, RegenRule, StepPeriod};
use eincasm_core::{ChannelSpec, Simulation};
use eincasm_data::{Kernel, Shape};
use eincasm_io::Snapshot;
use std::path::Path;
use uuid::Uuid;

pub const EXPERIMENT_NAME: &str = "EINCASM Experiment";

/// Rule names in execution order.
pub const RULE_ORDER: [&str; 7] = [
    "step_period",
    "grow",
    "flow",
    "eat",
    "dig",
    "regen_resources",
    "random_agent",
];

pub struct Eincasm {
    config: AppConfig,
    kernel: Kernel,
    run_id: Uuid,
    sim: Simulation,
}

impl Eincasm {
    /// Builds, allocates and initialises the experiment on a von Neumann kernel.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_kernel(config, Kernel::von_neumann())
    }

    pub fn with_kernel(config: AppConfig, kernel: Kernel) -> Result<Self> {
        config.validate()?;
        let seed = config.world.resolve_seed();
        let shape = Shape::new(config.world.width, config.world.height);
        let mut sim = Simulation::new(EXPERIMENT_NAME, shape, seed);
        sim.metrics().set_log_interval(config.logging.log_interval);

        define_channels(&mut sim, &config, &kernel)?;
        sim.malloc()?;
        define_rules(&mut sim, &config, &kernel)?;
        sim.init_all_channels()?;

        let run_id = Uuid::new_v4();
        tracing::info!(
            %run_id,
            seed,
            width = shape.width,
            height = shape.height,
            kernel = kernel.len(),
            config = %config.fingerprint(),
            "Experiment initialised"
        );
        Ok(Self {
            config,
            kernel,
            run_id,
            sim,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    pub fn step(&mut self) -> Result<()> {
        self.sim.update()?;
        Ok(())
    }

    pub fn run(&mut self, steps: u64) -> Result<()> {
        self.sim.run(steps)?;
        Ok(())
    }

    /// Total capital plus waste on the grid.
    pub fn total_mass(&self) -> Result<f64> {
        Ok(self.sim.read(CAPITAL)?.sum() + self.sim.read(WASTE)?.sum())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::capture(&self.sim, self.run_id)?)
    }

    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.snapshot()?.save(path)?;
        Ok(())
    }

    /// Rebuilds the experiment from `config` and loads a saved snapshot into it.
    pub fn resume<P: AsRef<Path>>(config: AppConfig, path: P) -> Result<Self> {
        let snapshot = Snapshot::load(path)?;
        let mut config = config;
        config.world.width = snapshot.shape.width;
        config.world.height = snapshot.shape.height;
        config.world.seed = Some(snapshot.seed);
        let mut experiment = Self::new(config)?;
        snapshot.restore_into(&mut experiment.sim)?;
        experiment.run_id = snapshot.run_id;
        Ok(experiment)
    }
}

/// Muscles per cell: one flow muscle per kernel direction plus the port and mine muscles.
#[must_use]
pub fn muscle_count(kernel: &Kernel) -> usize {
    kernel.len() + 2
}

/// Actuator components the controller must produce.
#[must_use]
pub fn actuator_count(config: &AppConfig, kernel: &Kernel) -> usize {
    muscle_count(kernel) + 3 + config.organism.num_communication_channels
}

fn define_channels(sim: &mut Simulation, config: &AppConfig, kernel: &Kernel) -> Result<()> {
    let k = kernel.len();
    let channels = &config.channels;

    sim.add_channel(
        COMMUNICATION,
        ChannelSpec::new().with_components(config.organism.num_communication_channels),
    )?;

    sim.add_channel(
        ALL_MUSCLE_RADII,
        ChannelSpec::new()
            .with_components(muscle_count(kernel))
            .with_kernel(kernel.clone()),
    )?;
    sim.add_subchannel(FLOW_MUSCLE_RADII, ALL_MUSCLE_RADII, 0..k)?;
    sim.add_subchannel(PORT_MUSCLE_RADII, ALL_MUSCLE_RADII, [k])?;
    sim.add_subchannel(MINE_MUSCLE_RADII, ALL_MUSCLE_RADII, [k + 1])?;

    sim.add_channel(
        ALL_MUSCLE_ACTIVATION,
        ChannelSpec::new()
            .with_components(3)
            .with_lims((-channels.activation_max, channels.activation_max)),
    )?;
    sim.add_subchannel(FLOW_MUSCLE_ACTIVATION, ALL_MUSCLE_ACTIVATION, [0])?;
    sim.add_subchannel(PORT_MUSCLE_ACTIVATION, ALL_MUSCLE_ACTIVATION, [1])?;
    sim.add_subchannel(MINE_MUSCLE_ACTIVATION, ALL_MUSCLE_ACTIVATION, [2])?;

    // Flow, port and mine muscles grow alike.
    sim.add_channel(
        MUSCLE_GROWTH_ACTIVATION,
        ChannelSpec::new().with_components(muscle_count(kernel)),
    )?;

    sim.add_channel(
        CAPITAL,
        ChannelSpec::new().with_lims((0.0, channels.capital_max)),
    )?;
    sim.add_channel(WASTE, ChannelSpec::new().with_lims((0.0, channels.waste_max)))?;
    sim.add_channel(
        OBSTACLES,
        ChannelSpec::new().with_init(pcg::obstacles(config.obstacles.clone())),
    )?;
    sim.add_channel(
        PORTS,
        ChannelSpec::new()
            .with_lims((channels.ports_min, channels.ports_max))
            .with_init(pcg::ports(config.ports.clone())),
    )?;
    Ok(())
}

fn define_rules(sim: &mut Simulation, config: &AppConfig, kernel: &Kernel) -> Result<()> {
    let physics = &config.physics;

    sim.add_update_function(StepPeriod::new(RULE_ORDER[0]))?;
    sim.add_update_function(GrowRule::new(
        RULE_ORDER[1],
        ALL_MUSCLE_RADII,
        MUSCLE_GROWTH_ACTIVATION,
        CAPITAL,
        physics.growth(),
    ))?;
    sim.add_update_function(FlowRule::new(
        RULE_ORDER[2],
        CAPITAL,
        WASTE,
        OBSTACLES,
        FLOW_MUSCLE_RADII,
        FLOW_MUSCLE_ACTIVATION,
        physics.flow(),
    ))?;
    sim.add_update_function(PortRule::new(
        RULE_ORDER[3],
        CAPITAL,
        PORTS,
        PORT_MUSCLE_RADII,
        PORT_MUSCLE_ACTIVATION,
        physics.port(),
    ))?;
    sim.add_update_function(MineRule::new(
        RULE_ORDER[4],
        CAPITAL,
        OBSTACLES,
        WASTE,
        MINE_MUSCLE_RADII,
        MINE_MUSCLE_ACTIVATION,
        physics.mine(),
    ))?;
    sim.add_update_function(RegenRule::new(RULE_ORDER[5], PORTS))?;
    sim.add_update_function(OrganismRule::new(
        RULE_ORDER[6],
        &[CAPITAL, ALL_MUSCLE_RADII, COMMUNICATION],
        &[MUSCLE_GROWTH_ACTIVATION, ALL_MUSCLE_ACTIVATION, COMMUNICATION],
        RandomAgent::new(actuator_count(config, kernel)),
    ))?;
    Ok(())
}
