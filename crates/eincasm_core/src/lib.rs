//! # EINCASM Core
//!
//! The simulation engine for EINCASM, a cellular grid where every cell holds
//! several physical quantities that evolve under a fixed physics pipeline.
//!
//! This crate contains:
//! - The channel-indexed grid substrate with sub-channel aliasing
//! - The update-rule registry with declared read/write sets
//! - Physics kernels for growth, flow, porting, mining and regeneration
//! - The organism interface and a random controller
//! - Procedural initializers, configuration, metrics and logging
//!
//! ## Architecture
//!
//! All channel contents live in one backing store owned by the [`Substrate`].
//! Update rules run in registration order; each sees the store as committed
//! by the rules before it and stages its own writes, which the registry
//! commits (clamped into channel limits) once the rule returns.
//!
//! ## Example
//!
//! ```
//! use eincasm_core::{ChannelSpec, Declaration, Field, Simulation};
//! use eincasm_data::Shape;
//!
//! let mut sim = Simulation::new("demo", Shape::new(4, 4), 7);
//! sim.add_channel("heat", ChannelSpec::new().with_lims((0.0, 1.0))).unwrap();
//! sim.malloc().unwrap();
//! sim.add_fn(Declaration::new("warm").writes(["heat"]), |ctx| {
//!     let heat = ctx.read("heat")?;
//!     let warmer: Vec<f32> = heat.as_slice().iter().map(|v| v + 0.25).collect();
//!     ctx.write("heat", Field::from_vec(heat.shape(), 1, warmer)?)
//! })
//! .unwrap();
//! sim.init_all_channels().unwrap();
//! sim.run(8).unwrap();
//! assert_eq!(sim.read("heat").unwrap().max(), 1.0);
//! ```

/// Channel descriptors, metadata and initializer contract
pub mod channel;
/// Configuration management for experiment parameters
pub mod config;
/// Engine error taxonomy
pub mod error;
/// Owned multi-component grid tensors
pub mod field;
/// Performance metrics collection and logging
pub mod metrics;
/// Controller interface and the random agent
pub mod organism;
/// Procedural obstacle and port initializers
pub mod pcg;
/// Physics kernels and their update rules
pub mod physics;
/// Update-rule declarations, context and registry
pub mod registry;
/// The simulation driver
pub mod simulation;
/// Global simulation state
pub mod state;
/// Grid substrate and channel views
pub mod substrate;

pub use channel::{Channel, ChannelKind, ChannelMetadata, ChannelSpec, InitContext, Initializer};
pub use config::AppConfig;
pub use error::{Result, SimError};
pub use field::Field;
pub use metrics::{init_logging, Metrics};
pub use organism::{Organism, OrganismRule, RandomAgent};
pub use registry::{
    AccessKind, AccessRecord, Declaration, FnRule, Registry, RuleContext, UpdateRule,
};
pub use simulation::{PaintRequest, Simulation};
pub use state::{SimulationState, PERIOD};
pub use substrate::{ChannelView, ChannelViewMut, Substrate};
