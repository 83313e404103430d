//! EINCASM: a cellular substrate where organisms grow muscles, move capital,
//! eat from regenerating ports and dig through obstacles.
//!
//! The engine lives in `eincasm_core`; this crate wires the experiment
//! together and drives it from the command line.

pub mod app;
pub mod model;

pub use model::experiment::Eincasm;
