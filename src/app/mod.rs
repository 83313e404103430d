pub mod runner;

pub use runner::{RunOptions, RunSummary, Runner};
