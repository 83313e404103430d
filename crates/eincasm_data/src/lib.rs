//! Core data structures for the EINCASM substrate.

pub mod data;

pub use data::grid::{DType, Lims, Shape};
pub use data::kernel::{Kernel, KernelError};
pub use data::resource::{PortLayout, RegenFunc, Resource, NO_PORT};
