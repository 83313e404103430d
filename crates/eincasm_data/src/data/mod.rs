pub mod grid;
pub mod kernel;
pub mod resource;
