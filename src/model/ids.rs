//! Channel ids of the EINCASM experiment.

pub const COMMUNICATION: &str = "communication";
/// Every muscle radius: one flow muscle per kernel direction, then port, then mine.
pub const ALL_MUSCLE_RADII: &str = "all_muscle_radii";
pub const FLOW_MUSCLE_RADII: &str = "flow_muscle_radii";
pub const PORT_MUSCLE_RADII: &str = "port_muscle_radii";
pub const MINE_MUSCLE_RADII: &str = "mine_muscle_radii";
pub const ALL_MUSCLE_ACTIVATION: &str = "all_muscle_activation";
pub const FLOW_MUSCLE_ACTIVATION: &str = "flow_muscle_activation";
pub const PORT_MUSCLE_ACTIVATION: &str = "port_muscle_activation";
pub const MINE_MUSCLE_ACTIVATION: &str = "mine_muscle_activation";
pub const MUSCLE_GROWTH_ACTIVATION: &str = "muscle_growth_activation";
pub const CAPITAL: &str = "capital";
pub const WASTE: &str = "waste";
pub const OBSTACLES: &str = "obstacles";
pub const PORTS: &str = "ports";
