pub mod config {
    pub use eincasm_core::config::*;
}
pub mod physics {
    pub use eincasm_core::physics::*;
}
pub mod organism {
    pub use eincasm_core::organism::*;
}
pub mod pcg {
    pub use eincasm_core::pcg::*;
}
pub mod snapshot {
    pub use eincasm_io::snapshot::*;
}
pub mod state {
    pub use eincasm_core::state::*;
    pub use eincasm_data::*;
}

pub mod experiment;
pub mod ids;
