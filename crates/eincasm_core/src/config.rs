//! Configuration management for experiment parameters.
//!
//! Strongly-typed configuration structures mapping to a `config.toml` file.
//! Every section has defaults, so a file only needs the keys it overrides.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! width = 128
//! height = 128
//! seed = 42
//! steps = 500
//!
//! [physics]
//! flow_cost = 0.1
//!
//! [ports]
//! num_resources = 4
//! alpha_range = [0.5, 0.9]
//! ```

use crate::physics::{FlowConfig, GrowthConfig, MineConfig, PortConfig};
use serde::{Deserialize, Serialize};

/// Grid dimensions and run length.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
    pub seed: Option<u64>,
    pub steps: u64,
    /// Forces seed 0 when no seed is given, instead of drawing one from entropy.
    pub deterministic: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            seed: None,
            steps: 1000,
            deterministic: true,
        }
    }
}

impl WorldConfig {
    /// Seed for the run: the configured one, 0 when deterministic, otherwise random.
    #[must_use]
    pub fn resolve_seed(&self) -> u64 {
        match self.seed {
            Some(seed) => seed,
            None if self.deterministic => 0,
            None => rand::random(),
        }
    }
}

/// Exchange costs of the physics kernels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    pub growth_cost: f32,
    pub flow_cost: f32,
    pub port_cost: f32,
    pub mining_cost: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            growth_cost: 0.2,
            flow_cost: 0.2,
            port_cost: 0.2,
            mining_cost: 0.2,
        }
    }
}

impl PhysicsConfig {
    #[must_use]
    pub fn growth(&self) -> GrowthConfig {
        GrowthConfig {
            growth_cost: self.growth_cost,
        }
    }

    #[must_use]
    pub fn flow(&self) -> FlowConfig {
        FlowConfig {
            flow_cost: self.flow_cost,
        }
    }

    #[must_use]
    pub fn port(&self) -> PortConfig {
        PortConfig {
            port_cost: self.port_cost,
        }
    }

    #[must_use]
    pub fn mine(&self) -> MineConfig {
        MineConfig {
            mining_cost: self.mining_cost,
        }
    }
}

/// Value limits of the bounded channels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChannelsConfig {
    pub capital_max: f32,
    pub waste_max: f32,
    pub ports_min: f32,
    pub ports_max: f32,
    /// Muscle activations are clamped into `[-activation_max, activation_max]`.
    pub activation_max: f32,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            capital_max: 100.0,
            waste_max: 100.0,
            ports_min: -1.0,
            ports_max: 10.0,
            activation_max: 1.0,
        }
    }
}

/// Resource port placement.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PortsConfig {
    pub num_resources: u32,
    pub min_regen_amp: f32,
    pub max_regen_amp: f32,
    /// Levy exponent range; smaller values give longer jumps between sites.
    pub alpha_range: [f32; 2],
    /// Regeneration frequency range.
    pub beta_range: [f32; 2],
    pub num_sites_range: [usize; 2],
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            num_resources: 3,
            min_regen_amp: 0.5,
            max_regen_amp: 2.0,
            alpha_range: [0.4, 0.9],
            beta_range: [0.8, 1.2],
            num_sites_range: [50, 100],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ObstaclesConfig {
    /// Cells whose noise value exceeds this become obstacles.
    pub threshold: f32,
    /// Multiplier on the noise frequencies; larger values give smaller features.
    pub noise_scale: f32,
}

impl Default for ObstaclesConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            noise_scale: 1.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OrganismConfig {
    pub num_communication_channels: usize,
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            num_communication_channels: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Steps between summary log lines; 0 disables them.
    pub log_interval: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_interval: 100 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub channels: ChannelsConfig,
    pub ports: PortsConfig,
    pub obstacles: ObstaclesConfig,
    pub organism: OrganismConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        // World validation
        anyhow::ensure!(self.world.width > 0, "World width must be positive");
        anyhow::ensure!(self.world.width <= 4096, "World width too large (max 4096)");
        anyhow::ensure!(self.world.height > 0, "World height must be positive");
        anyhow::ensure!(
            self.world.height <= 4096,
            "World height too large (max 4096)"
        );

        // Physics validation
        self.physics.growth().validate()?;
        self.physics.flow().validate()?;
        self.physics.port().validate()?;
        self.physics.mine().validate()?;

        // Channel limits
        anyhow::ensure!(
            self.channels.capital_max > 0.0,
            "capital_max must be positive"
        );
        anyhow::ensure!(self.channels.waste_max > 0.0, "waste_max must be positive");
        anyhow::ensure!(
            self.channels.ports_min <= 0.0 && self.channels.ports_max > 0.0,
            "ports limits must straddle zero"
        );
        anyhow::ensure!(
            self.channels.activation_max > 0.0,
            "activation_max must be positive"
        );

        // Port placement
        anyhow::ensure!(
            self.ports.min_regen_amp >= 0.0 && self.ports.min_regen_amp <= self.ports.max_regen_amp,
            "Regeneration amplitude range is empty or negative"
        );
        anyhow::ensure!(
            self.ports.alpha_range[0] > 0.0 && self.ports.alpha_range[0] <= self.ports.alpha_range[1],
            "alpha_range must be positive and ordered"
        );
        anyhow::ensure!(
            self.ports.beta_range[0] >= 0.0 && self.ports.beta_range[0] <= self.ports.beta_range[1],
            "beta_range must be non-negative and ordered"
        );
        anyhow::ensure!(
            self.ports.num_sites_range[0] <= self.ports.num_sites_range[1],
            "num_sites_range must be ordered"
        );

        // Obstacles
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.obstacles.threshold),
            "Obstacle threshold must be between 0.0 and 1.0"
        );
        anyhow::ensure!(
            self.obstacles.noise_scale > 0.0,
            "Obstacle noise_scale must be positive"
        );

        // Organism
        anyhow::ensure!(
            self.organism.num_communication_channels > 0,
            "At least one communication channel is required"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Hash of the sections that change simulation outcomes.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.physics).as_bytes());
        hasher.update(format!("{:?}", self.channels).as_bytes());
        hasher.update(format!("{:?}", self.ports).as_bytes());
        hasher.update(format!("{:?}", self.obstacles).as_bytes());
        hasher.update(format!("{:?}", self.organism).as_bytes());
        hex::encode(hasher.finalize())
    }
}
