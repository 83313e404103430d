//! Update-rule adapters binding each physics kernel to named channels.
//!
//! Each rule owns a typed configuration struct that is validated when the
//! rule is registered, never while stepping.

use super::{
    activate_flow_muscles, activate_mine_muscles, activate_port_muscles, grow_muscle_csa,
    regen_ports,
};
use crate::error::{Result, SimError};
use crate::registry::{Declaration, RuleContext, UpdateRule};
use crate::state::PERIOD;
use crate::substrate::Substrate;
use serde::{Deserialize, Serialize};

fn ensure_cost(name: &str, value: f32, allow_zero: bool, max: Option<f32>) -> Result<()> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    let upper_ok = max.map_or(true, |m| value <= m);
    if value.is_finite() && lower_ok && upper_ok {
        return Ok(());
    }
    let lower = if allow_zero { "non-negative" } else { "positive" };
    Err(SimError::configuration(match max {
        Some(m) => format!("{name} must be {lower} and at most {m}, got {value}"),
        None => format!("{name} must be {lower}, got {value}"),
    }))
}

fn components(substrate: &Substrate, id: &str) -> Result<usize> {
    Ok(substrate.channel(id)?.components())
}

fn ensure_components(rule: &str, substrate: &Substrate, id: &str, expected: usize) -> Result<()> {
    let actual = components(substrate, id)?;
    if actual != expected {
        return Err(SimError::configuration(format!(
            "rule '{rule}' needs '{id}' with {expected} component(s), it has {actual}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthConfig {
    /// Fraction of capital lost converting to or from muscle area.
    pub growth_cost: f32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self { growth_cost: 0.2 }
    }
}

impl GrowthConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_cost("growth_cost", self.growth_cost, true, Some(1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Capital burnt per unit of mass a cell emits.
    pub flow_cost: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { flow_cost: 0.2 }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_cost("flow_cost", self.flow_cost, true, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortConfig {
    pub port_cost: f32,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self { port_cost: 0.2 }
    }
}

impl PortConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_cost("port_cost", self.port_cost, false, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MineConfig {
    pub mining_cost: f32,
}

impl Default for MineConfig {
    fn default() -> Self {
        Self { mining_cost: 0.2 }
    }
}

impl MineConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_cost("mining_cost", self.mining_cost, false, None)
    }
}

/// Advances the period counter by one.
pub struct StepPeriod {
    decl: Declaration,
}

impl Default for StepPeriod {
    fn default() -> Self {
        Self::new("step_period")
    }
}

impl StepPeriod {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            decl: Declaration::new(name).requires_sim(PERIOD).mutates_state(),
        }
    }
}

impl UpdateRule for StepPeriod {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let period = ctx.period()?;
        ctx.set_sim_value(PERIOD, (period + 1) as f64)
    }
}

pub struct GrowRule {
    decl: Declaration,
    radii: String,
    deltas: String,
    capital: String,
    config: GrowthConfig,
}

impl GrowRule {
    /// `deltas` must have as many components as `radii`.
    #[must_use]
    pub fn new(name: &str, radii: &str, deltas: &str, capital: &str, config: GrowthConfig) -> Self {
        Self {
            decl: Declaration::new(name)
                .reads([capital, radii, deltas])
                .writes([radii, capital]),
            radii: radii.to_string(),
            deltas: deltas.to_string(),
            capital: capital.to_string(),
            config,
        }
    }
}

impl UpdateRule for GrowRule {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn validate(&self, substrate: &Substrate) -> Result<()> {
        self.config.validate()?;
        let k = components(substrate, &self.radii)?;
        ensure_components(&self.decl.name, substrate, &self.deltas, k)?;
        ensure_components(&self.decl.name, substrate, &self.capital, 1)
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let radii = ctx.read(&self.radii)?;
        let deltas = ctx.read(&self.deltas)?;
        let capital = ctx.read(&self.capital)?;
        let out = grow_muscle_csa(&radii, &deltas, &capital, self.config.growth_cost)?;
        ctx.write(&self.radii, out.radii)?;
        ctx.write(&self.capital, out.capital)
    }
}

pub struct FlowRule {
    decl: Declaration,
    capital: String,
    waste: String,
    obstacles: String,
    radii: String,
    activations: String,
    config: FlowConfig,
}

impl FlowRule {
    /// The kernel is taken from the `radii` channel's metadata (or its root parent's).
    #[must_use]
    pub fn new(
        name: &str,
        capital: &str,
        waste: &str,
        obstacles: &str,
        radii: &str,
        activations: &str,
        config: FlowConfig,
    ) -> Self {
        Self {
            decl: Declaration::new(name)
                .reads([capital, waste, radii, activations, obstacles])
                .writes([capital, waste])
                .requires_channel(radii, "kernel"),
            capital: capital.to_string(),
            waste: waste.to_string(),
            obstacles: obstacles.to_string(),
            radii: radii.to_string(),
            activations: activations.to_string(),
            config,
        }
    }
}

impl UpdateRule for FlowRule {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn validate(&self, substrate: &Substrate) -> Result<()> {
        self.config.validate()?;
        let name = &self.decl.name;
        let k = components(substrate, &self.radii)?;
        if let Some(kernel) = &substrate.metadata(&self.radii)?.kernel {
            if kernel.len() != k {
                return Err(SimError::configuration(format!(
                    "rule '{name}': kernel has {} directions, '{}' has {k} components",
                    kernel.len(),
                    self.radii
                )));
            }
        }
        let a = components(substrate, &self.activations)?;
        if a != 1 && a != k {
            return Err(SimError::configuration(format!(
                "rule '{name}': '{}' must have 1 or {k} components, it has {a}",
                self.activations
            )));
        }
        ensure_components(name, substrate, &self.capital, 1)?;
        ensure_components(name, substrate, &self.waste, 1)?;
        ensure_components(name, substrate, &self.obstacles, 1)
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let kernel = ctx.metadata(&self.radii)?.kernel.as_ref().ok_or_else(|| {
            SimError::configuration(format!("channel '{}' has no kernel", self.radii))
        })?;
        let capital = ctx.read(&self.capital)?;
        let waste = ctx.read(&self.waste)?;
        let obstacles = ctx.read(&self.obstacles)?;
        let radii = ctx.read(&self.radii)?;
        let activations = ctx.read(&self.activations)?;
        let out = activate_flow_muscles(
            &capital,
            &waste,
            &obstacles,
            &radii,
            &activations,
            kernel,
            self.config.flow_cost,
        )?;
        ctx.write(&self.capital, out.capital)?;
        ctx.write(&self.waste, out.waste)
    }
}

pub struct PortRule {
    decl: Declaration,
    capital: String,
    ports: String,
    radii: String,
    activations: String,
    config: PortConfig,
}

impl PortRule {
    #[must_use]
    pub fn new(
        name: &str,
        capital: &str,
        ports: &str,
        radii: &str,
        activations: &str,
        config: PortConfig,
    ) -> Self {
        Self {
            decl: Declaration::new(name)
                .reads([capital, ports, radii, activations])
                .writes([capital, ports]),
            capital: capital.to_string(),
            ports: ports.to_string(),
            radii: radii.to_string(),
            activations: activations.to_string(),
            config,
        }
    }
}

impl UpdateRule for PortRule {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn validate(&self, substrate: &Substrate) -> Result<()> {
        self.config.validate()?;
        for id in [&self.capital, &self.ports, &self.radii, &self.activations] {
            ensure_components(&self.decl.name, substrate, id, 1)?;
        }
        Ok(())
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let capital = ctx.read(&self.capital)?;
        let ports = ctx.read(&self.ports)?;
        let radii = ctx.read(&self.radii)?;
        let activations = ctx.read(&self.activations)?;
        let out =
            activate_port_muscles(&capital, &ports, &radii, &activations, self.config.port_cost)?;
        ctx.write(&self.capital, out.capital)?;
        ctx.write(&self.ports, out.ports)
    }
}

pub struct MineRule {
    decl: Declaration,
    capital: String,
    obstacles: String,
    waste: String,
    radii: String,
    activations: String,
    config: MineConfig,
}

impl MineRule {
    #[must_use]
    pub fn new(
        name: &str,
        capital: &str,
        obstacles: &str,
        waste: &str,
        radii: &str,
        activations: &str,
        config: MineConfig,
    ) -> Self {
        Self {
            decl: Declaration::new(name)
                .reads([capital, obstacles, waste, radii, activations])
                .writes([capital, obstacles, waste]),
            capital: capital.to_string(),
            obstacles: obstacles.to_string(),
            waste: waste.to_string(),
            radii: radii.to_string(),
            activations: activations.to_string(),
            config,
        }
    }
}

impl UpdateRule for MineRule {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn validate(&self, substrate: &Substrate) -> Result<()> {
        self.config.validate()?;
        for id in [
            &self.capital,
            &self.obstacles,
            &self.waste,
            &self.radii,
            &self.activations,
        ] {
            ensure_components(&self.decl.name, substrate, id, 1)?;
        }
        Ok(())
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let capital = ctx.read(&self.capital)?;
        let obstacles = ctx.read(&self.obstacles)?;
        let waste = ctx.read(&self.waste)?;
        let radii = ctx.read(&self.radii)?;
        let activations = ctx.read(&self.activations)?;
        let out = activate_mine_muscles(
            &capital,
            &obstacles,
            &waste,
            &radii,
            &activations,
            self.config.mining_cost,
        )?;
        ctx.write(&self.capital, out.capital)?;
        ctx.write(&self.obstacles, out.obstacles)?;
        ctx.write(&self.waste, out.waste)
    }
}

/// Metadata key counting how many times a port channel has regenerated.
pub const NUM_REGENS: &str = "num_regens";

/// Regenerates every resource port from the port layout stored on the channel.
pub struct RegenRule {
    decl: Declaration,
    ports: String,
}

impl RegenRule {
    #[must_use]
    pub fn new(name: &str, ports: &str) -> Self {
        Self {
            decl: Declaration::new(name)
                .writes([ports])
                .requires_sim(PERIOD)
                .requires_channel(ports, "port_id_map")
                .requires_channel(ports, "port_sizes")
                .requires_channel(ports, "resources"),
            ports: ports.to_string(),
        }
    }
}

impl UpdateRule for RegenRule {
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn validate(&self, substrate: &Substrate) -> Result<()> {
        ensure_components(&self.decl.name, substrate, &self.ports, 1)
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let layout = ctx.metadata(&self.ports)?.ports.as_ref().ok_or_else(|| {
            SimError::configuration(format!("channel '{}' has no port layout", self.ports))
        })?;
        let view = ctx.view(&self.ports)?;
        let lims = view.lims();
        let ports = view.to_field();
        let period = ctx.period()?;
        let out = regen_ports(&ports, layout, period, lims)?;
        let regens = ctx
            .metadata(&self.ports)?
            .get(NUM_REGENS)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        ctx.write(&self.ports, out)?;
        ctx.set_metadata(&self.ports, NUM_REGENS, regens + 1)
    }
}
