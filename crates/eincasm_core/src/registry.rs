//! Update-rule registry.
//!
//! Each rule carries a [`Declaration`] naming the channels it reads, the
//! channels it writes, and the metadata it depends on. The registry checks
//! declarations against the substrate when a rule is registered, runs rules
//! in registration order, and hands each one a [`RuleContext`] that refuses
//! any access outside the declaration.
//!
//! Writes are staged: a rule sees the store as committed by the rules before
//! it, and its own writes land only after `apply` returns.

use crate::channel::ChannelMetadata;
use crate::error::{Result, SimError};
use crate::field::Field;
use crate::metrics::Metrics;
use crate::state::SimulationState;
use crate::substrate::{ChannelView, Substrate};
use eincasm_data::Shape;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// What a rule touches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    /// Read-only channels.
    pub inputs: Vec<String>,
    /// Read-write channels.
    pub affected: Vec<String>,
    /// Required simulation-state keys.
    pub sim_metadata: Vec<String>,
    /// Required `(channel, key)` metadata entries.
    pub channel_metadata: Vec<(String, String)>,
    /// Whether the rule may write simulation state.
    pub writes_state: bool,
}

impl Declaration {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn reads<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn writes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn requires_sim(mut self, key: &str) -> Self {
        self.sim_metadata.push(key.to_string());
        self
    }

    #[must_use]
    pub fn requires_channel(mut self, channel: &str, key: &str) -> Self {
        self.channel_metadata
            .push((channel.to_string(), key.to_string()));
        self
    }

    #[must_use]
    pub fn mutates_state(mut self) -> Self {
        self.writes_state = true;
        self
    }

    #[must_use]
    pub fn may_read(&self, id: &str) -> bool {
        self.inputs.iter().any(|c| c == id) || self.may_write(id)
    }

    #[must_use]
    pub fn may_write(&self, id: &str) -> bool {
        self.affected.iter().any(|c| c == id)
    }

    /// Checks channel ids and simulation keys. Channel metadata is checked
    /// separately since initializers fill it in after registration.
    pub fn validate(&self, substrate: &Substrate, state: &SimulationState) -> Result<()> {
        for id in self.inputs.iter().chain(&self.affected) {
            if !substrate.contains(id) {
                return Err(SimError::configuration(format!(
                    "rule '{}' declares unknown channel '{id}'",
                    self.name
                )));
            }
        }
        for key in &self.sim_metadata {
            if !state.has(key) {
                return Err(SimError::configuration(format!(
                    "rule '{}' requires simulation metadata '{key}'",
                    self.name
                )));
            }
        }
        for (id, key) in &self.channel_metadata {
            if !self.may_read(id) {
                return Err(SimError::configuration(format!(
                    "rule '{}' requires metadata '{key}' of undeclared channel '{id}'",
                    self.name
                )));
            }
        }
        Ok(())
    }

    pub fn check_channel_metadata(&self, substrate: &Substrate) -> Result<()> {
        for (id, key) in &self.channel_metadata {
            if !substrate.metadata(id)?.has(key) {
                return Err(SimError::configuration(format!(
                    "rule '{}' requires metadata '{key}' on channel '{id}'",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A named transformation over declared channels.
pub trait UpdateRule: Send {
    fn declaration(&self) -> &Declaration;

    /// Rule-specific checks at registration (component counts, config ranges).
    fn validate(&self, _substrate: &Substrate) -> Result<()> {
        Ok(())
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()>;
}

/// Rule backed by a closure.
pub struct FnRule<F> {
    decl: Declaration,
    f: F,
}

impl<F> FnRule<F>
where
    F: FnMut(&mut RuleContext<'_>) -> Result<()> + Send,
{
    pub fn new(decl: Declaration, f: F) -> Self {
        Self { decl, f }
    }
}

impl<F> UpdateRule for FnRule<F>
where
    F: FnMut(&mut RuleContext<'_>) -> Result<()> + Send,
{
    fn declaration(&self) -> &Declaration {
        &self.decl
    }

    fn apply(&mut self, ctx: &mut RuleContext<'_>) -> Result<()> {
        (self.f)(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    Metadata,
}

/// One channel access observed while auditing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub rule: String,
    pub channel: String,
    pub kind: AccessKind,
}

/// Declaration-gated access to the substrate for one rule invocation.
pub struct RuleContext<'a> {
    decl: &'a Declaration,
    substrate: &'a Substrate,
    state: &'a mut SimulationState,
    rng: &'a mut ChaCha8Rng,
    staged: Vec<(String, Field)>,
    staged_metadata: Vec<(String, String, serde_json::Value)>,
    audit: Option<&'a mut Vec<AccessRecord>>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        decl: &'a Declaration,
        substrate: &'a Substrate,
        state: &'a mut SimulationState,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            decl,
            substrate,
            state,
            rng,
            staged: Vec::new(),
            staged_metadata: Vec::new(),
            audit: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.substrate.shape()
    }

    fn record(&mut self, channel: &str, kind: AccessKind) {
        if let Some(log) = self.audit.as_deref_mut() {
            log.push(AccessRecord {
                rule: self.decl.name.clone(),
                channel: channel.to_string(),
                kind,
            });
        }
    }

    /// Live view of a declared channel as committed so far this step.
    pub fn view(&mut self, id: &str) -> Result<ChannelView<'a>> {
        if !self.decl.may_read(id) {
            return Err(SimError::undeclared(
                &self.decl.name,
                format!("channel '{id}'"),
            ));
        }
        self.record(id, AccessKind::Read);
        self.substrate.view(id)
    }

    /// Copy of a declared channel's contents.
    pub fn read(&mut self, id: &str) -> Result<Field> {
        Ok(self.view(id)?.to_field())
    }

    pub fn metadata(&mut self, id: &str) -> Result<&'a ChannelMetadata> {
        if !self.decl.may_read(id) {
            return Err(SimError::undeclared(
                &self.decl.name,
                format!("metadata of channel '{id}'"),
            ));
        }
        self.record(id, AccessKind::Metadata);
        self.substrate.metadata(id)
    }

    /// Stages new contents for an affected channel; committed after `apply` returns.
    pub fn write(&mut self, id: &str, field: Field) -> Result<()> {
        if !self.decl.may_write(id) {
            return Err(SimError::undeclared(
                &self.decl.name,
                format!("write to channel '{id}'"),
            ));
        }
        let channel = self.substrate.channel(id)?;
        if field.shape() != self.substrate.shape() || field.components() != channel.components()
        {
            return Err(SimError::configuration(format!(
                "rule '{}' wrote {} components to '{id}' which has {}",
                self.decl.name,
                field.components(),
                channel.components()
            )));
        }
        self.record(id, AccessKind::Write);
        self.staged.retain(|(staged, _)| staged != id);
        self.staged.push((id.to_string(), field));
        Ok(())
    }

    /// Stages a free-form metadata value on an affected channel.
    pub fn set_metadata<V: Into<serde_json::Value>>(
        &mut self,
        id: &str,
        key: &str,
        value: V,
    ) -> Result<()> {
        if !self.decl.may_write(id) {
            return Err(SimError::undeclared(
                &self.decl.name,
                format!("metadata of channel '{id}'"),
            ));
        }
        self.substrate.channel(id)?;
        self.record(id, AccessKind::Metadata);
        self.staged_metadata
            .push((id.to_string(), key.to_string(), value.into()));
        Ok(())
    }

    fn ensure_sim_key(&self, key: &str) -> Result<()> {
        if self.decl.sim_metadata.iter().any(|k| k == key) {
            Ok(())
        } else {
            Err(SimError::undeclared(
                &self.decl.name,
                format!("simulation metadata '{key}'"),
            ))
        }
    }

    pub fn period(&self) -> Result<u64> {
        self.ensure_sim_key(crate::state::PERIOD)?;
        Ok(self.state.period)
    }

    pub fn sim_value(&self, key: &str) -> Result<f64> {
        self.ensure_sim_key(key)?;
        self.state
            .get(key)
            .ok_or_else(|| SimError::configuration(format!("simulation metadata '{key}' missing")))
    }

    pub fn set_sim_value(&mut self, key: &str, value: f64) -> Result<()> {
        self.ensure_sim_key(key)?;
        if !self.decl.writes_state {
            return Err(SimError::undeclared(
                &self.decl.name,
                format!("write to simulation metadata '{key}'"),
            ));
        }
        self.state.set(key, value);
        Ok(())
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut *self.rng
    }

    fn into_staged(self) -> (Vec<(String, Field)>, Vec<(String, String, serde_json::Value)>) {
        (self.staged, self.staged_metadata)
    }
}

struct Entry {
    decl: Declaration,
    rule: Box<dyn UpdateRule>,
}

/// Ordered set of update rules.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
    metadata_checked: bool,
    audit: Option<Vec<AccessRecord>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and appends a rule. Nothing is registered on failure.
    pub fn register(
        &mut self,
        rule: Box<dyn UpdateRule>,
        substrate: &Substrate,
        state: &SimulationState,
    ) -> Result<()> {
        let decl = rule.declaration().clone();
        if self.entries.iter().any(|e| e.decl.name == decl.name) {
            return Err(SimError::configuration(format!(
                "update function '{}' is already registered",
                decl.name
            )));
        }
        decl.validate(substrate, state)?;
        rule.validate(substrate)?;
        tracing::debug!(
            rule = %decl.name,
            inputs = ?decl.inputs,
            affected = ?decl.affected,
            "Update function registered"
        );
        self.entries.push(Entry { decl, rule });
        self.metadata_checked = false;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.decl.name.as_str())
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.iter().map(|e| &e.decl)
    }

    /// Starts recording every channel access rules perform.
    pub fn enable_audit(&mut self) {
        self.audit.get_or_insert_with(Vec::new);
    }

    #[must_use]
    pub fn take_audit(&mut self) -> Vec<AccessRecord> {
        self.audit.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Runs every rule once, in registration order, committing each rule's writes before the next.
    pub fn run_step(
        &mut self,
        substrate: &mut Substrate,
        state: &mut SimulationState,
        rng: &mut ChaCha8Rng,
        metrics: &Metrics,
    ) -> Result<()> {
        if !self.metadata_checked {
            for entry in &self.entries {
                entry.decl.check_channel_metadata(substrate)?;
            }
            self.metadata_checked = true;
        }

        for entry in &mut self.entries {
            let start = Instant::now();
            let (staged, staged_metadata) = {
                let mut ctx = RuleContext::new(&entry.decl, substrate, state, rng);
                ctx.audit = self.audit.as_mut();
                entry.rule.apply(&mut ctx)?;
                ctx.into_staged()
            };
            for (id, field) in &staged {
                substrate.write(id, field)?;
            }
            for (id, key, value) in staged_metadata {
                substrate.metadata_mut(&id)?.insert(&key, value);
            }
            let elapsed = start.elapsed();
            metrics.record_rule(&entry.decl.name, elapsed);
            tracing::trace!(rule = %entry.decl.name, micros = elapsed.as_micros() as u64, "Rule applied");
        }
        Ok(())
    }
}
