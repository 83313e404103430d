//! Channel descriptors.
//!
//! A channel never owns storage: it records which component planes of the
//! substrate's backing store belong to it. Sub-channels record a subset of
//! their parent's planes, so writes through either alias the same cells.

use crate::error::Result;
use eincasm_data::{DType, Kernel, Lims, PortLayout, Shape};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Everything an initializer may look at while producing a channel's contents.
pub struct InitContext<'a> {
    pub channel_id: &'a str,
    pub shape: Shape,
    pub components: usize,
    pub lims: Lims,
    /// Initializers may record what they generated (e.g. port placement).
    pub metadata: &'a mut ChannelMetadata,
    pub rng: &'a mut ChaCha8Rng,
}

/// Produces `components * width * height` values, component-major.
pub type Initializer = Box<dyn FnMut(&mut InitContext<'_>) -> Result<Vec<f32>> + Send>;

/// Typed channel metadata plus a free-form map for anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub kernel: Option<Kernel>,
    pub ports: Option<PortLayout>,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl ChannelMetadata {
    /// Whether `key` is present, mapping the typed fields to their conventional names.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        match key {
            "kernel" => self.kernel.is_some(),
            "ports" | "port_id_map" | "port_sizes" | "resources" => self.ports.is_some(),
            other => self.values.contains_key(other),
        }
    }

    pub fn insert<V: Into<serde_json::Value>>(&mut self, key: &str, value: V) {
        self.values.insert(key.to_string(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }
}

/// Declarative description of a root channel, consumed by `Substrate::add_channel`.
pub struct ChannelSpec {
    pub(crate) dtype: DType,
    pub(crate) components: usize,
    pub(crate) lims: Lims,
    pub(crate) metadata: ChannelMetadata,
    pub(crate) init: Option<Initializer>,
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSpec {
    /// Single-component, unbounded, zero-initialised `f32` channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dtype: DType::F32,
            components: 1,
            lims: Lims::UNBOUNDED,
            metadata: ChannelMetadata::default(),
            init: None,
        }
    }

    #[must_use]
    pub fn with_components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }

    #[must_use]
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    #[must_use]
    pub fn with_lims<L: Into<Lims>>(mut self, lims: L) -> Self {
        self.lims = lims.into();
        self
    }

    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.metadata.kernel = Some(kernel);
        self
    }

    #[must_use]
    pub fn with_ports(mut self, ports: PortLayout) -> Self {
        self.metadata.ports = Some(ports);
        self
    }

    #[must_use]
    pub fn with_metadata<V: Into<serde_json::Value>>(mut self, key: &str, value: V) -> Self {
        self.metadata.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: FnMut(&mut InitContext<'_>) -> Result<Vec<f32>> + Send + 'static,
    {
        self.init = Some(Box::new(init));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Root,
    Sub { parent: String },
}

pub struct Channel {
    id: String,
    dtype: DType,
    lims: Lims,
    metadata: ChannelMetadata,
    kind: ChannelKind,
    /// Absolute component planes in the backing store.
    planes: Vec<usize>,
    pub(crate) init: Option<Initializer>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("dtype", &self.dtype)
            .field("lims", &self.lims)
            .field("kind", &self.kind)
            .field("planes", &self.planes)
            .field("has_init", &self.init.is_some())
            .finish()
    }
}

impl Channel {
    pub(crate) fn root(id: &str, spec: ChannelSpec, first_plane: usize) -> Self {
        Self {
            id: id.to_string(),
            dtype: spec.dtype,
            lims: spec.lims,
            metadata: spec.metadata,
            kind: ChannelKind::Root,
            planes: (first_plane..first_plane + spec.components).collect(),
            init: spec.init,
        }
    }

    pub(crate) fn sub(id: &str, parent: &Channel, planes: Vec<usize>) -> Self {
        Self {
            id: id.to_string(),
            dtype: parent.dtype,
            lims: parent.lims,
            metadata: ChannelMetadata::default(),
            kind: ChannelKind::Sub {
                parent: parent.id.clone(),
            },
            planes,
            init: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn lims(&self) -> Lims {
        self.lims
    }

    #[must_use]
    pub fn kind(&self) -> &ChannelKind {
        &self.kind
    }

    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        match &self.kind {
            ChannelKind::Root => None,
            ChannelKind::Sub { parent } => Some(parent),
        }
    }

    #[must_use]
    pub fn is_subchannel(&self) -> bool {
        matches!(self.kind, ChannelKind::Sub { .. })
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.planes.len()
    }

    #[must_use]
    pub fn planes(&self) -> &[usize] {
        &self.planes
    }

    /// Own metadata. Sub-channels keep none; `Substrate::metadata` resolves them to the root.
    #[must_use]
    pub fn metadata(&self) -> &ChannelMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ChannelMetadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_builder() {
        let spec = ChannelSpec::new()
            .with_components(3)
            .with_lims((-1.0, 1.0))
            .with_metadata("growth_cost", 0.2);
        assert_eq!(spec.components, 3);
        assert_eq!(spec.lims, Lims::new(-1.0, 1.0));
        assert!(spec.metadata.has("growth_cost"));
        assert!(!spec.metadata.has("kernel"));
    }

    #[test]
    fn test_metadata_typed_keys() {
        let mut md = ChannelMetadata::default();
        assert!(!md.has("port_id_map"));
        md.ports = Some(PortLayout::default());
        assert!(md.has("port_id_map"));
        assert!(md.has("resources"));
        md.kernel = Some(Kernel::von_neumann());
        assert!(md.has("kernel"));
    }

    #[test]
    fn test_root_planes_are_contiguous() {
        let ch = Channel::root("muscles", ChannelSpec::new().with_components(4), 3);
        assert_eq!(ch.planes(), &[3, 4, 5, 6]);
        let sub = Channel::sub("port", &ch, vec![6]);
        assert_eq!(sub.parent(), Some("muscles"));
        assert_eq!(sub.components(), 1);
    }
}
