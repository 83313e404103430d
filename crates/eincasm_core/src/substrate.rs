//! The grid substrate: shape, channel table, and the single backing store.
//!
//! ## Layout
//!
//! The backing store is one `Vec<f32>` of `total_planes * width * height`
//! values. Root channels are assigned consecutive component planes in
//! registration order; sub-channels reference a subset of their parent's
//! planes. Once [`Substrate::malloc`] has run the channel table is frozen.

use crate::channel::{Channel, ChannelMetadata, ChannelSpec, InitContext};
use crate::error::{Result, SimError};
use crate::field::Field;
use eincasm_data::{Lims, Shape};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Substrate {
    shape: Shape,
    channels: Vec<Channel>,
    index: HashMap<String, usize>,
    total_planes: usize,
    mem: Vec<f32>,
    allocated: bool,
}

impl Substrate {
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            channels: Vec::new(),
            index: HashMap::new(),
            total_planes: 0,
            mem: Vec::new(),
            allocated: false,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Total component planes across all root channels.
    #[must_use]
    pub fn total_planes(&self) -> usize {
        self.total_planes
    }

    fn ensure_unallocated(&self, id: &str) -> Result<()> {
        if self.allocated {
            return Err(SimError::configuration(format!(
                "cannot add channel '{id}' after substrate memory is allocated"
            )));
        }
        if self.index.contains_key(id) {
            return Err(SimError::configuration(format!(
                "channel '{id}' is already registered"
            )));
        }
        Ok(())
    }

    pub fn add_channel(&mut self, id: &str, spec: ChannelSpec) -> Result<()> {
        self.ensure_unallocated(id)?;
        if spec.components == 0 {
            return Err(SimError::configuration(format!(
                "channel '{id}' must have at least one component"
            )));
        }
        if !spec.lims.is_valid() {
            return Err(SimError::configuration(format!(
                "channel '{id}' has invalid limits [{}, {}]",
                spec.lims.lo, spec.lims.hi
            )));
        }
        let components = spec.components;
        let channel = Channel::root(id, spec, self.total_planes);
        self.total_planes += components;
        self.index.insert(id.to_string(), self.channels.len());
        self.channels.push(channel);
        tracing::debug!(channel = id, components, "Channel registered");
        Ok(())
    }

    /// Registers `id` as an alias over `indices` of `parent_id`'s components.
    pub fn add_subchannel<I>(&mut self, id: &str, parent_id: &str, indices: I) -> Result<()>
    where
        I: IntoIterator<Item = usize>,
    {
        self.ensure_unallocated(id)?;
        let parent = match self.index.get(parent_id) {
            Some(&i) => &self.channels[i],
            None => {
                return Err(SimError::configuration(format!(
                    "sub-channel '{id}' references unknown parent '{parent_id}'"
                )))
            }
        };
        let indices: Vec<usize> = indices.into_iter().collect();
        if indices.is_empty() {
            return Err(SimError::configuration(format!(
                "sub-channel '{id}' selects no components"
            )));
        }
        let mut planes = Vec::with_capacity(indices.len());
        for &i in &indices {
            let Some(&plane) = parent.planes().get(i) else {
                return Err(SimError::configuration(format!(
                    "sub-channel '{id}' index {i} out of range for '{parent_id}' ({} components)",
                    parent.components()
                )));
            };
            if planes.contains(&plane) {
                return Err(SimError::configuration(format!(
                    "sub-channel '{id}' selects component {i} twice"
                )));
            }
            planes.push(plane);
        }
        let channel = Channel::sub(id, parent, planes);
        self.index.insert(id.to_string(), self.channels.len());
        self.channels.push(channel);
        Ok(())
    }

    /// Allocates the backing store. One-shot: the channel table is frozen afterwards.
    pub fn malloc(&mut self) -> Result<()> {
        if self.allocated {
            return Err(SimError::configuration(
                "cannot allocate substrate memory twice",
            ));
        }
        if self.shape.cells() == 0 {
            return Err(SimError::configuration(format!(
                "substrate shape {}x{} has no cells",
                self.shape.width, self.shape.height
            )));
        }
        self.mem = vec![0.0; self.total_planes * self.shape.cells()];
        self.allocated = true;
        tracing::info!(
            width = self.shape.width,
            height = self.shape.height,
            planes = self.total_planes,
            channels = self.channels.len(),
            "Substrate allocated"
        );
        Ok(())
    }

    fn ensure_allocated(&self) -> Result<()> {
        if self.allocated {
            Ok(())
        } else {
            Err(SimError::configuration("substrate memory is not allocated"))
        }
    }

    /// Runs every root channel's initializer; channels without one are zero-filled.
    pub fn init_all_channels(&mut self, rng: &mut ChaCha8Rng) -> Result<()> {
        self.ensure_allocated()?;
        let shape = self.shape;
        let n = shape.cells();
        for ch in self.channels.iter_mut().filter(|c| !c.is_subchannel()) {
            let values = match ch.init.take() {
                Some(mut init) => {
                    let id = ch.id().to_string();
                    let components = ch.components();
                    let lims = ch.lims();
                    let result = {
                        let mut ctx = InitContext {
                            channel_id: &id,
                            shape,
                            components,
                            lims,
                            metadata: ch.metadata_mut(),
                            rng: &mut *rng,
                        };
                        init(&mut ctx)
                    };
                    ch.init = Some(init);
                    let values = result?;
                    if values.len() != components * n {
                        return Err(SimError::configuration(format!(
                            "initializer for '{id}' produced {} values, expected {}",
                            values.len(),
                            components * n
                        )));
                    }
                    Some(values)
                }
                None => None,
            };
            let dtype = ch.dtype();
            let lims = ch.lims();
            for (k, &p) in ch.planes().iter().enumerate() {
                let dst = &mut self.mem[p * n..(p + 1) * n];
                match &values {
                    Some(v) => {
                        for (d, &s) in dst.iter_mut().zip(&v[k * n..(k + 1) * n]) {
                            *d = lims.clamp(dtype.quantize(s));
                        }
                    }
                    None => dst.fill(0.0),
                }
            }
        }
        tracing::info!(channels = self.channels.len(), "Channels initialised");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn channel(&self, id: &str) -> Result<&Channel> {
        self.index
            .get(id)
            .map(|&i| &self.channels[i])
            .ok_or_else(|| SimError::lookup(id))
    }

    /// Channels in registration order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn root_index(&self, id: &str) -> Result<usize> {
        let mut i = *self.index.get(id).ok_or_else(|| SimError::lookup(id))?;
        while let Some(parent) = self.channels[i].parent() {
            i = *self.index.get(parent).ok_or_else(|| SimError::lookup(parent))?;
        }
        Ok(i)
    }

    /// Metadata of the channel, or of its root parent for sub-channels.
    pub fn metadata(&self, id: &str) -> Result<&ChannelMetadata> {
        let i = self.root_index(id)?;
        Ok(self.channels[i].metadata())
    }

    pub fn metadata_mut(&mut self, id: &str) -> Result<&mut ChannelMetadata> {
        let i = self.root_index(id)?;
        Ok(self.channels[i].metadata_mut())
    }

    pub fn view(&self, id: &str) -> Result<ChannelView<'_>> {
        let channel = self.channel(id)?;
        self.ensure_allocated()?;
        Ok(ChannelView {
            channel,
            shape: self.shape,
            mem: &self.mem,
        })
    }

    pub fn view_mut(&mut self, id: &str) -> Result<ChannelViewMut<'_>> {
        let i = *self.index.get(id).ok_or_else(|| SimError::lookup(id))?;
        self.ensure_allocated()?;
        Ok(ChannelViewMut {
            channel: &self.channels[i],
            shape: self.shape,
            mem: &mut self.mem,
        })
    }

    /// Copies a channel's contents out of the store.
    pub fn read(&self, id: &str) -> Result<Field> {
        Ok(self.view(id)?.to_field())
    }

    /// Writes `field` into the channel, quantising and clamping into its limits.
    pub fn write(&mut self, id: &str, field: &Field) -> Result<()> {
        self.view_mut(id)?.copy_from(field)
    }

    #[must_use]
    pub fn memory(&self) -> &[f32] {
        &self.mem
    }

    /// Replaces the backing store wholesale (snapshot restore).
    pub fn load_memory(&mut self, mem: Vec<f32>) -> Result<()> {
        self.ensure_allocated()?;
        if mem.len() != self.mem.len() {
            return Err(SimError::configuration(format!(
                "memory image has {} values, substrate holds {}",
                mem.len(),
                self.mem.len()
            )));
        }
        self.mem = mem;
        Ok(())
    }

    /// Zeroes every channel.
    pub fn clear(&mut self) {
        self.mem.fill(0.0);
    }
}

/// Read-only live view over one channel's planes.
pub struct ChannelView<'a> {
    channel: &'a Channel,
    shape: Shape,
    mem: &'a [f32],
}

impl<'a> ChannelView<'a> {
    #[must_use]
    pub fn id(&self) -> &str {
        self.channel.id()
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.channel.components()
    }

    #[must_use]
    pub fn lims(&self) -> Lims {
        self.channel.lims()
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[must_use]
    pub fn plane(&self, c: usize) -> &'a [f32] {
        let n = self.shape.cells();
        let p = self.channel.planes()[c];
        &self.mem[p * n..(p + 1) * n]
    }

    #[must_use]
    pub fn get(&self, c: usize, x: usize, y: usize) -> f32 {
        self.plane(c)[self.shape.index(x, y)]
    }

    #[must_use]
    pub fn to_field(&self) -> Field {
        let mut field = Field::zeros(self.shape, self.components());
        for c in 0..self.components() {
            field.plane_mut(c).copy_from_slice(self.plane(c));
        }
        field
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        (0..self.components())
            .flat_map(|c| self.plane(c).iter())
            .map(|&v| v as f64)
            .sum()
    }

    #[must_use]
    pub fn min(&self) -> f32 {
        (0..self.components())
            .flat_map(|c| self.plane(c).iter().copied())
            .fold(f32::INFINITY, f32::min)
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        (0..self.components())
            .flat_map(|c| self.plane(c).iter().copied())
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Mutable live view; writes land directly in the shared store.
pub struct ChannelViewMut<'a> {
    channel: &'a Channel,
    shape: Shape,
    mem: &'a mut [f32],
}

impl ChannelViewMut<'_> {
    #[must_use]
    pub fn components(&self) -> usize {
        self.channel.components()
    }

    #[must_use]
    pub fn plane(&self, c: usize) -> &[f32] {
        let n = self.shape.cells();
        let p = self.channel.planes()[c];
        &self.mem[p * n..(p + 1) * n]
    }

    pub fn plane_mut(&mut self, c: usize) -> &mut [f32] {
        let n = self.shape.cells();
        let p = self.channel.planes()[c];
        &mut self.mem[p * n..(p + 1) * n]
    }

    #[must_use]
    pub fn get(&self, c: usize, x: usize, y: usize) -> f32 {
        self.plane(c)[self.shape.index(x, y)]
    }

    pub fn set(&mut self, c: usize, x: usize, y: usize, v: f32) {
        let v = self.channel.dtype().quantize(v);
        let idx = self.shape.index(x, y);
        self.plane_mut(c)[idx] = v;
    }

    pub fn fill(&mut self, v: f32) {
        let v = self.channel.dtype().quantize(v);
        for c in 0..self.components() {
            self.plane_mut(c).fill(v);
        }
    }

    /// Overwrites the channel from `field`, quantising and clamping into its limits.
    pub fn copy_from(&mut self, field: &Field) -> Result<()> {
        if field.shape() != self.shape || field.components() != self.components() {
            return Err(SimError::configuration(format!(
                "field of {}x{}x{} does not fit channel '{}' ({}x{}x{})",
                field.shape().width,
                field.shape().height,
                field.components(),
                self.channel.id(),
                self.shape.width,
                self.shape.height,
                self.components()
            )));
        }
        let dtype = self.channel.dtype();
        let lims = self.channel.lims();
        for c in 0..self.components() {
            for (d, &s) in self.plane_mut(c).iter_mut().zip(field.plane(c)) {
                *d = lims.clamp(dtype.quantize(s));
            }
        }
        Ok(())
    }

    /// Clamps every value into the channel's limits.
    pub fn clamp_to_lims(&mut self) {
        let lims = self.channel.lims();
        if lims.is_unbounded() {
            return;
        }
        for c in 0..self.components() {
            for v in self.plane_mut(c).iter_mut() {
                *v = lims.clamp(*v);
            }
        }
    }
}
