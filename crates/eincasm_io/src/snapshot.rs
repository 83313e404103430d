//! Snapshots of a running simulation.
//!
//! A snapshot holds the whole backing store together with the channel table
//! that gives it meaning, the global state, and a SHA-256 checksum over all
//! of it. On disk it is gzip-compressed JSON.

use crate::error::{IoError, Result};
use crate::serialization::{read_gz_json, write_gz_json};
use chrono::{DateTime, Utc};
use eincasm_core::{ChannelKind, ChannelMetadata, Simulation, SimulationState};
use eincasm_data::{DType, Lims, Shape};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

/// Channel limits with infinite bounds stored as `None`, since JSON has no infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimsRecord {
    pub lo: Option<f32>,
    pub hi: Option<f32>,
}

impl From<Lims> for LimsRecord {
    fn from(lims: Lims) -> Self {
        Self {
            lo: lims.lo.is_finite().then_some(lims.lo),
            hi: lims.hi.is_finite().then_some(lims.hi),
        }
    }
}

impl From<LimsRecord> for Lims {
    fn from(record: LimsRecord) -> Self {
        Lims::new(
            record.lo.unwrap_or(f32::NEG_INFINITY),
            record.hi.unwrap_or(f32::INFINITY),
        )
    }
}

/// One row of the channel table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub kind: ChannelKind,
    pub dtype: DType,
    pub lims: LimsRecord,
    /// Absolute planes in the backing store.
    pub planes: Vec<usize>,
    pub metadata: ChannelMetadata,
}

/// Summary statistics of one channel's contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub simulation: String,
    pub seed: u64,
    pub shape: Shape,
    pub state: SimulationState,
    pub channels: Vec<ChannelRecord>,
    pub memory: Vec<f32>,
    pub checksum: String,
}

impl Snapshot {
    /// Captures the current contents of an allocated simulation.
    pub fn capture(sim: &Simulation, run_id: Uuid) -> Result<Self> {
        sim.ensure_ready()?;
        let channels = sim
            .substrate()
            .channels()
            .iter()
            .map(|c| ChannelRecord {
                id: c.id().to_string(),
                kind: c.kind().clone(),
                dtype: c.dtype(),
                lims: c.lims().into(),
                planes: c.planes().to_vec(),
                metadata: c.metadata().clone(),
            })
            .collect();
        let mut snapshot = Self {
            run_id,
            created_at: Utc::now(),
            simulation: sim.name().to_string(),
            seed: sim.seed(),
            shape: sim.shape(),
            state: sim.state().clone(),
            channels,
            memory: sim.substrate().memory().to_vec(),
            checksum: String::new(),
        };
        snapshot.checksum = snapshot.compute_checksum()?;
        Ok(snapshot)
    }

    /// SHA-256 over everything except the timestamp and the checksum itself.
    pub fn compute_checksum(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.run_id.as_bytes());
        hasher.update(self.simulation.as_bytes());
        hasher.update(self.seed.to_le_bytes());
        hasher.update((self.shape.width as u64).to_le_bytes());
        hasher.update((self.shape.height as u64).to_le_bytes());
        hasher.update(serde_json::to_vec(&self.state)?);
        hasher.update(serde_json::to_vec(&self.channels)?);
        for v in &self.memory {
            hasher.update(v.to_le_bytes());
        }
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn verify(&self) -> Result<()> {
        let actual = self.compute_checksum()?;
        if actual != self.checksum {
            return Err(IoError::checksum(&self.checksum, actual));
        }
        let planes = self
            .channels
            .iter()
            .flat_map(|c| c.planes.iter())
            .max()
            .map_or(0, |p| p + 1);
        let expected_len = planes * self.shape.cells();
        if self.memory.len() != expected_len {
            return Err(IoError::validation(format!(
                "memory holds {} values, channel table implies {}",
                self.memory.len(),
                expected_len
            )));
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_gz_json(self, &path)
            .map_err(|e| e.with_context(format!("saving snapshot {}", self.run_id)))?;
        tracing::info!(
            run_id = %self.run_id,
            period = self.state.period,
            path = %path.as_ref().display(),
            "Snapshot saved"
        );
        Ok(())
    }

    /// Loads and verifies a snapshot.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        read_gz_json::<Self, _>(path)
            .and_then(|snapshot| snapshot.verify().map(|()| snapshot))
            .map_err(|e| {
                if e.is_corrupt() {
                    tracing::warn!(path = %path.display(), error = %e, "Snapshot is corrupt");
                }
                e.with_context(format!("loading snapshot {}", path.display()))
            })
    }

    /// Copies memory, global state and channel metadata into `sim`, whose
    /// channel layout must match the snapshot's exactly.
    pub fn restore_into(&self, sim: &mut Simulation) -> Result<()> {
        sim.ensure_ready()?;
        if sim.shape() != self.shape {
            return Err(IoError::validation(format!(
                "snapshot shape {}x{} does not match simulation shape {}x{}",
                self.shape.width,
                self.shape.height,
                sim.shape().width,
                sim.shape().height
            )));
        }
        let live = sim.substrate().channels();
        if live.len() != self.channels.len() {
            return Err(IoError::validation(format!(
                "snapshot has {} channels, simulation has {}",
                self.channels.len(),
                live.len()
            )));
        }
        for (record, channel) in self.channels.iter().zip(live) {
            if record.id != channel.id()
                || &record.kind != channel.kind()
                || record.dtype != channel.dtype()
                || record.planes != channel.planes()
            {
                return Err(IoError::validation(format!(
                    "channel '{}' does not match simulation channel '{}'",
                    record.id,
                    channel.id()
                )));
            }
        }

        sim.substrate_mut().load_memory(self.memory.clone())?;
        // Sub-channels share their root's metadata.
        for record in self.channels.iter().filter(|r| r.kind == ChannelKind::Root) {
            *sim.substrate_mut().metadata_mut(&record.id)? = record.metadata.clone();
        }
        sim.restore_state(self.state.clone());
        tracing::info!(
            run_id = %self.run_id,
            period = self.state.period,
            "Snapshot restored"
        );
        Ok(())
    }

    /// Per-channel statistics in table order.
    #[must_use]
    pub fn channel_stats(&self) -> Vec<(String, ChannelStats)> {
        let cells = self.shape.cells();
        self.channels
            .iter()
            .map(|record| {
                let mut min = f32::INFINITY;
                let mut max = f32::NEG_INFINITY;
                let mut sum = 0.0f64;
                let mut count = 0usize;
                for &plane in &record.planes {
                    let start = plane * cells;
                    let values = self.memory.get(start..start + cells).unwrap_or(&[]);
                    for &v in values {
                        min = min.min(v);
                        max = max.max(v);
                        sum += f64::from(v);
                    }
                    count += values.len();
                }
                let mean = if count == 0 { 0.0 } else { sum / count as f64 };
                (record.id.clone(), ChannelStats { min, max, mean, sum })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eincasm_core::{ChannelSpec, Field};

    fn build() -> Simulation {
        let mut sim = Simulation::new("snap", Shape::new(4, 3), 9);
        sim.add_channel("capital", ChannelSpec::new().with_lims((0.0, 100.0)))
            .unwrap();
        sim.add_channel("radii", ChannelSpec::new().with_components(3))
            .unwrap();
        sim.add_subchannel("port_radii", "radii", [1]).unwrap();
        sim.malloc().unwrap();
        sim
    }

    fn temp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("eincasm_snapshot_{}.json.gz", Uuid::new_v4()))
    }

    #[test]
    fn test_capture_checksum_verifies() {
        let mut sim = build();
        sim.write("capital", &Field::filled(sim.shape(), 1, 2.5)).unwrap();
        let snap = Snapshot::capture(&sim, Uuid::new_v4()).unwrap();
        assert_eq!(snap.checksum.len(), 64);
        assert!(snap.verify().is_ok());
        assert_eq!(snap.channels.len(), 3);
        assert_eq!(snap.channels[2].planes, vec![2]);
    }

    #[test]
    fn test_tampered_memory_fails_verification() {
        let sim = build();
        let mut snap = Snapshot::capture(&sim, Uuid::new_v4()).unwrap();
        snap.memory[0] = 1.0;
        assert!(matches!(snap.verify(), Err(IoError::Checksum { .. })));
    }

    #[test]
    fn test_load_flags_tampered_file_as_corrupt() {
        let mut snap = Snapshot::capture(&build(), Uuid::new_v4()).unwrap();
        snap.memory[0] = 3.0;
        let path = temp_path();
        crate::serialization::write_gz_json(&snap, &path).unwrap();

        let err = Snapshot::load(&path).unwrap_err();
        assert!(err.is_corrupt());
        assert!(matches!(err, IoError::Context { ref source, .. } if matches!(**source, IoError::Checksum { .. })));
        let _ = std::fs::remove_file(&path);

        let missing = Snapshot::load(temp_path()).unwrap_err();
        assert!(!missing.is_corrupt());
    }

    #[test]
    fn test_unbounded_lims_survive_json() {
        let record: LimsRecord = Lims::UNBOUNDED.into();
        assert_eq!(record.lo, None);
        let json = serde_json::to_string(&record).unwrap();
        let back: LimsRecord = serde_json::from_str(&json).unwrap();
        assert!(Lims::from(back).is_unbounded());
    }

    #[test]
    fn test_save_load_restore() {
        let mut sim = build();
        sim.write("capital", &Field::filled(sim.shape(), 1, 7.0)).unwrap();
        sim.write("port_radii", &Field::filled(sim.shape(), 1, -0.5))
            .unwrap();
        sim.set_state_value("period", 12.0);
        sim.substrate_mut()
            .metadata_mut("radii")
            .unwrap()
            .insert("note", "grown");
        let snap = Snapshot::capture(&sim, Uuid::new_v4()).unwrap();
        let path = temp_path();
        snap.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snap);

        let mut fresh = build();
        loaded.restore_into(&mut fresh).unwrap();
        assert_eq!(fresh.read("capital").unwrap().sum(), 7.0 * 12.0);
        assert_eq!(fresh.read("radii").unwrap().get(1, 0, 0), -0.5);
        assert_eq!(fresh.period(), 12);
        let meta = fresh.substrate().metadata("port_radii").unwrap();
        assert_eq!(meta.get("note"), Some(&serde_json::json!("grown")));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_restore_rejects_different_layout() {
        let snap = Snapshot::capture(&build(), Uuid::new_v4()).unwrap();
        let mut other = Simulation::new("other", Shape::new(4, 3), 9);
        other
            .add_channel("capital", ChannelSpec::new().with_lims((0.0, 100.0)))
            .unwrap();
        other.malloc().unwrap();
        assert!(matches!(
            snap.restore_into(&mut other),
            Err(IoError::Validation(_))
        ));

        let mut wrong_shape = Simulation::new("snap", Shape::new(3, 4), 9);
        wrong_shape.add_channel("capital", ChannelSpec::new()).unwrap();
        wrong_shape.malloc().unwrap();
        assert!(snap.restore_into(&mut wrong_shape).is_err());
    }

    #[test]
    fn test_channel_stats() {
        let mut sim = build();
        let mut capital = Field::zeros(sim.shape(), 1);
        capital.set(0, 0, 0, 4.0);
        capital.set(0, 3, 2, 2.0);
        sim.write("capital", &capital).unwrap();
        let snap = Snapshot::capture(&sim, Uuid::new_v4()).unwrap();
        let stats = snap.channel_stats();
        let (id, s) = &stats[0];
        assert_eq!(id, "capital");
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.sum, 6.0);
        assert!((s.mean - 0.5).abs() < 1e-12);
    }
}
