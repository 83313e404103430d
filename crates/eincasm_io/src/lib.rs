//! # EINCASM IO
//!
//! Persistence layer for EINCASM simulations.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - JSON and gzip-compressed JSON helpers
//! - Checksummed snapshots of the substrate backing store

/// Error types and result aliases for I/O operations
pub mod error;
/// Validated serialization helpers for plain and compressed JSON
pub mod serialization;
/// Capture, persist and restore whole-substrate snapshots
pub mod snapshot;

pub use error::{IoError, Result};
pub use serialization::{
    from_json, read_gz_json, read_json_file, to_json, to_json_pretty, write_gz_json,
    write_json_file,
};
pub use snapshot::{ChannelRecord, ChannelStats, LimsRecord, Snapshot};
