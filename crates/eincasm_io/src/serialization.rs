//! Serialization helpers: plain JSON and gzip-compressed JSON.

use crate::error::{IoError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Serializes data to JSON.
pub fn to_json<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Serializes data to pretty-printed JSON.
pub fn to_json_pretty<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Deserializes data from a JSON string. Empty input is a validation error.
pub fn from_json<T>(json: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Err(IoError::validation("Empty JSON string"));
    }

    serde_json::from_str(json)
        .map_err(|e| IoError::serialization(format!("JSON deserialization failed: {}", e)))
}

/// Writes pretty JSON to a file.
pub fn write_json_file<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = to_json_pretty(data)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing JSON to {:?}", path.as_ref()))
    })?;
    Ok(())
}

/// Reads JSON from a file.
pub fn read_json_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let json = std::fs::read_to_string(&path).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("reading JSON from {:?}", path.as_ref()))
    })?;
    from_json(&json)
}

/// Writes gzip-compressed JSON to a file.
pub fn write_gz_json<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("creating {:?}", path))
    })?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))?;
    let mut writer = encoder
        .finish()
        .map_err(|e| IoError::compression(format!("finishing gzip stream: {}", e)))?;
    writer.flush()?;
    Ok(())
}

/// Reads gzip-compressed JSON from a file.
pub fn read_gz_json<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::not_found(path.display().to_string()));
    }
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .map_err(|e| IoError::compression(format!("decompressing {:?}: {}", path, e)))?;
    from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        values: Vec<f32>,
    }

    fn temp_path(ext: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("eincasm_io_{}.{}", uuid::Uuid::new_v4(), ext))
    }

    #[test]
    fn test_empty_json_fails() {
        let result: Result<Sample> = from_json("  ");
        assert!(matches!(result, Err(IoError::Validation(_))));
    }

    #[test]
    fn test_invalid_json_fails() {
        let result: Result<Sample> = from_json("{ invalid json");
        assert!(matches!(result, Err(IoError::Serialization(_))));
    }

    #[test]
    fn test_gz_file_is_compressed_and_readable() {
        let path = temp_path("json.gz");
        let data = Sample {
            name: "capital".into(),
            values: vec![0.0; 512],
        };
        write_gz_json(&data, &path).unwrap();
        let raw = std::fs::read(&path).unwrap();
        // gzip magic bytes
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert!(raw.len() < to_json(&data).unwrap().len());
        let restored: Sample = read_gz_json(&path).unwrap();
        assert_eq!(restored, data);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_gz_rejects_plain_file() {
        let path = temp_path("json");
        write_json_file(&Sample { name: "x".into(), values: vec![] }, &path).unwrap();
        let result: Result<Sample> = read_gz_json(&path);
        assert!(matches!(result, Err(IoError::Compression(_))));
        let plain: Sample = read_json_file(&path).unwrap();
        assert_eq!(plain.name, "x");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result: Result<Sample> = read_gz_json(temp_path("gz"));
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }
}
