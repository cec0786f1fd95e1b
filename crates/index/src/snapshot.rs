//! Exchange format for [`InMemoryIndex`] content.
//!
//! Snapshots are either plain JSON (human-editable dumps) or bincode-encoded
//! and zstd-compressed binaries. They carry no durability guarantees.

use std::fs;
use std::path::Path;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use crate::{IndexError, InMemoryIndex, SubFingerprintData, TrackData};

/// Bump this value whenever the snapshot layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

const fn default_schema_version() -> u16 {
    INDEX_SCHEMA_VERSION
}

/// Complete content of an in-memory index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub tracks: Vec<TrackData>,
    pub sub_fingerprints: Vec<SubFingerprintData>,
}

/// Compression codec options for binary snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// No compression (useful for debugging).
    None,
    /// Zstd compression (default).
    #[default]
    Zstd,
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => {
                encode_all(data, self.level).map_err(|e| IndexError::Zstd(e.to_string()))
            }
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => decode_all(data).map_err(|e| IndexError::Zstd(e.to_string())),
        }
    }
}

impl IndexSnapshot {
    /// Encode with bincode, then compress.
    pub fn encode(&self, cfg: &CompressionConfig) -> Result<Vec<u8>, IndexError> {
        let bytes = encode_to_vec(self, standard())?;
        cfg.compress(&bytes)
    }

    /// Decompress, then decode. Rejects snapshots written with another schema.
    pub fn decode(data: &[u8], cfg: &CompressionConfig) -> Result<Self, IndexError> {
        let bytes = cfg.decompress(data)?;
        let (snapshot, _): (IndexSnapshot, usize) = decode_from_slice(&bytes, standard())?;
        snapshot.check_schema()?;
        Ok(snapshot)
    }

    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let snapshot: IndexSnapshot = serde_json::from_str(json)?;
        snapshot.check_schema()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, IndexError> {
        serde_json::to_string_pretty(self).map_err(|e| IndexError::Encode(e.to_string()))
    }

    fn check_schema(&self) -> Result<(), IndexError> {
        if self.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::Decode(format!(
                "unsupported snapshot schema version {} (expected {INDEX_SCHEMA_VERSION})",
                self.schema_version
            )));
        }
        Ok(())
    }
}

impl InMemoryIndex {
    /// Capture the current content of the index.
    pub fn snapshot(&self) -> Result<IndexSnapshot, IndexError> {
        let (tracks, sub_fingerprints) = self.export()?;
        Ok(IndexSnapshot {
            schema_version: INDEX_SCHEMA_VERSION,
            tracks,
            sub_fingerprints,
        })
    }

    /// Build an index from a snapshot, rebuilding the hash buckets.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self, IndexError> {
        snapshot.check_schema()?;
        let index = Self::rebuild(snapshot.tracks, snapshot.sub_fingerprints)?;
        tracing::debug!(
            tracks = index.track_count(),
            sub_fingerprints = index.sub_fingerprint_count(),
            "index rebuilt from snapshot"
        );
        Ok(index)
    }

    pub fn save_snapshot<P: AsRef<Path>>(
        &self,
        path: P,
        cfg: &CompressionConfig,
    ) -> Result<(), IndexError> {
        let bytes = self.snapshot()?.encode(cfg)?;
        fs::write(path, bytes).map_err(|e| IndexError::Io(e.to_string()))
    }

    pub fn load_snapshot<P: AsRef<Path>>(
        path: P,
        cfg: &CompressionConfig,
    ) -> Result<Self, IndexError> {
        let bytes = fs::read(path).map_err(|e| IndexError::Io(e.to_string()))?;
        Self::from_snapshot(IndexSnapshot::decode(&bytes, cfg)?)
    }
}
