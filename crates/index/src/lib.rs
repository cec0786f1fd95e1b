//! # Fingerprint Index
//!
//! This crate holds the data model shared between the hash-bucket fingerprint
//! index and the query matching engine, together with the narrow capability
//! interfaces the engine consumes. The index itself is treated as an external
//! service: production deployments plug their own storage behind
//! [`SubFingerprintStore`] and [`TrackStore`].
//!
//! ## Core Types
//!
//! - [`HashedFingerprint`]: one time-indexed sample of a query, one hash bin per
//!   LSH table.
//! - [`SubFingerprintData`]: one stored fingerprint record belonging to a track.
//! - [`TrackData`]: read-only track metadata, minimally a reference and a length.
//! - [`TrackReference`] / [`SubFingerprintReference`]: opaque, value-comparable
//!   identifiers.
//!
//! ## Reference Index
//!
//! [`InMemoryIndex`] implements both capability traits over per-table hash
//! buckets. It is intended for tests, tooling and small catalogues. Its content
//! can be exchanged as an [`IndexSnapshot`] (JSON, or bincode + zstd).
//!
//! ```
//! use index::{InMemoryIndex, NewSubFingerprint, SubFingerprintStore, TrackData, TrackReference};
//!
//! let index = InMemoryIndex::new();
//! let track = TrackReference(1);
//! index.insert_track(TrackData::new(track, "Artist", "Title", 180.0)).unwrap();
//! index
//!     .insert_sub_fingerprint(NewSubFingerprint {
//!         track_reference: track,
//!         hashes: vec![1, 2, 3, 4],
//!         sequence_number: 0,
//!         sequence_at: 0.0,
//!         clusters: vec![],
//!     })
//!     .unwrap();
//!
//! let hits = index
//!     .read_sub_fingerprints_by_hash_buckets_having_threshold(&[1, 2, 9, 9], 2, &[])
//!     .unwrap();
//! assert_eq!(hits.len(), 1);
//! ```

mod backend;
mod query;
mod snapshot;

pub use backend::{InMemoryIndex, NewSubFingerprint, SubFingerprintStore, TrackStore};
pub use query::{count_votes, passes_threshold_votes, SimilarityMetric};
pub use snapshot::{CompressionCodec, CompressionConfig, IndexSnapshot, INDEX_SCHEMA_VERSION};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque reference to a track in the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackReference(pub u64);

impl fmt::Display for TrackReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track:{}", self.0)
    }
}

/// Opaque reference to a single stored sub-fingerprint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubFingerprintReference(pub u64);

impl fmt::Display for SubFingerprintReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subfp:{}", self.0)
    }
}

/// One hashed sample of the query audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashedFingerprint {
    /// One hash-bin code per LSH table. Arity is fixed across a query.
    pub hash_bins: Vec<i32>,
    /// Start of the sample, in seconds from the beginning of the query.
    pub starts_at: f64,
    /// Ordinal of this sample within the query.
    pub sequence_number: u32,
    /// Cluster tags narrowing which index partitions may be searched.
    #[serde(default)]
    pub clusters: Vec<String>,
}

impl HashedFingerprint {
    pub fn new(hash_bins: Vec<i32>, sequence_number: u32, starts_at: f64) -> Self {
        Self {
            hash_bins,
            starts_at,
            sequence_number,
            clusters: Vec::new(),
        }
    }

    pub fn with_clusters(mut self, clusters: Vec<String>) -> Self {
        self.clusters = clusters;
        self
    }
}

/// A fingerprint record persisted in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubFingerprintData {
    /// Hash-bin codes, same shape as [`HashedFingerprint::hash_bins`].
    pub hashes: Vec<i32>,
    /// Ordinal of the record within its track.
    pub sequence_number: u32,
    /// Offset of the record within its track, in seconds.
    pub sequence_at: f64,
    pub track_reference: TrackReference,
    pub sub_fingerprint_reference: SubFingerprintReference,
    #[serde(default)]
    pub clusters: Vec<String>,
}

/// Read-only track metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub track_reference: TrackReference,
    #[serde(default)]
    pub isrc: Option<String>,
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub release_year: Option<u16>,
    /// Total length of the track in seconds.
    pub length: f64,
}

impl TrackData {
    pub fn new(
        track_reference: TrackReference,
        artist: impl Into<String>,
        title: impl Into<String>,
        length: f64,
    ) -> Self {
        Self {
            track_reference,
            isrc: None,
            artist: artist.into(),
            title: title.into(),
            album: None,
            release_year: None,
            length,
        }
    }
}

/// Errors raised by index implementations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Unknown track: {0}")]
    UnknownTrack(TrackReference),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Zstd(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<bincode::error::EncodeError> for IndexError {
    fn from(e: bincode::error::EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for IndexError {
    fn from(e: bincode::error::DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
