//! Workspace umbrella crate for soundmatch.
//!
//! Re-exports the index data model and the matching engine, and adds the
//! file-level plumbing used by the `soundmatch` binary: YAML configuration,
//! JSON query dumps, and conversion of JSON index dumps into compressed
//! snapshots.

pub mod config;

pub use config::{ConfigLoadError, IndexYamlConfig, LoggingYamlConfig, SoundMatchConfig};
pub use index::{
    CompressionCodec, CompressionConfig, HashedFingerprint, InMemoryIndex, IndexError,
    IndexSnapshot, NewSubFingerprint, SimilarityMetric, SubFingerprintData,
    SubFingerprintReference, SubFingerprintStore, TrackData, TrackReference, TrackStore,
    INDEX_SCHEMA_VERSION,
};
pub use matcher::{
    set_match_metrics, CancellationToken, Coverage, FingerprintConfiguration, MatchError,
    MatchMetrics, MatchedPair, QueryFingerprintService, QueryOptions, QueryResult, ResultEntry,
};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the file-level helpers.
#[derive(Debug, Error)]
pub enum SoundMatchError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed query dump: {0}")]
    QueryDump(#[from] serde_json::Error),
}

/// Query fingerprints exchanged as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDump {
    pub fingerprints: Vec<HashedFingerprint>,
}

impl QueryDump {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SoundMatchError> {
        let json = read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub tracks: usize,
    pub sub_fingerprints: usize,
}

/// Convert a JSON index dump into a compressed snapshot.
///
/// The dump is loaded into an [`InMemoryIndex`] first, so records referencing
/// unknown tracks or with inconsistent hash arity are rejected before
/// anything is written.
pub fn import_dump(
    dump: &Path,
    out: &Path,
    compression: &CompressionConfig,
) -> Result<ImportSummary, SoundMatchError> {
    let json = read_to_string(dump)?;
    let index = InMemoryIndex::from_snapshot(IndexSnapshot::from_json(&json)?)?;
    index.save_snapshot(out, compression)?;

    let summary = ImportSummary {
        tracks: index.track_count(),
        sub_fingerprints: index.sub_fingerprint_count(),
    };
    tracing::info!(
        dump = %dump.display(),
        out = %out.display(),
        tracks = summary.tracks,
        sub_fingerprints = summary.sub_fingerprints,
        "index dump imported"
    );
    Ok(summary)
}

/// Open a snapshot written by [`import_dump`] as a ready-to-query service.
pub fn open_service(
    snapshot: &Path,
    compression: &CompressionConfig,
) -> Result<QueryFingerprintService, SoundMatchError> {
    let index = InMemoryIndex::load_snapshot(snapshot, compression)?;
    tracing::debug!(
        snapshot = %snapshot.display(),
        tracks = index.track_count(),
        "snapshot loaded"
    );
    Ok(QueryFingerprintService::with_index(Arc::new(index)))
}

fn read_to_string(path: &Path) -> Result<String, SoundMatchError> {
    fs::read_to_string(path).map_err(|source| SoundMatchError::Read {
        path: path.display().to_string(),
        source,
    })
}
