use std::sync::Arc;
use std::time::Duration;

use index::{
    HashedFingerprint, IndexError, SimilarityMetric, SubFingerprintData, TrackData,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration consumed by a single query.
///
/// `FingerprintConfiguration` is cheap to clone and serde-friendly so it can be
/// embedded in higher-level configs or shipped alongside a query dump.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FingerprintConfiguration {
    /// Minimum number of agreeing hash-bin positions for a stored record to be
    /// admitted as a candidate.
    #[serde(default = "FingerprintConfiguration::default_threshold_votes")]
    pub threshold_votes: usize,
    /// Number of LSH tables, i.e. the arity of every hash-bin vector.
    #[serde(default = "FingerprintConfiguration::default_hash_tables")]
    pub hash_tables: usize,
    /// Audio samples covered by one fingerprint window.
    #[serde(default = "FingerprintConfiguration::default_samples_per_fingerprint")]
    pub samples_per_fingerprint: u32,
    /// Sample rate the fingerprints were extracted at.
    #[serde(default = "FingerprintConfiguration::default_sample_rate")]
    pub sample_rate: u32,
    /// Largest gap, in seconds, allowed between consecutive matches of one
    /// aligned run. `None` derives the tolerance from the query length.
    #[serde(default)]
    pub permitted_gap: Option<f64>,
    /// Maximum number of ranked tracks to return.
    #[serde(default = "FingerprintConfiguration::default_max_results")]
    pub max_results: usize,
    /// Exact similarity computed for each admitted candidate.
    #[serde(default)]
    pub similarity: SimilarityMetric,
    /// Fan candidate retrieval out over the rayon pool.
    #[serde(default = "FingerprintConfiguration::default_use_parallel")]
    pub use_parallel: bool,
}

impl FingerprintConfiguration {
    pub(crate) fn default_threshold_votes() -> usize {
        5
    }

    pub(crate) fn default_hash_tables() -> usize {
        25
    }

    pub(crate) fn default_samples_per_fingerprint() -> u32 {
        128 * 64
    }

    pub(crate) fn default_sample_rate() -> u32 {
        5512
    }

    pub(crate) fn default_max_results() -> usize {
        25
    }

    pub(crate) fn default_use_parallel() -> bool {
        true
    }

    /// Duration of one fingerprint window in seconds.
    pub fn fingerprint_length_in_seconds(&self) -> f64 {
        f64::from(self.samples_per_fingerprint) / f64::from(self.sample_rate)
    }

    /// Gap tolerance for a query of the given length.
    pub fn gap_tolerance(&self, query_length: f64) -> GapTolerance {
        match self.permitted_gap {
            Some(gap) => GapTolerance::Fixed(gap),
            None => GapTolerance::QueryBound {
                query_length,
                window: self.fingerprint_length_in_seconds(),
            },
        }
    }

    /// Validate the configuration before any retrieval starts.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.hash_tables == 0 {
            return Err(MatchError::InvalidConfig(
                "hash_tables must be greater than zero".into(),
            ));
        }
        if self.threshold_votes == 0 {
            return Err(MatchError::InvalidConfig(
                "threshold_votes must be greater than zero".into(),
            ));
        }
        if self.threshold_votes > self.hash_tables {
            return Err(MatchError::InvalidConfig(format!(
                "threshold_votes ({}) must not exceed hash_tables ({})",
                self.threshold_votes, self.hash_tables
            )));
        }
        if self.samples_per_fingerprint == 0 {
            return Err(MatchError::InvalidConfig(
                "samples_per_fingerprint must be greater than zero".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(MatchError::InvalidConfig(
                "sample_rate must be greater than zero".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(MatchError::InvalidConfig(
                "max_results must be greater than zero".into(),
            ));
        }
        if let Some(gap) = self.permitted_gap {
            if !gap.is_finite() || gap < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "permitted_gap must be a non-negative number of seconds, got {gap}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for FingerprintConfiguration {
    fn default() -> Self {
        Self {
            threshold_votes: Self::default_threshold_votes(),
            hash_tables: Self::default_hash_tables(),
            samples_per_fingerprint: Self::default_samples_per_fingerprint(),
            sample_rate: Self::default_sample_rate(),
            permitted_gap: None,
            max_results: Self::default_max_results(),
            similarity: SimilarityMetric::default(),
            use_parallel: Self::default_use_parallel(),
        }
    }
}

/// Largest admissible gap between consecutive matches of one aligned run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GapTolerance {
    /// Admit `gap` while `gap + window <= query_length`: two matches further
    /// apart than the query itself cannot both belong to it.
    QueryBound { query_length: f64, window: f64 },
    /// Admit `gap` while `gap <= tolerance`.
    Fixed(f64),
}

impl GapTolerance {
    pub fn admits(&self, gap: f64) -> bool {
        if gap < 0.0 {
            return false;
        }
        match *self {
            GapTolerance::QueryBound {
                query_length,
                window,
            } => gap + window <= query_length,
            GapTolerance::Fixed(tolerance) => gap <= tolerance,
        }
    }
}

/// Per-call options for [`crate::QueryFingerprintService::query_async`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Stop dispatching retrieval work after this long and rank what was found.
    pub deadline: Option<Duration>,
}

/// One query fingerprint matched with one stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub hashed_fingerprint: Arc<HashedFingerprint>,
    pub sub_fingerprint: SubFingerprintData,
    pub similarity: u32,
}

impl MatchedPair {
    pub fn new(
        hashed_fingerprint: Arc<HashedFingerprint>,
        sub_fingerprint: SubFingerprintData,
        similarity: u32,
    ) -> Self {
        Self {
            hashed_fingerprint,
            sub_fingerprint,
            similarity,
        }
    }
}

/// Best contiguous aligned segment between the query and one track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    /// Where the segment starts on the query timeline, in seconds.
    pub source_match_starts_at: f64,
    /// Covered length of the segment, in seconds.
    pub source_match_length: f64,
    /// Where the segment starts on the track timeline, in seconds.
    pub origin_match_starts_at: f64,
}

/// One ranked candidate track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub track: TrackData,
    pub source_match_starts_at: f64,
    pub source_match_length: f64,
    pub origin_match_starts_at: f64,
    /// Estimated position of the query start on the track timeline.
    pub track_starts_at: f64,
    pub confidence: f64,
    pub similarity_sum: u64,
    pub query_length: f64,
    pub best_match: MatchedPair,
}

impl ResultEntry {
    pub fn coverage(&self) -> Coverage {
        Coverage {
            source_match_starts_at: self.source_match_starts_at,
            source_match_length: self.source_match_length,
            origin_match_starts_at: self.origin_match_starts_at,
        }
    }
}

/// Outcome of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Ranked by cumulative similarity, best first.
    pub result_entries: Vec<ResultEntry>,
    pub query_length: f64,
    /// Number of (fingerprint, record) candidate pairs folded into evidence.
    pub analyzed_candidates: usize,
    /// Set when the query was cancelled or hit its deadline before every
    /// fingerprint was retrieved.
    pub is_partial: bool,
}

impl QueryResult {
    pub fn is_successful(&self) -> bool {
        !self.result_entries.is_empty()
    }

    pub fn best_match(&self) -> Option<&ResultEntry> {
        self.result_entries.first()
    }
}

/// Errors produced by the matching engine.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Invalid configuration, reported before any retrieval.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// Malformed query fingerprints.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Index or metadata lookup failed; propagated unchanged.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    /// The blocking query task panicked or was aborted.
    #[error("query task failed: {0}")]
    Join(String),
}
