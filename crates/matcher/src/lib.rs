//! # Soundmatch Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the index layer (`index`) and turns a sequence of
//! hashed query fingerprints into a ranked list of candidate tracks. For every
//! candidate it reports how much of the query aligned with the track, where
//! the alignment sits on both timelines, and a confidence in `[0, 1]`.
//!
//! A query flows through these stages:
//! - **Retrieval** ([`retriever`]): per query fingerprint, ask the
//!   [`SubFingerprintStore`](index::SubFingerprintStore) for records agreeing on
//!   at least `threshold_votes` hash tables and score each candidate.
//! - **Accumulation** ([`accumulator`]): group the scored pairs by track,
//!   summing similarity and keeping the best single pair.
//! - **Span** ([`span`]): the query's duration on its own timeline.
//! - **Coverage** ([`coverage`]): the best contiguous aligned run per track.
//! - **Confidence** ([`confidence`]): covered length relative to what the
//!   track could show at that alignment.
//! - **Ranking** ([`ranker`]): order by cumulative similarity, truncate, and
//!   attach track metadata.
//!
//! ## Core Types
//!
//! - [`FingerprintConfiguration`]: thresholds, window geometry, gap tolerance
//!   and result limits for one query.
//! - [`QueryFingerprintService`]: the query entry point; blocking, cancellable
//!   and async variants.
//! - [`QueryResult`] / [`ResultEntry`]: the ranked answer.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use index::{HashedFingerprint, InMemoryIndex, NewSubFingerprint, TrackData, TrackReference};
//! use matcher::{FingerprintConfiguration, QueryFingerprintService};
//!
//! let index = InMemoryIndex::new();
//! index
//!     .insert_track(TrackData::new(TrackReference(1), "Artist", "Title", 180.0))
//!     .unwrap();
//! for n in 0..4u32 {
//!     index
//!         .insert_sub_fingerprint(NewSubFingerprint {
//!             track_reference: TrackReference(1),
//!             hashes: vec![n as i32 * 10, n as i32 * 10 + 1, n as i32 * 10 + 2],
//!             sequence_number: n,
//!             sequence_at: f64::from(n),
//!             clusters: vec![],
//!         })
//!         .unwrap();
//! }
//!
//! let config = FingerprintConfiguration {
//!     hash_tables: 3,
//!     threshold_votes: 2,
//!     ..Default::default()
//! };
//! let query: Vec<HashedFingerprint> = (0..4u32)
//!     .map(|n| HashedFingerprint::new(vec![n as i32 * 10, n as i32 * 10 + 1, -1], n, f64::from(n)))
//!     .collect();
//!
//! let service = QueryFingerprintService::with_index(Arc::new(index));
//! let result = service.query(&query, &config).unwrap();
//! let best = result.best_match().unwrap();
//! assert_eq!(best.track.track_reference, TrackReference(1));
//! assert_eq!(best.similarity_sum, 8);
//! ```
//!
//! ## Observability
//!
//! Install a [`MatchMetrics`] implementation via [`set_match_metrics`] to record
//! per-query latency and result counts. This is typically done once during
//! service startup so every [`QueryFingerprintService`] reports to the same
//! backend.

pub mod accumulator;
pub mod confidence;
pub mod coverage;
pub mod engine;
pub mod metrics;
pub mod ranker;
pub mod retriever;
pub mod span;
pub mod types;

pub use crate::engine::QueryFingerprintService;
pub use crate::metrics::{set_match_metrics, MatchMetrics};
pub use crate::types::{
    Coverage, FingerprintConfiguration, GapTolerance, MatchError, MatchedPair, QueryOptions,
    QueryResult, ResultEntry,
};
pub use tokio_util::sync::CancellationToken;
