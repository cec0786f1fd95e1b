use std::sync::Arc;
use std::time::Instant;

use index::{HashedFingerprint, InMemoryIndex, IndexError, SubFingerprintStore, TrackStore};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::accumulator::{fold, Accumulators};
use crate::metrics::metrics_recorder;
use crate::ranker::best_candidates;
use crate::retriever::{retrieve, Candidate};
use crate::span::query_length;
use crate::types::{FingerprintConfiguration, MatchError, QueryOptions, QueryResult};


/// Query service over a hash-bucket index and a track metadata store.
///
/// Both collaborators are shared read-only, so one service can answer any
/// number of concurrent queries. Cloning is cheap.
#[derive(Clone)]
pub struct QueryFingerprintService {
    sub_fingerprints: Arc<dyn SubFingerprintStore>,
    tracks: Arc<dyn TrackStore>,
}

impl std::fmt::Debug for QueryFingerprintService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryFingerprintService").finish_non_exhaustive()
    }
}

impl QueryFingerprintService {
    pub fn new(sub_fingerprints: Arc<dyn SubFingerprintStore>, tracks: Arc<dyn TrackStore>) -> Self {
        Self {
            sub_fingerprints,
            tracks,
        }
    }

    /// Serve both lookups from one in-memory index.
    pub fn with_index(index: Arc<InMemoryIndex>) -> Self {
        Self::new(index.clone(), index)
    }

    /// Run a query to completion and return the ranked tracks.
    pub fn query(
        &self,
        fingerprints: &[HashedFingerprint],
        config: &FingerprintConfiguration,
    ) -> Result<QueryResult, MatchError> {
        self.query_with_cancellation(fingerprints, config, &CancellationToken::new())
    }

    /// Run a query that stops dispatching retrieval once `cancel` fires.
    ///
    /// Whatever evidence was gathered before cancellation is still ranked and
    /// returned with [`QueryResult::is_partial`] set.
    pub fn query_with_cancellation(
        &self,
        fingerprints: &[HashedFingerprint],
        config: &FingerprintConfiguration,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, MatchError> {
        config.validate()?;
        validate_fingerprints(fingerprints, config)?;

        let start = Instant::now();
        let query_length = query_length(fingerprints, config);
        let shared: Vec<Arc<HashedFingerprint>> =
            fingerprints.iter().cloned().map(Arc::new).collect();

        let retrieved = self.retrieve_all(&shared, config, cancel)?;

        // Folding in query order keeps best-match ties deterministic no matter
        // how the retrieval was scheduled.
        let mut accumulators = Accumulators::new();
        let mut analyzed_candidates = 0usize;
        let mut completed = 0usize;
        for (query, candidates) in shared.iter().zip(retrieved) {
            let Some(candidates) = candidates else {
                continue;
            };
            completed += 1;
            analyzed_candidates += candidates.len();
            fold(&mut accumulators, query, candidates);
        }
        let is_partial = completed < shared.len();
        if is_partial {
            tracing::info!(
                completed,
                total = shared.len(),
                "query cancelled, ranking partial evidence"
            );
        }

        let candidate_tracks = accumulators.len();
        let result_entries = best_candidates(
            accumulators,
            config.max_results,
            self.tracks.as_ref(),
            config,
            query_length,
        )?;

        let latency = start.elapsed();
        tracing::debug!(
            fingerprints = shared.len(),
            analyzed_candidates,
            candidate_tracks,
            results = result_entries.len(),
            query_length,
            ?latency,
            "query finished"
        );
        if let Some(recorder) = metrics_recorder() {
            recorder.record_query(latency, shared.len(), result_entries.len(), is_partial);
        }

        Ok(QueryResult {
            result_entries,
            query_length,
            analyzed_candidates,
            is_partial,
        })
    }

    /// Run a query as one asynchronous unit of work on the blocking pool.
    ///
    /// `cancel` and the optional deadline both stop further retrieval; the
    /// call then resolves with a partial ranking.
    pub async fn query_async(
        &self,
        fingerprints: Vec<HashedFingerprint>,
        config: FingerprintConfiguration,
        options: QueryOptions,
        cancel: CancellationToken,
    ) -> Result<QueryResult, MatchError> {
        let token = cancel.child_token();
        let timer = options.deadline.map(|deadline| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::debug!(?deadline, "query deadline reached");
                token.cancel();
            })
        });

        let service = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            service.query_with_cancellation(&fingerprints, &config, &token)
        })
        .await;

        if let Some(timer) = timer {
            timer.abort();
        }
        outcome.map_err(|e| MatchError::Join(e.to_string()))?
    }

    /// One slot per query fingerprint; `None` where cancellation skipped it.
    fn retrieve_all(
        &self,
        shared: &[Arc<HashedFingerprint>],
        config: &FingerprintConfiguration,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<Vec<Candidate>>>, IndexError> {
        let store = self.sub_fingerprints.as_ref();
        let retrieve_one =
            |query: &Arc<HashedFingerprint>| -> Result<Option<Vec<Candidate>>, IndexError> {
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                retrieve(query, config.threshold_votes, config.similarity, store).map(Some)
            };

        if config.use_parallel {
            shared.par_iter().map(retrieve_one).collect()
        } else {
            shared.iter().map(retrieve_one).collect()
        }
    }
}

fn validate_fingerprints(
    fingerprints: &[HashedFingerprint],
    config: &FingerprintConfiguration,
) -> Result<(), MatchError> {
    for fingerprint in fingerprints {
        if fingerprint.hash_bins.len() != config.hash_tables {
            return Err(MatchError::InvalidQuery(format!(
                "fingerprint {} carries {} hash bins, expected {}",
                fingerprint.sequence_number,
                fingerprint.hash_bins.len(),
                config.hash_tables
            )));
        }
        if !fingerprint.starts_at.is_finite() || fingerprint.starts_at < 0.0 {
            return Err(MatchError::InvalidQuery(format!(
                "fingerprint {} starts at {}, expected a non-negative offset",
                fingerprint.sequence_number, fingerprint.starts_at
            )));
        }
    }
    Ok(())
}
