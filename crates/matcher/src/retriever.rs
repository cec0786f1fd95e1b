//! Candidate retrieval for one query fingerprint.

use index::{
    passes_threshold_votes, HashedFingerprint, IndexError, SimilarityMetric, SubFingerprintData,
    SubFingerprintStore,
};

/// A stored record admitted for one query fingerprint, with its exact score.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub sub_fingerprint: SubFingerprintData,
    pub similarity: u32,
}

/// Ask the index for records sharing at least `threshold_votes` hash bins with
/// `query`, then score each of them with `metric`.
///
/// Records the store returns without actually reaching the vote threshold are
/// dropped. Duplicates are kept; folding them is the caller's job. No matches
/// is an empty vector, not an error.
pub fn retrieve(
    query: &HashedFingerprint,
    threshold_votes: usize,
    metric: SimilarityMetric,
    store: &dyn SubFingerprintStore,
) -> Result<Vec<Candidate>, IndexError> {
    let records = store.read_sub_fingerprints_by_hash_buckets_having_threshold(
        &query.hash_bins,
        threshold_votes,
        &query.clusters,
    )?;

    Ok(records
        .into_iter()
        .filter(|record| passes_threshold_votes(&query.hash_bins, &record.hashes, threshold_votes))
        .map(|record| {
            let similarity = metric.score(&query.hash_bins, &record.hashes);
            Candidate {
                sub_fingerprint: record,
                similarity,
            }
        })
        .collect())
}
