//! Per-track evidence gathered during one query.

use std::collections::HashMap;
use std::sync::Arc;

use index::{HashedFingerprint, TrackReference};

use crate::retriever::Candidate;
use crate::types::MatchedPair;

/// Running state for one candidate track.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntryAccumulator {
    similarity_sum: u64,
    best_match: MatchedPair,
    matches: Vec<MatchedPair>,
}

impl ResultEntryAccumulator {
    pub fn new(first: MatchedPair) -> Self {
        Self {
            similarity_sum: u64::from(first.similarity),
            best_match: first.clone(),
            matches: vec![first],
        }
    }

    /// Record one more pair. The best match is replaced only on strictly
    /// greater similarity, so among equals the earliest pair wins.
    pub fn add(&mut self, pair: MatchedPair) {
        self.similarity_sum += u64::from(pair.similarity);
        if pair.similarity > self.best_match.similarity {
            self.best_match = pair.clone();
        }
        self.matches.push(pair);
    }

    pub fn similarity_sum(&self) -> u64 {
        self.similarity_sum
    }

    pub fn best_match(&self) -> &MatchedPair {
        &self.best_match
    }

    /// Matches in the order they were folded in.
    pub fn matches(&self) -> &[MatchedPair] {
        &self.matches
    }

    pub fn into_parts(self) -> (u64, MatchedPair, Vec<MatchedPair>) {
        (self.similarity_sum, self.best_match, self.matches)
    }
}

/// Accumulators keyed by track reference.
pub type Accumulators = HashMap<TrackReference, ResultEntryAccumulator>;

/// Fold every candidate found for `query` into the per-track accumulators,
/// creating an accumulator on the first match for a track.
pub fn fold(
    accumulators: &mut Accumulators,
    query: &Arc<HashedFingerprint>,
    candidates: Vec<Candidate>,
) {
    for candidate in candidates {
        let track = candidate.sub_fingerprint.track_reference;
        let pair = MatchedPair::new(
            Arc::clone(query),
            candidate.sub_fingerprint,
            candidate.similarity,
        );
        match accumulators.get_mut(&track) {
            Some(accumulator) => accumulator.add(pair),
            None => {
                accumulators.insert(track, ResultEntryAccumulator::new(pair));
            }
        }
    }
}
