//! Ranking of accumulated evidence into result rows.

use std::collections::HashMap;

use index::{TrackData, TrackReference, TrackStore};

use crate::accumulator::{Accumulators, ResultEntryAccumulator};
use crate::confidence::confidence;
use crate::coverage::{coverage, order_matches};
use crate::types::{FingerprintConfiguration, MatchError, MatchedPair, ResultEntry};

/// Rank tracks by cumulative similarity (ties by track reference), keep the
/// first `max_results`, and build one [`ResultEntry`] per kept track.
///
/// Only the kept tracks are looked up in `tracks`. A kept track the store no
/// longer knows is skipped. The output keeps the similarity order; confidence
/// does not reorder it.
pub fn best_candidates(
    accumulators: Accumulators,
    max_results: usize,
    tracks: &dyn TrackStore,
    config: &FingerprintConfiguration,
    query_length: f64,
) -> Result<Vec<ResultEntry>, MatchError> {
    let mut ranked: Vec<(TrackReference, ResultEntryAccumulator)> =
        accumulators.into_iter().collect();
    ranked.sort_by(|(left_ref, left), (right_ref, right)| {
        right
            .similarity_sum()
            .cmp(&left.similarity_sum())
            .then_with(|| left_ref.cmp(right_ref))
    });
    ranked.truncate(max_results);
    if ranked.is_empty() {
        return Ok(Vec::new());
    }

    let references: Vec<TrackReference> = ranked.iter().map(|(reference, _)| *reference).collect();
    let mut metadata: HashMap<TrackReference, TrackData> = tracks
        .read_tracks_by_references(&references)?
        .into_iter()
        .map(|track| (track.track_reference, track))
        .collect();

    let mut entries = Vec::with_capacity(ranked.len());
    for (reference, accumulator) in ranked {
        let Some(track) = metadata.remove(&reference) else {
            tracing::warn!(track = %reference, "no metadata for candidate track, skipping");
            continue;
        };
        entries.push(result_entry(track, accumulator, config, query_length));
    }
    Ok(entries)
}

fn result_entry(
    track: TrackData,
    accumulator: ResultEntryAccumulator,
    config: &FingerprintConfiguration,
    query_length: f64,
) -> ResultEntry {
    let (similarity_sum, best_match, mut matches) = accumulator.into_parts();
    order_matches(&mut matches);
    let coverage = coverage(&matches, query_length, config);
    let confidence = confidence(
        coverage.source_match_starts_at,
        coverage.source_match_length,
        query_length,
        coverage.origin_match_starts_at,
        track.length,
    );

    tracing::debug!(
        track = %track.track_reference,
        similarity_sum,
        matches = matches.len(),
        source_match_length = coverage.source_match_length,
        confidence,
        "ranked candidate"
    );

    ResultEntry {
        track_starts_at: track_starts_at(&best_match),
        track,
        source_match_starts_at: coverage.source_match_starts_at,
        source_match_length: coverage.source_match_length,
        origin_match_starts_at: coverage.origin_match_starts_at,
        confidence,
        similarity_sum,
        query_length,
        best_match,
    }
}

/// Where, on the track timeline, the query is estimated to begin.
fn track_starts_at(best_match: &MatchedPair) -> f64 {
    best_match.hashed_fingerprint.starts_at - best_match.sub_fingerprint.sequence_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::fold;
    use crate::retriever::Candidate;
    use index::{
        HashedFingerprint, IndexError, InMemoryIndex, SubFingerprintData, SubFingerprintReference,
    };
    use std::sync::{Arc, Mutex};

    /// Track store that records every batch it was asked for.
    struct RecordingTracks {
        inner: InMemoryIndex,
        requested: Mutex<Vec<Vec<TrackReference>>>,
    }

    impl RecordingTracks {
        fn with_tracks(references: &[u64]) -> Self {
            let inner = InMemoryIndex::new();
            for &r in references {
                inner
                    .insert_track(TrackData::new(TrackReference(r), "artist", format!("t{r}"), 120.0))
                    .unwrap();
            }
            Self {
                inner,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl TrackStore for RecordingTracks {
        fn read_tracks_by_references(
            &self,
            references: &[TrackReference],
        ) -> Result<Vec<TrackData>, IndexError> {
            self.requested.lock().unwrap().push(references.to_vec());
            self.inner.read_tracks_by_references(references)
        }

        fn read_track_by_reference(
            &self,
            reference: TrackReference,
        ) -> Result<Option<TrackData>, IndexError> {
            self.inner.read_track_by_reference(reference)
        }
    }

    fn evidence(track: u64, query_at: f64, track_at: f64, similarity: u32) -> (Arc<HashedFingerprint>, Candidate) {
        let query = Arc::new(HashedFingerprint::new(vec![], query_at as u32, query_at));
        let candidate = Candidate {
            sub_fingerprint: SubFingerprintData {
                hashes: vec![],
                sequence_number: track_at as u32,
                sequence_at: track_at,
                track_reference: TrackReference(track),
                sub_fingerprint_reference: SubFingerprintReference(track * 1000 + track_at as u64),
                clusters: vec![],
            },
            similarity,
        };
        (query, candidate)
    }

    fn accumulate(rows: &[(u64, f64, f64, u32)]) -> Accumulators {
        let mut accumulators = Accumulators::new();
        for &(track, query_at, track_at, similarity) in rows {
            let (query, candidate) = evidence(track, query_at, track_at, similarity);
            fold(&mut accumulators, &query, vec![candidate]);
        }
        accumulators
    }

    #[test]
    fn ranks_by_similarity_sum_and_truncates() {
        let accumulators = accumulate(&[
            (1, 0.0, 10.0, 3),
            (2, 0.0, 20.0, 9),
            (3, 0.0, 30.0, 5),
            (3, 1.0, 31.0, 5),
        ]);
        let tracks = RecordingTracks::with_tracks(&[1, 2, 3]);
        let cfg = FingerprintConfiguration::default();

        let entries = best_candidates(accumulators, 2, &tracks, &cfg, 5.0).unwrap();
        let order: Vec<u64> = entries.iter().map(|e| e.track.track_reference.0).collect();
        assert_eq!(order, vec![3, 2]);
        assert_eq!(entries[0].similarity_sum, 10);

        // only the kept tracks were looked up, in one batch
        let requested = tracks.requested.lock().unwrap();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0], vec![TrackReference(3), TrackReference(2)]);
    }

    #[test]
    fn equal_sums_are_ordered_by_track_reference() {
        let accumulators = accumulate(&[(7, 0.0, 1.0, 4), (5, 0.0, 1.0, 4), (6, 0.0, 1.0, 4)]);
        let tracks = RecordingTracks::with_tracks(&[5, 6, 7]);
        let entries =
            best_candidates(accumulators, 10, &tracks, &FingerprintConfiguration::default(), 2.0)
                .unwrap();
        let order: Vec<u64> = entries.iter().map(|e| e.track.track_reference.0).collect();
        assert_eq!(order, vec![5, 6, 7]);
    }

    #[test]
    fn no_accumulators_yield_no_rows_and_no_lookup() {
        let tracks = RecordingTracks::with_tracks(&[1]);
        let entries = best_candidates(
            Accumulators::new(),
            5,
            &tracks,
            &FingerprintConfiguration::default(),
            0.0,
        )
        .unwrap();
        assert!(entries.is_empty());
        assert!(tracks.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn track_start_is_projected_from_best_match() {
        let accumulators = accumulate(&[(1, 2.0, 40.0, 3), (1, 3.0, 41.0, 8)]);
        let tracks = RecordingTracks::with_tracks(&[1]);
        let entries =
            best_candidates(accumulators, 1, &tracks, &FingerprintConfiguration::default(), 5.0)
                .unwrap();
        assert_eq!(entries[0].track_starts_at, 3.0 - 41.0);
        assert_eq!(entries[0].best_match.similarity, 8);
        assert_eq!(entries[0].origin_match_starts_at, 40.0);
        assert_eq!(entries[0].source_match_starts_at, 2.0);
        assert!(entries[0].confidence > 0.0 && entries[0].confidence <= 1.0);
    }

    #[test]
    fn tracks_missing_from_the_store_are_skipped() {
        let accumulators = accumulate(&[(1, 0.0, 1.0, 4), (2, 0.0, 1.0, 9)]);
        let tracks = RecordingTracks::with_tracks(&[1]);
        let entries =
            best_candidates(accumulators, 5, &tracks, &FingerprintConfiguration::default(), 2.0)
                .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].track.track_reference, TrackReference(1));
    }
}
