//! Longest aligned run with bounded gaps.
//!
//! The matches of one track are scanned in alignment order (track offset, then
//! query offset). Consecutive matches whose gaps on both timelines stay within
//! the configured tolerance form a run; the best run becomes the track's
//! [`Coverage`].

use std::cmp::Ordering;

use crate::span::adjust_length_to_seconds;
use crate::types::{Coverage, FingerprintConfiguration, MatchedPair};

/// Total order used for alignment: track offset, then query offset. The
/// remaining keys only make the order independent of insertion order.
pub fn alignment_order(a: &MatchedPair, b: &MatchedPair) -> Ordering {
    a.sub_fingerprint
        .sequence_at
        .total_cmp(&b.sub_fingerprint.sequence_at)
        .then_with(|| {
            a.hashed_fingerprint
                .starts_at
                .total_cmp(&b.hashed_fingerprint.starts_at)
        })
        .then_with(|| {
            a.hashed_fingerprint
                .sequence_number
                .cmp(&b.hashed_fingerprint.sequence_number)
        })
        .then_with(|| {
            a.sub_fingerprint
                .sequence_number
                .cmp(&b.sub_fingerprint.sequence_number)
        })
        .then_with(|| {
            a.sub_fingerprint
                .sub_fingerprint_reference
                .cmp(&b.sub_fingerprint.sub_fingerprint_reference)
        })
        .then_with(|| b.similarity.cmp(&a.similarity))
}

/// Sort matches into alignment order in place.
pub fn order_matches(matches: &mut [MatchedPair]) {
    matches.sort_by(alignment_order);
}

#[derive(Debug, Clone, Copy)]
struct Run {
    first: usize,
    last: usize,
    matches: usize,
    similarity: u64,
    /// Seconds of track time inside the run not covered by any window.
    uncovered: f64,
}

impl Run {
    fn start(index: usize, pair: &MatchedPair) -> Self {
        Self {
            first: index,
            last: index,
            matches: 1,
            similarity: u64::from(pair.similarity),
            uncovered: 0.0,
        }
    }

    fn extend(&mut self, index: usize, pair: &MatchedPair, previous: &MatchedPair, window: f64) {
        let gap = pair.sub_fingerprint.sequence_at - previous.sub_fingerprint.sequence_at;
        if gap > window {
            self.uncovered +=
                pair.sub_fingerprint.sequence_at - (previous.sub_fingerprint.sequence_at + window);
        }
        self.last = index;
        self.matches += 1;
        self.similarity += u64::from(pair.similarity);
    }

    fn query_span(&self, ordered: &[MatchedPair]) -> f64 {
        ordered[self.last].hashed_fingerprint.starts_at
            - ordered[self.first].hashed_fingerprint.starts_at
    }

    /// Larger query span, then more matches, then larger similarity sum.
    /// Full ties keep the incumbent, i.e. the leftmost run.
    fn is_better_than(&self, other: &Run, ordered: &[MatchedPair]) -> bool {
        let span = self.query_span(ordered);
        let other_span = other.query_span(ordered);
        if span != other_span {
            return span > other_span;
        }
        if self.matches != other.matches {
            return self.matches > other.matches;
        }
        self.similarity > other.similarity
    }

    fn covered_length(&self, ordered: &[MatchedPair], window: f64) -> f64 {
        adjust_length_to_seconds(
            ordered[self.last].sub_fingerprint.sequence_at,
            ordered[self.first].sub_fingerprint.sequence_at,
            window,
        ) - self.uncovered
    }
}

/// Best contiguous aligned segment for one track.
///
/// `ordered` must be in [`alignment_order`]. The covered length is measured on
/// the track timeline: the run's span plus one window, minus every stretch
/// between consecutive matches that lies beyond the preceding match's window.
/// It never exceeds `query_length` plus one window.
pub fn coverage(
    ordered: &[MatchedPair],
    query_length: f64,
    config: &FingerprintConfiguration,
) -> Coverage {
    let Some(head) = ordered.first() else {
        return Coverage::default();
    };

    let window = config.fingerprint_length_in_seconds();
    let tolerance = config.gap_tolerance(query_length);

    let mut best = Run::start(0, head);
    let mut current = best;
    for (index, pair) in ordered.iter().enumerate().skip(1) {
        let previous = &ordered[current.last];
        let track_gap = pair.sub_fingerprint.sequence_at - previous.sub_fingerprint.sequence_at;
        let query_gap = pair.hashed_fingerprint.starts_at - previous.hashed_fingerprint.starts_at;

        if tolerance.admits(track_gap) && tolerance.admits(query_gap) {
            current.extend(index, pair, previous, window);
        } else {
            if current.is_better_than(&best, ordered) {
                best = current;
            }
            current = Run::start(index, pair);
        }
    }
    if current.is_better_than(&best, ordered) {
        best = current;
    }

    let first = &ordered[best.first];
    let source_match_length = best
        .covered_length(ordered, window)
        .min(query_length.max(0.0) + window);

    Coverage {
        source_match_starts_at: first.hashed_fingerprint.starts_at,
        source_match_length,
        origin_match_starts_at: first.sub_fingerprint.sequence_at,
    }
}
