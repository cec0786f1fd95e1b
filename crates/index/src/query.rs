use serde::{Deserialize, Serialize};

/// Similarity measure applied to a candidate admitted by the vote filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Number of hash-bin positions with equal codes.
    #[default]
    MatchingBins,
    /// Bit-level inverse Hamming distance over the hash-bin codes:
    /// `32 * n - popcount(a ^ b)` summed over the compared positions.
    InverseHamming,
}

impl SimilarityMetric {
    /// Score `candidate` against `query`. Only the common prefix of the two
    /// vectors is compared.
    pub fn score(&self, query: &[i32], candidate: &[i32]) -> u32 {
        match self {
            SimilarityMetric::MatchingBins => count_votes(query, candidate) as u32,
            SimilarityMetric::InverseHamming => query
                .iter()
                .zip(candidate.iter())
                .map(|(&q, &c)| 32 - (q ^ c).count_ones())
                .sum(),
        }
    }
}

/// Count the positions at which `query` and `candidate` carry the same bin.
#[inline]
pub fn count_votes(query: &[i32], candidate: &[i32]) -> usize {
    query
        .iter()
        .zip(candidate.iter())
        .filter(|(q, c)| q == c)
        .count()
}

/// Whether at least `threshold_votes` positions agree. Stops scanning as soon
/// as the threshold is reached.
pub fn passes_threshold_votes(query: &[i32], candidate: &[i32], threshold_votes: usize) -> bool {
    if threshold_votes == 0 {
        return true;
    }
    let mut votes = 0usize;
    for (q, c) in query.iter().zip(candidate.iter()) {
        if q == c {
            votes += 1;
            if votes >= threshold_votes {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn votes_count_equal_positions_only() {
        assert_eq!(count_votes(&[1, 2, 3, 4], &[1, 0, 3, 0]), 2);
        assert_eq!(count_votes(&[1, 2, 3], &[1, 2]), 2);
        assert_eq!(count_votes(&[], &[1]), 0);
    }

    #[test]
    fn threshold_votes_short_circuits() {
        assert!(passes_threshold_votes(&[5, 6, 7], &[5, 6, 0], 2));
        assert!(!passes_threshold_votes(&[5, 6, 7], &[5, 0, 0], 2));
        assert!(passes_threshold_votes(&[5], &[9], 0));
    }

    #[test]
    fn matching_bins_metric_equals_vote_count() {
        let metric = SimilarityMetric::MatchingBins;
        assert_eq!(metric.score(&[1, 2, 3, 4], &[1, 2, 0, 4]), 3);
    }

    #[test]
    fn inverse_hamming_rewards_close_bit_patterns() {
        let metric = SimilarityMetric::InverseHamming;
        assert_eq!(metric.score(&[0b1010, 7], &[0b1010, 7]), 64);
        // one flipped bit in the first bin, two in the second
        assert_eq!(metric.score(&[0b1010, 0b0111], &[0b1011, 0b0001]), 61);
        assert!(metric.score(&[0, 0], &[-1, -1]) < metric.score(&[0, 0], &[1, 1]));
    }
}
