//! Length of a query, in seconds.

use index::HashedFingerprint;

use crate::types::FingerprintConfiguration;

/// Span between two sample timestamps, widened by one fingerprint window so
/// that a single sample still covers a full window.
#[inline]
pub fn adjust_length_to_seconds(ends_at: f64, starts_at: f64, window: f64) -> f64 {
    ends_at - starts_at + window
}

/// Time covered by the query fingerprints: from the earliest to the latest
/// start, plus one window. Zero for an empty query.
pub fn query_length(fingerprints: &[HashedFingerprint], config: &FingerprintConfiguration) -> f64 {
    let mut starts_at = f64::MAX;
    let mut ends_at = f64::MIN;
    for fingerprint in fingerprints {
        starts_at = starts_at.min(fingerprint.starts_at);
        ends_at = ends_at.max(fingerprint.starts_at);
    }

    if fingerprints.is_empty() || ends_at < starts_at {
        return 0.0;
    }

    adjust_length_to_seconds(ends_at, starts_at, config.fingerprint_length_in_seconds())
}
