//! Match confidence in `[0, 1]`.

/// Ratio of the covered length to the part of the track the query could
/// overlap at the detected alignment.
///
/// The query is projected onto the track timeline at
/// `origin_match_starts_at - source_match_starts_at`; the overlap of that
/// projection with `[0, track_length]` is the visible segment. A covered length
/// at least as long as the query scores `1.0`. Tracks without a known length
/// are measured against the whole query.
pub fn confidence(
    source_match_starts_at: f64,
    source_match_length: f64,
    query_length: f64,
    origin_match_starts_at: f64,
    track_length: f64,
) -> f64 {
    let positive = |value: f64| value.is_finite() && value > 0.0;
    if !positive(source_match_length) || !positive(query_length) {
        return 0.0;
    }
    if source_match_length >= query_length {
        return 1.0;
    }

    let projected_start = origin_match_starts_at - source_match_starts_at;
    let visible = if track_length.is_finite() && track_length > 0.0 {
        let overlap =
            (projected_start + query_length).min(track_length) - projected_start.max(0.0);
        if overlap > 0.0 {
            overlap
        } else {
            query_length
        }
    } else {
        query_length
    };

    (source_match_length / visible).clamp(0.0, 1.0)
}
