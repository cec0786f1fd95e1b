//! Common utilities for soundmatch benchmarks
//!
//! Synthetic catalogues and queries with a known source track, so benchmark
//! runs exercise the full retrieve/align/rank path.

#![allow(dead_code)]

use soundmatch::{
    FingerprintConfiguration, HashedFingerprint, InMemoryIndex, NewSubFingerprint, TrackData,
    TrackReference,
};

pub const HASH_TABLES: usize = 25;
pub const STRIDE_SECONDS: f64 = 0.2;

/// Deterministic hash bins for a (track, position) pair. Neighbouring
/// positions share no bins.
pub fn hash_bins(track: u64, position: u32) -> Vec<i32> {
    (0..HASH_TABLES as u64)
        .map(|table| {
            let mixed = (track.wrapping_mul(0x9E37_79B9_7F4A_7C15))
                ^ (u64::from(position) << 8)
                ^ table;
            (mixed as i32) & 0x7FFF_FFFF
        })
        .collect()
}

/// Catalogue of `tracks` tracks with `positions` records each.
pub fn build_catalogue(tracks: u64, positions: u32) -> InMemoryIndex {
    let index = InMemoryIndex::new();
    for track in 1..=tracks {
        let length = f64::from(positions) * STRIDE_SECONDS;
        index
            .insert_track(TrackData::new(
                TrackReference(track),
                "Bench Artist",
                format!("Bench Track {track}"),
                length,
            ))
            .expect("track insert should succeed");
        for position in 0..positions {
            index
                .insert_sub_fingerprint(NewSubFingerprint {
                    track_reference: TrackReference(track),
                    hashes: hash_bins(track, position),
                    sequence_number: position,
                    sequence_at: f64::from(position) * STRIDE_SECONDS,
                    clusters: vec![],
                })
                .expect("sub-fingerprint insert should succeed");
        }
    }
    index
}

/// `len` query fingerprints cut from `track` starting at `from`, with the
/// first `noisy_tables` bins of every fingerprint replaced.
pub fn query_from(track: u64, from: u32, len: u32, noisy_tables: usize) -> Vec<HashedFingerprint> {
    (0..len)
        .map(|offset| {
            let mut bins = hash_bins(track, from + offset);
            for bin in bins.iter_mut().take(noisy_tables) {
                *bin = -1;
            }
            HashedFingerprint::new(bins, offset, f64::from(offset) * STRIDE_SECONDS)
        })
        .collect()
}

pub fn bench_config() -> FingerprintConfiguration {
    FingerprintConfiguration {
        hash_tables: HASH_TABLES,
        threshold_votes: 5,
        ..Default::default()
    }
}
