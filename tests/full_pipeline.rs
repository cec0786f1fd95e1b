use std::fs;
use std::sync::Arc;

use soundmatch::{
    import_dump, open_service, CompressionConfig, FingerprintConfiguration, HashedFingerprint,
    InMemoryIndex, MatchError, NewSubFingerprint, QueryDump, QueryFingerprintService, TrackData,
    TrackReference,
};

const ARITY: usize = 6;

fn bins(seed: i32) -> Vec<i32> {
    (0..ARITY as i32).map(|table| seed * 16 + table).collect()
}

fn config() -> FingerprintConfiguration {
    FingerprintConfiguration {
        hash_tables: ARITY,
        threshold_votes: 3,
        ..Default::default()
    }
}

/// A track whose records sit at 0s, 5s, 9s and 10s, and a query that hits them
/// at 5s, 9s, 11s and 14s of its own timeline.
fn sparse_alignment() -> Result<(InMemoryIndex, Vec<HashedFingerprint>), MatchError> {
    let index = InMemoryIndex::new();
    index.insert_track(TrackData::new(TrackReference(1), "Artist", "Sparse", 30.0))?;
    index.insert_track(TrackData::new(TrackReference(2), "Artist", "Unrelated", 30.0))?;

    let track_offsets = [0.0, 5.0, 9.0, 10.0];
    for (n, &at) in track_offsets.iter().enumerate() {
        index.insert_sub_fingerprint(NewSubFingerprint {
            track_reference: TrackReference(1),
            hashes: bins(n as i32 + 1),
            sequence_number: n as u32,
            sequence_at: at,
            clusters: vec![],
        })?;
    }
    for n in 0..10u32 {
        index.insert_sub_fingerprint(NewSubFingerprint {
            track_reference: TrackReference(2),
            hashes: bins(1_000 + n as i32),
            sequence_number: n,
            sequence_at: f64::from(n),
            clusters: vec![],
        })?;
    }

    let query_offsets = [5.0, 9.0, 11.0, 14.0];
    let query = query_offsets
        .iter()
        .enumerate()
        .map(|(n, &at)| HashedFingerprint::new(bins(n as i32 + 1), n as u32, at))
        .collect();
    Ok((index, query))
}

#[test]
fn sparse_alignment_measures_covered_length() -> Result<(), MatchError> {
    let (index, query) = sparse_alignment()?;
    let service = QueryFingerprintService::with_index(Arc::new(index));

    let result = service.query(&query, &config())?;
    assert_eq!(result.result_entries.len(), 1);

    let entry = &result.result_entries[0];
    assert_eq!(entry.track.track_reference, TrackReference(1));
    assert_eq!(entry.track.title, "Sparse");
    assert!((entry.source_match_length - 5.4586).abs() < 1e-4);
    assert_eq!(entry.source_match_starts_at, 5.0);
    assert_eq!(entry.origin_match_starts_at, 0.0);
    assert_eq!(entry.track_starts_at, 5.0);
    assert_eq!(entry.similarity_sum, 4 * ARITY as u64);
    assert!(entry.confidence > 0.0 && entry.confidence < 1.0);
    Ok(())
}

#[test]
fn json_dump_to_snapshot_to_query() {
    let (index, query) = sparse_alignment().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("index.json");
    let snapshot = dir.path().join("index.snap");
    let query_path = dir.path().join("query.json");

    fs::write(&dump, index.snapshot().unwrap().to_json().unwrap()).unwrap();
    fs::write(
        &query_path,
        serde_json::to_string(&QueryDump {
            fingerprints: query.clone(),
        })
        .unwrap(),
    )
    .unwrap();

    let compression = CompressionConfig::default();
    let summary = import_dump(&dump, &snapshot, &compression).unwrap();
    assert_eq!(summary.tracks, 2);
    assert_eq!(summary.sub_fingerprints, 14);

    let service = open_service(&snapshot, &compression).unwrap();
    let loaded = QueryDump::from_file(&query_path).unwrap();
    assert_eq!(loaded.fingerprints, query);

    let from_snapshot = service.query(&loaded.fingerprints, &config()).unwrap();
    let direct = QueryFingerprintService::with_index(Arc::new(index))
        .query(&query, &config())
        .unwrap();
    assert_eq!(
        serde_json::to_value(&from_snapshot).unwrap(),
        serde_json::to_value(&direct).unwrap()
    );
}

#[test]
fn cluster_tags_narrow_the_search() -> Result<(), MatchError> {
    let index = InMemoryIndex::new();
    for track in 1..=2u64 {
        index.insert_track(TrackData::new(TrackReference(track), "Artist", "Take", 60.0))?;
        index.insert_sub_fingerprint(NewSubFingerprint {
            track_reference: TrackReference(track),
            hashes: bins(7),
            sequence_number: 0,
            sequence_at: 0.0,
            clusters: vec![if track == 1 { "studio" } else { "live" }.to_string()],
        })?;
    }
    let service = QueryFingerprintService::with_index(Arc::new(index));

    let everywhere = service.query(&[HashedFingerprint::new(bins(7), 0, 0.0)], &config())?;
    assert_eq!(everywhere.result_entries.len(), 2);

    let live_only = service.query(
        &[HashedFingerprint::new(bins(7), 0, 0.0).with_clusters(vec!["live".into()])],
        &config(),
    )?;
    assert_eq!(live_only.result_entries.len(), 1);
    assert_eq!(
        live_only.result_entries[0].track.track_reference,
        TrackReference(2)
    );
    Ok(())
}
