use crate::{
    IndexError, SubFingerprintData, SubFingerprintReference, TrackData, TrackReference,
};
use hashbrown::{HashMap, HashSet};
use std::sync::RwLock;

/// Hash-bucket lookup over stored sub-fingerprints.
///
/// Implementations are shared read-only across concurrent queries.
pub trait SubFingerprintStore: Send + Sync {
    /// Return every stored record whose hash bins agree with `hash_bins` on at
    /// least `threshold_votes` table positions.
    ///
    /// `clusters` narrows the search to records tagged with at least one of the
    /// given clusters; an empty slice searches every partition.
    fn read_sub_fingerprints_by_hash_buckets_having_threshold(
        &self,
        hash_bins: &[i32],
        threshold_votes: usize,
        clusters: &[String],
    ) -> Result<Vec<SubFingerprintData>, IndexError>;
}

/// Read-only track metadata lookup.
pub trait TrackStore: Send + Sync {
    /// Batch lookup. References that are unknown to the store are omitted
    /// from the result rather than reported as errors.
    fn read_tracks_by_references(
        &self,
        references: &[TrackReference],
    ) -> Result<Vec<TrackData>, IndexError>;

    /// Single lookup.
    fn read_track_by_reference(
        &self,
        reference: TrackReference,
    ) -> Result<Option<TrackData>, IndexError>;
}

/// Input for [`InMemoryIndex::insert_sub_fingerprint`]. The index assigns the
/// record reference.
#[derive(Debug, Clone)]
pub struct NewSubFingerprint {
    pub track_reference: TrackReference,
    pub hashes: Vec<i32>,
    pub sequence_number: u32,
    pub sequence_at: f64,
    pub clusters: Vec<String>,
}

#[derive(Default)]
struct Tables {
    tracks: HashMap<TrackReference, TrackData>,
    records: Vec<SubFingerprintData>,
    /// One map per hash table: bin code -> positions in `records`.
    buckets: Vec<HashMap<i32, Vec<usize>>>,
    references: HashSet<SubFingerprintReference>,
    next_reference: u64,
}

impl Tables {
    /// Validate and store one record. Nothing is modified when validation fails.
    fn insert_record(&mut self, record: SubFingerprintData) -> Result<(), IndexError> {
        if !record.sequence_at.is_finite() || record.sequence_at < 0.0 {
            return Err(IndexError::InvalidRecord(format!(
                "sequence_at must be a non-negative number, got {}",
                record.sequence_at
            )));
        }
        let reference = record.sub_fingerprint_reference;
        if self.references.contains(&reference) {
            return Err(IndexError::InvalidRecord(format!(
                "duplicate sub-fingerprint reference {reference}"
            )));
        }
        let next_reference = reference.0.checked_add(1).ok_or_else(|| {
            IndexError::InvalidRecord(format!("sub-fingerprint reference {reference} out of range"))
        })?;
        if !self.buckets.is_empty() && record.hashes.len() != self.buckets.len() {
            return Err(IndexError::InvalidRecord(format!(
                "expected {} hash bins, got {}",
                self.buckets.len(),
                record.hashes.len()
            )));
        }
        if self.buckets.is_empty() {
            if record.hashes.is_empty() {
                return Err(IndexError::InvalidRecord(
                    "sub-fingerprint must carry at least one hash bin".into(),
                ));
            }
            self.buckets = vec![HashMap::new(); record.hashes.len()];
        }

        let position = self.records.len();
        for (table, &bin) in record.hashes.iter().enumerate() {
            self.buckets[table].entry(bin).or_default().push(position);
        }
        self.next_reference = self.next_reference.max(next_reference);
        self.references.insert(reference);
        self.records.push(record);
        Ok(())
    }
}

/// An in-memory index using a `RwLock` around per-table hash buckets.
pub struct InMemoryIndex {
    tables: RwLock<Tables>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Insert or replace track metadata.
    pub fn insert_track(&self, track: TrackData) -> Result<(), IndexError> {
        self.tables
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .tracks
            .insert(track.track_reference, track);
        Ok(())
    }

    /// Insert a sub-fingerprint for an already registered track.
    ///
    /// The first inserted record fixes the number of hash tables; later records
    /// with a different arity are rejected.
    pub fn insert_sub_fingerprint(
        &self,
        new: NewSubFingerprint,
    ) -> Result<SubFingerprintReference, IndexError> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        if !guard.tracks.contains_key(&new.track_reference) {
            return Err(IndexError::UnknownTrack(new.track_reference));
        }
        let reference = SubFingerprintReference(guard.next_reference);
        guard.insert_record(SubFingerprintData {
            hashes: new.hashes,
            sequence_number: new.sequence_number,
            sequence_at: new.sequence_at,
            track_reference: new.track_reference,
            sub_fingerprint_reference: reference,
            clusters: new.clusters,
        })?;
        Ok(reference)
    }

    pub fn track_count(&self) -> usize {
        self.tables
            .read()
            .map(|guard| guard.tracks.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().tracks.len())
    }

    pub fn sub_fingerprint_count(&self) -> usize {
        self.tables
            .read()
            .map(|guard| guard.records.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().records.len())
    }

    /// Number of hash tables fixed by the first inserted record, if any.
    pub fn hash_tables(&self) -> Option<usize> {
        let guard = self
            .tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (!guard.buckets.is_empty()).then_some(guard.buckets.len())
    }

    /// Copy out tracks (ordered by reference) and records (insertion order).
    pub(crate) fn export(&self) -> Result<(Vec<TrackData>, Vec<SubFingerprintData>), IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        let mut tracks: Vec<TrackData> = guard.tracks.values().cloned().collect();
        tracks.sort_by_key(|t| t.track_reference);
        Ok((tracks, guard.records.clone()))
    }

    /// Rebuild an index from already referenced records.
    pub(crate) fn rebuild(
        tracks: Vec<TrackData>,
        records: Vec<SubFingerprintData>,
    ) -> Result<Self, IndexError> {
        let mut tables = Tables::default();
        for track in tracks {
            tables.tracks.insert(track.track_reference, track);
        }
        for record in records {
            if !tables.tracks.contains_key(&record.track_reference) {
                return Err(IndexError::UnknownTrack(record.track_reference));
            }
            tables.insert_record(record)?;
        }
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SubFingerprintStore for InMemoryIndex {
    fn read_sub_fingerprints_by_hash_buckets_having_threshold(
        &self,
        hash_bins: &[i32],
        threshold_votes: usize,
        clusters: &[String],
    ) -> Result<Vec<SubFingerprintData>, IndexError> {
        // A read lock is held for the duration of the lookup.
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;

        let mut votes: HashMap<usize, usize> = HashMap::new();
        for (table, bin) in hash_bins.iter().enumerate().take(guard.buckets.len()) {
            if let Some(positions) = guard.buckets[table].get(bin) {
                for &position in positions {
                    *votes.entry(position).or_insert(0) += 1;
                }
            }
        }

        let mut admitted: Vec<usize> = votes
            .into_iter()
            .filter(|&(_, count)| count >= threshold_votes.max(1))
            .map(|(position, _)| position)
            .collect();
        admitted.sort_unstable();

        let results: Vec<SubFingerprintData> = admitted
            .into_iter()
            .map(|position| &guard.records[position])
            .filter(|record| {
                clusters.is_empty() || record.clusters.iter().any(|c| clusters.contains(c))
            })
            .cloned()
            .collect();

        tracing::trace!(
            candidates = results.len(),
            threshold_votes,
            "hash bucket lookup"
        );
        Ok(results)
    }
}

impl TrackStore for InMemoryIndex {
    fn read_tracks_by_references(
        &self,
        references: &[TrackReference],
    ) -> Result<Vec<TrackData>, IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(references
            .iter()
            .filter_map(|reference| guard.tracks.get(reference).cloned())
            .collect())
    }

    fn read_track_by_reference(
        &self,
        reference: TrackReference,
    ) -> Result<Option<TrackData>, IndexError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.tracks.get(&reference).cloned())
    }
}
