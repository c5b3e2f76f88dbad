//! In-memory stand-ins for the external programs.

#![allow(dead_code)]

use rsd_rs::{
    Distance, DistanceEstimator, FastaRecord, Genome, Hit, HitMap, Result, SavedHits,
    SequenceAligner,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Aligns by padding every sequence with trailing gaps to the longest one.
pub struct PaddingAligner;

impl SequenceAligner for PaddingAligner {
    fn align(&self, records: &[(&str, &str)], _scratch: &Path) -> Result<Vec<FastaRecord>> {
        let width = records.iter().map(|(_, seq)| seq.len()).max().unwrap_or(0);
        Ok(records
            .iter()
            .map(|(id, seq)| FastaRecord::new(*id, format!("{seq:-<width$}")))
            .collect())
    }
}

/// Fixed alignments for ordered id pairs; other pairs are padded.
#[derive(Default)]
pub struct TableAligner {
    alignments: HashMap<(String, String), (String, String)>,
}

impl TableAligner {
    /// Entries are `(first id, second id, first aligned, second aligned)`.
    pub fn new(entries: &[(&str, &str, &str, &str)]) -> Self {
        let mut aligner = Self::default();
        for (first, second, first_aln, second_aln) in entries {
            aligner.alignments.insert(
                (first.to_string(), second.to_string()),
                (first_aln.to_string(), second_aln.to_string()),
            );
        }
        aligner
    }
}

impl SequenceAligner for TableAligner {
    fn align(&self, records: &[(&str, &str)], scratch: &Path) -> Result<Vec<FastaRecord>> {
        if let [(first, _), (second, _)] = records {
            let key = (first.to_string(), second.to_string());
            if let Some((first_aln, second_aln)) = self.alignments.get(&key) {
                return Ok(vec![
                    FastaRecord::new(*first, first_aln.as_str()),
                    FastaRecord::new(*second, second_aln.as_str()),
                ]);
            }
        }
        PaddingAligner.align(records, scratch)
    }
}

/// Never produces an alignment.
pub struct EmptyAligner {
    pub calls: Arc<AtomicUsize>,
}

impl EmptyAligner {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SequenceAligner for EmptyAligner {
    fn align(&self, _records: &[(&str, &str)], _scratch: &Path) -> Result<Vec<FastaRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Distances looked up by unordered id pair; unknown pairs are unavailable.
///
/// Every request is logged as `(first id, second id)` and every prepared
/// scratch directory counted; both stay readable after the table is boxed.
#[derive(Default)]
pub struct DistanceTable {
    distances: HashMap<(String, String), f64>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
    prepared: Arc<AtomicUsize>,
}

impl DistanceTable {
    pub fn new(entries: &[(&str, &str, f64)]) -> Self {
        let mut table = Self::default();
        for (a, b, distance) in entries {
            table
                .distances
                .insert(Self::key(a, b), *distance);
        }
        table
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.requests)
    }

    pub fn prepared(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.prepared)
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }
}

impl DistanceEstimator for DistanceTable {
    fn prepare(&self, _scratch: &Path) -> Result<()> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn estimate(
        &self,
        first: &FastaRecord,
        second: &FastaRecord,
        _scratch: &Path,
    ) -> Result<Distance> {
        self.requests
            .lock()
            .expect("request log")
            .push((first.id.clone(), second.id.clone()));
        Ok(self
            .distances
            .get(&Self::key(&first.id, &second.id))
            .map_or(Distance::Unavailable, |d| Distance::Resolved(*d)))
    }
}

/// Saved hits from `(query, [(hit, evalue)])` lists.
pub fn hits(entries: &[(&str, Vec<(&str, f64)>)]) -> SavedHits {
    let mut map = HitMap::new();
    for (query, query_hits) in entries {
        map.insert(
            query.to_string(),
            query_hits
                .iter()
                .map(|(hit, evalue)| Hit::new(*hit, *evalue))
                .collect(),
        );
    }
    SavedHits::new(map)
}

/// A genome from `(id, sequence)` pairs.
pub fn genome_of(name: &str, records: &[(&str, &str)]) -> Genome {
    Genome::from_records(
        name,
        records.iter().map(|(id, seq)| FastaRecord::new(*id, *seq)),
    )
    .expect("distinct ids")
}

/// A genome whose sequences are all the same ungapped protein.
pub fn genome(name: &str, ids: &[&str]) -> Genome {
    Genome::from_records(
        name,
        ids.iter()
            .map(|id| FastaRecord::new(*id, "MKTAYIAKQRQISFVKSHFSRQ")),
    )
    .expect("distinct ids")
}
