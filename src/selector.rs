//! Candidate hits and per-threshold minimum-distance selection.

use crate::alignment::{AlignedPair, DivergencePredicate};
use crate::ortholog::{loosest, Threshold};
use indexmap::IndexMap;

/// A forward or reverse hit after alignment and trimming.
#[derive(Debug, Clone)]
pub struct AlignedHit<'g> {
    pub hit_id: String,
    pub hit_seq: &'g str,
    pub hit_evalue: f64,
    pub aligned_query: String,
    pub aligned_hit: String,
    pub predicate: DivergencePredicate,
}

impl<'g> AlignedHit<'g> {
    pub fn new(hit_id: impl Into<String>, hit_seq: &'g str, hit_evalue: f64, pair: AlignedPair) -> Self {
        Self {
            hit_id: hit_id.into(),
            hit_seq,
            hit_evalue,
            aligned_query: pair.first.seq,
            aligned_hit: pair.second.seq,
            predicate: pair.predicate,
        }
    }

    /// Attaches the estimated distance, making the hit selectable.
    pub fn resolved(self, distance: f64) -> CandidateHit<'g> {
        CandidateHit {
            hit_id: self.hit_id,
            hit_seq: self.hit_seq,
            hit_evalue: self.hit_evalue,
            predicate: self.predicate,
            distance,
        }
    }
}

/// An aligned hit with a resolved distance.
#[derive(Debug, Clone)]
pub struct CandidateHit<'g> {
    pub hit_id: String,
    pub hit_seq: &'g str,
    pub hit_evalue: f64,
    pub predicate: DivergencePredicate,
    pub distance: f64,
}

impl CandidateHit<'_> {
    /// True if the candidate passes the threshold's e-value (strictly below)
    /// and divergence filters.
    pub fn passes(&self, threshold: &Threshold) -> bool {
        self.hit_evalue < threshold.evalue && !self.predicate.is_too_diverged(threshold.divergence)
    }
}

/// All candidates passing `threshold` whose distance equals the minimum
/// among those passing, in candidate order.
pub fn minimum_for_threshold<'a, 'g>(
    candidates: &'a [CandidateHit<'g>],
    threshold: &Threshold,
) -> Vec<&'a CandidateHit<'g>> {
    let passing: Vec<&CandidateHit> = candidates.iter().filter(|c| c.passes(threshold)).collect();

    let Some(minimum) = passing.iter().map(|c| c.distance).min_by(f64::total_cmp) else {
        return Vec::new();
    };
    passing.into_iter().filter(|c| c.distance == minimum).collect()
}

/// Minimum-distance candidates for every threshold, in threshold order.
pub fn select_minimum_distance<'a, 'g>(
    candidates: &'a [CandidateHit<'g>],
    thresholds: &[Threshold],
) -> IndexMap<Threshold, Vec<&'a CandidateHit<'g>>> {
    thresholds
        .iter()
        .map(|t| (*t, minimum_for_threshold(candidates, t)))
        .collect()
}

/// A forward winner and the thresholds under which it won.
#[derive(Debug)]
pub struct Winner<'a, 'g> {
    pub candidate: &'a CandidateHit<'g>,
    pub thresholds: Vec<Threshold>,
}

impl Winner<'_, '_> {
    /// Loosest e-value and divergence among the thresholds this hit won.
    pub fn bound(&self) -> Threshold {
        loosest(&self.thresholds)
    }
}

/// Distinct winning hits, in order of first selection, each with the
/// thresholds that selected it.
pub fn winners_by_hit<'a, 'g>(
    selected: &IndexMap<Threshold, Vec<&'a CandidateHit<'g>>>,
) -> IndexMap<&'a str, Winner<'a, 'g>> {
    let mut winners: IndexMap<&'a str, Winner<'a, 'g>> = IndexMap::new();
    for (threshold, candidates) in selected {
        for &candidate in candidates {
            winners
                .entry(candidate.hit_id.as_str())
                .or_insert_with(|| Winner {
                    candidate,
                    thresholds: Vec::new(),
                })
                .thresholds
                .push(*threshold);
        }
    }
    winners
}
