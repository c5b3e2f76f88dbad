//! Thresholds, ortholog records and the per-threshold ortholog set.

use crate::error::{Result, RsdError};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A (divergence, e-value) pair defining one ortholog-calling configuration.
///
/// Equality, hashing and ordering use the exact float values, so thresholds
/// can key a map.
#[derive(Debug, Clone, Copy)]
pub struct Threshold {
    pub divergence: f64,
    pub evalue: f64,
}

impl Threshold {
    pub fn new(divergence: f64, evalue: f64) -> Self {
        // +0.0 and -0.0 must hash alike
        Self {
            divergence: divergence + 0.0,
            evalue: evalue + 0.0,
        }
    }

    /// Rejects negative, infinite or NaN components.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("divergence", self.divergence), ("evalue", self.evalue)] {
            if !value.is_finite() || value < 0.0 {
                return Err(RsdError::InvalidConfig(format!(
                    "threshold {name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    fn key(&self) -> (u64, u64) {
        (self.divergence.to_bits(), self.evalue.to_bits())
    }
}

impl From<(f64, f64)> for Threshold {
    fn from((divergence, evalue): (f64, f64)) -> Self {
        Threshold::new(divergence, evalue)
    }
}

impl PartialEq for Threshold {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Threshold {}

impl Hash for Threshold {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Threshold {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Threshold {
    fn cmp(&self, other: &Self) -> Ordering {
        self.divergence
            .total_cmp(&other.divergence)
            .then(self.evalue.total_cmp(&other.evalue))
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})",
            format_float(self.divergence),
            format_float(self.evalue)
        )
    }
}

/// Shortest round-trip text for a float, in exponent form below 1e-4.
pub fn format_float(value: f64) -> String {
    if value != 0.0 && value.abs() < 1e-4 {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

/// Collapses duplicate thresholds, keeping first-occurrence order, and
/// validates each one.
pub fn distinct_thresholds(thresholds: &[Threshold]) -> Result<Vec<Threshold>> {
    if thresholds.is_empty() {
        return Err(RsdError::InvalidConfig(
            "at least one threshold is required".to_string(),
        ));
    }
    let mut distinct: Vec<Threshold> = Vec::with_capacity(thresholds.len());
    for threshold in thresholds {
        threshold.validate()?;
        if !distinct.contains(threshold) {
            distinct.push(*threshold);
        }
    }
    Ok(distinct)
}

/// The loosest (largest) divergence and e-value among `thresholds`.
pub fn loosest(thresholds: &[Threshold]) -> Threshold {
    thresholds.iter().fold(
        Threshold::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        |acc, t| Threshold::new(acc.divergence.max(t.divergence), acc.evalue.max(t.evalue)),
    )
}

/// An inferred ortholog pair and its forward maximum-likelihood distance.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthologRecord {
    pub query_id: String,
    pub subject_id: String,
    pub distance: f64,
}

impl OrthologRecord {
    pub fn new(query_id: impl Into<String>, subject_id: impl Into<String>, distance: f64) -> Self {
        Self {
            query_id: query_id.into(),
            subject_id: subject_id.into(),
            distance,
        }
    }

    /// The same pair seen from the other genome.
    pub fn swapped(self) -> Self {
        Self {
            query_id: self.subject_id,
            subject_id: self.query_id,
            distance: self.distance,
        }
    }
}

/// Orthologs per threshold, in threshold order and query-processing order.
///
/// A threshold without orthologs is present with an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrthologSet {
    groups: IndexMap<Threshold, Vec<OrthologRecord>>,
}

impl OrthologSet {
    /// An empty group for each threshold.
    pub fn new(thresholds: &[Threshold]) -> Self {
        Self {
            groups: thresholds.iter().map(|t| (*t, Vec::new())).collect(),
        }
    }

    /// Appends a record to a threshold's group, creating the group if needed.
    pub fn push(&mut self, threshold: Threshold, record: OrthologRecord) {
        self.groups.entry(threshold).or_default().push(record);
    }

    /// Appends records to a threshold's group, creating the group (even for
    /// no records) if needed.
    pub fn extend_group(&mut self, threshold: Threshold, records: Vec<OrthologRecord>) {
        self.groups.entry(threshold).or_default().extend(records);
    }

    pub fn get(&self, threshold: &Threshold) -> Option<&[OrthologRecord]> {
        self.groups.get(threshold).map(Vec::as_slice)
    }

    pub fn thresholds(&self) -> impl Iterator<Item = &Threshold> {
        self.groups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Threshold, &[OrthologRecord])> {
        self.groups.iter().map(|(t, records)| (t, records.as_slice()))
    }

    /// Appends every group of `other` after this set's records.
    pub fn extend(&mut self, other: OrthologSet) {
        for (threshold, records) in other.groups {
            self.extend_group(threshold, records);
        }
    }

    /// Exchanges query and subject ids of every record.
    pub fn swap_ids(self) -> Self {
        Self {
            groups: self
                .groups
                .into_iter()
                .map(|(t, records)| (t, records.into_iter().map(OrthologRecord::swapped).collect()))
                .collect(),
        }
    }

    /// Number of thresholds.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Records across all thresholds.
    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

impl IntoIterator for OrthologSet {
    type Item = (Threshold, Vec<OrthologRecord>);
    type IntoIter = indexmap::map::IntoIter<Threshold, Vec<OrthologRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}
