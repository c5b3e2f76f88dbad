//! Aligned sequence pairs, terminal gap trimming and the divergence predicate.
//!
//! A pairwise alignment is trimmed once and summarized into a
//! [`DivergencePredicate`], which can then be evaluated against any number of
//! divergence thresholds without touching the alignment again.

use crate::fasta::{gap_count, FastaRecord};

/// Terminal gap runs shorter than this are alignment noise and left in place.
pub const MIN_TRIM_LENGTH: usize = 10;

/// Result of scanning one aligned sequence for terminal gaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalTrim {
    /// Residues to cut from the start (0 if the leading gap run is short)
    pub front: usize,

    /// Residues to cut from the end (0 if the trailing gap run is short)
    pub end: usize,

    /// Gap density of the sequence between the terminal gap runs.
    /// None for an all-gap sequence.
    pub divergence: Option<f64>,
}

impl TerminalTrim {
    /// True if either end is long enough to be cut.
    pub fn is_applied(&self) -> bool {
        self.front > 0 || self.end > 0
    }
}

/// Computes terminal trim lengths for the more gapped sequence of a pair.
///
/// Surrounding whitespace is ignored. An all-gap sequence is never trimmed.
pub fn terminal_gap_trim(seq: &str) -> TerminalTrim {
    let seq = seq.trim();
    let leading = seq.bytes().take_while(|&b| b == b'-').count();
    if leading == seq.len() {
        return TerminalTrim {
            front: 0,
            end: 0,
            divergence: None,
        };
    }
    let trailing = seq.bytes().rev().take_while(|&b| b == b'-').count();
    let core = &seq[leading..seq.len() - trailing];

    let front = if leading < MIN_TRIM_LENGTH { 0 } else { leading };
    let end = if trailing < MIN_TRIM_LENGTH { 0 } else { trailing };

    TerminalTrim {
        front,
        end,
        divergence: Some(gap_count(core) as f64 / core.len() as f64),
    }
}

/// Gap density of a whole aligned sequence, None when it is empty.
fn gap_density(seq: &str) -> Option<f64> {
    if seq.is_empty() {
        None
    } else {
        Some(gap_count(seq) as f64 / seq.len() as f64)
    }
}

/// Decides whether an alignment is too diverged for a given threshold.
///
/// Holds only the numbers derived from one alignment; cheap to copy and to
/// evaluate once per threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergencePredicate {
    least_divergence: Option<f64>,
    trimmed_divergence: Option<f64>,
}

impl DivergencePredicate {
    /// Builds the predicate from the less gapped sequence and the trim of the
    /// more gapped one.
    pub fn new(least_gapped: &str, trim: &TerminalTrim) -> Self {
        let trimmed_divergence = if trim.is_applied() {
            trim.divergence
        } else {
            None
        };
        Self {
            least_divergence: gap_density(least_gapped),
            trimmed_divergence,
        }
    }

    /// A predicate that never reports excessive divergence.
    pub fn never() -> Self {
        Self {
            least_divergence: None,
            trimmed_divergence: None,
        }
    }

    /// Gap density of the less gapped sequence.
    pub fn least_divergence(&self) -> Option<f64> {
        self.least_divergence
    }

    /// Gap density of the trimmed core, present only when a trim was applied.
    pub fn trimmed_divergence(&self) -> Option<f64> {
        self.trimmed_divergence
    }

    pub fn trim_applied(&self) -> bool {
        self.trimmed_divergence.is_some()
    }

    /// True when the alignment exceeds `threshold`.
    ///
    /// The untrimmed density must be strictly greater than the threshold; the
    /// trimmed density only needs to reach it.
    pub fn is_too_diverged(&self, threshold: f64) -> bool {
        if matches!(self.least_divergence, Some(div) if div > threshold) {
            return true;
        }
        matches!(self.trimmed_divergence, Some(div) if div >= threshold)
    }
}

/// Two aligned, trimmed sequences of equal length plus their predicate.
///
/// `first` is always the sequence the alignment was requested for (the query
/// side), `second` the hit.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub first: FastaRecord,
    pub second: FastaRecord,
    pub predicate: DivergencePredicate,
}

impl AlignedPair {
    /// Trims an untrimmed aligned pair and derives its predicate.
    ///
    /// The sequences are ranked by gap count (ties broken by id, then by
    /// sequence); the more gapped one decides the trim, which is applied to
    /// both.
    pub fn from_alignment(first: FastaRecord, second: FastaRecord) -> Self {
        let (least, most) = if rank(&first) <= rank(&second) {
            (&first, &second)
        } else {
            (&second, &first)
        };
        let trim = terminal_gap_trim(&most.seq);
        let predicate = DivergencePredicate::new(&least.seq, &trim);

        Self {
            first: trimmed(first, &trim),
            second: trimmed(second, &trim),
            predicate,
        }
    }

    /// Length of the trimmed alignment.
    pub fn len(&self) -> usize {
        self.first.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.seq.is_empty()
    }
}

fn rank(record: &FastaRecord) -> (usize, &str, &str) {
    (record.gap_count(), &record.id, &record.seq)
}

fn trimmed(record: FastaRecord, trim: &TerminalTrim) -> FastaRecord {
    if !trim.is_applied() {
        return record;
    }
    let seq = record.seq.trim();
    let end = seq.len().saturating_sub(trim.end);
    let start = trim.front.min(end);
    FastaRecord {
        seq: seq[start..end].to_string(),
        id: record.id,
    }
}
