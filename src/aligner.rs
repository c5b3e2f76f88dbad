//! Pairwise alignment of a query with a candidate hit.

use crate::alignment::AlignedPair;
use crate::error::{Result, RsdError};
use crate::fasta::FastaRecord;
use std::path::Path;
use std::time::Duration;

/// Global aligner for a small set of protein sequences.
///
/// Returns one gapped record per input record, all of equal length. An empty
/// result signals an intermittent failure the caller may retry.
pub trait SequenceAligner: Send + Sync {
    fn align(&self, records: &[(&str, &str)], scratch: &Path) -> Result<Vec<FastaRecord>>;
}

/// Aligns `first` with `second`, trims the alignment and derives its predicate.
///
/// An empty aligner result is retried once after `retry_delay`; a second empty
/// result is [`RsdError::AlignmentFailed`].
pub fn align_pair(
    aligner: &dyn SequenceAligner,
    first: (&str, &str),
    second: (&str, &str),
    scratch: &Path,
    retry_delay: Duration,
) -> Result<AlignedPair> {
    let input = [first, second];
    let mut aligned = aligner.align(&input, scratch)?;
    if aligned.is_empty() {
        tracing::warn!(
            "alignment of {} with {} returned nothing, retrying in {:?}",
            first.0,
            second.0,
            retry_delay
        );
        std::thread::sleep(retry_delay);
        aligned = aligner.align(&input, scratch)?;
    }
    if aligned.is_empty() {
        return Err(RsdError::AlignmentFailed(format!(
            "no aligned sequences for {} and {}",
            first.0, second.0
        )));
    }

    let (first_aligned, second_aligned) = pair_up(aligned, first.0, second.0)?;
    Ok(AlignedPair::from_alignment(first_aligned, second_aligned))
}

/// Matches aligner output back to the requested order and checks its shape.
fn pair_up(
    aligned: Vec<FastaRecord>,
    first_id: &str,
    second_id: &str,
) -> Result<(FastaRecord, FastaRecord)> {
    let count = aligned.len();
    let mut records = aligned.into_iter();
    let (Some(first), Some(second), None) = (records.next(), records.next(), records.next())
    else {
        return Err(RsdError::MalformedOutput(format!(
            "expected 2 aligned sequences for {first_id} and {second_id}, got {count}"
        )));
    };

    let (first, second) = if first.id == first_id && second.id == second_id {
        (first, second)
    } else if first.id == second_id && second.id == first_id {
        (second, first)
    } else {
        return Err(RsdError::MalformedOutput(format!(
            "aligned ids {} and {} do not match {first_id} and {second_id}",
            first.id, second.id
        )));
    };

    if first.seq.len() != second.seq.len() {
        return Err(RsdError::MalformedOutput(format!(
            "aligned sequences {first_id} and {second_id} differ in length ({} vs {})",
            first.seq.len(),
            second.seq.len()
        )));
    }
    if !first.seq.is_ascii() || !second.seq.is_ascii() {
        return Err(RsdError::MalformedOutput(format!(
            "non-ASCII residues in alignment of {first_id} and {second_id}"
        )));
    }
    Ok((first, second))
}
