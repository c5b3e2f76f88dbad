//! Maximum-likelihood distance between two aligned sequences.
//!
//! Estimation does not converge for every alignment. That outcome is an
//! ordinary value, [`Distance::Unavailable`], which callers skip; only process
//! and I/O failures are errors.

use crate::error::{Result, RsdError};
use crate::fasta::FastaRecord;
use std::path::Path;

/// Outcome of a distance estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    Resolved(f64),
    Unavailable,
}

impl Distance {
    pub fn value(self) -> Option<f64> {
        match self {
            Distance::Resolved(distance) => Some(distance),
            Distance::Unavailable => None,
        }
    }
}

/// Estimates the evolutionary distance of an aligned pair.
///
/// `scratch` is a directory owned by the calling worker for the whole run;
/// no two concurrent calls share one.
pub trait DistanceEstimator: Send + Sync {
    /// Sets up a fresh scratch directory (control files, matrices).
    fn prepare(&self, _scratch: &Path) -> Result<()> {
        Ok(())
    }

    fn estimate(&self, first: &FastaRecord, second: &FastaRecord, scratch: &Path)
        -> Result<Distance>;
}

/// Resolves the distance of an aligned, trimmed pair.
pub fn resolve_distance(
    estimator: &dyn DistanceEstimator,
    first: &FastaRecord,
    second: &FastaRecord,
    scratch: &Path,
) -> Result<Distance> {
    if first.seq.len() != second.seq.len() {
        return Err(RsdError::MalformedOutput(format!(
            "cannot estimate distance of {} and {}: lengths {} and {} differ",
            first.id,
            second.id,
            first.seq.len(),
            second.seq.len()
        )));
    }
    let distance = estimator.estimate(first, second, scratch)?;
    if distance == Distance::Unavailable {
        tracing::debug!("no distance for {} and {}", first.id, second.id);
    }
    Ok(distance)
}

/// codeml sequence file: a `count length` heading, then id and sequence lines.
pub fn codeml_data_file(first: &FastaRecord, second: &FastaRecord) -> String {
    format!(
        "2 {}\n{}\n{}\n{}\n{}\n",
        first.seq.len(),
        first.id,
        first.seq,
        second.id,
        second.seq
    )
}

/// Reads the pairwise distance from the contents of codeml's `2AA.t`.
///
/// The first line (sequence count) is skipped. Each later line contributes
/// its only token, or its first two tokens; the third token overall is the
/// distance. Empty contents mean codeml produced nothing.
pub fn parse_codeml_distance(contents: &str) -> Result<Distance> {
    if contents.trim().is_empty() {
        return Ok(Distance::Unavailable);
    }
    let tokens: Vec<&str> = contents
        .lines()
        .skip(1)
        .flat_map(|line| line.split_whitespace().take(2))
        .collect();

    let token = tokens.get(2).ok_or_else(|| {
        RsdError::MalformedOutput(format!("codeml distance table too short: {contents:?}"))
    })?;
    let distance: f64 = token.parse().map_err(|_| {
        RsdError::MalformedOutput(format!("codeml distance {token:?} is not a number"))
    })?;
    Ok(Distance::Resolved(distance))
}

/// Built-in codeml control file for pairwise amino acid distances under an
/// empirical rate matrix with gamma-distributed rates.
pub fn codeml_control_file(rate_matrix_name: &str) -> String {
    let matrix_line = format!("aaRatefile = {rate_matrix_name}");
    let lines = [
        "seqfile = datafile.seq",
        "treefile = treefile.seq",
        "outfile = outfile.seq",
        "noisy = 0",
        "verbose = 0",
        "runmode = -2",
        "seqtype = 2",
        "clock = 0",
        "aaDist = 0",
        matrix_line.as_str(),
        "model = 2",
        "icode = 0",
        "Mgene = 0",
        "fix_alpha = 0",
        "alpha = 0.5",
        "Malpha = 0",
        "ncatG = 4",
        "getSE = 0",
        "RateAncestor = 0",
        "Small_Diff = .5e-6",
        "cleandata = 1",
        "method = 0",
    ];
    let mut control = lines.join("\n");
    control.push('\n');
    control
}
