//! # rsd-rs: Reciprocal Smallest Distance ortholog detection
//!
//! This library finds orthologous protein pairs between two genomes with the
//! reciprocal smallest distance (RSD) method: a query's candidate hits are
//! aligned, their maximum-likelihood evolutionary distance is estimated, and
//! the closest hit is kept only if, searched back against the query genome,
//! its own closest hit is the query.
//!
//! ## Overview
//!
//! rsd-rs allows you to:
//! - Compute orthologs for many (divergence, e-value) thresholds in one pass
//! - Use precomputed BLAST hits or run blastp on the fly
//! - Plug in your own aligner, distance estimator or hit source
//! - Save and reload results in the RSD ortholog text format
//!
//! ## Example Usage
//!
//! ```no_run
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! use rsd_rs::{orthdata, Config, Rsd, Threshold};
//! use std::path::Path;
//!
//! let rsd = Rsd::new(Config::default())?;
//! let thresholds = [Threshold::new(0.2, 1e-20), Threshold::new(0.8, 1e-5)];
//!
//! let orthologs = rsd.compute_orthologs_using_saved_hits(
//!     Path::new("Homo_sapiens.faa"),
//!     Path::new("Mus_musculus.faa"),
//!     &thresholds,
//!     Path::new("human_vs_mouse.hits"),
//!     Path::new("mouse_vs_human.hits"),
//!     None,
//! )?;
//!
//! let groups = orthologs.to_orthdatas("Homo_sapiens", "Mus_musculus");
//! orthdata::write_orthdatas_file(Path::new("orthologs.txt"), &groups)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - `finder`: the multi-threshold reciprocal search
//! - `selector`: per-threshold minimum-distance selection
//! - `alignment` and `aligner`: pairwise alignment, gap trimming, divergence
//! - `distance`: distance estimation contract and codeml file formats
//! - `hits` and `genome`: search hits and sequence lookup
//! - `runner`: blastp, Kalign, ClustalW and codeml subprocesses
//! - `orthdata`: ortholog persistence
//!
//! ## Thread Safety
//!
//! Query sequences are processed on a rayon pool of `Config::num_threads`
//! workers, each with its own scratch directory. Results do not depend on the
//! number of threads.

pub mod aligner;
pub mod alignment;
pub mod api;
pub mod binary_finder;
pub mod config;
pub mod distance;
pub mod error;
pub mod fasta;
pub mod finder;
pub mod genome;
pub mod hits;
pub mod orthdata;
pub mod ortholog;
pub mod runner;
pub mod selector;
pub mod timeout;

pub use aligner::SequenceAligner;
pub use alignment::{AlignedPair, DivergencePredicate};
pub use api::{ProcessRsd, Rsd};
pub use config::{AlignerKind, Config};
pub use distance::{Distance, DistanceEstimator};
pub use error::{Result, RsdError};
pub use fasta::FastaRecord;
pub use finder::OrthologFinder;
pub use genome::Genome;
pub use hits::{Hit, HitMap, HitSource, SavedHits};
pub use orthdata::{OrthData, OrthParams};
pub use ortholog::{OrthologRecord, OrthologSet, Threshold};
