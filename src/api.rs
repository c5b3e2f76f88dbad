//! Subprocess-backed API for RSD
//!
//! Wires the process runners (blastp, Kalign or ClustalW, codeml) into an
//! [`OrthologFinder`] and exposes the file-level entry points.

use crate::finder::OrthologFinder;
use crate::genome::Genome;
use crate::hits::{HitSource, SavedHits};
use crate::ortholog::{distinct_thresholds, loosest, OrthologSet, Threshold};
use crate::runner::{aligner_from_config, BlastpRunner, CodemlRunner};
use crate::{Config, Result, RsdError};
use std::path::Path;

/// Subprocess-based RSD implementation.
///
/// External programs are located when a computation starts, so a
/// `ProcessRsd` can be built on a machine without them.
#[derive(Debug, Clone)]
pub struct ProcessRsd {
    pub config: Config,
}

impl ProcessRsd {
    /// Create a new subprocess-based RSD instance.
    pub fn new(config: Config) -> Result<Self> {
        if config.max_hits == 0 || config.num_threads == 0 {
            return Err(RsdError::InvalidConfig(
                "max_hits and num_threads must be positive".to_string(),
            ));
        }
        Ok(ProcessRsd { config })
    }

    /// A finder using the configured aligner and codeml.
    pub fn finder(&self) -> Result<OrthologFinder> {
        let aligner = aligner_from_config(&self.config)?;
        let estimator = CodemlRunner::from_config(&self.config)?;
        Ok(OrthologFinder::new(
            self.config.clone(),
            aligner,
            Box::new(estimator),
        ))
    }

    /// Computes orthologs from hits saved by [`ProcessRsd::compute_blast_hits`].
    ///
    /// `forward_hits` holds query-genome hits in the subject genome,
    /// `reverse_hits` the opposite direction.
    pub fn compute_orthologs_using_saved_hits(
        &self,
        query_fasta: &Path,
        subject_fasta: &Path,
        thresholds: &[Threshold],
        forward_hits: &Path,
        reverse_hits: &Path,
        query_ids: Option<&[String]>,
    ) -> Result<OrthologSet> {
        let forward = SavedHits::load(forward_hits)?;
        let reverse = SavedHits::load(reverse_hits)?;
        self.compute(query_fasta, subject_fasta, thresholds, &forward, &reverse, query_ids)
    }

    /// Computes orthologs running blastp per sequence.
    ///
    /// Each FASTA path must also be the name of its `makeblastdb` index.
    /// Slower than precomputed hits for whole genomes.
    pub fn compute_orthologs_on_the_fly(
        &self,
        query_fasta: &Path,
        subject_fasta: &Path,
        thresholds: &[Threshold],
        query_ids: Option<&[String]>,
    ) -> Result<OrthologSet> {
        let forward = BlastpRunner::new(subject_fasta)?.with_temp_dir(self.config.temp_dir.clone());
        let reverse = BlastpRunner::new(query_fasta)?.with_temp_dir(self.config.temp_dir.clone());
        self.compute(query_fasta, subject_fasta, thresholds, &forward, &reverse, query_ids)
    }

    fn compute(
        &self,
        query_fasta: &Path,
        subject_fasta: &Path,
        thresholds: &[Threshold],
        forward: &dyn HitSource,
        reverse: &dyn HitSource,
        query_ids: Option<&[String]>,
    ) -> Result<OrthologSet> {
        tracing::info!(
            "Computing orthologs: {} vs {}",
            query_fasta.display(),
            subject_fasta.display()
        );
        let query = Genome::from_fasta(query_fasta)?;
        let subject = Genome::from_fasta(subject_fasta)?;
        self.finder()?
            .compute_orthologs(&query, &subject, thresholds, forward, reverse, query_ids)
    }

    /// Runs blastp for every sequence of `query_fasta` against
    /// `subject_index` and saves up to `max_hits` hits per query to `out`.
    ///
    /// `out` is replaced atomically.
    pub fn compute_blast_hits(
        &self,
        query_fasta: &Path,
        subject_index: &Path,
        out: &Path,
        max_evalue: f64,
    ) -> Result<()> {
        let blastp = BlastpRunner::new(subject_index)?.with_temp_dir(self.config.temp_dir.clone());
        let hits = blastp.search_file(query_fasta, max_evalue, Some(self.config.max_hits))?;
        tracing::info!(
            "Saving hits of {} queries to {}",
            hits.len(),
            out.display()
        );

        SavedHits::new(hits).save(out)
    }

    /// Hits for both directions with the loosest e-value of `thresholds`.
    pub fn compute_blast_hits_for_thresholds(
        &self,
        query_fasta: &Path,
        subject_fasta: &Path,
        thresholds: &[Threshold],
        forward_out: &Path,
        reverse_out: &Path,
    ) -> Result<()> {
        let max_evalue = loosest(&distinct_thresholds(thresholds)?).evalue;
        self.compute_blast_hits(query_fasta, subject_fasta, forward_out, max_evalue)?;
        self.compute_blast_hits(subject_fasta, query_fasta, reverse_out, max_evalue)
    }
}

/// Type alias for the recommended implementation
pub type Rsd = ProcessRsd;
