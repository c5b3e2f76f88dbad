//! Reciprocal smallest distance search over many thresholds at once
//!
//! For each query sequence the forward hits are aligned and their distances
//! estimated once, under the loosest threshold. Every threshold then picks its
//! minimum-distance hits from that shared candidate list, and each distinct
//! winner is searched back against the query genome, again once, under the
//! loosest threshold it won. A pair is an ortholog under a threshold when the
//! query is among the minimum-distance reverse candidates for that threshold.

use crate::aligner::{align_pair, SequenceAligner};
use crate::config::Config;
use crate::distance::{resolve_distance, DistanceEstimator};
use crate::error::{Result, RsdError};
use crate::fasta::FastaRecord;
use crate::genome::Genome;
use crate::hits::{good_evalue_hits, GoodHit, HitSource};
use crate::ortholog::{distinct_thresholds, loosest, OrthologRecord, OrthologSet, Threshold};
use crate::selector::{
    minimum_for_threshold, select_minimum_distance, winners_by_hit, AlignedHit, CandidateHit,
};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Runs the ortholog search with the given aligner and distance estimator.
pub struct OrthologFinder {
    config: Config,
    aligner: Box<dyn SequenceAligner>,
    estimator: Box<dyn DistanceEstimator>,
}

/// The genomes and hit sources of one run, after any swap.
struct Search<'a> {
    query: &'a Genome,
    subject: &'a Genome,
    forward: &'a dyn HitSource,
    reverse: &'a dyn HitSource,
    thresholds: &'a [Threshold],
    loosest: Threshold,
}

impl OrthologFinder {
    pub fn new(
        config: Config,
        aligner: Box<dyn SequenceAligner>,
        estimator: Box<dyn DistanceEstimator>,
    ) -> Self {
        Self {
            config,
            aligner,
            estimator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Finds orthologs of `query` sequences in `subject` for every threshold.
    ///
    /// `forward` returns hits of query sequences in the subject genome,
    /// `reverse` hits of subject sequences in the query genome. With a
    /// non-empty `query_ids` only those query sequences are searched;
    /// otherwise (`None` or an empty list) all of them, and the genomes may be
    /// swapped internally when the subject is smaller. Records always name
    /// the query sequence first.
    ///
    /// The result holds a (possibly empty) group for every distinct
    /// threshold, in the order given.
    pub fn compute_orthologs(
        &self,
        query: &Genome,
        subject: &Genome,
        thresholds: &[Threshold],
        forward: &dyn HitSource,
        reverse: &dyn HitSource,
        query_ids: Option<&[String]>,
    ) -> Result<OrthologSet> {
        let thresholds = distinct_thresholds(thresholds)?;
        let query_ids = query_ids.filter(|ids| !ids.is_empty());

        let swapped = query_ids.is_none() && self.config.genome_swap && subject.len() < query.len();
        let search = if swapped {
            tracing::info!(
                "{} has fewer sequences than {}, searching from {}",
                subject.name(),
                query.name(),
                subject.name()
            );
            Search {
                query: subject,
                subject: query,
                forward: reverse,
                reverse: forward,
                thresholds: &thresholds,
                loosest: loosest(&thresholds),
            }
        } else {
            Search {
                query,
                subject,
                forward,
                reverse,
                thresholds: &thresholds,
                loosest: loosest(&thresholds),
            }
        };

        let ids: Vec<&str> = match query_ids {
            Some(ids) => ids.iter().map(String::as_str).collect(),
            None => search.query.ids().iter().map(String::as_str).collect(),
        };
        if let Some(unknown) = ids.iter().find(|id| !search.query.contains(id)) {
            return Err(RsdError::UnknownSequence {
                genome: search.query.name().to_string(),
                id: unknown.to_string(),
            });
        }

        tracing::info!(
            "Searching {} of {} against {} at {} thresholds with {} threads",
            ids.len(),
            search.query.name(),
            search.subject.name(),
            thresholds.len(),
            self.config.num_threads
        );

        let orthologs = self.search_all(&search, &ids)?;
        tracing::info!("Found {} orthologs", orthologs.record_count());

        Ok(if swapped {
            orthologs.swap_ids()
        } else {
            orthologs
        })
    }

    /// Processes every query id on the worker pool, merging results in id
    /// order.
    ///
    /// A failure stops the pool from starting later queries. Queries before
    /// the lowest failing one still run, so the returned error is the first
    /// failure in id order regardless of scheduling.
    fn search_all(&self, search: &Search, ids: &[&str]) -> Result<OrthologSet> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()?;
        let scratch = (0..pool.current_num_threads())
            .map(|_| self.new_scratch())
            .collect::<Result<Vec<_>>>()?;
        let first_failure = AtomicUsize::new(usize::MAX);

        let partials: Vec<Option<Result<OrthologSet>>> = pool.install(|| {
            ids.par_iter()
                .enumerate()
                .map(|(index, id)| {
                    if index > first_failure.load(Ordering::Acquire) {
                        return None;
                    }
                    let worker = rayon::current_thread_index().unwrap_or(0);
                    let result = self.process_query(search, id, scratch[worker].path());
                    if let Err(e) = &result {
                        tracing::debug!("{id}: {e}");
                        first_failure.fetch_min(index, Ordering::AcqRel);
                    }
                    Some(result)
                })
                .collect()
        });

        let mut orthologs = OrthologSet::new(search.thresholds);
        for partial in partials.into_iter().flatten() {
            orthologs.extend(partial?);
        }
        Ok(orthologs)
    }

    /// A scratch directory for one pool thread, prepared for the distance
    /// estimator.
    fn new_scratch(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder
            .prefix("rsd_")
            .disable_cleanup(self.config.keep_intermediates);
        let dir = match &self.config.temp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| {
            tracing::error!("Cannot create scratch directory: {e}");
            RsdError::TempDirError
        })?;

        if self.config.keep_intermediates {
            tracing::debug!("Keeping scratch directory {}", dir.path().display());
        }
        self.estimator.prepare(dir.path())?;
        Ok(dir)
    }

    fn process_query(&self, search: &Search, query_id: &str, scratch: &Path) -> Result<OrthologSet> {
        let mut orthologs = OrthologSet::new(search.thresholds);
        let query_seq = search.query.sequence(query_id)?;

        // forward candidates under the loosest threshold
        let good = good_evalue_hits(
            search.forward,
            query_id,
            query_seq,
            search.subject,
            search.loosest.evalue,
            self.config.max_hits,
        )?;
        let mut aligned = self.align_hits(query_id, query_seq, good, scratch)?;
        aligned.retain(|a| !a.predicate.is_too_diverged(search.loosest.divergence));
        let candidates = self.resolve_distances(query_id, aligned, scratch)?;

        let selected = select_minimum_distance(&candidates, search.thresholds);
        let winners = winners_by_hit(&selected);
        if winners.is_empty() {
            tracing::trace!("{query_id}: no forward winner");
        }

        for (hit_id, winner) in &winners {
            let Some(reverse) =
                self.reverse_candidates(search, query_id, winner.candidate, winner.bound(), scratch)?
            else {
                continue;
            };
            let distance = winner.candidate.distance;

            for threshold in &winner.thresholds {
                let minimum = minimum_for_threshold(&reverse, threshold);
                if minimum.iter().any(|c| c.hit_id == query_id) {
                    orthologs.push(*threshold, OrthologRecord::new(query_id, *hit_id, distance));
                } else {
                    tracing::trace!("{query_id} -> {hit_id}: not reciprocal at {threshold}");
                }
            }
        }

        Ok(orthologs)
    }

    /// Reverse candidates of a forward winner, or None as soon as the query
    /// can no longer be among them.
    fn reverse_candidates<'g>(
        &self,
        search: &Search<'g>,
        query_id: &str,
        winner: &CandidateHit,
        bound: Threshold,
        scratch: &Path,
    ) -> Result<Option<Vec<CandidateHit<'g>>>> {
        let good = good_evalue_hits(
            search.reverse,
            &winner.hit_id,
            winner.hit_seq,
            search.query,
            bound.evalue,
            self.config.max_hits,
        )?;
        if !good.iter().any(|g| g.hit.subject_id == query_id) {
            tracing::trace!("{query_id} -> {}: query not among reverse hits", winner.hit_id);
            return Ok(None);
        }

        let mut aligned = self.align_hits(&winner.hit_id, winner.hit_seq, good, scratch)?;
        aligned.retain(|a| !a.predicate.is_too_diverged(bound.divergence));
        if !aligned.iter().any(|a| a.hit_id == query_id) {
            tracing::trace!("{query_id} -> {}: reverse alignment too diverged", winner.hit_id);
            return Ok(None);
        }

        let candidates = self.resolve_distances(&winner.hit_id, aligned, scratch)?;
        if !candidates.iter().any(|c| c.hit_id == query_id) {
            tracing::trace!("{query_id} -> {}: no reverse distance", winner.hit_id);
            return Ok(None);
        }
        Ok(Some(candidates))
    }

    fn align_hits<'g>(
        &self,
        id: &str,
        seq: &str,
        hits: Vec<GoodHit<'g>>,
        scratch: &Path,
    ) -> Result<Vec<AlignedHit<'g>>> {
        hits.into_iter()
            .map(|good| {
                let pair = align_pair(
                    self.aligner.as_ref(),
                    (id, seq),
                    (good.hit.subject_id.as_str(), good.seq),
                    scratch,
                    self.config.align_retry_delay,
                )?;
                Ok(AlignedHit::new(good.hit.subject_id, good.seq, good.hit.evalue, pair))
            })
            .collect()
    }

    /// Estimates each aligned hit's distance, dropping those without one.
    fn resolve_distances<'g>(
        &self,
        id: &str,
        aligned: Vec<AlignedHit<'g>>,
        scratch: &Path,
    ) -> Result<Vec<CandidateHit<'g>>> {
        let mut resolved = Vec::with_capacity(aligned.len());
        for hit in aligned {
            let first = FastaRecord::new(id, hit.aligned_query.as_str());
            let second = FastaRecord::new(hit.hit_id.as_str(), hit.aligned_hit.as_str());
            if let Some(distance) =
                resolve_distance(self.estimator.as_ref(), &first, &second, scratch)?.value()
            {
                resolved.push(hit.resolved(distance));
            }
        }
        Ok(resolved)
    }
}
