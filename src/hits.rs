//! Similarity-search hits and the sources that provide them.

use crate::error::{Result, RsdError};
use crate::fasta::id_from_name;
use crate::genome::Genome;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One search hit of a query against the other genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub subject_id: String,
    pub evalue: f64,
}

impl Hit {
    pub fn new(subject_id: impl Into<String>, evalue: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            evalue,
        }
    }
}

/// Hits of every query id, in search output order.
pub type HitMap = IndexMap<String, Vec<Hit>>;

/// Provides search hits for a sequence against a fixed target genome.
///
/// Hits come back ascending by e-value. An id with no hits yields an empty
/// list, never an error.
pub trait HitSource: Send + Sync {
    fn hits(&self, id: &str, seq: &str, max_evalue: f64) -> Result<Vec<Hit>>;
}

/// Precomputed hits held in memory.
#[derive(Debug, Clone, Default)]
pub struct SavedHits {
    hits: HitMap,
}

impl SavedHits {
    pub fn new(hits: HitMap) -> Self {
        Self { hits }
    }

    /// Loads hits persisted by [`SavedHits::save`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RsdError::FileNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Self::new(serde_json::from_reader(reader)?))
    }

    /// Parses a BLAST tabular (`-outfmt 6`) results file.
    pub fn from_blast_tabular(path: &Path, limit: Option<usize>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(Self::new(parse_blast_tabular(reader, limit)?))
    }

    /// Writes the hits as JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::Builder::new()
            .prefix(".rsd_hits_")
            .tempfile_in(dir)?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            serde_json::to_writer(&mut writer, &self.hits)?;
            writer.flush()?;
        }
        staged.persist(path)?;
        Ok(())
    }

    pub fn hit_map(&self) -> &HitMap {
        &self.hits
    }

    pub fn into_hit_map(self) -> HitMap {
        self.hits
    }
}

impl HitSource for SavedHits {
    fn hits(&self, id: &str, _seq: &str, _max_evalue: f64) -> Result<Vec<Hit>> {
        Ok(self.hits.get(id).cloned().unwrap_or_default())
    }
}

/// Parses BLAST tabular output into hits per query.
///
/// BLAST reports every HSP of a hit on its own line, best first; only the
/// first line of each consecutive (query, hit) run is kept. At most `limit`
/// hits are kept per query.
pub fn parse_blast_tabular<R: BufRead>(reader: R, limit: Option<usize>) -> Result<HitMap> {
    let mut hits = HitMap::new();
    let mut previous: Option<(String, String)> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 11 {
            return Err(RsdError::MalformedOutput(format!(
                "BLAST line {} has {} fields, expected at least 11",
                line_no + 1,
                fields.len()
            )));
        }
        let query_id = id_from_name(fields[0]).to_string();
        let hit_id = id_from_name(fields[1]).to_string();
        let evalue: f64 = fields[10].parse().map_err(|_| {
            RsdError::MalformedOutput(format!(
                "BLAST line {} has invalid evalue {:?}",
                line_no + 1,
                fields[10]
            ))
        })?;

        let key = (query_id, hit_id);
        if previous.as_ref() == Some(&key) {
            continue;
        }
        let (query_id, hit_id) = key.clone();
        previous = Some(key);

        let query_hits = hits.entry(query_id).or_default();
        if limit.map_or(true, |limit| query_hits.len() < limit) {
            query_hits.push(Hit::new(hit_id, evalue));
        }
    }

    Ok(hits)
}

/// A hit that passed the e-value bound, with its sequence looked up.
#[derive(Debug, Clone)]
pub struct GoodHit<'g> {
    pub hit: Hit,
    pub seq: &'g str,
}

/// Looks up hits for `id` and keeps up to `max_hits` with `evalue < max_evalue`.
pub fn good_evalue_hits<'g>(
    source: &dyn HitSource,
    id: &str,
    seq: &str,
    target: &'g Genome,
    max_evalue: f64,
    max_hits: usize,
) -> Result<Vec<GoodHit<'g>>> {
    let mut good = Vec::new();
    for hit in source.hits(id, seq, max_evalue)? {
        if good.len() >= max_hits {
            break;
        }
        if hit.evalue < max_evalue {
            let seq = target.sequence(&hit.subject_id)?;
            good.push(GoodHit { hit, seq });
        }
    }
    Ok(good)
}
