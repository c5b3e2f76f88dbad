//! In-memory genome sequence store.

use crate::error::{Result, RsdError};
use crate::fasta::{self, FastaRecord};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// A genome's protein sequences keyed by id, remembering file order.
///
/// Whole genomes are loaded into memory; lookups are far cheaper than
/// repeated on-disk retrieval and protein FASTA files are small.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    name: String,
    ids: Vec<String>,
    sequences: HashMap<String, String>,
}

impl Genome {
    /// Loads a genome from a FASTA file. The genome is named after the file stem.
    pub fn from_fasta(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RsdError::FileNotFound(path.to_path_buf()));
        }
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let records = fasta::read_records(File::open(path)?)?;
        Self::from_records(name, records)
    }

    /// Builds a genome from records; duplicate ids are rejected.
    pub fn from_records<I>(name: impl Into<String>, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = FastaRecord>,
    {
        let name = name.into();
        let mut genome = Genome {
            name,
            ..Default::default()
        };
        for record in records {
            if genome.sequences.contains_key(&record.id) {
                return Err(RsdError::InvalidConfig(format!(
                    "duplicate sequence id {} in genome {}",
                    record.id, genome.name
                )));
            }
            genome.ids.push(record.id.clone());
            genome.sequences.insert(record.id, record.seq);
        }
        Ok(genome)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sequence ids in file order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Looks up a sequence; unknown ids are an error.
    pub fn sequence(&self, id: &str) -> Result<&str> {
        self.sequences
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| RsdError::UnknownSequence {
                genome: self.name.clone(),
                id: id.to_string(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sequences.contains_key(id)
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
