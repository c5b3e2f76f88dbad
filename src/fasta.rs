//! FASTA reading and writing on top of `bio::io::fasta`.

use crate::error::{Result, RsdError};
use bio::io::fasta;
use std::io::{Read, Write};

/// Namespace prefix NCBI BLAST wants on local query ids.
pub const LOCAL_ID_PREFIX: &str = "lcl|";

/// A sequence id paired with its residues (possibly gapped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub seq: String,
}

impl FastaRecord {
    pub fn new(id: impl Into<String>, seq: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
        }
    }

    /// Number of gap characters.
    pub fn gap_count(&self) -> usize {
        gap_count(&self.seq)
    }
}

/// Number of `-` characters in a sequence.
pub fn gap_count(seq: &str) -> usize {
    seq.bytes().filter(|&b| b == b'-').count()
}

/// Extracts the sequence id from a FASTA name line or search-result id.
///
/// Takes the first whitespace-delimited token, drops a leading `>` and the
/// `lcl|` namespace prefix.
pub fn id_from_name(name: &str) -> &str {
    let name = name.trim_start().trim_start_matches('>');
    let token = name.split_whitespace().next().unwrap_or("");
    token.strip_prefix(LOCAL_ID_PREFIX).unwrap_or(token)
}

/// Reads every record of a FASTA stream, normalizing ids with [`id_from_name`].
pub fn read_records<R: Read>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    for record in fasta::Reader::new(reader).records() {
        let record = record?;
        let seq = String::from_utf8(record.seq().to_vec())?;
        records.push(FastaRecord::new(id_from_name(record.id()), seq));
    }
    Ok(records)
}

/// Writes records as FASTA, one sequence line per record.
pub fn write_records<'a, W, I>(writer: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut writer = fasta::Writer::new(writer);
    for (id, seq) in records {
        if id.is_empty() || id.contains(char::is_whitespace) {
            return Err(RsdError::InvalidConfig(format!(
                "sequence id {id:?} cannot be written as a FASTA name"
            )));
        }
        writer.write(id, None, seq.as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders records as an in-memory FASTA string.
pub fn to_fasta_string<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut buffer = Vec::new();
    write_records(&mut buffer, records)?;
    Ok(String::from_utf8(buffer)?)
}
