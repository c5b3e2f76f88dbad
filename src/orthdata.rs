//! Text persistence for ortholog results.
//!
//! Each result group is written as
//!
//! ```text
//! PA	<query genome>	<subject genome>	<divergence>	<evalue>
//! OR	<query id>	<subject id>	<distance>
//! ...
//! //
//! ```
//!
//! A group with no orthologs is just its `PA` line followed by `//`. The
//! older line formats, one tab-separated ortholog per line without
//! parameters, are readable and writable through [`LineFormat`].

use crate::error::{Result, RsdError};
use crate::ortholog::{format_float, OrthologRecord, OrthologSet, Threshold};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const PARAMS_TAG: &str = "PA";
const ORTHOLOG_TAG: &str = "OR";
const END_TAG: &str = "//";

/// Genomes and threshold a group of orthologs was computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthParams {
    pub query_genome: String,
    pub subject_genome: String,
    pub divergence: f64,
    pub evalue: f64,
}

impl OrthParams {
    pub fn new(
        query_genome: impl Into<String>,
        subject_genome: impl Into<String>,
        threshold: Threshold,
    ) -> Self {
        Self {
            query_genome: query_genome.into(),
            subject_genome: subject_genome.into(),
            divergence: threshold.divergence,
            evalue: threshold.evalue,
        }
    }

    pub fn threshold(&self) -> Threshold {
        Threshold::new(self.divergence, self.evalue)
    }
}

/// One persisted group: parameters plus the orthologs found under them.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthData {
    pub params: OrthParams,
    pub orthologs: Vec<OrthologRecord>,
}

impl OrthologSet {
    /// One group per threshold, in threshold order.
    pub fn to_orthdatas(&self, query_genome: &str, subject_genome: &str) -> Vec<OrthData> {
        self.iter()
            .map(|(threshold, records)| OrthData {
                params: OrthParams::new(query_genome, subject_genome, *threshold),
                orthologs: records.to_vec(),
            })
            .collect()
    }

    /// Rebuilds a set from persisted groups. Groups sharing a threshold are
    /// concatenated; genome names are not kept.
    pub fn from_orthdatas<I: IntoIterator<Item = OrthData>>(orthdatas: I) -> Self {
        let mut set = OrthologSet::default();
        for orthdata in orthdatas {
            set.extend_group(orthdata.params.threshold(), orthdata.orthologs);
        }
        set
    }
}

/// Writes groups in the `PA`/`OR`/`//` format.
pub fn write_orthdatas<W: Write>(writer: &mut W, orthdatas: &[OrthData]) -> Result<()> {
    for orthdata in orthdatas {
        let params = &orthdata.params;
        writeln!(
            writer,
            "{PARAMS_TAG}\t{}\t{}\t{}\t{}",
            params.query_genome,
            params.subject_genome,
            format_float(params.divergence),
            format_float(params.evalue)
        )?;
        for record in &orthdata.orthologs {
            writeln!(
                writer,
                "{ORTHOLOG_TAG}\t{}\t{}\t{}",
                record.query_id,
                record.subject_id,
                format_float(record.distance)
            )?;
        }
        writeln!(writer, "{END_TAG}")?;
    }
    Ok(())
}

/// Streams groups out of `PA`/`OR`/`//` text.
pub struct OrthDataReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> OrthDataReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> RsdError {
        RsdError::OrthDataParse(format!("line {}: {message}", self.line_no))
    }

    fn read_group(&mut self) -> Result<Option<OrthData>> {
        let mut current: Option<OrthData> = None;
        while let Some(line) = self.lines.next() {
            let line = line?;
            self.line_no += 1;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            match fields[0] {
                PARAMS_TAG => {
                    if current.is_some() {
                        return Err(self.error("PA line inside an unterminated group"));
                    }
                    let [_, query_genome, subject_genome, divergence, evalue] = fields[..] else {
                        return Err(self.error(format!(
                            "PA line has {} fields, expected 5",
                            fields.len()
                        )));
                    };
                    current = Some(OrthData {
                        params: OrthParams {
                            query_genome: query_genome.to_string(),
                            subject_genome: subject_genome.to_string(),
                            divergence: self.parse_float(divergence)?,
                            evalue: self.parse_float(evalue)?,
                        },
                        orthologs: Vec::new(),
                    });
                }
                ORTHOLOG_TAG => {
                    let [_, query_id, subject_id, distance] = fields[..] else {
                        return Err(self.error(format!(
                            "OR line has {} fields, expected 4",
                            fields.len()
                        )));
                    };
                    let distance = self.parse_float(distance)?;
                    let Some(group) = current.as_mut() else {
                        return Err(self.error("OR line before any PA line"));
                    };
                    group
                        .orthologs
                        .push(OrthologRecord::new(query_id, subject_id, distance));
                }
                END_TAG => {
                    return match current {
                        Some(group) => Ok(Some(group)),
                        None => Err(self.error("group terminator without a PA line")),
                    };
                }
                tag => return Err(self.error(format!("unknown line tag {tag:?}"))),
            }
        }
        match current {
            Some(group) => Err(RsdError::OrthDataParse(format!(
                "group {} {} ({}, {}) is not terminated by {END_TAG}",
                group.params.query_genome,
                group.params.subject_genome,
                format_float(group.params.divergence),
                format_float(group.params.evalue)
            ))),
            None => Ok(None),
        }
    }

    fn parse_float(&self, field: &str) -> Result<f64> {
        field
            .trim()
            .parse()
            .map_err(|_| self.error(format!("{field:?} is not a number")))
    }
}

impl<R: BufRead> Iterator for OrthDataReader<R> {
    type Item = Result<OrthData>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_group().transpose()
    }
}

pub fn read_orthdatas<R: BufRead>(reader: R) -> Result<Vec<OrthData>> {
    OrthDataReader::new(reader).collect()
}

/// Replaces `path` with the given groups.
pub fn write_orthdatas_file(path: &Path, orthdatas: &[OrthData]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_orthdatas(&mut writer, orthdatas)?;
    writer.flush()?;
    Ok(())
}

/// Adds groups to the end of `path`, creating it if needed.
pub fn append_orthdatas_file(path: &Path, orthdatas: &[OrthData]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    write_orthdatas(&mut writer, orthdatas)?;
    writer.flush()?;
    Ok(())
}

pub fn read_orthdatas_file(path: &Path) -> Result<Vec<OrthData>> {
    if !path.exists() {
        return Err(RsdError::FileNotFound(path.to_path_buf()));
    }
    read_orthdatas(BufReader::new(File::open(path)?))
}

/// Reads every file in turn, keeping file order.
pub fn read_orthdatas_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<OrthData>> {
    let mut orthdatas = Vec::new();
    for path in paths {
        orthdatas.extend(read_orthdatas_file(path.as_ref())?);
    }
    Ok(orthdatas)
}

/// Column order of the parameterless ortholog line formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// `query subject distance` (version 2)
    #[default]
    QueryFirst,
    /// `subject query distance` (version 1)
    SubjectFirst,
}

impl LineFormat {
    pub fn from_version(version: u32) -> Result<Self> {
        match version {
            1 => Ok(LineFormat::SubjectFirst),
            2 => Ok(LineFormat::QueryFirst),
            other => Err(RsdError::InvalidConfig(format!(
                "unknown ortholog line format version {other}"
            ))),
        }
    }
}

pub fn write_ortholog_lines<W: Write>(
    writer: &mut W,
    orthologs: &[OrthologRecord],
    format: LineFormat,
) -> Result<()> {
    for record in orthologs {
        let (first, second) = match format {
            LineFormat::QueryFirst => (&record.query_id, &record.subject_id),
            LineFormat::SubjectFirst => (&record.subject_id, &record.query_id),
        };
        writeln!(writer, "{first}\t{second}\t{}", format_float(record.distance))?;
    }
    Ok(())
}

pub fn read_ortholog_lines<R: BufRead>(
    reader: R,
    format: LineFormat,
) -> Result<Vec<OrthologRecord>> {
    let mut orthologs = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [first, second, distance] = fields[..] else {
            return Err(RsdError::OrthDataParse(format!(
                "line {}: expected 3 fields, got {}",
                index + 1,
                fields.len()
            )));
        };
        let distance: f64 = distance.parse().map_err(|_| {
            RsdError::OrthDataParse(format!(
                "line {}: {distance:?} is not a number",
                index + 1
            ))
        })?;
        let record = match format {
            LineFormat::QueryFirst => OrthologRecord::new(first, second, distance),
            LineFormat::SubjectFirst => OrthologRecord::new(second, first, distance),
        };
        orthologs.push(record);
    }
    Ok(orthologs)
}
