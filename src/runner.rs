//! Subprocess runners for the external programs
//!
//! Each runner wraps one binary behind the trait the ortholog search consumes:
//! Kalign and ClustalW behind [`SequenceAligner`], blastp behind [`HitSource`],
//! codeml behind [`DistanceEstimator`].

use crate::aligner::SequenceAligner;
use crate::binary_finder::{find_binary, find_rate_matrix};
use crate::config::{AlignerKind, Config};
use crate::distance::{codeml_control_file, codeml_data_file, parse_codeml_distance};
use crate::distance::{Distance, DistanceEstimator};
use crate::error::{Result, RsdError};
use crate::fasta::{read_records, to_fasta_string, FastaRecord, LOCAL_ID_PREFIX};
use crate::hits::{parse_blast_tabular, Hit, HitMap, HitSource};
use crate::timeout::{check_status, output_with_timeout};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const CLUSTAL_INPUT_FILENAME: &str = "clustal_fasta.faa";
const CLUSTAL_ALIGNMENT_FILENAME: &str = "clustal_fasta.aln";

const CODEML_CONTROL_FILENAME: &str = "codeml.ctl";
const CODEML_DATA_FILENAME: &str = "datafile.seq";
const CODEML_TREE_FILENAME: &str = "treefile.seq";
const CODEML_OUT_FILENAME: &str = "outfile.seq";
const CODEML_DISTANCE_FILENAME: &str = "2AA.t";

/// Grace period for a distance table that is not on disk yet.
const DISTANCE_FILE_WAIT: Duration = Duration::from_millis(500);

/// Builds the aligner selected by `config.aligner`.
pub fn aligner_from_config(config: &Config) -> Result<Box<dyn SequenceAligner>> {
    let aligner: Box<dyn SequenceAligner> = match config.aligner {
        AlignerKind::Kalign => Box::new(KalignRunner::new()?.with_timeout(config.align_timeout)),
        AlignerKind::Clustalw => {
            Box::new(ClustalwRunner::new()?.with_timeout(config.align_timeout))
        }
    };
    Ok(aligner)
}

/// Kalign reading FASTA on stdin and writing the alignment to stdout.
#[derive(Debug, Clone)]
pub struct KalignRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl KalignRunner {
    pub fn new() -> Result<Self> {
        Ok(Self::with_program(find_binary("kalign")?))
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SequenceAligner for KalignRunner {
    fn align(&self, records: &[(&str, &str)], _scratch: &Path) -> Result<Vec<FastaRecord>> {
        let input = to_fasta_string(records.iter().copied())?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-f").arg("fasta");
        tracing::trace!("Executing: {cmd:?}");

        let output = output_with_timeout(&mut cmd, Some(input.as_bytes()), self.timeout)?;
        check_status("kalign", &output)?;

        // Kalign 2.04 emits a blank line after sequences of exactly 60 residues
        let aligned = String::from_utf8(output.stdout)?.replace("\n\n", "\n");
        read_records(aligned.as_bytes())
    }
}

/// ClustalW exchanging FASTA files through the scratch directory.
#[derive(Debug, Clone)]
pub struct ClustalwRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ClustalwRunner {
    pub fn new() -> Result<Self> {
        Ok(Self::with_program(find_binary("clustalw")?))
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SequenceAligner for ClustalwRunner {
    fn align(&self, records: &[(&str, &str)], scratch: &Path) -> Result<Vec<FastaRecord>> {
        let input_path = scratch.join(CLUSTAL_INPUT_FILENAME);
        let output_path = scratch.join(CLUSTAL_ALIGNMENT_FILENAME);
        fs::write(&input_path, to_fasta_string(records.iter().copied())?)?;
        if output_path.exists() {
            fs::remove_file(&output_path)?;
        }

        let mut cmd = Command::new(&self.program);
        cmd.arg("-output")
            .arg("fasta")
            .arg("-infile")
            .arg(&input_path)
            .arg("-outfile")
            .arg(&output_path);
        tracing::trace!("Executing: {cmd:?}");

        let output = output_with_timeout(&mut cmd, None, self.timeout)?;
        if let Err(e) = check_status("clustalw", &output) {
            tracing::error!(
                "clustalw failed on {:?}",
                records.iter().map(|(id, _)| *id).collect::<Vec<_>>()
            );
            return Err(e);
        }

        // no output file reads as an empty alignment, which the caller retries
        if !output_path.exists() {
            return Ok(Vec::new());
        }
        read_records(File::open(&output_path)?)
    }
}

/// blastp against a database prepared with `makeblastdb`.
#[derive(Debug, Clone)]
pub struct BlastpRunner {
    program: PathBuf,
    database: PathBuf,
    temp_dir: Option<PathBuf>,
}

impl BlastpRunner {
    /// `database` is the index path given to `makeblastdb -out`.
    pub fn new(database: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_program(find_binary("blastp")?, database))
    }

    pub fn with_program(program: impl Into<PathBuf>, database: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            database: database.into(),
            temp_dir: None,
        }
    }

    /// Directory for query and result files instead of the system temp dir.
    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    /// Searches every sequence of `query_fasta`, keeping at most `limit` hits
    /// per query.
    pub fn search_file(
        &self,
        query_fasta: &Path,
        max_evalue: f64,
        limit: Option<usize>,
    ) -> Result<HitMap> {
        if !query_fasta.exists() {
            return Err(RsdError::FileNotFound(query_fasta.to_path_buf()));
        }
        let work_dir = self.work_dir()?;
        let results_path = work_dir.path().join("blast_results");
        self.run(query_fasta, &results_path, max_evalue)?;

        let reader = BufReader::new(File::open(&results_path)?);
        parse_blast_tabular(reader, limit)
    }

    fn run(&self, query: &Path, results: &Path, max_evalue: f64) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-outfmt")
            .arg("6")
            .arg("-evalue")
            .arg(max_evalue.to_string())
            .arg("-query")
            .arg(query)
            .arg("-db")
            .arg(&self.database)
            .arg("-out")
            .arg(results);
        tracing::debug!("Executing: {cmd:?}");

        let output = output_with_timeout(&mut cmd, None, None)?;
        check_status("blastp", &output)
    }

    fn work_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("rsd_blast_");
        let dir = match &self.temp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(|e| RsdError::Other(format!("Failed to create temp directory: {e}")))
    }
}

impl HitSource for BlastpRunner {
    fn hits(&self, id: &str, seq: &str, max_evalue: f64) -> Result<Vec<Hit>> {
        let work_dir = self.work_dir()?;
        let query_path = work_dir.path().join("query.faa");
        let results_path = work_dir.path().join("blast_results");

        let local_id = format!("{LOCAL_ID_PREFIX}{id}");
        fs::write(&query_path, to_fasta_string([(local_id.as_str(), seq)])?)?;
        self.run(&query_path, &results_path, max_evalue)?;

        let reader = BufReader::new(File::open(&results_path)?);
        let mut hits = parse_blast_tabular(reader, None)?;
        Ok(hits.swap_remove(id).unwrap_or_default())
    }
}

/// PAML codeml estimating pairwise amino acid distances.
///
/// Each scratch directory gets its own control file and rate matrix in
/// [`DistanceEstimator::prepare`]; codeml then runs with the scratch
/// directory as working directory.
#[derive(Debug, Clone)]
pub struct CodemlRunner {
    program: PathBuf,
    rate_matrix: PathBuf,
    control_file: Option<PathBuf>,
}

impl CodemlRunner {
    /// Locates codeml and its rate matrix, honoring the overrides in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let program = find_binary("codeml")?;
        let rate_matrix = match &config.rate_matrix {
            Some(path) => path.clone(),
            None => find_rate_matrix(&program)?,
        };
        Self::with_program(program, rate_matrix, config.codeml_control.clone())
    }

    pub fn with_program(
        program: impl Into<PathBuf>,
        rate_matrix: impl Into<PathBuf>,
        control_file: Option<PathBuf>,
    ) -> Result<Self> {
        let rate_matrix = rate_matrix.into();
        if !rate_matrix.is_file() {
            return Err(RsdError::FileNotFound(rate_matrix));
        }
        if let Some(control) = &control_file {
            if !control.is_file() {
                return Err(RsdError::FileNotFound(control.clone()));
            }
        }
        Ok(Self {
            program: program.into(),
            rate_matrix,
            control_file,
        })
    }

    fn rate_matrix_name(&self) -> Result<&str> {
        self.rate_matrix
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                RsdError::InvalidConfig(format!(
                    "rate matrix path {} has no usable file name",
                    self.rate_matrix.display()
                ))
            })
    }

    fn run(&self, scratch: &Path) -> Result<Distance> {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(scratch);
        tracing::trace!("Executing: {cmd:?} in {}", scratch.display());

        let output = output_with_timeout(&mut cmd, None, None)?;
        check_status("codeml", &output)?;

        let distance_path = scratch.join(CODEML_DISTANCE_FILENAME);
        if !distance_path.exists() {
            std::thread::sleep(DISTANCE_FILE_WAIT);
        }
        if !distance_path.exists() {
            tracing::debug!("codeml wrote no {CODEML_DISTANCE_FILENAME}");
            return Ok(Distance::Unavailable);
        }
        parse_codeml_distance(&fs::read_to_string(&distance_path)?)
    }
}

impl DistanceEstimator for CodemlRunner {
    fn prepare(&self, scratch: &Path) -> Result<()> {
        let matrix_name = self.rate_matrix_name()?;
        fs::copy(&self.rate_matrix, scratch.join(matrix_name))?;

        let control_path = scratch.join(CODEML_CONTROL_FILENAME);
        match &self.control_file {
            Some(control) => {
                fs::copy(control, &control_path)?;
            }
            None => fs::write(&control_path, codeml_control_file(matrix_name))?,
        }
        Ok(())
    }

    fn estimate(&self, first: &FastaRecord, second: &FastaRecord, scratch: &Path) -> Result<Distance> {
        fs::write(
            scratch.join(CODEML_DATA_FILENAME),
            codeml_data_file(first, second),
        )?;

        let result = self.run(scratch);

        for name in [
            CODEML_DATA_FILENAME,
            CODEML_TREE_FILENAME,
            CODEML_OUT_FILENAME,
            CODEML_DISTANCE_FILENAME,
        ] {
            let path = scratch.join(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        result
    }
}
