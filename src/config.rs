//! Configuration options for ortholog computation.
//!
//! This module provides a builder pattern for the search parameters: the hit
//! cap, the aligner choice, the codeml control files, and the worker count.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum number of hits per query retained from a similarity search.
pub const MAX_HITS: usize = 3;

/// Environment variable selecting ClustalW over Kalign.
pub const USE_CLUSTALW_ENV: &str = "RSD_USE_CLUSTALW";

/// Configuration for an RSD run.
///
/// # Default Values
/// - `max_hits`: 3
/// - `num_threads`: Number of CPU cores
/// - `genome_swap`: true
/// - `aligner`: Kalign, or ClustalW when `RSD_USE_CLUSTALW` is truthy
/// - `align_retry_delay`: 100 ms
/// - `align_timeout`: None
#[derive(Debug, Clone)]
pub struct Config {
    /// Hits kept per query sequence, in ascending e-value order
    pub max_hits: usize,

    /// Worker threads used to process query sequences
    pub num_threads: usize,

    /// Swap query and subject when the subject genome is smaller
    pub genome_swap: bool,

    /// Pairwise aligner backend
    pub aligner: AlignerKind,

    /// Pause before the single retry of an empty alignment
    pub align_retry_delay: Duration,

    /// Kill an aligner process running longer than this
    pub align_timeout: Option<Duration>,

    /// Parent directory for per-worker scratch directories
    pub temp_dir: Option<PathBuf>,

    /// Leave scratch directories behind for debugging
    pub keep_intermediates: bool,

    /// codeml control file to use instead of the built-in one
    pub codeml_control: Option<PathBuf>,

    /// Amino acid rate matrix (jones.dat) for codeml
    pub rate_matrix: Option<PathBuf>,
}

/// Pairwise alignment program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignerKind {
    /// Kalign, reading FASTA on stdin (recommended)
    Kalign,
    /// ClustalW, reading and writing files in the scratch directory
    Clustalw,
}

impl AlignerKind {
    /// Picks the aligner from `RSD_USE_CLUSTALW`, defaulting to Kalign.
    pub fn from_env() -> Self {
        match std::env::var(USE_CLUSTALW_ENV) {
            Ok(value) if env_flag(&value) => AlignerKind::Clustalw,
            _ => AlignerKind::Kalign,
        }
    }
}

fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_hits: MAX_HITS,
            num_threads: num_cpus::get().max(1), // Ensure at least 1 thread
            genome_swap: true,
            aligner: AlignerKind::from_env(),
            align_retry_delay: Duration::from_millis(100),
            align_timeout: None,
            temp_dir: None,
            keep_intermediates: false,
            codeml_control: None,
            rate_matrix: None,
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Example
    /// ```
    /// use rsd_rs::Config;
    ///
    /// let config = Config::builder()
    ///     .num_threads(4)
    ///     .max_hits(3)
    ///     .build();
    /// assert_eq!(config.num_threads, 4);
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Single-threaded configuration with no genome swap.
    ///
    /// Useful when reproducing a run query by query.
    pub fn sequential() -> Self {
        Config {
            num_threads: 1,
            genome_swap: false,
            ..Default::default()
        }
    }
}

/// Builder for constructing Config instances.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the number of hits kept per query.
    ///
    /// Default: 3
    pub fn max_hits(mut self, hits: usize) -> Self {
        assert!(hits > 0, "max_hits must be positive");
        self.config.max_hits = hits;
        self
    }

    /// Sets the number of worker threads.
    ///
    /// Default: Number of CPU cores
    pub fn num_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Number of threads must be positive");
        self.config.num_threads = threads;
        self
    }

    /// Enables or disables the genome swap optimization.
    ///
    /// Default: true
    pub fn genome_swap(mut self, enabled: bool) -> Self {
        self.config.genome_swap = enabled;
        self
    }

    /// Selects the pairwise aligner.
    ///
    /// Default: from `RSD_USE_CLUSTALW`
    pub fn aligner(mut self, aligner: AlignerKind) -> Self {
        self.config.aligner = aligner;
        self
    }

    /// Sets the pause before retrying an empty alignment.
    ///
    /// Default: 100 ms
    pub fn align_retry_delay(mut self, delay: Duration) -> Self {
        self.config.align_retry_delay = delay;
        self
    }

    /// Sets a wall-clock limit for each aligner invocation.
    ///
    /// Default: None
    pub fn align_timeout(mut self, timeout: Duration) -> Self {
        self.config.align_timeout = Some(timeout);
        self
    }

    /// Sets the parent directory for scratch directories.
    ///
    /// Default: System temp directory
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.config.temp_dir = Some(path);
        self
    }

    /// Keep scratch directories after the run.
    ///
    /// Default: false
    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.config.keep_intermediates = keep;
        self
    }

    /// Use this codeml control file instead of the built-in one.
    pub fn codeml_control(mut self, path: PathBuf) -> Self {
        self.config.codeml_control = Some(path);
        self
    }

    /// Use this amino acid rate matrix for codeml.
    ///
    /// Default: jones.dat located next to the codeml binary
    pub fn rate_matrix(mut self, path: PathBuf) -> Self {
        self.config.rate_matrix = Some(path);
        self
    }

    /// Builds the final Config instance.
    pub fn build(self) -> Config {
        self.config
    }
}
