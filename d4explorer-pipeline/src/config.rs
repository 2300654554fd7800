use std::fmt::{self, Display};
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_BINS, DEFAULT_THREADS};
use crate::errors::{PipelineError, Result};
use crate::tools::D4Tools;

///
/// What to do when a feature's histogram cannot be computed.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop queued work and return the first error
    #[default]
    Abort,
    /// Leave the feature out and carry on
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(PipelineError::Config(format!(
                "unknown failure policy '{}', expected 'abort' or 'skip'",
                other
            ))),
        }
    }
}

impl Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Skip => write!(f, "skip"),
        }
    }
}

///
/// Options of one preprocessing run. Can be read from a TOML file:
///
/// ```toml
/// annotation_file = "genes.gff3"
/// max_bins = 500
/// threads = 4
/// timeout = 600
/// on_error = "skip"
/// ```
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessOptions {
    /// GFF3 or BED annotation; without one only the genome is summarized
    pub annotation_file: Option<PathBuf>,
    /// Sequence lengths to use instead of asking the depth tool
    pub chrom_sizes: Option<PathBuf>,
    pub max_bins: u64,
    /// Worker threads, i.e. concurrent tool invocations
    pub threads: usize,
    /// Defaults to twice the number of threads
    pub max_queue_size: Option<usize>,
    /// Threads passed to each tool invocation
    pub tool_threads: usize,
    pub d4tools: Option<PathBuf>,
    /// Seconds before a tool invocation is killed
    pub timeout: Option<u64>,
    pub on_error: FailurePolicy,
    pub cache_folder: Option<PathBuf>,
    pub progress: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        PreprocessOptions {
            annotation_file: None,
            chrom_sizes: None,
            max_bins: DEFAULT_MAX_BINS,
            threads: DEFAULT_THREADS,
            max_queue_size: None,
            tool_threads: 1,
            d4tools: None,
            timeout: None,
            on_error: FailurePolicy::default(),
            cache_folder: None,
            progress: true,
        }
    }
}

impl TryFrom<&Path> for PreprocessOptions {
    type Error = PipelineError;

    fn try_from(path: &Path) -> Result<Self> {
        let toml_str = read_to_string(path)?;
        PreprocessOptions::from_str(&toml_str)
    }
}

impl FromStr for PreprocessOptions {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let options: PreprocessOptions = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }
}

impl PreprocessOptions {
    pub fn queue_size(&self) -> usize {
        self.max_queue_size.unwrap_or(2 * self.threads)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_bins == 0 {
            return Err(PipelineError::Config("max_bins must be positive".to_string()));
        }
        if self.threads == 0 {
            return Err(PipelineError::Config("threads must be positive".to_string()));
        }
        if self.queue_size() == 0 {
            return Err(PipelineError::Config(
                "max_queue_size must be positive".to_string(),
            ));
        }
        if self.timeout == Some(0) {
            return Err(PipelineError::Config("timeout must be positive".to_string()));
        }
        Ok(())
    }

    ///
    /// Depth tool configured by these options.
    ///
    pub fn d4tools(&self) -> D4Tools {
        let tools = D4Tools::new()
            .with_threads(self.tool_threads)
            .with_timeout(self.timeout());
        match &self.d4tools {
            Some(program) => tools.with_program(program),
            None => tools,
        }
    }
}
