use std::io;

use d4explorer_cache::errors::CacheError;
use d4explorer_core::errors::RangesError;
use d4explorer_hist::HistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to start '{program}': {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Unparseable tool output at line {line}: '{content}'")]
    Unparseable { line: usize, content: String },

    #[error("'{program}' did not finish within {seconds} s and was killed")]
    Timeout { program: String, seconds: u64 },

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("Task cancelled after an earlier failure")]
    Cancelled,

    #[error("Task ended without reporting a result")]
    TaskLost,

    #[error("Invalid preprocessing options: {0}")]
    Config(String),

    #[error("Feature '{feature}' failed: {source}")]
    FeatureFailed {
        feature: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Ranges(#[from] RangesError),

    #[error(transparent)]
    Hist(#[from] HistError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
