use std::path::PathBuf;

use d4explorer_core::errors::RangesError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid histogram bin label '{label}' at row {row}")]
    InvalidBin { label: String, row: usize },

    #[error("Sentinel bin '{label}' found at row {row}; '<' bins must come first and '>' bins last")]
    MisplacedSentinel { label: String, row: usize },

    #[error("Histogram table is empty")]
    EmptyTable,

    #[error("Histogram columns differ in length: {0}")]
    ShapeMismatch(String),

    #[error("Member '{feature}' has genome size {found}, collection has {expected}")]
    GenomeSizeMismatch {
        feature: String,
        expected: u64,
        found: u64,
    },

    #[error("Annotation file not found: {0}")]
    MissingAnnotation(PathBuf),

    #[error(transparent)]
    Ranges(#[from] RangesError),
}

pub type Result<T> = std::result::Result<T, HistError>;
