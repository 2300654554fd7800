use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RangesError {
    #[error("Expected {expected} columns in {format} record, got {found} (line {line})")]
    ColumnCount {
        format: &'static str,
        expected: String,
        found: usize,
        line: usize,
    },

    #[error("Invalid {field} value '{value}' in {format} record (line {line})")]
    InvalidField {
        format: &'static str,
        field: &'static str,
        value: String,
        line: usize,
    },

    #[error("Interval end precedes start: {seqid}:{start}-{end} (line {line})")]
    InvertedInterval {
        seqid: String,
        start: u64,
        end: u64,
        line: usize,
    },

    #[error("No records found in {0}")]
    Empty(PathBuf),

    #[error("Can't read file: {0}")]
    FileReadError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RangesError>;
