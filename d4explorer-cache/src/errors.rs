use d4explorer_core::errors::RangesError;
use d4explorer_hist::HistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Metadata failed schema validation: {0}")]
    SchemaValidation(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Metadata id '{id}' does not match cache key '{key}'")]
    KeyMismatch { key: String, id: String },

    #[error("Entry '{key}' is a {found}, expected {expected}")]
    ClassMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Entry '{parent}' refers to '{child}', which is not in the cache")]
    MissingChild { parent: String, child: String },

    #[error("Entry '{0}' has no payload")]
    MissingPayload(String),

    #[error("Failed to encode or decode payload: {0}")]
    Payload(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Hist(#[from] HistError),

    #[error(transparent)]
    Ranges(#[from] RangesError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
