//! Cache key derivation.
//!
//! Keys are plain strings `d4explorer:<Class>:<identity...>`. A dataset is
//! identified by the absolute, normalized path of its depth file, the file's
//! byte size and the processing parameters. Only the size stands in for the
//! content: an edit that keeps the size unchanged maps to the same key.

use std::fmt::{self, Display};
use std::path::Path;

use md5::{Digest, Md5};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use d4explorer_core::utils::normalize_path;

use crate::consts::{KEY_NAMESPACE, NO_ANNOTATION};
use crate::errors::Result;

///
/// Kind of object behind a cache entry.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClassTag {
    D4AnnotatedHist,
    D4Hist,
    Feature,
    #[serde(rename = "GFF3")]
    Gff3,
    Bed,
}

impl ClassTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassTag::D4AnnotatedHist => "D4AnnotatedHist",
            ClassTag::D4Hist => "D4Hist",
            ClassTag::Feature => "Feature",
            ClassTag::Gff3 => "GFF3",
            ClassTag::Bed => "Bed",
        }
    }

    /// Key prefix shared by all entries of this class.
    pub fn prefix(&self) -> String {
        format!("{}:{}:", KEY_NAMESPACE, self.as_str())
    }
}

impl Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<absolute normalized path>:<size in bytes>`
fn file_identity(path: &Path) -> Result<String> {
    let size = std::fs::metadata(path)?.len();
    let absname = normalize_path(path)?;
    Ok(format!("{}:{}", absname.display(), size))
}

///
/// Key of a preprocessed dataset.
///
/// ```text
/// d4explorer:D4AnnotatedHist:/data/sample.d4:123456:1000:None
/// ```
///
/// # Arguments
///
/// - path: depth file; must exist, its size is part of the key
/// - max_bins: histogram upper bound used for preprocessing
/// - annotation: annotation file, absolute and normalized like `path`, or `None`
///
pub fn cache_key(path: &Path, max_bins: u64, annotation: Option<&Path>) -> Result<String> {
    let annotation = match annotation {
        Some(a) => normalize_path(a)?.display().to_string(),
        None => NO_ANNOTATION.to_string(),
    };
    Ok(format!(
        "{}{}:{}:{}",
        ClassTag::D4AnnotatedHist.prefix(),
        file_identity(path)?,
        max_bins,
        annotation
    ))
}

///
/// Key of an annotation file entry: `d4explorer:GFF3:<path>:<size>` (or
/// `Bed`).
///
pub fn annotation_key(path: &Path, class: ClassTag) -> Result<String> {
    Ok(format!("{}{}", class.prefix(), file_identity(path)?))
}

///
/// Key of an object owned by a dataset, e.g. one member histogram.
/// The dataset identity is kept and `name` appended.
///
pub fn member_key(dataset_key: &str, class: ClassTag, name: &str) -> String {
    let identity = dataset_key
        .strip_prefix(&ClassTag::D4AnnotatedHist.prefix())
        .unwrap_or(dataset_key);
    format!("{}{}:{}", class.prefix(), identity, name)
}

pub fn is_dataset_key(key: &str) -> bool {
    key.starts_with(&ClassTag::D4AnnotatedHist.prefix())
}

///
/// Hex md5 of a key; names the entry's files on disk.
///
pub fn key_digest(key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}
