use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::consts::{SOFTWARE, VERSION};
use crate::keys::ClassTag;

///
/// Reconstruction parameters of a cached object. Composite objects refer to
/// their parts by cache key.
///
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Kwargs {
    /// Keys of the member histograms, in member order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// Key of the feature a histogram belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    /// Key of the annotation entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genome_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bins: Option<u64>,
    /// Source file of the object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

///
/// Record stored alongside every cache entry.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// The entry's own cache key
    pub id: String,
    pub class: ClassTag,
    pub version: String,
    pub software: String,
    pub parameters: String,
    #[serde(default)]
    pub kwargs: Kwargs,
}

impl Metadata {
    pub fn new(id: impl Into<String>, class: ClassTag, parameters: impl Into<String>) -> Metadata {
        Metadata {
            id: id.into(),
            class,
            version: VERSION.to_string(),
            software: SOFTWARE.to_string(),
            parameters: parameters.into(),
            kwargs: Kwargs::default(),
        }
    }

    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Metadata {
        self.kwargs = kwargs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_metadata_json_shape() {
        let metadata = Metadata::new("d4explorer:D4Hist:a", ClassTag::D4Hist, "feature=gene")
            .with_kwargs(Kwargs {
                genome_size: Some(10),
                ..Default::default()
            });
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["class"], "D4Hist");
        assert_eq!(value["software"], "d4explorer");
        assert_eq!(value["kwargs"]["genome_size"], 10);
        assert!(value["kwargs"].get("members").is_none());
    }

    #[rstest]
    fn test_gff3_class_tag() {
        let value = serde_json::to_value(ClassTag::Gff3).unwrap();
        assert_eq!(value, "GFF3");
    }
}
