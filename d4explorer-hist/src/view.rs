use serde::{Deserialize, Serialize};

use crate::annotated::D4AnnotatedHist;
use crate::errors::Result;
use crate::table::FlatTable;

/// Feature types with a fixed display position; anything else follows.
pub const KNOWN_FEATURES: [&str; 9] = [
    "genome",
    "intergenic",
    "gene",
    "mRNA",
    "CDS",
    "exon",
    "UTR",
    "five_prime_UTR",
    "three_prime_UTR",
];

///
/// Order feature names for display: known types first in their fixed order,
/// then the rest in the order given.
///
pub fn order_features<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut rest: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
    let mut order = Vec::with_capacity(rest.len());
    for known in KNOWN_FEATURES {
        if let Some(pos) = rest.iter().position(|v| *v == known) {
            order.push(rest.remove(pos).to_string());
        }
    }
    order.extend(rest.into_iter().map(String::from));
    order
}

///
/// What a viewer currently selects: a depth range and a set of features.
///
/// An empty feature list selects every feature.
///
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub range: Option<(i64, i64)>,
    pub features: Vec<String>,
}

impl ViewState {
    pub fn with_range(mut self, low: i64, high: i64) -> ViewState {
        self.range = Some((low, high));
        self
    }

    pub fn with_features<S: Into<String>>(mut self, features: impl IntoIterator<Item = S>) -> ViewState {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }
}

///
/// The collection restricted to a view state: selected features only, masked
/// to the selected range. The input collection is not modified.
///
pub fn apply_view(collection: &D4AnnotatedHist, state: &ViewState) -> D4AnnotatedHist {
    let mut view = if state.features.is_empty() {
        collection.clone()
    } else {
        collection.filter_by_feature_names(&state.features)
    };
    match state.range {
        Some((low, high)) => view.filter_by_range(low, high),
        None => view.reset_filter(),
    }
    view
}

///
/// Derive the table to display for a view state; call again on every
/// selection change.
///
pub fn recompute(collection: &D4AnnotatedHist, state: &ViewState) -> Result<FlatTable> {
    apply_view(collection, state).flatten_to_table()
}
