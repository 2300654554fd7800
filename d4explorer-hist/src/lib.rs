//! # Coverage histograms
//!
//! [D4Hist] holds the depth histogram of one feature as produced by the
//! depth tool, normalized so the open-ended `<0` and `>N` bins become plain
//! integers. [D4AnnotatedHist] binds the histograms of every feature of one
//! depth file together and is what gets cached and displayed.
//!
//! ```rust
//! use d4explorer_hist::D4Hist;
//!
//! let hist = D4Hist::from_raw(&[("<0", 0), ("0", 1), ("1", 2), (">1", 1)]).unwrap();
//! assert_eq!(hist.x(), &[-1, 0, 1, 2]);
//! assert_eq!(hist.nbases(), vec![0, 0, 2, 2]);
//! ```
pub mod annotated;
pub mod errors;
pub mod hist;
pub mod summary;
pub mod table;
pub mod view;

pub use annotated::{Annotation, AnnotationData, D4AnnotatedHist};
pub use errors::HistError;
pub use hist::D4Hist;
pub use summary::{CoverageSummary, summarize};
pub use table::{FlatRow, FlatTable};
pub use view::{ViewState, apply_view, order_features, recompute};
