//! # Histogram preprocessing
//!
//! Turns a d4 depth file, and optionally a GFF3 or BED annotation, into a
//! [d4explorer_hist::D4AnnotatedHist] with one histogram per feature. The
//! depth histograms come from a [tools::HistogramSource], normally the
//! `d4tools` binary, run in parallel on a bounded [pool::MaxQueuePool].
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use d4explorer_pipeline::{PreprocessOptions, preprocess};
//!
//! let options = PreprocessOptions::default();
//! let report = preprocess(Arc::new(options.d4tools()), Path::new("sample.d4"), &options).unwrap();
//! println!("{:?}", report.hist.features());
//! ```
pub mod config;
pub mod consts;
pub mod errors;
pub mod pool;
pub mod preprocess;
pub mod tools;

pub use config::{FailurePolicy, PreprocessOptions};
pub use errors::PipelineError;
pub use pool::{MaxQueuePool, TaskHandle, as_completed};
pub use preprocess::{PreprocessReport, make_features, preprocess, preprocess_cached};
pub use tools::{D4Tools, HistogramSource};
