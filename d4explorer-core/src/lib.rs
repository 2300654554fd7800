//! # d4explorer core models
//!
//! Interval tables (BED and GFF3) and named [models::Feature] sets, the
//! building blocks for per-feature coverage histograms.
//!
//! ```rust,ignore
//! use d4explorer_core::models::{Feature, Gff3};
//!
//! let gff = Gff3::try_from("annotation.gff3")?;
//! for ftype in gff.feature_types() {
//!     let mut feature = Feature::from_gff3_slice(&gff, &ftype);
//!     feature.merge();
//!     println!("{}: {}", feature.name, feature.format_length());
//! }
//! ```
pub mod errors;
pub mod models;
pub mod utils;
