//! # Content-addressed cache for coverage histograms
//!
//! Computed [d4explorer_hist::D4AnnotatedHist] collections are stored under a
//! key derived from the coverage file's identity, the bin count and the
//! annotation. Each entry is a JSON metadata record plus an optional binary
//! payload, kept in a folder named by the md5 digest of the key.
//!
//! ```no_run
//! use d4explorer_cache::client::D4ExplorerCache;
//! use d4explorer_cache::mapper::list_datasets;
//!
//! let cache = D4ExplorerCache::builder().finish().unwrap();
//! for key in list_datasets(&cache).unwrap() {
//!     println!("{}", key);
//! }
//! ```
pub mod client;
pub mod consts;
pub mod errors;
pub mod keys;
pub mod mapper;
pub mod metadata;
pub mod payload;
pub mod schema;
pub mod utils;

pub use client::{CacheEntry, D4ExplorerCache, D4ExplorerCacheBuilder};
pub use errors::CacheError;
pub use keys::{ClassTag, cache_key};
pub use mapper::{list_datasets, load_annotated_hist, store_annotated_hist};
pub use metadata::{Kwargs, Metadata};
pub use payload::Payload;
pub use schema::Schema;
