//! Constants for the cache layout and key namespace.

/// Environment variable name for setting the cache directory location.
///
/// When set, this overrides the default cache location (`~/.d4explorer/cache`).
///
/// # Example
///
/// ```bash
/// export D4EXPLORER_CACHE=/scratch/d4explorer
/// ```
pub const D4EXPLORER_CACHE_ENV: &str = "D4EXPLORER_CACHE";

/// Cache location below the home directory when no folder is configured.
pub const DEFAULT_CACHE_SUBDIR: &str = ".d4explorer/cache";

/// Every cache key starts with this namespace.
pub const KEY_NAMESPACE: &str = "d4explorer";

/// Marker used in keys for "no annotation".
pub const NO_ANNOTATION: &str = "None";

/// Entries are stored in `<cache_folder>/entries/`.
pub const DEFAULT_ENTRY_SUBFOLDER: &str = "entries";

pub const METADATA_EXT: &str = ".json";
pub const PAYLOAD_EXT: &str = ".bin";

/// Suffix of metadata files still being written.
pub const PARTIAL_EXT: &str = ".partial";

/// Software tag written into every metadata record.
pub const SOFTWARE: &str = "d4explorer";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
