//! Cache client.
//!
//! [D4ExplorerCache] is a file-backed key-value store. Each entry is a JSON
//! metadata file plus an optional bincode payload file, placed under
//! `<cache_folder>/entries/<h0>/<h1>/` where `h` is the md5 of the key.

use std::fs::{self, create_dir_all, read_dir, remove_dir, remove_file};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_ENTRY_SUBFOLDER, METADATA_EXT, PARTIAL_EXT, PAYLOAD_EXT};
use crate::errors::{CacheError, Result};
use crate::keys::key_digest;
use crate::metadata::Metadata;
use crate::payload::Payload;
use crate::schema::Schema;
use crate::utils::get_default_cache_folder;

/// Builder for constructing a [`D4ExplorerCache`].
///
/// # Examples
///
/// ```rust,no_run
/// use d4explorer_cache::client::D4ExplorerCache;
/// use std::path::PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = D4ExplorerCache::builder()
///     .with_cache_folder(PathBuf::from("/scratch/d4explorer"))
///     .finish()?;
/// # Ok(())
/// # }
/// ```
pub struct D4ExplorerCacheBuilder {
    cache_folder: Option<PathBuf>,
    schema: Option<Schema>,
    validate: bool,
}

impl Default for D4ExplorerCacheBuilder {
    fn default() -> Self {
        D4ExplorerCacheBuilder {
            cache_folder: None,
            schema: None,
            validate: true,
        }
    }
}

impl D4ExplorerCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache folder; `$VAR`s are expanded.
    pub fn with_cache_folder(mut self, path: PathBuf) -> Self {
        self.cache_folder = Some(path);
        self
    }

    /// Validate metadata against `schema` instead of the generated one.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Turn metadata validation on or off (on by default).
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn finish(self) -> Result<D4ExplorerCache> {
        // handle the cache dir
        let raw_path_to_cache_folder = self.cache_folder.unwrap_or_else(get_default_cache_folder);
        let raw_str_to_cache_folder = raw_path_to_cache_folder.to_string_lossy().into_owned();
        let expanded_str = shellexpand::env(&raw_str_to_cache_folder)
            .unwrap_or_else(|_| raw_str_to_cache_folder.clone().into())
            .into_owned();
        let cache_folder = PathBuf::from(expanded_str);
        create_dir_all(cache_folder.join(DEFAULT_ENTRY_SUBFOLDER))?;

        let schema = match (self.validate, self.schema) {
            (false, _) => None,
            (true, Some(schema)) => Some(schema),
            (true, None) => Some(Schema::metadata()?),
        };

        debug!(cache_folder = %cache_folder.display(), validate = schema.is_some(), "opened cache");
        Ok(D4ExplorerCache {
            cache_folder,
            schema,
        })
    }
}

/// A cache entry as returned by [`D4ExplorerCache::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub metadata: Metadata,
    pub payload: Option<Payload>,
}

// on-disk metadata file
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    metadata: Metadata,
    payload: Option<String>,
}

///
/// File-backed cache of preprocessed datasets.
///
/// Writes are first-writer-wins: adding a key that is already present is a
/// logged no-op. An entry only becomes visible once its metadata file is in
/// place, and that happens after the payload is fully written.
///
pub struct D4ExplorerCache {
    /// Path to the root cache directory
    pub cache_folder: PathBuf,
    schema: Option<Schema>,
}

impl D4ExplorerCache {
    pub fn builder() -> D4ExplorerCacheBuilder {
        D4ExplorerCacheBuilder::default()
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn entry_folder(&self, digest: &str) -> PathBuf {
        self.cache_folder
            .join(DEFAULT_ENTRY_SUBFOLDER)
            .join(&digest[0..1])
            .join(&digest[1..2])
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        let digest = key_digest(key);
        self.entry_folder(&digest)
            .join(format!("{}{}", digest, METADATA_EXT))
    }

    fn read_stored(path: &Path) -> Result<StoredEntry> {
        let reader = BufReader::new(fs::File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Stored entry for `key`, or `None` if absent or a different key hashes
    /// to the same file.
    fn lookup(&self, key: &str) -> Result<Option<(PathBuf, StoredEntry)>> {
        let path = self.metadata_path(key);
        let stored = match Self::read_stored(&path) {
            Ok(stored) => stored,
            Err(CacheError::Io(e)) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if stored.key != key {
            warn!(key, stored = %stored.key, "cache key collision");
            return Ok(None);
        }
        Ok(Some((path, stored)))
    }

    fn validate(&self, metadata: &Metadata) -> Result<()> {
        match &self.schema {
            Some(schema) => schema.validate_metadata(metadata),
            None => Ok(()),
        }
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.lookup(key)?.is_some())
    }

    ///
    /// Look up an entry. A miss is logged and returned as `Ok(None)`.
    ///
    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some((path, stored)) = self.lookup(key)? else {
            warn!(key, "cache miss");
            return Ok(None);
        };
        self.validate(&stored.metadata)?;

        let payload = match &stored.payload {
            Some(name) => {
                let payload_path = path.with_file_name(name);
                Some(Payload::read_from(&payload_path)?)
            }
            None => None,
        };

        debug!(key, "cache hit");
        Ok(Some(CacheEntry {
            metadata: stored.metadata,
            payload,
        }))
    }

    ///
    /// Store an entry unless the key already exists.
    ///
    /// Returns `true` if this call wrote the entry. The metadata is validated
    /// first and its `id` must equal `key`.
    ///
    pub fn add(&self, key: &str, metadata: &Metadata, payload: Option<&Payload>) -> Result<bool> {
        if metadata.id != key {
            return Err(CacheError::KeyMismatch {
                key: key.to_string(),
                id: metadata.id.clone(),
            });
        }
        self.validate(metadata)?;

        if self.has(key)? {
            info!(key, "key already exists in cache");
            return Ok(false);
        }

        let digest = key_digest(key);
        let folder = self.entry_folder(&digest);
        create_dir_all(&folder)?;

        // payload first, under a name no other writer can pick
        let payload_path = match payload {
            Some(payload) => {
                let file = tempfile::Builder::new()
                    .prefix(&format!("{}.", digest))
                    .suffix(PAYLOAD_EXT)
                    .tempfile_in(&folder)?;
                payload.write_to(file.as_file())?;
                let (_, path) = file.keep().map_err(|e| CacheError::Io(e.error))?;
                Some(path)
            }
            None => None,
        };

        let stored = StoredEntry {
            key: key.to_string(),
            metadata: metadata.clone(),
            payload: payload_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
        };
        let mut partial = tempfile::Builder::new()
            .prefix(&format!(".{}.", digest))
            .suffix(PARTIAL_EXT)
            .tempfile_in(&folder)?;
        serde_json::to_writer_pretty(&mut partial, &stored)?;
        partial.flush()?;

        let target = folder.join(format!("{}{}", digest, METADATA_EXT));
        match partial.persist_noclobber(&target) {
            Ok(_) => {
                info!(key, "added to cache");
                Ok(true)
            }
            Err(e) => {
                if let Some(path) = payload_path {
                    let _ = remove_file(path);
                }
                if target.exists() {
                    info!(key, "key was added concurrently; keeping the first entry");
                    Ok(false)
                } else {
                    Err(CacheError::Io(e.error))
                }
            }
        }
    }

    ///
    /// Remove an entry and its payload. Returns `false` if the key is absent.
    ///
    pub fn remove(&self, key: &str) -> Result<bool> {
        let Some((path, stored)) = self.lookup(key)? else {
            return Ok(false);
        };
        remove_file(&path)?;
        if let Some(name) = stored.payload {
            let payload_path = path.with_file_name(name);
            if payload_path.exists() {
                remove_file(&payload_path)?;
            }
        }
        self.prune_empty_folders(&path);
        info!(key, "removed from cache");
        Ok(true)
    }

    // remove the two hash levels if they became empty
    fn prune_empty_folders(&self, metadata_path: &Path) {
        let root = self.cache_folder.join(DEFAULT_ENTRY_SUBFOLDER);
        let mut folder = metadata_path.parent();
        while let Some(dir) = folder {
            if dir == root || remove_dir(dir).is_err() {
                break;
            }
            folder = dir.parent();
        }
    }

    ///
    /// Keys and metadata of every entry, sorted by key.
    ///
    pub fn entries(&self) -> Result<Vec<(String, Metadata)>> {
        let mut entries = Vec::new();
        let root = self.cache_folder.join(DEFAULT_ENTRY_SUBFOLDER);
        let mut stack = vec![root];
        while let Some(dir) = stack.pop() {
            for entry in read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(METADATA_EXT) && !n.starts_with('.'))
                {
                    let stored = Self::read_stored(&path)?;
                    entries.push((stored.key, stored.metadata));
                }
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(key, _)| key).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use d4explorer_core::models::Interval;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::TempDir;

    use crate::keys::ClassTag;

    #[fixture]
    fn cache_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    fn open(dir: &TempDir) -> D4ExplorerCache {
        D4ExplorerCache::builder()
            .with_cache_folder(dir.path().to_path_buf())
            .finish()
            .unwrap()
    }

    fn intervals(end: u64) -> Payload {
        Payload::Intervals(vec![Interval::new("chr1", 0, end)])
    }

    #[rstest]
    fn test_add_and_get(cache_dir: TempDir) {
        let cache = open(&cache_dir);
        let key = "d4explorer:Feature:a";
        let metadata = Metadata::new(key, ClassTag::Feature, "name=gene");

        assert!(!cache.has(key).unwrap());
        assert!(cache.add(key, &metadata, Some(&intervals(10))).unwrap());
        assert!(cache.has(key).unwrap());

        let entry = cache.get(key).unwrap().unwrap();
        assert_eq!(entry.metadata, metadata);
        assert_eq!(entry.payload, Some(intervals(10)));
    }

    #[rstest]
    fn test_add_is_idempotent(cache_dir: TempDir) {
        let cache = open(&cache_dir);
        let key = "d4explorer:Feature:a";
        let first = Metadata::new(key, ClassTag::Feature, "first");
        let second = Metadata::new(key, ClassTag::Feature, "second");

        assert!(cache.add(key, &first, Some(&intervals(10))).unwrap());
        assert!(!cache.add(key, &second, Some(&intervals(99))).unwrap());

        let entry = cache.get(key).unwrap().unwrap();
        assert_eq!(entry.metadata.parameters, "first");
        assert_eq!(entry.payload, Some(intervals(10)));
        assert_eq!(cache.keys().unwrap(), vec![key.to_string()]);
    }

    #[rstest]
    fn test_miss_is_none(cache_dir: TempDir) {
        let cache = open(&cache_dir);
        assert!(cache.get("d4explorer:D4Hist:missing").unwrap().is_none());
        assert!(!cache.remove("d4explorer:D4Hist:missing").unwrap());
    }

    #[rstest]
    fn test_entry_without_payload(cache_dir: TempDir) {
        let cache = open(&cache_dir);
        let key = "d4explorer:D4AnnotatedHist:x";
        cache
            .add(key, &Metadata::new(key, ClassTag::D4AnnotatedHist, ""), None)
            .unwrap();
        assert_eq!(cache.get(key).unwrap().unwrap().payload, None);
    }

    #[rstest]
    fn test_key_mismatch(cache_dir: TempDir) {
        let cache = open(&cache_dir);
        let metadata = Metadata::new("other", ClassTag::Feature, "");
        assert!(matches!(
            cache.add("d4explorer:Feature:a", &metadata, None),
            Err(CacheError::KeyMismatch { .. })
        ));
    }

    #[rstest]
    fn test_invalid_metadata_on_read(cache_dir: TempDir) {
        let cache = open(&cache_dir);
        let key = "d4explorer:Feature:a";
        cache
            .add(key, &Metadata::new(key, ClassTag::Feature, ""), None)
            .unwrap();

        // corrupt a stored field
        let path = cache.metadata_path(key);
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("\"software\": \"d4explorer\"", "\"software\": 3")).unwrap();

        assert!(matches!(cache.get(key), Err(CacheError::Json(_)) | Err(CacheError::SchemaValidation(_))));
    }

    #[rstest]
    fn test_custom_schema_rejects_on_write(cache_dir: TempDir) {
        let schema = Schema::from_json(
            r#"{"type": "object", "properties": {"parameters": {"enum": ["ok"]}}}"#,
        )
        .unwrap();
        let cache = D4ExplorerCache::builder()
            .with_cache_folder(cache_dir.path().to_path_buf())
            .with_schema(schema)
            .finish()
            .unwrap();
        let key = "d4explorer:Feature:a";
        assert!(cache.add(key, &Metadata::new(key, ClassTag::Feature, "ok"), None).unwrap());
        let key2 = "d4explorer:Feature:b";
        assert!(matches!(
            cache.add(key2, &Metadata::new(key2, ClassTag::Feature, "bad"), None),
            Err(CacheError::SchemaValidation(_))
        ));
        assert!(!cache.has(key2).unwrap());
    }

    #[rstest]
    fn test_remove_cleans_up(cache_dir: TempDir) {
        let cache = open(&cache_dir);
        let key = "d4explorer:Feature:a";
        cache
            .add(key, &Metadata::new(key, ClassTag::Feature, ""), Some(&intervals(5)))
            .unwrap();
        assert!(cache.remove(key).unwrap());
        assert!(!cache.has(key).unwrap());
        assert!(cache.keys().unwrap().is_empty());

        let entries = cache_dir.path().join(DEFAULT_ENTRY_SUBFOLDER);
        assert_eq!(read_dir(entries).unwrap().count(), 0);
    }

    #[rstest]
    fn test_concurrent_adds_keep_one_entry(cache_dir: TempDir) {
        let folder = cache_dir.path().to_path_buf();
        let key = "d4explorer:Feature:race";
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let folder = folder.clone();
                std::thread::spawn(move || {
                    let cache = D4ExplorerCache::builder()
                        .with_cache_folder(folder)
                        .finish()
                        .unwrap();
                    let metadata = Metadata::new(key, ClassTag::Feature, i.to_string());
                    cache.add(key, &metadata, Some(&intervals(i + 1))).unwrap()
                })
            })
            .collect();
        let written: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(written.iter().filter(|w| **w).count(), 1);

        let cache = open(&cache_dir);
        let entry = cache.get(key).unwrap().unwrap();
        let i: u64 = entry.metadata.parameters.parse().unwrap();
        assert_eq!(entry.payload, Some(intervals(i + 1)));

        // losers removed their payloads
        let folder = cache.metadata_path(key).parent().unwrap().to_path_buf();
        let payloads = read_dir(folder)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(PAYLOAD_EXT)
            })
            .count();
        assert_eq!(payloads, 1);
    }
}
