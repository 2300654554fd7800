use std::env;
use std::path::PathBuf;

use dirs::home_dir;
use tabled::{Table, Tabled};

use crate::consts::{D4EXPLORER_CACHE_ENV, DEFAULT_CACHE_SUBDIR};
use crate::metadata::Metadata;

#[derive(Tabled)]
pub struct EntryPrint {
    key: String,
    class: String,
    software: String,
    version: String,
}

/// Get default cache folder from environment variable, if not available then use the home folder
///
/// # Returns
/// - path to cache folder
pub fn get_default_cache_folder() -> PathBuf {
    if let Ok(val) = env::var(D4EXPLORER_CACHE_ENV) {
        PathBuf::from(val)
    } else {
        let home = env::var("HOME")
            .or_else(|_| {
                home_dir()
                    .map(|p| p.to_string_lossy().into_owned())
                    .ok_or(std::env::VarError::NotPresent)
            })
            .unwrap_or_else(|_| "/tmp".to_string());

        let mut path = PathBuf::from(home);
        path.push(DEFAULT_CACHE_SUBDIR);
        path
    }
}

/// Render cache entries as a table.
pub fn entries_table(entries: &[(String, Metadata)]) -> Table {
    let rows: Vec<EntryPrint> = entries
        .iter()
        .map(|(key, metadata)| EntryPrint {
            key: key.clone(),
            class: metadata.class.to_string(),
            software: metadata.software.clone(),
            version: metadata.version.clone(),
        })
        .collect();
    Table::new(rows)
}

pub fn print_entries(entries: &[(String, Metadata)]) {
    println!("{}", entries_table(entries));
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    use crate::keys::ClassTag;

    #[rstest]
    fn test_entries_table() {
        let entries = vec![(
            "d4explorer:D4Hist:a".to_string(),
            Metadata::new("d4explorer:D4Hist:a", ClassTag::D4Hist, ""),
        )];
        let rendered = entries_table(&entries).to_string();
        assert!(rendered.contains("d4explorer:D4Hist:a"));
        assert!(rendered.contains("class"));
    }

    #[rstest]
    fn test_default_cache_folder() {
        let folder = get_default_cache_folder();
        match env::var(D4EXPLORER_CACHE_ENV) {
            Ok(val) => assert_eq!(folder, PathBuf::from(val)),
            Err(_) => assert!(folder.ends_with(DEFAULT_CACHE_SUBDIR)),
        }
    }
}
