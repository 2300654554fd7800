use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;

use d4explorer_cache::utils::print_entries;
use d4explorer_cache::{D4ExplorerCache, Schema, list_datasets};

use crate::cache::cli::{CACHE_LIST, CACHE_REMOVE, CACHE_SCHEMA, CACHE_SHOW};

///
/// Open the cache in `folder`, or in the default location.
///
pub fn open_cache(folder: Option<PathBuf>) -> Result<D4ExplorerCache> {
    let builder = D4ExplorerCache::builder();
    let builder = match folder {
        Some(folder) => builder.with_cache_folder(folder),
        None => builder,
    };
    builder.finish().context("Failed to open the cache")
}

/// Execute the cache subcommands
/// # Arguments
/// - matches: matched items from CLAP args
pub fn run_cache(matches: &ArgMatches) -> Result<()> {
    let Some((subcmd, sub_matches)) = matches.subcommand() else {
        bail!("A cache subcommand is required");
    };

    if subcmd == CACHE_SCHEMA {
        println!("{}", Schema::metadata()?);
        return Ok(());
    }

    let cache = open_cache(
        sub_matches
            .get_one::<String>("cache-folder")
            .map(PathBuf::from),
    )?;

    match subcmd {
        CACHE_LIST => {
            let entries = cache.entries()?;
            let entries = if sub_matches.get_flag("all") {
                entries
            } else {
                let datasets = list_datasets(&cache)?;
                entries
                    .into_iter()
                    .filter(|(key, _)| datasets.contains(key))
                    .collect()
            };
            let n = entries.len();
            print_entries(&entries);
            println!("Number of entries: {}", n);
        }
        CACHE_SHOW => {
            let key = sub_matches
                .get_one::<String>("key")
                .context("A cache key is required")?;
            match cache.get(key)? {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry.metadata)?),
                None => bail!("'{}' is not in the cache", key),
            }
        }
        CACHE_REMOVE => {
            let key = sub_matches
                .get_one::<String>("key")
                .context("A cache key is required")?;
            if !cache.remove(key)? {
                bail!("'{}' is not in the cache", key);
            }
            println!("Removed {}", key);
        }
        _ => unreachable!("Unknown cache subcommand: {subcmd}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    use crate::cache::cli::create_cache_cli;

    #[rstest]
    fn test_cache_folder_reaches_subcommands() {
        let matches = create_cache_cli()
            .try_get_matches_from(["cache", "list", "--cache-folder", "/tmp/d4x", "--all"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(
            sub.get_one::<String>("cache-folder").map(String::as_str),
            Some("/tmp/d4x")
        );
        assert!(sub.get_flag("all"));
    }
}
