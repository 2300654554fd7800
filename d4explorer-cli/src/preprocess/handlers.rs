use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tabled::{Table, Tabled};
use tracing::warn;

use d4explorer_hist::D4AnnotatedHist;
use d4explorer_pipeline::{
    FailurePolicy, PreprocessOptions, PreprocessReport, preprocess, preprocess_cached,
};

use crate::cache::handlers::open_cache;

#[derive(Tabled)]
struct MemberPrint {
    feature: String,
    length: String,
    bins: usize,
    max_depth: String,
}

fn members_table(hist: &D4AnnotatedHist) -> Table {
    let rows: Vec<MemberPrint> = hist
        .members()
        .iter()
        .map(|member| MemberPrint {
            feature: member.feature_name().unwrap_or("-").to_string(),
            length: member
                .feature()
                .map(|f| f.format_length())
                .unwrap_or_default(),
            bins: member.len(),
            max_depth: member
                .max_nonzero_x()
                .map(|x| x.to_string())
                .unwrap_or_default(),
        })
        .collect();
    Table::new(rows)
}

///
/// Options from `--config` if given, overridden by the flags that were set.
///
pub fn options_from_matches(matches: &ArgMatches) -> Result<PreprocessOptions> {
    let mut options = match matches.get_one::<String>("config") {
        Some(config) => PreprocessOptions::try_from(Path::new(config))
            .with_context(|| format!("Failed to read config file '{}'", config))?,
        None => PreprocessOptions::default(),
    };

    if let Some(annotation) = matches.get_one::<String>("annotation-file") {
        options.annotation_file = Some(PathBuf::from(annotation));
    }
    if let Some(chrom_sizes) = matches.get_one::<String>("chrom-sizes") {
        options.chrom_sizes = Some(PathBuf::from(chrom_sizes));
    }
    if let Some(max_bins) = matches.get_one::<u64>("max-bins") {
        options.max_bins = *max_bins;
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        options.threads = *threads;
    }
    if let Some(max_queue_size) = matches.get_one::<usize>("max-queue-size") {
        options.max_queue_size = Some(*max_queue_size);
    }
    if let Some(d4tools) = matches.get_one::<String>("d4tools") {
        options.d4tools = Some(PathBuf::from(d4tools));
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        options.timeout = Some(*timeout);
    }
    if let Some(on_error) = matches.get_one::<String>("on-error") {
        options.on_error = on_error.parse::<FailurePolicy>()?;
    }
    if let Some(cache_folder) = matches.get_one::<String>("cache-folder") {
        options.cache_folder = Some(PathBuf::from(cache_folder));
    }
    if matches.get_flag("no-progress") {
        options.progress = false;
    }

    options.validate()?;
    Ok(options)
}

pub fn run_preprocess(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("path")
        .map(PathBuf::from)
        .context("A d4 file is required")?;
    let options = options_from_matches(matches)?;
    let source = Arc::new(options.d4tools());

    let report: PreprocessReport = if matches.get_flag("no-cache") {
        preprocess(source, &path, &options)
    } else {
        let cache = open_cache(options.cache_folder.clone())?;
        preprocess_cached(&cache, source, &path, &options)
    }
    .with_context(|| format!("Failed to preprocess '{}'", path.display()))?;

    println!("{}", members_table(&report.hist));
    for (feature, err) in &report.failures {
        warn!(feature = %feature, error = %err, "feature skipped");
    }
    match (&report.cache_key, report.from_cache) {
        (Some(key), true) => println!("Loaded from cache: {}", key),
        (Some(key), false) => println!("Cached as: {}", key),
        (None, _) => println!("Not cached"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::preprocess::cli::create_preprocess_cli;

    #[rstest]
    fn test_flags_override_defaults() {
        let matches = create_preprocess_cli()
            .try_get_matches_from([
                "preprocess",
                "sample.d4",
                "--max-bins",
                "250",
                "--threads",
                "3",
                "--on-error",
                "skip",
                "--no-progress",
            ])
            .unwrap();
        let options = options_from_matches(&matches).unwrap();
        assert_eq!(options.max_bins, 250);
        assert_eq!(options.threads, 3);
        assert_eq!(options.queue_size(), 6);
        assert_eq!(options.on_error, FailurePolicy::Skip);
        assert!(!options.progress);
        assert_eq!(options.annotation_file, None);
    }

    #[rstest]
    fn test_invalid_values_rejected() {
        let matches = create_preprocess_cli()
            .try_get_matches_from(["preprocess", "sample.d4", "--threads", "0"])
            .unwrap();
        assert!(options_from_matches(&matches).is_err());

        assert!(
            create_preprocess_cli()
                .try_get_matches_from(["preprocess", "sample.d4", "--on-error", "retry"])
                .is_err()
        );
    }
}
