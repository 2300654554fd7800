use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tabled::{Table, Tabled};
use tracing::info;

use d4explorer_cache::keys::is_dataset_key;
use d4explorer_cache::{cache_key, load_annotated_hist};
use d4explorer_core::utils::convert_to_si_suffix;
use d4explorer_hist::{
    CoverageSummary, D4AnnotatedHist, FlatTable, ViewState, apply_view, recompute, summarize,
};

use crate::cache::handlers::open_cache;

#[derive(Tabled)]
struct SummaryPrint {
    feature: String,
    size: String,
    selected: String,
    #[tabled(rename = "selected %")]
    selected_pct: f64,
    mean: f64,
    median: f64,
    std: f64,
    #[tabled(rename = "60%")]
    pct60: f64,
    #[tabled(rename = "70%")]
    pct70: f64,
    #[tabled(rename = "80%")]
    pct80: f64,
    #[tabled(rename = "90%")]
    pct90: f64,
    #[tabled(rename = "median+1sd")]
    median_plus_1sd: f64,
    #[tabled(rename = "median+2sd")]
    median_plus_2sd: f64,
}

impl From<&CoverageSummary> for SummaryPrint {
    fn from(s: &CoverageSummary) -> Self {
        SummaryPrint {
            feature: s.feature.clone(),
            size: convert_to_si_suffix(s.size),
            selected: convert_to_si_suffix(s.selected),
            selected_pct: s.selected_pct,
            mean: s.mean,
            median: s.median,
            std: s.std,
            pct60: s.pct60,
            pct70: s.pct70,
            pct80: s.pct80,
            pct90: s.pct90,
            median_plus_1sd: s.median_plus_1sd,
            median_plus_2sd: s.median_plus_2sd,
        }
    }
}

///
/// View described by the `--min`, `--max` and `--features` flags.
///
fn view_state(matches: &ArgMatches, collection: &D4AnnotatedHist) -> ViewState {
    let mut state = ViewState::default();
    let low = matches.get_one::<i64>("min").copied();
    let high = matches.get_one::<i64>("max").copied();
    if low.is_some() || high.is_some() {
        state = state.with_range(
            low.or(collection.min()).unwrap_or_default(),
            high.or(collection.max()).unwrap_or_default(),
        );
    }
    if let Some(features) = matches.get_many::<String>("features") {
        state = state.with_features(features.cloned());
    }
    state
}

fn write_table(table: &FlatTable, target: &str, format: &str) -> Result<()> {
    let mut writer: Box<dyn Write> = if target == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(
            File::create(target).with_context(|| format!("Failed to create '{}'", target))?,
        ))
    };
    match format {
        "json" => writeln!(writer, "{}", table.to_json()?)?,
        _ => table.write_tsv(&mut writer)?,
    }
    writer.flush()?;
    Ok(())
}

pub fn run_summary(matches: &ArgMatches) -> Result<()> {
    let dataset = matches
        .get_one::<String>("dataset")
        .context("A dataset is required")?;
    let cache = open_cache(
        matches
            .get_one::<String>("cache-folder")
            .map(Into::into),
    )?;

    let key = if is_dataset_key(dataset) {
        dataset.clone()
    } else {
        let max_bins = matches.get_one::<u64>("max-bins").copied().unwrap_or(1000);
        let annotation = matches.get_one::<String>("annotation-file").map(Path::new);
        cache_key(Path::new(dataset), max_bins, annotation)?
    };
    let collection = load_annotated_hist(&cache, &key)?.with_context(|| {
        format!(
            "'{}' is not in the cache, run `d4explorer preprocess` first",
            key
        )
    })?;
    info!(key = %key, members = collection.len(), "loaded dataset");

    let state = view_state(matches, &collection);
    if let Some(target) = matches.get_one::<String>("table") {
        let format = matches
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("tsv");
        write_table(&recompute(&collection, &state)?, target, format)?;
    }

    let view = apply_view(&collection, &state);
    if view.is_empty() {
        println!("No data available");
        return Ok(());
    }
    let sample_size = matches
        .get_one::<usize>("sample-size")
        .copied()
        .unwrap_or(d4explorer_hist::summary::DEFAULT_SAMPLE_SIZE);
    let seed = matches.get_one::<u64>("seed").copied();
    let rows: Vec<SummaryPrint> = summarize(&view, sample_size, seed)
        .iter()
        .map(SummaryPrint::from)
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use d4explorer_core::models::{Feature, Interval};
    use d4explorer_hist::D4Hist;

    use crate::summary::cli::create_summary_cli;

    #[fixture]
    fn collection() -> D4AnnotatedHist {
        let genome = Feature::new("genome", vec![Interval::new("chr1", 0, 100)]);
        let gene = Feature::new("gene", vec![Interval::new("chr1", 10, 30)]);
        let members = vec![
            D4Hist::from_raw(&[("<0", 0), ("0", 40), ("1", 50), (">1", 10)])
                .unwrap()
                .with_feature(genome),
            D4Hist::from_raw(&[("<0", 0), ("0", 5), ("1", 15), (">1", 0)])
                .unwrap()
                .with_feature(gene),
        ];
        D4AnnotatedHist::new(members, "sample.d4", 1, 100, None).unwrap()
    }

    #[rstest]
    fn test_view_from_flags(collection: D4AnnotatedHist) {
        let matches = create_summary_cli()
            .try_get_matches_from(["summary", "sample.d4", "--min", "1", "--features", "gene"])
            .unwrap();
        let state = view_state(&matches, &collection);
        assert_eq!(state.range, Some((1, 2)));
        assert_eq!(state.features, vec!["gene".to_string()]);

        let view = apply_view(&collection, &state);
        assert_eq!(view.features(), vec!["gene"]);
        assert_eq!(view.members()[0].mask(), &[false, false, true, true]);
    }

    #[rstest]
    fn test_unknown_feature_gives_empty_view(collection: D4AnnotatedHist) {
        let matches = create_summary_cli()
            .try_get_matches_from(["summary", "sample.d4", "--features", "CDS,UTR"])
            .unwrap();
        let view = apply_view(&collection, &view_state(&matches, &collection));
        assert!(view.is_empty());
    }

    #[rstest]
    fn test_summary_rows(collection: D4AnnotatedHist) {
        let summaries = summarize(&collection, 1000, Some(1));
        let row = SummaryPrint::from(&summaries[0]);
        assert_eq!(row.feature, "genome");
        assert_eq!(row.size, "100.0 bp");
    }
}
