use std::path::PathBuf;

use d4explorer_core::models::{Feature, Interval};
use d4explorer_hist::{D4AnnotatedHist, D4Hist, ViewState, recompute, summarize};

use pretty_assertions::assert_eq;
use rstest::*;

#[fixture]
fn raw_rows() -> Vec<(String, u64)> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../tests/data/hist.txt");
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let mut parts = line.split_whitespace();
            let label = parts.next().unwrap().to_string();
            let count = parts.next().unwrap().parse::<u64>().unwrap();
            (label, count)
        })
        .collect()
}

#[fixture]
fn genome() -> Feature {
    Feature::new(
        "genome",
        vec![Interval::new("chr1", 0, 500), Interval::new("chr2", 0, 300)],
    )
}

#[rstest]
fn test_tool_output_normalizes(raw_rows: Vec<(String, u64)>, genome: Feature) {
    let hist = D4Hist::from_raw(&raw_rows).unwrap().with_feature(genome);
    assert_eq!(hist.x(), &[-1, 0, 1, 2, 3, 4, 5]);
    assert_eq!(hist.max_bin(), 4);
    assert_eq!(hist.original(), raw_rows);
    assert_eq!(hist.nbases(), vec![0, 0, 300, 500, 270, 120, 50]);
}

#[rstest]
fn test_collection_view_and_summary(raw_rows: Vec<(String, u64)>, genome: Feature) {
    let hist = D4Hist::from_raw(&raw_rows).unwrap().with_feature(genome);
    let collection = D4AnnotatedHist::new(vec![hist], "sample.d4", 4, 800, None).unwrap();

    let table = recompute(&collection, &ViewState::default().with_range(1, 4)).unwrap();
    let selected: u64 = table.masked().rows.iter().map(|r| r.counts).sum();
    assert_eq!(selected, 300 + 250 + 90 + 30);

    let summaries = summarize(&collection, 1_000, Some(42));
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].size, 800);
    assert_eq!(summaries[0].selected, 300 + 250 + 90 + 30 + 10);
}
