use std::fs;
use std::path::{Path, PathBuf};

use d4explorer_cache::errors::CacheError;
use d4explorer_cache::keys::{ClassTag, member_key};
use d4explorer_cache::{
    D4ExplorerCache, cache_key, list_datasets, load_annotated_hist, store_annotated_hist,
};
use d4explorer_core::models::{Feature, Interval};
use d4explorer_hist::{Annotation, D4AnnotatedHist, D4Hist};

use pretty_assertions::assert_eq;
use rstest::*;
use tempfile::{TempDir, tempdir};

#[fixture]
fn annotation_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../tests/data/annotation.gff3")
}

fn cache_in(dir: &Path) -> D4ExplorerCache {
    D4ExplorerCache::builder()
        .with_cache_folder(dir.join("cache"))
        .finish()
        .unwrap()
}

fn dataset(dir: &Path, annotation_path: &Path) -> D4AnnotatedHist {
    let d4 = dir.join("sample.d4");
    fs::write(&d4, b"not really a d4 file").unwrap();

    let genome = Feature::new(
        "genome",
        vec![
            Interval::new("chr1", 0, 1_000_000),
            Interval::new("chr2", 0, 1_000_000),
            Interval::new("chr3", 0, 1_000_000),
        ],
    );
    let gene = Feature::new(
        "gene",
        vec![
            Interval::new("chr1", 1000, 5000),
            Interval::new("chr2", 100, 1100),
        ],
    )
    .with_source_path(annotation_path);

    let members = vec![
        D4Hist::from_raw(&[("0", 2_000_000), ("1", 900_000), (">1", 100_000)])
            .unwrap()
            .with_feature(genome),
        D4Hist::from_raw(&[("0", 1000), ("1", 4000)])
            .unwrap()
            .with_feature(gene),
    ];
    let annotation = Annotation::from_path(annotation_path).unwrap();
    D4AnnotatedHist::new(members, d4, 1, 3_000_000, Some(annotation)).unwrap()
}

#[rstest]
fn test_dataset_round_trip(annotation_path: PathBuf) {
    let dir: TempDir = tempdir().unwrap();
    let cache = cache_in(dir.path());
    let hist = dataset(dir.path(), &annotation_path);

    let key = store_annotated_hist(&cache, &hist).unwrap();
    assert_eq!(
        key,
        cache_key(hist.path(), 1, Some(annotation_path.as_path())).unwrap()
    );
    assert_eq!(list_datasets(&cache).unwrap(), vec![key.clone()]);

    let loaded = load_annotated_hist(&cache, &key).unwrap().unwrap();
    assert_eq!(loaded, hist);
    assert_eq!(loaded.features(), vec!["genome", "gene"]);
    assert_eq!(loaded.members()[0].original(), hist.members()[0].original());

    let annotation = loaded.annotation().unwrap();
    assert_eq!(annotation.path(), annotation_path.as_path());
    assert!(annotation.is_loaded());
}

#[rstest]
fn test_store_is_idempotent(annotation_path: PathBuf) {
    let dir = tempdir().unwrap();
    let cache = cache_in(dir.path());
    let hist = dataset(dir.path(), &annotation_path);

    let first = store_annotated_hist(&cache, &hist).unwrap();
    let count = cache.keys().unwrap().len();
    // two features, two histograms, the annotation and the dataset
    assert_eq!(count, 6);

    let second = store_annotated_hist(&cache, &hist).unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.keys().unwrap().len(), count);
}

#[rstest]
fn test_load_miss_and_missing_member(annotation_path: PathBuf) {
    let dir = tempdir().unwrap();
    let cache = cache_in(dir.path());
    let hist = dataset(dir.path(), &annotation_path);

    assert!(
        load_annotated_hist(&cache, "d4explorer:D4AnnotatedHist:/nowhere:0:1:None")
            .unwrap()
            .is_none()
    );

    let key = store_annotated_hist(&cache, &hist).unwrap();
    let gene_hist = member_key(&key, ClassTag::D4Hist, "1-gene");
    assert!(cache.remove(&gene_hist).unwrap());

    match load_annotated_hist(&cache, &key) {
        Err(CacheError::MissingChild { parent, child }) => {
            assert_eq!(parent, key);
            assert_eq!(child, gene_hist);
        }
        other => panic!("expected a missing child, got {:?}", other.map(|h| h.is_some())),
    }
}

#[rstest]
fn test_load_member_key_as_dataset_is_class_mismatch(annotation_path: PathBuf) {
    let dir = tempdir().unwrap();
    let cache = cache_in(dir.path());
    let hist = dataset(dir.path(), &annotation_path);
    let key = store_annotated_hist(&cache, &hist).unwrap();

    let genome_hist = member_key(&key, ClassTag::D4Hist, "0-genome");
    assert!(matches!(
        load_annotated_hist(&cache, &genome_hist),
        Err(CacheError::ClassMismatch { .. })
    ));
}
