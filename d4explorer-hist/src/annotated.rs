use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, info};

use d4explorer_core::models::{Bed, Gff3};
use d4explorer_core::utils::inner_extension;

use crate::errors::{HistError, Result};
use crate::hist::D4Hist;
use crate::table::{FlatRow, FlatTable};

///
/// Parsed content of an annotation file.
///
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationData {
    Gff3(Gff3),
    Bed(Bed),
}

impl AnnotationData {
    ///
    /// Read an annotation file, choosing the parser from the extension
    /// (`.bed` for BED, anything else as GFF3; `.gz` is looked through).
    ///
    pub fn read(path: &Path) -> Result<AnnotationData> {
        match inner_extension(path).as_deref() {
            Some("bed") => Ok(AnnotationData::Bed(Bed::try_from(path)?)),
            _ => Ok(AnnotationData::Gff3(Gff3::try_from(path)?)),
        }
    }
}

///
/// Reference to the annotation a collection was built from. The file is only
/// parsed on first access.
///
#[derive(Debug, Clone)]
pub struct Annotation {
    path: PathBuf,
    data: OnceLock<AnnotationData>,
}

impl Annotation {
    ///
    /// Refer to an annotation on disk. Fails if the path does not exist.
    ///
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Annotation> {
        let path = path.into();
        if !path.exists() {
            return Err(HistError::MissingAnnotation(path));
        }
        Ok(Annotation {
            path,
            data: OnceLock::new(),
        })
    }

    /// An annotation whose content is already at hand.
    pub fn with_data(path: impl Into<PathBuf>, data: AnnotationData) -> Annotation {
        Annotation {
            path: path.into(),
            data: OnceLock::from(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }

    /// Parsed annotation, read from disk on first call.
    pub fn data(&self) -> Result<&AnnotationData> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }
        debug!(path = %self.path.display(), "loading annotation");
        let data = AnnotationData::read(&self.path)?;
        Ok(self.data.get_or_init(|| data))
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

///
/// Histograms of one depth file across all features.
///
/// Members are ordered with the whole-genome histogram first. Every member
/// shares the collection's genome size.
///
#[derive(Debug, Clone, PartialEq)]
pub struct D4AnnotatedHist {
    members: Vec<D4Hist>,
    path: PathBuf,
    max_bins: u64,
    annotation: Option<Annotation>,
    genome_size: u64,
}

impl D4AnnotatedHist {
    ///
    /// Bind member histograms to their source file.
    ///
    /// Members without a genome size get the collection's; a member carrying
    /// a different genome size is rejected.
    ///
    pub fn new(
        members: Vec<D4Hist>,
        path: impl Into<PathBuf>,
        max_bins: u64,
        genome_size: u64,
        annotation: Option<Annotation>,
    ) -> Result<D4AnnotatedHist> {
        let mut members = members;
        for member in members.iter_mut() {
            match member.genome_size() {
                None => member.set_genome_size(genome_size),
                Some(found) if found != genome_size => {
                    return Err(HistError::GenomeSizeMismatch {
                        feature: member.feature_name().unwrap_or("-").to_string(),
                        expected: genome_size,
                        found,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(D4AnnotatedHist {
            members,
            path: path.into(),
            max_bins,
            annotation,
            genome_size,
        })
    }

    pub fn members(&self) -> &[D4Hist] {
        &self.members
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_bins(&self) -> u64 {
        self.max_bins
    }

    pub fn genome_size(&self) -> u64 {
        self.genome_size
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Feature names in member order; feature-less members are skipped.
    pub fn features(&self) -> Vec<String> {
        self.members
            .iter()
            .filter_map(|m| m.feature_name().map(String::from))
            .collect()
    }

    pub fn get_index(&self, index: usize) -> Option<&D4Hist> {
        self.members.get(index)
    }

    pub fn get(&self, feature: &str) -> Option<&D4Hist> {
        self.members
            .iter()
            .find(|m| m.feature_name() == Some(feature))
    }

    /// Shape of the first member's table
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.members.first().map(D4Hist::shape)
    }

    /// Smallest bin of the first member, usually the genome.
    pub fn min(&self) -> Option<i64> {
        self.members.first().and_then(|m| m.x().first().copied())
    }

    /// Largest bin of the first member, usually the genome.
    pub fn max(&self) -> Option<i64> {
        self.members.first().and_then(|m| m.x().last().copied())
    }

    ///
    /// Mask every member to the bins with `low <= x <= high`. The data is
    /// untouched; the same predicate is applied to each member's own bins.
    ///
    pub fn filter_by_range(&mut self, low: i64, high: i64) {
        debug!(low, high, "filtering by range");
        for member in self.members.iter_mut() {
            member.set_range_mask(low, high);
        }
    }

    pub fn reset_filter(&mut self) {
        for member in self.members.iter_mut() {
            member.reset_mask();
        }
    }

    ///
    /// New collection holding only the members whose feature is named in
    /// `names`, in member order. No match gives an empty collection.
    ///
    pub fn filter_by_feature_names<S: AsRef<str>>(&self, names: &[S]) -> D4AnnotatedHist {
        let members: Vec<D4Hist> = self
            .members
            .iter()
            .filter(|m| {
                m.feature_name()
                    .is_some_and(|f| names.iter().any(|n| n.as_ref() == f))
            })
            .cloned()
            .collect();
        if members.is_empty() {
            info!(path = %self.path.display(), "no features matched the selection");
        }

        D4AnnotatedHist {
            members,
            path: self.path.clone(),
            max_bins: self.max_bins,
            annotation: self.annotation.clone(),
            genome_size: self.genome_size,
        }
    }

    ///
    /// Concatenate all members into one long table with the feature name,
    /// bases, coverage fraction and mask of every bin.
    ///
    pub fn flatten_to_table(&self) -> Result<FlatTable> {
        let mut rows = Vec::with_capacity(self.members.iter().map(D4Hist::len).sum());
        for member in &self.members {
            let feature = member.feature_name().unwrap_or_default();
            let nbases = member.nbases();
            let coverage = member.coverage()?;
            for i in 0..member.len() {
                rows.push(FlatRow {
                    feature: feature.to_string(),
                    x: member.x()[i],
                    counts: member.counts()[i],
                    nbases: nbases[i],
                    coverage: coverage[i],
                    mask: member.mask()[i],
                });
            }
        }
        Ok(FlatTable { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use d4explorer_core::models::{Feature, Interval};
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn member(name: &str, length: u64, counts: [u64; 4]) -> D4Hist {
        let raw = [
            ("<0", counts[0]),
            ("0", counts[1]),
            ("1", counts[2]),
            (">1", counts[3]),
        ];
        D4Hist::from_raw(&raw)
            .unwrap()
            .with_feature(Feature::new(name, vec![Interval::new("chr1", 0, length)]))
    }

    #[fixture]
    fn collection() -> D4AnnotatedHist {
        D4AnnotatedHist::new(
            vec![
                member("genome", 100, [0, 10, 60, 30]),
                member("gene", 40, [0, 5, 25, 10]),
                member("exon", 10, [0, 0, 8, 2]),
            ],
            "sample.d4",
            1,
            100,
            None,
        )
        .unwrap()
    }

    #[rstest]
    fn test_members_share_genome_size(collection: D4AnnotatedHist) {
        assert!(collection.members().iter().all(|m| m.genome_size() == Some(100)));
        assert_eq!(collection.features(), vec!["genome", "gene", "exon"]);
        assert_eq!(collection.min(), Some(-1));
        assert_eq!(collection.max(), Some(2));
        assert_eq!(collection.shape(), Some((4, 2)));
    }

    #[rstest]
    fn test_genome_size_mismatch() {
        let result = D4AnnotatedHist::new(
            vec![member("genome", 100, [0, 1, 1, 1]).with_genome_size(50)],
            "sample.d4",
            1,
            100,
            None,
        );
        assert!(matches!(
            result,
            Err(HistError::GenomeSizeMismatch { expected: 100, found: 50, .. })
        ));
    }

    #[rstest]
    fn test_missing_annotation() {
        assert!(matches!(
            Annotation::from_path("/no/such/annotation.gff3"),
            Err(HistError::MissingAnnotation(_))
        ));
    }

    #[rstest]
    fn test_filter_by_range_masks_every_member(mut collection: D4AnnotatedHist) {
        collection.filter_by_range(0, 1);
        for m in collection.members() {
            assert_eq!(m.mask(), &[false, true, true, false]);
        }
        assert_eq!(collection.get_index(1).unwrap().counts(), &[0, 5, 25, 10]);

        collection.reset_filter();
        assert!(collection.members().iter().all(|m| m.mask().iter().all(|b| *b)));
    }

    #[rstest]
    fn test_filter_by_feature_names(collection: D4AnnotatedHist) {
        let subset = collection.filter_by_feature_names(&["exon", "genome"]);
        assert_eq!(subset.features(), vec!["genome", "exon"]);
        assert_eq!(subset.genome_size(), 100);

        let empty = collection.filter_by_feature_names(&["CDS"]);
        assert!(empty.is_empty());
        assert_eq!(empty.min(), None);
        assert!(empty.flatten_to_table().unwrap().is_empty());
    }

    #[rstest]
    fn test_featureless_member_never_matches() {
        let anonymous = D4Hist::from_raw(&[("0", 1), ("1", 1)]).unwrap();
        let collection =
            D4AnnotatedHist::new(vec![anonymous], "sample.d4", 1, 10, None).unwrap();
        assert!(collection.filter_by_feature_names(&[""]).is_empty());
        assert!(collection.features().is_empty());
    }

    #[rstest]
    fn test_flatten_to_table(mut collection: D4AnnotatedHist) {
        collection.filter_by_range(1, 2);
        let table = collection.flatten_to_table().unwrap();
        assert_eq!(table.len(), 12);

        let exon: Vec<&FlatRow> = table.rows.iter().filter(|r| r.feature == "exon").collect();
        assert_eq!(
            exon.iter().map(|r| r.nbases).collect::<Vec<_>>(),
            vec![0, 0, 8, 4]
        );
        assert_eq!(exon[2].coverage, 0.08);
        assert_eq!(
            exon.iter().map(|r| r.mask).collect::<Vec<_>>(),
            vec![false, false, true, true]
        );
    }

    #[rstest]
    fn test_annotation_lazy_load() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../tests/data/annotation.gff3");
        let annotation = Annotation::from_path(&path).unwrap();
        assert!(!annotation.is_loaded());
        match annotation.data().unwrap() {
            AnnotationData::Gff3(gff) => assert_eq!(gff.feature_types().len(), 3),
            other => panic!("expected GFF3 annotation, got {:?}", other),
        }
        assert!(annotation.is_loaded());
    }
}
