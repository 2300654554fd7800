use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::errors::Result;
use crate::models::ranges::Ranges;
use crate::models::{Bed, Gff3, Interval};
use crate::utils::{convert_to_si_suffix, inner_stem};

/// Name of the feature synthesized from a depth file's chromosome list.
pub const GENOME_FEATURE: &str = "genome";

///
/// A named set of genomic intervals, e.g. all genes of an annotation or the
/// whole genome.
///
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature {
    pub name: String,
    pub intervals: Vec<Interval>,
    pub source_path: Option<PathBuf>,
}

///
/// A region file on disk, removed when dropped.
///
/// The file is one `seqid<TAB>start<TAB>end` line per interval, no header.
///
#[derive(Debug)]
pub struct RegionFile {
    path: PathBuf,
    _dir: TempDir,
}

impl RegionFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Feature {
    pub fn new(name: impl Into<String>, intervals: Vec<Interval>) -> Feature {
        Feature {
            name: name.into(),
            intervals,
            source_path: None,
        }
    }

    ///
    /// Build a feature from a parsed BED table. The BED's path is kept as
    /// provenance.
    ///
    pub fn from_bed(bed: &Bed, name: impl Into<String>) -> Feature {
        Feature {
            name: name.into(),
            intervals: bed.intervals().cloned().collect(),
            source_path: bed.path.clone(),
        }
    }

    ///
    /// Read a BED file into a feature named after the file stem.
    ///
    pub fn from_bed_path(path: &Path) -> Result<Feature> {
        let bed = Bed::try_from(path)?;
        let name = inner_stem(path).unwrap_or_else(|| path.display().to_string());
        Ok(Feature::from_bed(&bed, name))
    }

    ///
    /// Slice a GFF3 annotation by feature type. The feature takes the type as
    /// its name; an unknown type yields an empty feature.
    ///
    pub fn from_gff3_slice(gff: &Gff3, feature_type: &str) -> Feature {
        let slice = gff.select(feature_type);
        Feature {
            name: feature_type.to_string(),
            intervals: slice.intervals().cloned().collect(),
            source_path: gff.path.clone(),
        }
    }

    ///
    /// Whole-sequence intervals `[0, length)` for each `(name, length)` pair.
    ///
    pub fn from_chrom_sizes(name: impl Into<String>, chrom_sizes: &[(String, u64)]) -> Feature {
        Feature::new(
            name,
            chrom_sizes
                .iter()
                .map(|(seqid, length)| Interval::new(seqid.clone(), 0, *length))
                .collect(),
        )
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Feature {
        self.source_path = Some(path.into());
        self
    }

    pub fn total_length(&self) -> u64 {
        self.width()
    }

    /// Total length with an SI suffix, e.g. `3.0 Mbp`
    pub fn format_length(&self) -> String {
        convert_to_si_suffix(self.total_length())
    }

    pub fn is_genome(&self) -> bool {
        self.name == GENOME_FEATURE
    }

    ///
    /// Write the intervals to a fresh temporary region file.
    ///
    /// The file lives in its own temporary directory, which is removed when
    /// the returned [RegionFile] goes out of scope.
    ///
    pub fn materialize_to_temp_region_file(&self) -> Result<RegionFile> {
        let dir = tempfile::Builder::new().prefix("d4explorer-").tempdir()?;
        let path = dir.path().join(format!("{}.bed", sanitize(&self.name)));

        let mut writer = BufWriter::new(File::create(&path)?);
        for interval in &self.intervals {
            writeln!(writer, "{}", interval.as_string())?;
        }
        writer.flush()?;

        debug!(feature = %self.name, path = %path.display(), "wrote region file");
        Ok(RegionFile { path, _dir: dir })
    }

    ///
    /// Coalesce overlapping or touching intervals in place.
    ///
    /// Intervals are grouped by seqid and sorted by start; an interval merges
    /// into its predecessor when `start <= previous.end`. The result stays
    /// sorted by seqid then start.
    ///
    pub fn merge(&mut self) {
        if self.intervals.is_empty() {
            return;
        }

        let mut sorted = std::mem::take(&mut self.intervals);
        sorted.sort();

        let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
        for interval in sorted {
            match merged.last_mut() {
                Some(last) if last.seqid == interval.seqid && interval.start <= last.end => {
                    last.end = last.end.max(interval.end);
                }
                _ => merged.push(interval),
            }
        }
        self.intervals = merged;
    }
}

impl Ranges for Feature {
    fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }
}

// keep file names portable whatever the feature is called
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
