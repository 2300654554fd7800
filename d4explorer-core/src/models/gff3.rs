use std::path::{Path, PathBuf};

use crate::errors::{RangesError, Result};
use crate::models::Interval;
use crate::models::ranges::{
    NumberedRow, Ranges, checked_interval, number_rows, parse_coordinate, read_tab_rows,
};

pub const GFF3_COLUMNS: [&str; 9] = [
    "seqid",
    "source",
    "type",
    "start",
    "end",
    "score",
    "strand",
    "phase",
    "attributes",
];

///
/// One GFF3 feature line.
///
/// `interval` holds the converted coordinates: GFF3 is 1-based and closed on
/// disk, so `start - 1` and `end` give the zero-based half-open interval.
///
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gff3Record {
    pub interval: Interval,
    pub source: String,
    pub feature_type: String,
    pub score: Option<String>,
    pub strand: Option<String>,
    pub phase: Option<String>,
    pub attributes: String,
}

fn optional_column(value: &str) -> Option<String> {
    match value {
        "." | "" => None,
        v => Some(v.to_string()),
    }
}

impl Gff3Record {
    fn from_fields(fields: &[String], line: usize) -> Result<Gff3Record> {
        if fields.len() != GFF3_COLUMNS.len() {
            return Err(RangesError::ColumnCount {
                format: "GFF3",
                expected: GFF3_COLUMNS.len().to_string(),
                found: fields.len(),
                line,
            });
        }

        let start1 = parse_coordinate(&fields[3], "GFF3", "start", line)?;
        if start1 == 0 {
            return Err(RangesError::InvalidField {
                format: "GFF3",
                field: "start",
                value: fields[3].clone(),
                line,
            });
        }
        let end1 = parse_coordinate(&fields[4], "GFF3", "end", line)?;
        let interval = checked_interval(&fields[0], start1 - 1, end1, line)?;

        Ok(Gff3Record {
            interval,
            source: fields[1].clone(),
            feature_type: fields[2].clone(),
            score: optional_column(&fields[5]),
            strand: optional_column(&fields[6]),
            phase: optional_column(&fields[7]),
            attributes: fields[8].clone(),
        })
    }

    /// Back to the on-disk 1-based start
    pub fn start1(&self) -> u64 {
        self.interval.start + 1
    }
}

///
/// A GFF3 annotation, or a slice of one restricted to a single feature type.
///
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gff3 {
    pub records: Vec<Gff3Record>,
    /// Feature type this slice was selected on, if any
    pub label: Option<String>,
    pub path: Option<PathBuf>,
}

impl Gff3 {
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Gff3> {
        Gff3::from_numbered_rows(number_rows(rows), None)
    }

    fn from_numbered_rows(rows: Vec<NumberedRow>, path: Option<PathBuf>) -> Result<Gff3> {
        let records = rows
            .iter()
            .map(|(line, fields)| Gff3Record::from_fields(fields, *line))
            .collect::<Result<Vec<_>>>()?;
        Ok(Gff3 {
            records,
            label: None,
            path,
        })
    }

    ///
    /// Select the records of one feature type. The returned slice is labelled
    /// with the type and keeps the provenance path.
    ///
    pub fn select(&self, feature_type: &str) -> Gff3 {
        Gff3 {
            records: self
                .records
                .iter()
                .filter(|r| r.feature_type == feature_type)
                .cloned()
                .collect(),
            label: Some(feature_type.to_string()),
            path: self.path.clone(),
        }
    }

    ///
    /// Distinct feature types in first-seen order.
    ///
    pub fn feature_types(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.feature_type) {
                seen.push(record.feature_type.clone());
            }
        }
        seen
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.records.len(), GFF3_COLUMNS.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<&Path> for Gff3 {
    type Error = RangesError;

    ///
    /// Parse a GFF3 file, gzipped or not. Directives and comments are
    /// skipped and an embedded `##FASTA` section ends the feature table.
    ///
    fn try_from(value: &Path) -> Result<Self> {
        let rows = read_tab_rows(value)?;
        if rows.is_empty() {
            return Err(RangesError::Empty(value.to_path_buf()));
        }
        Gff3::from_numbered_rows(rows, Some(value.to_path_buf()))
    }
}

impl TryFrom<PathBuf> for Gff3 {
    type Error = RangesError;

    fn try_from(value: PathBuf) -> Result<Self> {
        Gff3::try_from(value.as_path())
    }
}

impl TryFrom<&str> for Gff3 {
    type Error = RangesError;

    fn try_from(value: &str) -> Result<Self> {
        Gff3::try_from(Path::new(value))
    }
}

impl Ranges for Gff3 {
    fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.records.iter().map(|r| &r.interval)
    }
}
