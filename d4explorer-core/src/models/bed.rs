use std::path::{Path, PathBuf};

use crate::errors::{RangesError, Result};
use crate::models::Interval;
use crate::models::ranges::{
    NumberedRow, Ranges, checked_interval, number_rows, parse_coordinate, read_tab_rows,
};

pub const BED_COLUMNS: [&str; 6] = ["seqid", "start", "end", "name", "score", "strand"];

///
/// BED flavour, named after the number of columns.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BedType {
    Bed3 = 3,
    Bed4 = 4,
    Bed5 = 5,
    Bed6 = 6,
}

impl BedType {
    ///
    /// Guess the bed type from the number of columns of a row.
    ///
    pub fn guess(ncol: usize, line: usize) -> Result<BedType> {
        match ncol {
            3 => Ok(BedType::Bed3),
            4 => Ok(BedType::Bed4),
            5 => Ok(BedType::Bed5),
            6 => Ok(BedType::Bed6),
            found => Err(RangesError::ColumnCount {
                format: "BED",
                expected: "3 to 6".to_string(),
                found,
                line,
            }),
        }
    }

    pub fn ncol(&self) -> usize {
        *self as usize
    }

    /// Canonical column names for this bed type
    pub fn columns(&self) -> &'static [&'static str] {
        &BED_COLUMNS[..self.ncol()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BedRecord {
    pub interval: Interval,
    pub name: Option<String>,
    pub score: Option<i32>,
    pub strand: Option<String>,
}

///
/// A parsed BED file (BED3 to BED6). Coordinates are used as-is: BED is
/// zero-based and half-open on disk.
///
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bed {
    pub records: Vec<BedRecord>,
    pub bedtype: BedType,
    pub path: Option<PathBuf>,
}

impl Bed {
    ///
    /// Build a [Bed] from an in-memory table, one `Vec` of fields per row.
    ///
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Bed> {
        Bed::from_numbered_rows(number_rows(rows), None)
    }

    fn from_numbered_rows(rows: Vec<NumberedRow>, path: Option<PathBuf>) -> Result<Bed> {
        let Some((first_line, first)) = rows.first() else {
            return Err(RangesError::Empty(path.unwrap_or_default()));
        };
        let bedtype = BedType::guess(first.len(), *first_line)?;

        let mut records = Vec::with_capacity(rows.len());
        for (line, fields) in rows {
            if fields.len() != bedtype.ncol() {
                return Err(RangesError::ColumnCount {
                    format: "BED",
                    expected: bedtype.ncol().to_string(),
                    found: fields.len(),
                    line,
                });
            }
            records.push(parse_bed_record(&fields, line)?);
        }

        Ok(Bed {
            records,
            bedtype,
            path,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (rows, columns) of the underlying table
    pub fn shape(&self) -> (usize, usize) {
        (self.records.len(), self.bedtype.ncol())
    }
}

fn parse_bed_record(fields: &[String], line: usize) -> Result<BedRecord> {
    let start = parse_coordinate(&fields[1], "BED", "start", line)?;
    let end = parse_coordinate(&fields[2], "BED", "end", line)?;
    let interval = checked_interval(&fields[0], start, end, line)?;

    let score = match fields.get(4).map(String::as_str) {
        None | Some(".") => None,
        Some(value) => Some(value.trim().parse::<i32>().map_err(|_| {
            RangesError::InvalidField {
                format: "BED",
                field: "score",
                value: value.to_string(),
                line,
            }
        })?),
    };

    Ok(BedRecord {
        interval,
        name: fields.get(3).cloned(),
        score,
        strand: fields.get(5).cloned(),
    })
}

impl TryFrom<&Path> for Bed {
    type Error = RangesError;

    ///
    /// Read a BED file from disk (optionally gzipped).
    ///
    fn try_from(value: &Path) -> Result<Self> {
        let rows = read_tab_rows(value)?;
        if rows.is_empty() {
            return Err(RangesError::Empty(value.to_path_buf()));
        }
        Bed::from_numbered_rows(rows, Some(value.to_path_buf()))
    }
}

impl TryFrom<PathBuf> for Bed {
    type Error = RangesError;

    fn try_from(value: PathBuf) -> Result<Self> {
        Bed::try_from(value.as_path())
    }
}

impl TryFrom<&str> for Bed {
    type Error = RangesError;

    fn try_from(value: &str) -> Result<Self> {
        Bed::try_from(Path::new(value))
    }
}

impl Ranges for Bed {
    fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.records.iter().map(|r| &r.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[fixture]
    fn rows() -> Vec<Vec<&'static str>> {
        vec![
            vec!["chr1", "10", "100", "gene", "1", "+"],
            vec!["chr1", "10", "100", "rRNA", "10", "+"],
            vec!["chr2", "20", "60", "gene", "0", "-"],
            vec!["chr2", "20", "60", "exon", "3", "-"],
        ]
    }

    #[rstest]
    fn test_bed_from_rows(rows: Vec<Vec<&'static str>>) {
        let bed = Bed::from_rows(&rows).unwrap();
        assert_eq!(bed.bedtype, BedType::Bed6);
        assert_eq!(bed.shape(), (4, 6));
        assert_eq!(bed.width(), 260);
        assert_eq!(bed.records[2].strand.as_deref(), Some("-"));
        assert_eq!(bed.records[1].score, Some(10));
        assert!(bed.path.is_none());
    }

    #[rstest]
    fn test_bed_from_path_matches_rows(rows: Vec<Vec<&'static str>>) {
        let mut file = tempfile::Builder::new().suffix(".bed").tempfile().unwrap();
        writeln!(file, "track name=test").unwrap();
        for row in &rows {
            writeln!(file, "{}", row.join("\t")).unwrap();
        }
        let from_file = Bed::try_from(file.path()).unwrap();
        let from_rows = Bed::from_rows(&rows).unwrap();
        assert_eq!(from_file.records, from_rows.records);
        assert_eq!(from_file.bedtype, from_rows.bedtype);
        assert_ne!(from_file.path, from_rows.path);
    }

    #[rstest]
    #[case(vec![vec!["chr1", "10"]], 2)]
    #[case(vec![vec!["chr1", "1", "2", "a", "0", "+", "x"]], 7)]
    fn test_bed_column_count(#[case] rows: Vec<Vec<&'static str>>, #[case] found: usize) {
        match Bed::from_rows(&rows) {
            Err(RangesError::ColumnCount { found: f, .. }) => assert_eq!(f, found),
            other => panic!("expected column count error, got {:?}", other),
        }
    }

    #[rstest]
    fn test_bed_ragged_rows() {
        let rows = vec![vec!["chr1", "1", "2"], vec!["chr1", "1", "2", "name"]];
        assert!(matches!(
            Bed::from_rows(&rows),
            Err(RangesError::ColumnCount { line: 2, .. })
        ));
    }

    #[rstest]
    fn test_bed_inverted_interval() {
        let rows = vec![vec!["chr1", "20", "10"]];
        assert!(matches!(
            Bed::from_rows(&rows),
            Err(RangesError::InvertedInterval { .. })
        ));
    }

    #[rstest]
    fn test_bed_zero_width_is_legal() {
        let bed = Bed::from_rows(&[vec!["chr1", "5", "5"]]).unwrap();
        assert_eq!(bed.width(), 0);
        assert_eq!(bed.bedtype.columns(), &["seqid", "start", "end"]);
    }
}
