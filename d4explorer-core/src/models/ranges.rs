use std::io::BufRead;
use std::path::Path;

use crate::errors::{RangesError, Result};
use crate::models::Interval;
use crate::utils::get_dynamic_reader;

///
/// Common view over anything that holds a table of genomic intervals.
///
pub trait Ranges {
    /// Iterate the intervals in table order.
    fn intervals(&self) -> impl Iterator<Item = &Interval>;

    /// Sum of interval widths. Overlapping intervals are counted twice; merge
    /// first if that matters.
    fn width(&self) -> u64 {
        self.intervals().map(Interval::width).sum()
    }

    /// Number of intervals.
    fn count(&self) -> usize {
        self.intervals().count()
    }
}

/// One tab-delimited row along with its 1-based line number in the source.
pub(crate) type NumberedRow = (usize, Vec<String>);

///
/// Read the rows of a tab-delimited interval file, skipping blank lines,
/// `#` comments and UCSC `track`/`browser` lines. Reading stops at a GFF3
/// `##FASTA` directive.
///
pub(crate) fn read_tab_rows(path: &Path) -> Result<Vec<NumberedRow>> {
    let reader = get_dynamic_reader(path)?;
    let mut rows = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with("##FASTA") {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }
        rows.push((i + 1, line.split('\t').map(String::from).collect()));
    }
    Ok(rows)
}

/// Number in-memory rows from 1 so errors point at a row.
pub(crate) fn number_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Vec<NumberedRow> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| (i + 1, row.iter().map(|s| s.as_ref().to_string()).collect()))
        .collect()
}

pub(crate) fn parse_coordinate(
    value: &str,
    format: &'static str,
    field: &'static str,
    line: usize,
) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| RangesError::InvalidField {
            format,
            field,
            value: value.to_string(),
            line,
        })
}

pub(crate) fn checked_interval(seqid: &str, start: u64, end: u64, line: usize) -> Result<Interval> {
    if end < start {
        return Err(RangesError::InvertedInterval {
            seqid: seqid.to_string(),
            start,
            end,
            line,
        });
    }
    Ok(Interval::new(seqid, start, end))
}
