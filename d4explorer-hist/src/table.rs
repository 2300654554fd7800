use std::io::Write;

use serde::{Deserialize, Serialize};

pub const FLAT_TABLE_COLUMNS: [&str; 6] = ["feature", "x", "counts", "nbases", "coverage", "mask"];

/// One bin of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub feature: String,
    pub x: i64,
    pub counts: u64,
    pub nbases: u64,
    pub coverage: f64,
    pub mask: bool,
}

///
/// All members of a collection stacked into one long table; what plotting
/// and export consume.
///
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatTable {
    pub rows: Vec<FlatRow>,
}

impl FlatTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct feature names in row order.
    pub fn features(&self) -> Vec<&str> {
        let mut features: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !features.contains(&row.feature.as_str()) {
                features.push(&row.feature);
            }
        }
        features
    }

    /// Only the rows whose mask is set.
    pub fn masked(&self) -> FlatTable {
        FlatTable {
            rows: self.rows.iter().filter(|r| r.mask).cloned().collect(),
        }
    }

    ///
    /// Write the table as tab-separated text with a header line.
    ///
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", FLAT_TABLE_COLUMNS.join("\t"))?;
        for row in &self.rows {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                row.feature, row.x, row.counts, row.nbases, row.coverage, row.mask
            )?;
        }
        Ok(())
    }

    /// JSON array of row records
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn table() -> FlatTable {
        let row = |feature: &str, x: i64, counts: u64, mask: bool| FlatRow {
            feature: feature.to_string(),
            x,
            counts,
            nbases: counts * x.max(0) as u64,
            coverage: 0.5,
            mask,
        };
        FlatTable {
            rows: vec![
                row("genome", 0, 2, false),
                row("genome", 1, 2, true),
                row("gene", 1, 1, true),
            ],
        }
    }

    #[rstest]
    fn test_write_tsv(table: FlatTable) {
        let mut out = Vec::new();
        table.write_tsv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "feature\tx\tcounts\tnbases\tcoverage\tmask");
        assert_eq!(lines[1], "genome\t0\t2\t0\t0.5\tfalse");
        assert_eq!(lines.len(), 4);
    }

    #[rstest]
    fn test_features_and_masked(table: FlatTable) {
        assert_eq!(table.features(), vec!["genome", "gene"]);
        assert_eq!(table.masked().len(), 2);
    }

    #[rstest]
    fn test_json(table: FlatTable) {
        let json = table.to_json().unwrap();
        let rows: Vec<FlatRow> = serde_json::from_str(&json).unwrap();
        assert_eq!(rows, table.rows);
    }
}
