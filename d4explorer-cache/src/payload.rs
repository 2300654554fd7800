use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use d4explorer_core::models::{Bed, Gff3Record, Interval};

use crate::errors::Result;

///
/// Tabular data stored next to an entry's metadata.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Canonical histogram columns plus the original sentinel labels
    Bins {
        x: Vec<i64>,
        counts: Vec<u64>,
        low_label: Option<String>,
        high_label: Option<String>,
    },
    Intervals(Vec<Interval>),
    Gff3(Vec<Gff3Record>),
    Bed(Bed),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bins { .. } => "bins",
            Payload::Intervals(_) => "intervals",
            Payload::Gff3(_) => "gff3",
            Payload::Bed(_) => "bed",
        }
    }

    pub(crate) fn write_to(&self, file: &File) -> Result<()> {
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub(crate) fn read_from(path: &Path) -> Result<Payload> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }
}
