use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::errors::{RangesError, Result};

const SI_SUFFIXES: [&str; 5] = ["bp", "kbp", "Mbp", "Gbp", "Tbp"];

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path)
        .map_err(|e| RangesError::FileReadError(format!("{}: {}", path.display(), e)))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Extension of a file, looking through a trailing `.gz`.
///
/// `annotation.gff3.gz` gives `gff3`, `regions.bed` gives `bed`.
pub fn inner_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let base = name.strip_suffix(".gz").unwrap_or(name);
    Path::new(base)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

///
/// File name with any `.gz` and the inner extension removed.
pub fn inner_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let base = name.strip_suffix(".gz").unwrap_or(name);
    Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
}

/// Convert a base count to a string with an SI suffix, one decimal place.
pub fn convert_to_si_suffix(number: u64) -> String {
    let mut power = 0;
    let mut scale = 1u64;
    while power < SI_SUFFIXES.len() - 1 && number >= scale * 1000 {
        scale *= 1000;
        power += 1;
    }
    format!("{:.1} {}", number as f64 / scale as f64, SI_SUFFIXES[power])
}

///
/// Read a chromosome sizes file (`name<TAB>length` per line).
///
/// Blank lines and `#` comments are skipped; extra columns are ignored.
pub fn read_chrom_sizes(path: &Path) -> Result<Vec<(String, u64)>> {
    let reader = get_dynamic_reader(path)?;
    let mut sizes = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        sizes.push(parse_chrom_size_line(line, i + 1)?);
    }

    if sizes.is_empty() {
        return Err(RangesError::Empty(path.to_path_buf()));
    }
    Ok(sizes)
}

///
/// Parse one `name length` line of a chromosome sizes listing. Fields may be
/// separated by tabs or spaces.
pub fn parse_chrom_size_line(line: &str, line_number: usize) -> Result<(String, u64)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(RangesError::ColumnCount {
            format: "chrom sizes",
            expected: "at least 2".to_string(),
            found: parts.len(),
            line: line_number,
        });
    }
    let length = parts[1]
        .parse::<u64>()
        .map_err(|_| RangesError::InvalidField {
            format: "chrom sizes",
            field: "length",
            value: parts[1].to_string(),
            line: line_number,
        })?;
    Ok((parts[0].to_string(), length))
}

///
/// Make a path absolute and lexically normalized: `.` components are dropped
/// and `..` pops the previous component. Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[rstest]
    #[case(0, "0.0 bp")]
    #[case(999, "999.0 bp")]
    #[case(1_500, "1.5 kbp")]
    #[case(3_000_000, "3.0 Mbp")]
    #[case(2_500_000_000, "2.5 Gbp")]
    #[case(7_000_000_000_000_000, "7000000.0 Tbp")]
    fn test_si_suffix(#[case] number: u64, #[case] expected: &str) {
        assert_eq!(convert_to_si_suffix(number), expected);
    }

    #[rstest]
    fn test_inner_extension() {
        assert_eq!(inner_extension(Path::new("a/annotation.gff3.gz")).as_deref(), Some("gff3"));
        assert_eq!(inner_extension(Path::new("regions.BED")).as_deref(), Some("bed"));
        assert_eq!(inner_extension(Path::new("noext")), None);
        assert_eq!(inner_stem(Path::new("x/genes.bed.gz")).as_deref(), Some("genes"));
    }

    #[rstest]
    fn test_read_chrom_sizes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# genome").unwrap();
        writeln!(file, "chr1\t1000").unwrap();
        writeln!(file, "chr2 2000 extra").unwrap();
        let sizes = read_chrom_sizes(file.path()).unwrap();
        assert_eq!(
            sizes,
            vec![("chr1".to_string(), 1000), ("chr2".to_string(), 2000)]
        );
    }

    #[rstest]
    fn test_read_chrom_sizes_bad_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\tlong").unwrap();
        assert!(matches!(
            read_chrom_sizes(file.path()),
            Err(RangesError::InvalidField { field: "length", .. })
        ));
    }

    #[rstest]
    fn test_normalize_path() {
        let normalized = normalize_path(Path::new("/data/./run/../sample.d4")).unwrap();
        assert_eq!(normalized, PathBuf::from("/data/sample.d4"));
        assert!(normalize_path(Path::new("relative.d4")).unwrap().is_absolute());
    }
}
