use std::cmp::Ordering;
use std::fmt::{self, Display};

///
/// A genomic interval on one sequence, zero-based and half-open: `[start, end)`.
///
/// Zero-width intervals are legal and contribute nothing to a width sum.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub seqid: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(seqid: impl Into<String>, start: u64, end: u64) -> Self {
        Interval {
            seqid: seqid.into(),
            start,
            end,
        }
    }

    ///
    /// Number of bases covered by the interval
    ///
    pub fn width(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if the interval overlaps `[start, end)` on the same sequence
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.seqid == other.seqid && self.start < other.end && self.end > other.start
    }

    ///
    /// Region file line: `seqid<TAB>start<TAB>end`
    ///
    pub fn as_string(&self) -> String {
        format!("{}\t{}\t{}", self.seqid, self.start, self.end)
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seqid
            .cmp(&other.seqid)
            .then_with(|| self.start.cmp(&other.start))
            .then_with(|| self.end.cmp(&other.end))
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.seqid, self.start, self.end)
    }
}
