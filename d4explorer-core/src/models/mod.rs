pub mod bed;
pub mod feature;
pub mod gff3;
pub mod interval;
pub mod ranges;

// re-export for cleaner imports
pub use self::bed::{Bed, BedRecord, BedType};
pub use self::feature::{Feature, GENOME_FEATURE, RegionFile};
pub use self::gff3::{Gff3, Gff3Record};
pub use self::interval::Interval;
pub use self::ranges::Ranges;
