use std::fmt;

use crate::errors::{ManormError, ManormResult};
use crate::int_range::IntRange;

/// A contiguous region of the genome on a single chromosome, with a summit position
///
/// Coordinates are 0-based and half-open, `start <= summit < end` is enforced on construction.
///
#[derive(Clone, Eq, PartialEq)]
pub struct GenomicRegion {
    pub chrom: String,
    pub range: IntRange,
    pub summit: i64,
}

impl GenomicRegion {
    /// Create a new region
    ///
    /// If `summit` is not given, the midpoint of the region is used.
    ///
    pub fn new(chrom: &str, start: i64, end: i64, summit: Option<i64>) -> ManormResult<Self> {
        let invalid = |summit: i64, reason: &'static str| ManormError::InvalidRegion {
            chrom: chrom.to_string(),
            start,
            end,
            summit,
            reason,
        };

        let range = IntRange::from_pair(start, end);
        if start >= end {
            return Err(invalid(summit.unwrap_or(start), "expected start < end"));
        }
        let summit = summit.unwrap_or_else(|| range.center());
        if !range.intersect_pos(summit) {
            return Err(invalid(summit, "expected start <= summit < end"));
        }

        Ok(Self {
            chrom: chrom.to_string(),
            range,
            summit,
        })
    }

    pub fn start(&self) -> i64 {
        self.range.start
    }

    pub fn end(&self) -> i64 {
        self.range.end
    }

    pub fn size(&self) -> i64 {
        self.range.size()
    }
}

impl fmt::Debug for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}-{} (summit {})",
            self.chrom, self.range.start, self.range.end, self.summit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_summit() {
        let region = GenomicRegion::new("chr1", 1, 100, None).unwrap();
        assert_eq!(region.summit, 50);

        let region = GenomicRegion::new("chr1", 2, 100, None).unwrap();
        assert_eq!(region.summit, 51);
    }

    #[test]
    fn test_invalid_interval() {
        assert!(matches!(
            GenomicRegion::new("chr1", 100, 100, None),
            Err(ManormError::InvalidRegion { .. })
        ));
        assert!(matches!(
            GenomicRegion::new("chr1", 200, 100, Some(150)),
            Err(ManormError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_summit_outside_region() {
        for summit in [0, 100, 101, -5] {
            assert!(
                matches!(
                    GenomicRegion::new("chr1", 1, 100, Some(summit)),
                    Err(ManormError::InvalidRegion { .. })
                ),
                "summit {summit}"
            );
        }

        // Boundary summits within [start, end)
        assert!(GenomicRegion::new("chr1", 1, 100, Some(1)).is_ok());
        assert!(GenomicRegion::new("chr1", 1, 100, Some(99)).is_ok());
    }
}
