use std::fmt;

/// A simple type for integer ranges
///
/// All ranges follow the bed file range convention: 0-indexed, half-closed, [start,end)
///
/// This struct is used instead of the native rust Range type just to focus on the specific goals of
/// primarily genomic region intervals.
///
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn from_pair(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn size(&self) -> i64 {
        self.end - self.start
    }

    /// Midpoint of the range, rounded toward the start for even sizes
    pub fn center(&self) -> i64 {
        (self.start + self.end).div_euclid(2)
    }

    /// Return true if pos intersects range (adjacency does not count)
    ///
    pub fn intersect_pos(&self, pos: i64) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Return true if the ranges intersect (adjacency does not count)
    ///
    /// Two ranges [s1,e1) and [s2,e2) intersect iff (e1 - s2) * (e2 - s1) > 0
    ///
    pub fn intersect_range(&self, other: &IntRange) -> bool {
        (self.end - other.start) * (other.end - self.start) > 0
    }

    /// Extend this range to the envelope of itself and `other`
    ///
    pub fn merge(&mut self, other: &IntRange) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }
}

impl fmt::Debug for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}-{})", self.start, self.end)
    }
}
