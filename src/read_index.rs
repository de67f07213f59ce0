use std::collections::HashMap;

use crate::errors::{ManormError, ManormResult};

/// Representative genomic positions of the sequencing reads of one sample
///
/// Each read (or read pair) contributes a single position, and positions are stored sorted per
/// chromosome so that reads in any window can be counted with two binary searches.
///
pub struct ReadIndex {
    pub name: String,
    chroms: HashMap<String, Vec<i64>>,
    sorted: bool,
}

impl ReadIndex {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chroms: HashMap::new(),
            sorted: true,
        }
    }

    /// Add the position of one read, `sort` must be called before counting
    pub fn add(&mut self, chrom: &str, pos: i64) {
        match self.chroms.get_mut(chrom) {
            Some(positions) => positions.push(pos),
            None => {
                self.chroms.insert(chrom.to_string(), vec![pos]);
            }
        }
        self.sorted = false;
    }

    pub fn sort(&mut self) {
        for positions in self.chroms.values_mut() {
            positions.sort_unstable();
        }
        self.sorted = true;
    }

    /// Sorted chromosome names
    pub fn chroms(&self) -> Vec<&str> {
        let mut chroms = self.chroms.keys().map(|x| x.as_str()).collect::<Vec<_>>();
        chroms.sort_unstable();
        chroms
    }

    /// Total number of reads
    pub fn size(&self) -> usize {
        self.chroms.values().map(|x| x.len()).sum()
    }

    /// Sorted positions of all reads on `chrom`
    pub fn positions(&self, chrom: &str) -> &[i64] {
        match self.chroms.get(chrom) {
            Some(x) => x,
            None => &[],
        }
    }

    /// Count reads in [start, end)
    ///
    /// Returns 0 for a chromosome with no reads.
    ///
    pub fn count(&self, chrom: &str, start: i64, end: i64) -> ManormResult<u64> {
        if start >= end {
            return Err(ManormError::InvalidRange { start, end });
        }
        assert!(self.sorted, "Read index '{}' is not sorted", self.name);

        let positions = self.positions(chrom);
        let head = positions.partition_point(|&x| x < start);
        let tail = positions.partition_point(|&x| x < end);
        Ok((tail - head) as u64)
    }
}
