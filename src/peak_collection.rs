use std::collections::BTreeMap;

use crate::peak::Peak;

/// A named set of peaks, grouped by chromosome
///
/// Chromosomes iterate in sorted name order, and peaks within a chromosome are kept sorted by
/// start position once `sort` has been called.
///
#[derive(Clone)]
pub struct PeakCollection {
    pub name: String,
    pub chroms: BTreeMap<String, Vec<Peak>>,
}

impl PeakCollection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chroms: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, peak: Peak) {
        self.chroms
            .entry(peak.chrom().to_string())
            .or_default()
            .push(peak);
    }

    /// Sort peaks on each chromosome by start position
    ///
    /// The sort is stable, so peaks sharing a start position keep their insertion order.
    ///
    pub fn sort(&mut self) {
        for peaks in self.chroms.values_mut() {
            peaks.sort_by_key(|x| x.start());
        }
    }

    pub fn chrom_names(&self) -> impl Iterator<Item = &str> {
        self.chroms.keys().map(|x| x.as_str())
    }

    /// Peaks on `chrom`, or an empty slice if there are none
    pub fn fetch(&self, chrom: &str) -> &[Peak] {
        match self.chroms.get(chrom) {
            Some(x) => x,
            None => &[],
        }
    }

    /// Iterate over all peaks in chromosome order
    pub fn iter(&self) -> impl Iterator<Item = &Peak> {
        self.chroms.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Peak> {
        self.chroms.values_mut().flatten()
    }

    pub fn size(&self) -> usize {
        self.chroms.values().map(|x| x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn common_count(&self) -> usize {
        self.iter().filter(|x| x.is_common).count()
    }

    pub fn unique_count(&self) -> usize {
        self.iter().filter(|x| !x.is_common).count()
    }
}
