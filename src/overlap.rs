//! Classify peaks of two samples as common or unique by interval overlap
//!

use std::collections::BTreeSet;

use bio::data_structures::interval_tree::IntervalTree;
use log::debug;

use crate::genomic_region::GenomicRegion;
use crate::int_range::IntRange;
use crate::peak::Peak;
use crate::peak_collection::PeakCollection;

/// Any type with a genomic interval that can be used in an overlap query
pub trait HasRange {
    fn range(&self) -> &IntRange;
}

impl HasRange for GenomicRegion {
    fn range(&self) -> &IntRange {
        &self.range
    }
}

impl HasRange for Peak {
    fn range(&self) -> &IntRange {
        &self.region.range
    }
}

/// Return true if the two intervals overlap, adjacency does not count
///
pub fn is_overlap<T: HasRange, U: HasRange>(a: &T, b: &U) -> bool {
    a.range().intersect_range(b.range())
}

/// Get overlap flags for two sets of intervals on the same chromosome
///
/// Returns a 2-tuple of flag vectors, the flag for each item in `regions1` is true iff it
/// overlaps at least one item in `regions2`, and likewise for `regions2`.
///
pub fn get_overlap_flags<T: HasRange, U: HasRange>(
    regions1: &[T],
    regions2: &[U],
) -> (Vec<bool>, Vec<bool>) {
    let mut flags1 = vec![false; regions1.len()];
    let mut flags2 = vec![false; regions2.len()];
    if regions1.is_empty() || regions2.is_empty() {
        return (flags1, flags2);
    }

    let mut tree = IntervalTree::new();
    for (index2, region2) in regions2.iter().enumerate() {
        let range = region2.range();
        tree.insert(range.start..range.end, index2);
    }

    for (index1, region1) in regions1.iter().enumerate() {
        let range = region1.range();
        for entry in tree.find(range.start..range.end) {
            flags1[index1] = true;
            flags2[*entry.data()] = true;
        }
    }

    (flags1, flags2)
}

/// Count the items in `regions1` that overlap at least one item of `regions2`
///
pub fn count_overlapping<T: HasRange, U: HasRange>(regions1: &[T], regions2: &[U]) -> usize {
    let (flags1, _) = get_overlap_flags(regions1, regions2);
    flags1.into_iter().filter(|x| *x).count()
}

fn classify_chrom_peaks(peaks: &[Peak], flags: &[bool]) -> Vec<Peak> {
    peaks
        .iter()
        .zip(flags)
        .map(|(peak, flag)| peak.with_common_flag(*flag))
        .collect()
}

/// Classify the peaks of two samples as common (overlapping a peak of the other sample) or unique
///
/// The input collections are not modified, classified copies of each are returned.
///
pub fn classify_peaks_by_overlap(
    peaks1: &PeakCollection,
    peaks2: &PeakCollection,
) -> (PeakCollection, PeakCollection) {
    debug!("Classifying unique/common peaks by overlap");

    let mut classified1 = PeakCollection::new(&peaks1.name);
    let mut classified2 = PeakCollection::new(&peaks2.name);

    let chroms = peaks1
        .chrom_names()
        .chain(peaks2.chrom_names())
        .collect::<BTreeSet<_>>();
    for chrom in chroms {
        debug!("Classifying peaks on {chrom}");
        let chrom_peaks1 = peaks1.fetch(chrom);
        let chrom_peaks2 = peaks2.fetch(chrom);
        let (flags1, flags2) = get_overlap_flags(chrom_peaks1, chrom_peaks2);

        if !chrom_peaks1.is_empty() {
            classified1
                .chroms
                .insert(chrom.to_string(), classify_chrom_peaks(chrom_peaks1, &flags1));
        }
        if !chrom_peaks2.is_empty() {
            classified2
                .chroms
                .insert(chrom.to_string(), classify_chrom_peaks(chrom_peaks2, &flags2));
        }
    }

    (classified1, classified2)
}
