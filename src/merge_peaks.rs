//! Merge overlapping common peaks of both samples into consensus peaks
//!

use itertools::Itertools;
use log::{debug, warn};

use crate::errors::ManormResult;
use crate::genomic_region::GenomicRegion;
use crate::int_range::IntRange;
use crate::overlap::{HasRange, is_overlap};
use crate::peak::Peak;
use crate::peak_collection::PeakCollection;

pub const MERGED_PEAKS_NAME: &str = "merged";

/// An open run of transitively overlapping peaks
struct MergeRun {
    range: IntRange,
    summits: Vec<i64>,
}

impl MergeRun {
    fn new(peak: &Peak) -> Self {
        Self {
            range: peak.region.range.clone(),
            summits: vec![peak.summit()],
        }
    }

    /// Add `peak` to the run if it overlaps, return false otherwise
    ///
    /// Peaks must be added in start order, so any peak starting before the run end overlaps.
    ///
    fn try_extend(&mut self, peak: &Peak) -> bool {
        if is_overlap(self, peak) {
            self.range.merge(&peak.region.range);
            self.summits.push(peak.summit());
            true
        } else {
            false
        }
    }

    fn into_peak(mut self, chrom: &str) -> ManormResult<Peak> {
        let (summit, summit_distance) = get_merged_summit(&mut self.summits);
        let region = GenomicRegion::new(chrom, self.range.start, self.range.end, Some(summit))?;
        Ok(Peak::new_merged(region, summit_distance))
    }
}

impl HasRange for MergeRun {
    fn range(&self) -> &IntRange {
        &self.range
    }
}

/// Find the summit of a merged peak from all contributing summits
///
/// The merged summit is the midpoint of the two closest contributing summits, and the distance
/// between these two summits is returned with it. A run with a single contributing peak keeps
/// that peak's summit, and has no summit distance.
///
fn get_merged_summit(summits: &mut [i64]) -> (i64, Option<i64>) {
    assert!(!summits.is_empty());
    summits.sort_unstable();

    let closest = summits
        .iter()
        .tuple_windows()
        .min_by_key(|(a, b)| *b - *a);
    match closest {
        Some((a, b)) => ((a + b).div_euclid(2), Some(b - a)),
        None => (summits[0], None),
    }
}

/// Merge peaks on one chromosome, which must be sorted by start position
///
fn merge_chrom_peaks(chrom: &str, peaks: &[Peak]) -> ManormResult<Vec<Peak>> {
    let mut merged = Vec::new();
    let mut run: Option<MergeRun> = None;
    for peak in peaks {
        if let Some(current) = run.as_mut() {
            if current.try_extend(peak) {
                continue;
            }
        }
        if let Some(finished) = run.replace(MergeRun::new(peak)) {
            merged.push(finished.into_peak(chrom)?);
        }
    }
    if let Some(finished) = run {
        merged.push(finished.into_peak(chrom)?);
    }
    Ok(merged)
}

/// Merge the common peaks of both samples into a new collection of consensus peaks
///
/// Peaks are pooled per chromosome and sorted by start. A peak extends the current merge run only
/// if it starts strictly before the run's end, so peaks which only touch are not merged.
///
pub fn merge_common_peaks(
    peaks1: &PeakCollection,
    peaks2: &PeakCollection,
) -> ManormResult<PeakCollection> {
    let mut common_peaks = PeakCollection::new(MERGED_PEAKS_NAME);
    for peak in peaks1.iter().chain(peaks2.iter()).filter(|x| x.is_common) {
        common_peaks.add(peak.clone());
    }
    common_peaks.sort();

    let mut merged_peaks = PeakCollection::new(MERGED_PEAKS_NAME);
    for (chrom, chrom_peaks) in common_peaks.chroms.iter() {
        let merged = merge_chrom_peaks(chrom, chrom_peaks)?;
        debug!(
            "Merged {} common peaks into {} peaks on {chrom}",
            chrom_peaks.len(),
            merged.len()
        );
        merged_peaks.chroms.insert(chrom.clone(), merged);
    }

    if merged_peaks.is_empty() {
        warn!("No common peaks found between the two samples");
    }

    Ok(merged_peaks)
}
