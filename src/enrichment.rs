//! Random peak overlap control for the common peak enrichment test
//!

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::statistics::Statistics;

use crate::errors::ManormResult;
use crate::genomic_region::GenomicRegion;
use crate::overlap::count_overlapping;
use crate::peak::Peak;
use crate::peak_collection::PeakCollection;

/// Summary of overlap counts between the target peaks and random control peak sets
#[derive(Clone, Debug)]
pub struct RandomOverlap {
    pub mean: f64,
    pub std: f64,
}

impl RandomOverlap {
    /// Fold enrichment of `observed_count` over the random mean, if the mean is positive
    pub fn fold_change(&self, observed_count: usize) -> Option<f64> {
        if self.mean > 0.0 {
            Some(observed_count as f64 / self.mean)
        } else {
            None
        }
    }
}

/// Generate random peaks on one chromosome matched to the reference peaks
///
/// Each reference peak is replaced by a peak of the same length, with a start position drawn
/// uniformly from the range of reference start positions on the chromosome.
///
fn generate_random_chrom_peaks(
    chrom: &str,
    ref_peaks: &[Peak],
    rng: &mut StdRng,
) -> ManormResult<Vec<GenomicRegion>> {
    let min_start = ref_peaks.iter().map(|x| x.start()).min();
    let max_start = ref_peaks.iter().map(|x| x.start()).max();
    let (min_start, max_start) = match (min_start, max_start) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Vec::new()),
    };

    let mut random_peaks = ref_peaks
        .iter()
        .map(|peak| {
            let start = rng.gen_range(min_start..=max_start);
            GenomicRegion::new(chrom, start, start + peak.region.size(), None)
        })
        .collect::<ManormResult<Vec<_>>>()?;
    random_peaks.sort_by_key(|x| x.start());
    Ok(random_peaks)
}

/// Count target peaks overlapping one random peak set matched to the reference peaks
///
fn random_overlap_count(
    ref_peaks: &PeakCollection,
    target_peaks: &PeakCollection,
    rng: &mut StdRng,
) -> ManormResult<usize> {
    let mut count = 0;
    for (chrom, chrom_ref_peaks) in ref_peaks.chroms.iter() {
        // Random peaks are drawn for every reference chromosome, so that the random sequence doesn't
        // depend on which chromosomes the target contains
        let random_peaks = generate_random_chrom_peaks(chrom, chrom_ref_peaks, rng)?;
        count += count_overlapping(target_peaks.fetch(chrom), &random_peaks);
    }
    Ok(count)
}

/// Estimate the number of target peaks expected to overlap the reference peaks by chance
///
/// Generates `repeat_count` random peak sets matched to `ref_peaks` in per-chromosome count and
/// peak length, and returns the mean and population standard deviation of the number of
/// `target_peaks` overlapping each random set. Returns None if `repeat_count` is 0.
///
pub fn random_peak_overlap(
    ref_peaks: &PeakCollection,
    target_peaks: &PeakCollection,
    repeat_count: usize,
    seed: u64,
) -> ManormResult<Option<RandomOverlap>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts = Vec::with_capacity(repeat_count);
    for repeat_index in 0..repeat_count {
        let count = random_overlap_count(ref_peaks, target_peaks, &mut rng)?;
        debug!("Random overlap repeat {repeat_index}: {count} overlapping peaks");
        counts.push(count as f64);
    }
    if counts.is_empty() {
        return Ok(None);
    }
    Ok(Some(RandomOverlap {
        mean: (&counts).mean(),
        std: (&counts).population_std_dev(),
    }))
}
