//! Staged MAnorm model over the peaks and reads of two samples
//!
//! Stages must be run in order: peak processing (overlap classification and merging), read
//! counting, model fitting and finally normalization of every peak.
//!

use std::sync::mpsc::channel;

use log::{debug, info, warn};
use serde::Serialize;

use crate::errors::{ManormError, ManormResult};
use crate::merge_peaks::merge_common_peaks;
use crate::overlap::classify_peaks_by_overlap;
use crate::peak::Peak;
use crate::peak_collection::PeakCollection;
use crate::read_index::ReadIndex;
use crate::robust_regression::{HuberSettings, huber_regression};

/// Merged peaks with a larger absolute raw M value are left out of model fitting
const MAX_FIT_ABS_M_VALUE: f64 = 10.0;

/// Linear model of the M-A dependence in common peaks: M = slope * A + intercept
///
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizationModel {
    pub intercept: f64,
    pub slope: f64,
}

impl NormalizationModel {
    pub fn predict(&self, a: f64) -> f64 {
        self.slope * a + self.intercept
    }
}

/// Model fit along with details of the fitting data
#[derive(Clone, Debug, Serialize)]
pub struct ModelFit {
    pub model: NormalizationModel,

    /// Number of merged peaks used to fit the model
    pub fit_peak_count: usize,

    pub robust_scale: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Return true if the merged peak can be used to fit the normalization model
///
pub fn is_fitting_peak(peak: &Peak, summit_dis_cutoff: i64) -> bool {
    let close_summits = matches!(peak.summit_distance, Some(x) if x <= summit_dis_cutoff);
    close_summits
        && peak
            .counts()
            .is_ok_and(|x| x.m_raw.abs() <= MAX_FIT_ABS_M_VALUE)
}

pub struct MaModel {
    pub peaks1: PeakCollection,
    pub peaks2: PeakCollection,
    pub merged_peaks: PeakCollection,
    pub reads1: ReadIndex,
    pub reads2: ReadIndex,

    fit: Option<ModelFit>,
    processed: bool,
    counted: bool,
    normalized: bool,
}

impl MaModel {
    pub fn new(
        peaks1: PeakCollection,
        peaks2: PeakCollection,
        reads1: ReadIndex,
        reads2: ReadIndex,
    ) -> Self {
        Self {
            peaks1,
            peaks2,
            merged_peaks: PeakCollection::new(crate::merge_peaks::MERGED_PEAKS_NAME),
            reads1,
            reads2,
            fit: None,
            processed: false,
            counted: false,
            normalized: false,
        }
    }

    pub fn fit(&self) -> Option<&ModelFit> {
        self.fit.as_ref()
    }

    /// Classify peaks of both samples as common or unique, and merge common peaks
    ///
    pub fn process_peaks(&mut self) -> ManormResult<()> {
        if self.counted {
            return Err(ManormError::AlreadyCounted(format!(
                "collection '{}'",
                self.peaks1.name
            )));
        }
        let (peaks1, peaks2) = classify_peaks_by_overlap(&self.peaks1, &self.peaks2);
        let merged_peaks = merge_common_peaks(&peaks1, &peaks2)?;
        self.peaks1 = peaks1;
        self.peaks2 = peaks2;
        self.merged_peaks = merged_peaks;
        self.processed = true;
        Ok(())
    }

    /// Count reads in the window around every peak summit, for all peak collections
    ///
    /// Each chromosome of each peak collection is counted as a separate task on a pool of
    /// `thread_count` workers.
    ///
    pub fn count_reads(&mut self, window_size: i64, thread_count: usize) -> ManormResult<()> {
        if !self.processed {
            return Err(ManormError::ModelNotReady {
                step: "count reads",
                precursor: "process peaks",
            });
        }
        if self.counted {
            return Err(ManormError::AlreadyCounted(format!(
                "collection '{}'",
                self.peaks1.name
            )));
        }
        if window_size <= 1 {
            return Err(ManormError::InvalidWindowSize(window_size));
        }

        let worker_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build()
            .unwrap();

        let reads1 = &self.reads1;
        let reads2 = &self.reads2;
        let mut collections = [
            &mut self.peaks1,
            &mut self.peaks2,
            &mut self.merged_peaks,
        ];
        let mut chrom_tasks = Vec::new();
        for (collection_index, collection) in collections.iter_mut().enumerate() {
            for (chrom, peaks) in std::mem::take(&mut collection.chroms) {
                chrom_tasks.push((collection_index, chrom, peaks));
            }
        }

        let (tx, rx) = channel();
        worker_pool.scope(move |scope| {
            for (collection_index, chrom, mut peaks) in chrom_tasks {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = peaks
                        .iter_mut()
                        .try_for_each(|peak| peak.count_reads(reads1, reads2, window_size));
                    debug!("Counted reads for {} peaks on {chrom}", peaks.len());
                    tx.send((collection_index, chrom, peaks, result)).unwrap();
                });
            }
        });

        // Restore all chromosomes before reporting any error, so that no peaks are lost
        let mut first_error = None;
        for (collection_index, chrom, peaks, result) in rx {
            collections[collection_index].chroms.insert(chrom, peaks);
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.counted = true;
        Ok(())
    }

    /// Fit the normalization model with robust regression of M on A over merged common peaks
    ///
    /// Only merged peaks with a summit distance of at most `summit_dis_cutoff` and a plausible
    /// raw M value are used.
    ///
    pub fn fit_model(&mut self, summit_dis_cutoff: i64) -> ManormResult<&ModelFit> {
        if !self.counted {
            return Err(ManormError::ModelNotReady {
                step: "fit the model",
                precursor: "count reads",
            });
        }

        let mut a_values = Vec::new();
        let mut m_values = Vec::new();
        for peak in self
            .merged_peaks
            .iter()
            .filter(|x| is_fitting_peak(x, summit_dis_cutoff))
        {
            let counts = peak.counts()?;
            a_values.push(counts.a_raw);
            m_values.push(counts.m_raw);
        }
        debug!(
            "Fitting the M-A model over {} of {} merged peaks",
            a_values.len(),
            self.merged_peaks.size()
        );

        let result = huber_regression(&a_values, &m_values, &HuberSettings::default())?;
        let model = NormalizationModel {
            intercept: result.fit.intercept,
            slope: result.fit.slope,
        };
        info!("M-A model: M = {:.5} * A + {:.5}", model.slope, model.intercept);
        if !result.converged {
            warn!(
                "Robust regression did not converge after {} iterations",
                result.iterations
            );
        }

        Ok(&*self.fit.insert(ModelFit {
            model,
            fit_peak_count: a_values.len(),
            robust_scale: result.scale,
            iterations: result.iterations,
            converged: result.converged,
        }))
    }

    /// Normalize all peaks with the fitted model
    ///
    pub fn normalize(&mut self) -> ManormResult<()> {
        let model = match self.fit.as_ref() {
            Some(x) => &x.model,
            None => {
                return Err(ManormError::ModelNotReady {
                    step: "normalize peaks",
                    precursor: "fit the model",
                });
            }
        };
        if self.normalized {
            return Err(ManormError::AlreadyNormalized(format!(
                "collection '{}'",
                self.peaks1.name
            )));
        }

        for collection in [
            &mut self.peaks1,
            &mut self.peaks2,
            &mut self.merged_peaks,
        ] {
            for peak in collection.iter_mut() {
                peak.normalize(model)?;
            }
        }
        self.normalized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomic_region::GenomicRegion;

    fn get_test_peak(chrom: &str, start: i64, end: i64, summit: i64) -> Peak {
        Peak::new(GenomicRegion::new(chrom, start, end, Some(summit)).unwrap())
    }

    /// Build two samples with 6 identical common peaks where sample 1 always has twice the
    /// (pseudo-counted) reads of sample 2, plus one unique peak in sample 1
    ///
    fn get_test_model() -> MaModel {
        let mut peaks1 = PeakCollection::new("test1");
        let mut peaks2 = PeakCollection::new("test2");
        let mut reads1 = ReadIndex::new("test1");
        let mut reads2 = ReadIndex::new("test2");
        for i in 0..6 {
            let summit = 1000 * (i + 1);
            peaks1.add(get_test_peak("chr1", summit - 50, summit + 50, summit));
            peaks2.add(get_test_peak("chr1", summit - 50, summit + 50, summit));
            let count2 = (1 << i) - 1;
            let count1 = 2 * (count2 + 1) - 1;
            for _ in 0..count1 {
                reads1.add("chr1", summit);
            }
            for _ in 0..count2 {
                reads2.add("chr1", summit);
            }
        }
        peaks1.add(get_test_peak("chr2", 100, 200, 150));
        for _ in 0..7 {
            reads1.add("chr2", 150);
        }
        peaks1.sort();
        peaks2.sort();
        reads1.sort();
        reads2.sort();
        MaModel::new(peaks1, peaks2, reads1, reads2)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut peaks1 = PeakCollection::new("test1");
        let mut peaks2 = PeakCollection::new("test2");
        peaks1.add(get_test_peak("chr1", 1, 100, 50));
        peaks2.add(get_test_peak("chr1", 50, 150, 120));
        let mut model = MaModel::new(
            peaks1,
            peaks2,
            ReadIndex::new("test1"),
            ReadIndex::new("test2"),
        );
        model.process_peaks().unwrap();

        assert!(model.peaks1.fetch("chr1")[0].is_common);
        assert!(model.peaks2.fetch("chr1")[0].is_common);
        assert_eq!(model.merged_peaks.size(), 1);
        let merged = &model.merged_peaks.fetch("chr1")[0];
        assert_eq!((merged.start(), merged.end()), (1, 150));
        assert_eq!(merged.summit(), 85);
        assert_eq!(merged.summit_distance, Some(70));
    }

    #[test]
    fn test_stage_order() {
        let mut model = get_test_model();
        assert!(matches!(
            model.count_reads(100, 1),
            Err(ManormError::ModelNotReady { .. })
        ));
        assert!(matches!(
            model.fit_model(25),
            Err(ManormError::ModelNotReady { .. })
        ));
        assert!(matches!(
            model.normalize(),
            Err(ManormError::ModelNotReady { .. })
        ));

        model.process_peaks().unwrap();
        assert!(matches!(
            model.fit_model(25),
            Err(ManormError::ModelNotReady { .. })
        ));
        model.count_reads(100, 2).unwrap();
        assert!(matches!(
            model.count_reads(100, 2),
            Err(ManormError::AlreadyCounted(_))
        ));
        assert!(matches!(
            model.normalize(),
            Err(ManormError::ModelNotReady { .. })
        ));
        model.fit_model(25).unwrap();
        model.normalize().unwrap();
        assert!(matches!(
            model.normalize(),
            Err(ManormError::AlreadyNormalized(_))
        ));
    }

    #[test]
    fn test_full_model() {
        let mut model = get_test_model();
        model.process_peaks().unwrap();
        assert_eq!(model.peaks1.common_count(), 6);
        assert_eq!(model.peaks1.unique_count(), 1);
        assert_eq!(model.merged_peaks.size(), 6);

        model.count_reads(100, 2).unwrap();
        assert_eq!(model.peaks1.size(), 7);
        assert_eq!(model.merged_peaks.size(), 6);
        for peak in model.merged_peaks.iter() {
            approx::assert_abs_diff_eq!(peak.counts().unwrap().m_raw, 1.0, epsilon = 1e-12);
        }
        let unique_counts = model.peaks1.fetch("chr2")[0].counts().unwrap();
        assert_eq!(unique_counts.read_count1, 8);
        assert_eq!(unique_counts.read_count2, 1);

        let fit = model.fit_model(25).unwrap();
        assert_eq!(fit.fit_peak_count, 6);
        approx::assert_abs_diff_eq!(fit.model.slope, 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(fit.model.intercept, 1.0, epsilon = 1e-9);

        model.normalize().unwrap();
        assert!(model.normalized);
        for peak in model.merged_peaks.iter().chain(model.peaks2.iter()) {
            approx::assert_abs_diff_eq!(peak.normalized().unwrap().m_normed, 0.0, epsilon = 1e-9);
        }

        // Unique peak: raw M = log2(8), normalized M = 3 - 1
        let unique_values = model.peaks1.fetch("chr2")[0].normalized().unwrap();
        approx::assert_abs_diff_eq!(unique_values.m_normed, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_count_reads_error_keeps_peaks() {
        let mut model = get_test_model();
        model.process_peaks().unwrap();

        // Count the unique chr2 peak ahead of time so that its chromosome task fails
        model.peaks1.chroms.get_mut("chr2").unwrap()[0]
            .count_reads(&model.reads1, &model.reads2, 100)
            .unwrap();

        assert!(matches!(
            model.count_reads(100, 1),
            Err(ManormError::AlreadyCounted(_))
        ));
        assert_eq!(model.peaks1.size(), 7);
        assert_eq!(model.peaks1.fetch("chr2").len(), 1);
        assert_eq!(model.peaks2.size(), 6);
        assert_eq!(model.merged_peaks.size(), 6);
        assert!(!model.counted);
    }

    #[test]
    fn test_fit_insufficient_data() {
        let mut model = get_test_model();
        model.process_peaks().unwrap();
        model.count_reads(100, 1).unwrap();

        // Negative cutoff leaves no fitting peaks
        assert!(matches!(
            model.fit_model(-1),
            Err(ManormError::InsufficientData { count: 0 })
        ));
        assert!(model.fit().is_none());
    }

    #[test]
    fn test_invalid_window_size() {
        let mut model = get_test_model();
        model.process_peaks().unwrap();
        assert!(matches!(
            model.count_reads(0, 1),
            Err(ManormError::InvalidWindowSize(0))
        ));
    }

    #[test]
    fn test_is_fitting_peak() {
        let region = GenomicRegion::new("chr1", 100, 200, Some(150)).unwrap();
        let mut reads = ReadIndex::new("test");
        reads.add("chr1", 150);
        reads.sort();

        let mut close_peak = Peak::new_merged(region.clone(), Some(10));
        assert!(!is_fitting_peak(&close_peak, 10));
        close_peak.count_reads(&reads, &reads, 100).unwrap();
        assert!(is_fitting_peak(&close_peak, 10));
        assert!(!is_fitting_peak(&close_peak, 9));

        let mut single_peak = Peak::new_merged(region, None);
        single_peak.count_reads(&reads, &reads, 100).unwrap();
        assert!(!is_fitting_peak(&single_peak, 1000));
    }
}
