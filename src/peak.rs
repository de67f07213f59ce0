//! MAnorm peak data and its per-stage values
//!
//! A peak moves through the pipeline stages in a fixed order: classification, (optionally)
//! merging, read counting and normalization. The values from each of the last two stages are
//! stored exactly once, and attempts to reset them are reported as errors.
//!

use crate::errors::{ManormError, ManormResult};
use crate::genomic_region::GenomicRegion;
use crate::ma_model::NormalizationModel;
use crate::read_index::ReadIndex;
use crate::stats::{ma_to_xy, manorm_p, round_decimals, xy_to_ma};

/// Values rounded to this number of decimal places after normalization
const NORMED_DECIMALS: i32 = 5;

/// Read counts, densities and raw (M, A) values of a peak
///
#[derive(Clone, Debug, PartialEq)]
pub struct ReadCounts {
    /// Read count of sample 1 in the summit window, including a pseudo-count of 1
    pub read_count1: u64,

    /// Read count of sample 2 in the summit window, including a pseudo-count of 1
    pub read_count2: u64,

    /// Sample 1 reads per kilobase of window
    pub read_density1: f64,

    /// Sample 2 reads per kilobase of window
    pub read_density2: f64,

    pub m_raw: f64,
    pub a_raw: f64,
}

impl ReadCounts {
    /// Count reads of both samples in the window of size `window_size` centered on the summit
    ///
    /// The counting window is [summit - extend, summit + extend), where extend is `window_size / 2`
    ///
    pub fn from_read_indexes(
        region: &GenomicRegion,
        reads1: &ReadIndex,
        reads2: &ReadIndex,
        window_size: i64,
    ) -> ManormResult<Self> {
        let extend = window_size / 2;
        if extend <= 0 {
            return Err(ManormError::InvalidWindowSize(window_size));
        }
        let start = region.summit - extend;
        let end = region.summit + extend;

        let read_count1 = reads1.count(&region.chrom, start, end)? + 1;
        let read_count2 = reads2.count(&region.chrom, start, end)? + 1;

        let window_kb = (2 * extend) as f64;
        let read_density1 = read_count1 as f64 * 1000.0 / window_kb;
        let read_density2 = read_count2 as f64 * 1000.0 / window_kb;
        let (m_raw, a_raw) = xy_to_ma(read_density1, read_density2);

        Ok(Self {
            read_count1,
            read_count2,
            read_density1,
            read_density2,
            m_raw,
            a_raw,
        })
    }
}

/// Normalized values of a peak
///
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedValues {
    pub m_normed: f64,
    pub a_normed: f64,
    pub read_density1_normed: f64,
    pub read_density2_normed: f64,
    pub p_value: f64,
}

impl NormalizedValues {
    /// Remove the global M-A dependence given by `model` from the raw peak values
    ///
    pub fn from_model(counts: &ReadCounts, model: &NormalizationModel) -> ManormResult<Self> {
        let m_normed = round_decimals(counts.m_raw - model.predict(counts.a_raw), NORMED_DECIMALS);
        let a_normed = round_decimals(counts.a_raw, NORMED_DECIMALS);
        let (x, y) = ma_to_xy(m_normed, a_normed);
        let read_density1_normed = round_decimals(x, NORMED_DECIMALS);
        let read_density2_normed = round_decimals(y, NORMED_DECIMALS);
        let p_value = manorm_p(read_density1_normed, read_density2_normed)?;
        Ok(Self {
            m_normed,
            a_normed,
            read_density1_normed,
            read_density2_normed,
            p_value,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Peak {
    pub region: GenomicRegion,

    /// True if this peak overlaps at least one peak of the other sample
    pub is_common: bool,

    /// Minimal distance between neighboring source summits, only set for merged common peaks
    /// which were built from at least two source peaks
    pub summit_distance: Option<i64>,

    counts: Option<ReadCounts>,
    normalized: Option<NormalizedValues>,
}

impl Peak {
    pub fn new(region: GenomicRegion) -> Self {
        Self {
            region,
            is_common: false,
            summit_distance: None,
            counts: None,
            normalized: None,
        }
    }

    /// Create a merged common peak
    pub fn new_merged(region: GenomicRegion, summit_distance: Option<i64>) -> Self {
        Self {
            is_common: true,
            summit_distance,
            ..Self::new(region)
        }
    }

    pub fn chrom(&self) -> &str {
        &self.region.chrom
    }

    pub fn start(&self) -> i64 {
        self.region.start()
    }

    pub fn end(&self) -> i64 {
        self.region.end()
    }

    pub fn summit(&self) -> i64 {
        self.region.summit
    }

    /// Copy of this peak with the overlap classification updated
    pub fn with_common_flag(&self, is_common: bool) -> Self {
        Self {
            is_common,
            ..self.clone()
        }
    }

    pub fn is_counted(&self) -> bool {
        self.counts.is_some()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized.is_some()
    }

    pub fn counts(&self) -> ManormResult<&ReadCounts> {
        self.counts
            .as_ref()
            .ok_or_else(|| ManormError::NotCounted(self.label()))
    }

    pub fn normalized(&self) -> Option<&NormalizedValues> {
        self.normalized.as_ref()
    }

    /// Count reads around the peak summit and compute raw (M, A) values
    ///
    pub fn count_reads(
        &mut self,
        reads1: &ReadIndex,
        reads2: &ReadIndex,
        window_size: i64,
    ) -> ManormResult<()> {
        if self.is_counted() {
            return Err(ManormError::AlreadyCounted(self.label()));
        }
        self.counts = Some(ReadCounts::from_read_indexes(
            &self.region,
            reads1,
            reads2,
            window_size,
        )?);
        Ok(())
    }

    /// Normalize M and A values with the fitted model
    ///
    pub fn normalize(&mut self, model: &NormalizationModel) -> ManormResult<()> {
        if self.is_normalized() {
            return Err(ManormError::AlreadyNormalized(self.label()));
        }
        let values = NormalizedValues::from_model(self.counts()?, model)?;
        self.normalized = Some(values);
        Ok(())
    }

    fn label(&self) -> String {
        format!("{:?}", self.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_peak() -> Peak {
        Peak::new(GenomicRegion::new("chr1", 1000, 3000, Some(2000)).unwrap())
    }

    fn get_test_reads(positions: &[i64]) -> ReadIndex {
        let mut reads = ReadIndex::new("test");
        for &pos in positions {
            reads.add("chr1", pos);
        }
        reads.sort();
        reads
    }

    #[test]
    fn test_count_reads() {
        let mut peak = get_test_peak();
        let reads1 = get_test_reads(&[999, 1000, 1500, 2999, 3000]);
        let reads2 = get_test_reads(&[1000]);
        peak.count_reads(&reads1, &reads2, 2000).unwrap();

        let counts = peak.counts().unwrap();
        assert_eq!(counts.read_count1, 4);
        assert_eq!(counts.read_count2, 2);
        approx::assert_ulps_eq!(counts.read_density1, 2.0, max_ulps = 4);
        approx::assert_ulps_eq!(counts.read_density2, 1.0, max_ulps = 4);
        approx::assert_ulps_eq!(counts.m_raw, 1.0, max_ulps = 4);
        approx::assert_ulps_eq!(counts.a_raw, 0.5, max_ulps = 4);
    }

    #[test]
    fn test_count_reads_odd_window() {
        // extend = 1001 / 2 = 500, so the effective window is 1000
        let mut peak = get_test_peak();
        let reads = get_test_reads(&[1500, 2499, 2500]);
        peak.count_reads(&reads, &reads, 1001).unwrap();
        let counts = peak.counts().unwrap();
        assert_eq!(counts.read_count1, 3);
        approx::assert_ulps_eq!(counts.read_density1, 3.0, max_ulps = 4);
    }

    #[test]
    fn test_invalid_window_size() {
        let reads = get_test_reads(&[]);
        for window_size in [0, -10, 1] {
            let mut peak = get_test_peak();
            assert!(matches!(
                peak.count_reads(&reads, &reads, window_size),
                Err(ManormError::InvalidWindowSize(_))
            ));
            assert!(!peak.is_counted());
        }
    }

    #[test]
    fn test_stage_guards() {
        let model = NormalizationModel {
            intercept: 0.0,
            slope: 0.0,
        };
        let reads = get_test_reads(&[2000]);

        let mut peak = get_test_peak();
        assert!(matches!(peak.counts(), Err(ManormError::NotCounted(_))));
        assert!(matches!(
            peak.normalize(&model),
            Err(ManormError::NotCounted(_))
        ));

        peak.count_reads(&reads, &reads, 2000).unwrap();
        assert!(matches!(
            peak.count_reads(&reads, &reads, 2000),
            Err(ManormError::AlreadyCounted(_))
        ));

        peak.normalize(&model).unwrap();
        assert!(matches!(
            peak.normalize(&model),
            Err(ManormError::AlreadyNormalized(_))
        ));
    }

    #[test]
    fn test_normalize() {
        let model = NormalizationModel {
            intercept: 0.5,
            slope: 0.2,
        };
        let mut peak = get_test_peak();
        let reads1 = get_test_reads(&[1500, 1600, 1700]);
        let reads2 = get_test_reads(&[1500]);
        peak.count_reads(&reads1, &reads2, 2000).unwrap();
        peak.normalize(&model).unwrap();

        let counts = peak.counts().unwrap();
        let values = peak.normalized().unwrap();
        let expected_m = round_decimals(counts.m_raw - (0.2 * counts.a_raw + 0.5), 5);
        approx::assert_ulps_eq!(values.m_normed, expected_m, max_ulps = 4);
        approx::assert_ulps_eq!(values.a_normed, round_decimals(counts.a_raw, 5), max_ulps = 4);

        // Normalized densities invert the normalized (M, A) values
        let (x, y) = ma_to_xy(values.m_normed, values.a_normed);
        approx::assert_abs_diff_eq!(values.read_density1_normed, x, epsilon = 5e-6);
        approx::assert_abs_diff_eq!(values.read_density2_normed, y, epsilon = 5e-6);
        assert!(values.p_value > 0.0 && values.p_value <= 1.0);
    }

    #[test]
    fn test_with_common_flag() {
        let peak = get_test_peak();
        let common_peak = peak.with_common_flag(true);
        assert!(!peak.is_common);
        assert!(common_peak.is_common);
        assert_eq!(common_peak.region, peak.region);
    }
}
