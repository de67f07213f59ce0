//! Track stats for the whole manorm run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use unwrap::unwrap;

use crate::ma_model::{MaModel, ModelFit};
use crate::peak_output::BiasedPeakCounts;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Serialize)]
pub struct SampleStats {
    pub name: String,
    pub read_count: usize,
    pub peak_count: usize,
    pub unique_peak_count: usize,
    pub common_peak_count: usize,
}

#[derive(Serialize)]
pub struct EnrichmentStats {
    pub repeat_count: usize,
    pub seed: u64,
    pub random_overlap_mean: f64,
    pub random_overlap_std: f64,

    /// Observed common peak count of sample 1 over the random overlap mean, if the mean is positive
    pub fold_change: Option<f64>,
}

#[derive(Serialize)]
pub struct RunStats {
    pub sample1: SampleStats,
    pub sample2: SampleStats,
    pub merged_common_peak_count: usize,
    pub model_fit: Option<ModelFit>,
    pub enrichment: Option<EnrichmentStats>,
    pub biased_peaks: BiasedPeakCounts,
}

impl RunStats {
    pub fn new(
        model: &MaModel,
        enrichment: Option<EnrichmentStats>,
        biased_peaks: BiasedPeakCounts,
    ) -> Self {
        let sample_stats = |peaks: &crate::peak_collection::PeakCollection, read_count| SampleStats {
            name: peaks.name.clone(),
            read_count,
            peak_count: peaks.size(),
            unique_peak_count: peaks.unique_count(),
            common_peak_count: peaks.common_count(),
        };
        Self {
            sample1: sample_stats(&model.peaks1, model.reads1.size()),
            sample2: sample_stats(&model.peaks2, model.reads2.size()),
            merged_common_peak_count: model.merged_peaks.size(),
            model_fit: model.fit().cloned(),
            enrichment,
            biased_peaks,
        }
    }
}

/// Write run_stats structure out in json format
pub fn write_run_stats(output_dir: &Utf8Path, run_stats: &RunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
