use camino::Utf8Path;
use log::info;

use crate::cli::{InputSettings, Settings};
use crate::enrichment::random_peak_overlap;
use crate::errors::ManormResult;
use crate::ma_model::MaModel;
use crate::peak_collection::PeakCollection;
use crate::peak_output::{
    write_all_peaks, write_biased_peaks, write_original_peaks, write_wiggle_tracks,
};
use crate::peak_parsers::load_peaks;
use crate::read_index::ReadIndex;
use crate::read_parsers::{ReadSettings, load_reads};
use crate::run_stats::{EnrichmentStats, RunStats, write_run_stats};

type SampleData = (PeakCollection, ReadIndex);

fn load_sample(
    input: &InputSettings,
    peak_filename: &Utf8Path,
    read_filename: &Utf8Path,
    name: &str,
    read_settings: &ReadSettings,
) -> ManormResult<SampleData> {
    let peaks = load_peaks(peak_filename, input.peak_format, name)?;
    let reads = load_reads(read_filename, input.read_format, name, read_settings)?;
    Ok((peaks, reads))
}

/// Load peaks and reads of both samples, each sample on its own worker
///
fn load_sample_data(settings: &Settings) -> ManormResult<(SampleData, SampleData)> {
    let input = &settings.input;

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.shared.thread_count)
        .build()
        .unwrap();

    let (sample1, sample2) = worker_pool.install(|| {
        rayon::join(
            || {
                load_sample(
                    input,
                    &input.peak1_filename,
                    &input.read1_filename,
                    &input.name1,
                    &input.read_settings1(),
                )
            },
            || {
                load_sample(
                    input,
                    &input.peak2_filename,
                    &input.read2_filename,
                    &input.name2,
                    &input.read_settings2(),
                )
            },
        )
    });
    Ok((sample1?, sample2?))
}

/// Test whether common peaks of sample 1 are enriched relative to random peak placement
///
fn run_enrichment_test(
    settings: &Settings,
    model: &MaModel,
) -> ManormResult<Option<EnrichmentStats>> {
    let repeat_count = settings.model.n_random;
    let seed = settings.model.seed;
    if repeat_count == 0 {
        info!("Skipping common peak enrichment test");
        return Ok(None);
    }

    info!("Testing common peak enrichment with {repeat_count} random peak sets (seed: {seed})");
    let random_overlap = random_peak_overlap(&model.peaks2, &model.peaks1, repeat_count, seed)?;
    let Some(random_overlap) = random_overlap else {
        return Ok(None);
    };

    let observed_count = model.peaks1.common_count();
    let fold_change = random_overlap.fold_change(observed_count);
    info!(
        "Random overlap of sample '{}' peaks: mean {:.2} std {:.2}",
        model.peaks1.name, random_overlap.mean, random_overlap.std
    );
    match fold_change {
        Some(x) => info!("Common peak fold enrichment: {x:.2} ({observed_count} observed)"),
        None => info!("Common peak fold enrichment is undefined, no random peaks overlap"),
    }

    Ok(Some(EnrichmentStats {
        repeat_count,
        seed,
        random_overlap_mean: random_overlap.mean,
        random_overlap_std: random_overlap.std,
        fold_change,
    }))
}

pub fn run_manorm(settings: &Settings) -> ManormResult<()> {
    let output_dir = &settings.output.output_dir;

    info!("Step 1: Loading peaks and reads");
    let ((peaks1, reads1), (peaks2, reads2)) = load_sample_data(settings)?;

    info!("Step 2: Classifying and merging common peaks");
    let mut model = MaModel::new(peaks1, peaks2, reads1, reads2);
    model.process_peaks()?;
    for peaks in [&model.peaks1, &model.peaks2] {
        info!(
            "Sample '{}': {} unique peaks, {} common peaks",
            peaks.name,
            peaks.unique_count(),
            peaks.common_count()
        );
    }
    info!("Merged common peaks: {}", model.merged_peaks.size());

    info!("Step 3: Counting reads in peak windows");
    model.count_reads(settings.model.window_size, settings.shared.thread_count)?;

    info!("Step 4: Fitting the M-A normalization model");
    model.fit_model(settings.model.summit_dis_cutoff)?;

    info!("Step 5: Normalizing peak read densities");
    model.normalize()?;

    info!("Step 6: Common peak enrichment test");
    let enrichment = run_enrichment_test(settings, &model)?;

    info!("Step 7: Writing output files");
    write_all_peaks(output_dir, &model);
    if settings.output.write_all {
        write_original_peaks(output_dir, &model);
    }
    write_wiggle_tracks(output_dir, &model);
    let biased_peaks = write_biased_peaks(
        output_dir,
        &model,
        settings.output.m_cutoff,
        settings.output.p_cutoff,
    );
    info!(
        "Biased peaks: {} toward '{}', {} toward '{}', {} unbiased",
        biased_peaks.biased1,
        model.peaks1.name,
        biased_peaks.biased2,
        model.peaks2.name,
        biased_peaks.unbiased
    );

    let run_stats = RunStats::new(&model, enrichment, biased_peaks);
    write_run_stats(output_dir, &run_stats);

    Ok(())
}
