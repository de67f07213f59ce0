//! Write normalized peak tables, genome browser tracks and biased peak filters
//!

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use unwrap::unwrap;

use crate::ma_model::MaModel;
use crate::peak::{NormalizedValues, Peak};
use crate::peak_collection::PeakCollection;

pub const TRACKS_DIRNAME: &str = "output_tracks";
pub const FILTERS_DIRNAME: &str = "output_filters";

const MERGED_COMMON_GROUP: &str = "merged_common";

/// A normalized peak with its output peak group label
pub struct OutputPeak<'a> {
    pub peak: &'a Peak,
    pub group: String,
}

impl OutputPeak<'_> {
    fn values(&self) -> &NormalizedValues {
        unwrap!(
            self.peak.normalized(),
            "Peak {:?} has not been normalized",
            self.peak.region
        )
    }
}

/// Counts of peaks written to each biased peak filter file
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BiasedPeakCounts {
    /// Peaks biased toward sample 1
    pub biased1: usize,

    /// Peaks biased toward sample 2
    pub biased2: usize,

    pub unbiased: usize,
}

pub fn get_output_prefix(name1: &str, name2: &str) -> String {
    format!("{name1}_vs_{name2}")
}

fn get_unique_peaks(peaks: &PeakCollection) -> impl Iterator<Item = OutputPeak<'_>> {
    let group = format!("{}_unique", peaks.name);
    peaks
        .iter()
        .filter(|x| !x.is_common)
        .map(move |peak| OutputPeak {
            peak,
            group: group.clone(),
        })
}

/// Get unique peaks of sample 1, then merged common peaks, then unique peaks of sample 2
///
pub fn get_unique_and_merged_peaks(model: &MaModel) -> Vec<OutputPeak<'_>> {
    let merged_peaks = model.merged_peaks.iter().map(|peak| OutputPeak {
        peak,
        group: MERGED_COMMON_GROUP.to_string(),
    });
    get_unique_peaks(&model.peaks1)
        .chain(merged_peaks)
        .chain(get_unique_peaks(&model.peaks2))
        .collect()
}

/// Format P-values with the shortest representation, using scientific notation for small values
///
/// Scientific notation exponents have a sign and at least two digits, e.g. `1.5e-05`.
///
fn format_p_value(p: f64) -> String {
    if p != 0.0 && p < 1e-4 {
        let sci = format!("{p:e}");
        match sci.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent = exponent.parse::<i32>().unwrap_or_default();
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exponent.abs())
            }
            None => sci,
        }
    } else {
        format!("{p}")
    }
}

fn write_ma_table_header<W: Write>(f: &mut W, name1: &str, name2: &str) {
    writeln!(
        f,
        "chr\tstart\tend\tsummit\tM_value\tA_value\tP_value\tPeak_Group\tnormalized_read_density_in_{name1}\tnormalized_read_density_in_{name2}"
    )
    .unwrap();
}

/// Write one row per peak with 1-based start and summit
///
fn write_ma_table<W: Write>(f: &mut W, peaks: &[OutputPeak], name1: &str, name2: &str) {
    write_ma_table_header(f, name1, name2);
    for output_peak in peaks {
        let peak = output_peak.peak;
        let values = output_peak.values();
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{:.5}\t{:.5}\t{}\t{}\t{:.5}\t{:.5}",
            peak.chrom(),
            peak.start() + 1,
            peak.end(),
            peak.summit() + 1,
            values.m_normed,
            values.a_normed,
            format_p_value(values.p_value),
            output_peak.group,
            values.read_density1_normed,
            values.read_density2_normed,
        )
        .unwrap();
    }
}

fn create_output_file(filename: &Utf8Path, label: &str) -> BufWriter<File> {
    let f = unwrap!(
        File::create(filename),
        "Unable to create {label} file: '{filename}'"
    );
    BufWriter::new(f)
}

/// Write M-A values for the unique peaks of both samples and the merged common peaks
///
pub fn write_all_peaks(output_dir: &Utf8Path, model: &MaModel) {
    let name1 = &model.peaks1.name;
    let name2 = &model.peaks2.name;
    let filename = output_dir.join(format!(
        "{}_all_MAvalues.xls",
        get_output_prefix(name1, name2)
    ));
    info!("Writing M-A values of all peaks to file: '{filename}'");

    let mut f = create_output_file(&filename, "M-A values table");
    write_ma_table(&mut f, &get_unique_and_merged_peaks(model), name1, name2);
}

/// Write M-A values for the original peaks of each sample, in separate files
///
pub fn write_original_peaks(output_dir: &Utf8Path, model: &MaModel) {
    let name1 = &model.peaks1.name;
    let name2 = &model.peaks2.name;
    for peaks in [&model.peaks1, &model.peaks2] {
        let filename = output_dir.join(format!("{}_MAvalues.xls", peaks.name));
        info!(
            "Writing M-A values of sample '{}' peaks to file: '{filename}'",
            peaks.name
        );
        let output_peaks = peaks
            .iter()
            .map(|peak| {
                let group = if peak.is_common { "common" } else { "unique" };
                OutputPeak {
                    peak,
                    group: format!("{}_{group}", peaks.name),
                }
            })
            .collect::<Vec<_>>();

        let mut f = create_output_file(&filename, "M-A values table");
        write_ma_table(&mut f, &output_peaks, name1, name2);
    }
}

/// Which normalized value is written to a wiggle track
#[derive(Clone, Copy, strum::Display)]
enum TrackValue {
    #[strum(serialize = "M")]
    M,
    #[strum(serialize = "A")]
    A,
    #[strum(serialize = "P")]
    P,
}

impl TrackValue {
    fn track_name(&self, prefix: &str) -> String {
        match self {
            TrackValue::P => format!("{prefix}_-log10(P_value)"),
            _ => format!("{prefix}_{self}_value"),
        }
    }

    fn format_value(&self, values: &NormalizedValues) -> String {
        match self {
            TrackValue::M => format!("{:.5}", values.m_normed),
            TrackValue::A => format!("{:.5}", values.a_normed),
            TrackValue::P => format!("{}", -values.p_value.log10()),
        }
    }
}

/// Write a variableStep wiggle track of one value at the 1-based summit of each peak
///
/// Peaks are written in summit order for each chromosome.
///
fn write_wiggle_track<W: Write>(
    f: &mut W,
    peaks: &[OutputPeak],
    prefix: &str,
    track_value: TrackValue,
) {
    writeln!(
        f,
        "track type=wiggle_0 name={} visibility=full autoScale=on color=255,0,0 yLineMark=0 yLineOnOff=on priority=10",
        track_value.track_name(prefix)
    )
    .unwrap();

    let mut chrom_peaks: BTreeMap<&str, Vec<&OutputPeak>> = BTreeMap::new();
    for output_peak in peaks {
        chrom_peaks
            .entry(output_peak.peak.chrom())
            .or_default()
            .push(output_peak);
    }

    for (chrom, mut peaks) in chrom_peaks {
        peaks.sort_by_key(|x| x.peak.summit());
        writeln!(f, "variableStep chrom={chrom} span=100").unwrap();
        for output_peak in peaks {
            writeln!(
                f,
                "{}\t{}",
                output_peak.peak.summit() + 1,
                track_value.format_value(output_peak.values())
            )
            .unwrap();
        }
    }
}

/// Write wiggle tracks of M values, A values and P values
///
pub fn write_wiggle_tracks(output_dir: &Utf8Path, model: &MaModel) {
    let prefix = get_output_prefix(&model.peaks1.name, &model.peaks2.name);
    let output_peaks = get_unique_and_merged_peaks(model);
    for track_value in [TrackValue::M, TrackValue::A, TrackValue::P] {
        let filename = output_dir
            .join(TRACKS_DIRNAME)
            .join(format!("{prefix}_{track_value}_values.wig"));
        info!("Writing {track_value} value track to file: '{filename}'");
        let mut f = create_output_file(&filename, "wiggle track");
        write_wiggle_track(&mut f, &output_peaks, &prefix, track_value);
    }
}

/// Category of a normalized peak given the M value and P-value cutoffs
#[derive(Debug, PartialEq)]
pub enum PeakBias {
    Biased1,
    Biased2,
    Unbiased,

    /// Peaks which are neither clearly biased nor unbiased
    None,
}

pub fn get_peak_bias(values: &NormalizedValues, m_cutoff: f64, p_cutoff: f64) -> PeakBias {
    let m_cutoff = m_cutoff.abs();
    if values.m_normed.abs() < m_cutoff {
        PeakBias::Unbiased
    } else if values.p_value <= p_cutoff {
        if values.m_normed >= m_cutoff {
            PeakBias::Biased1
        } else {
            PeakBias::Biased2
        }
    } else {
        PeakBias::None
    }
}

fn write_biased_peaks_impl<W: Write>(
    biased1: &mut W,
    biased2: &mut W,
    unbiased: &mut W,
    peaks: &[OutputPeak],
    m_cutoff: f64,
    p_cutoff: f64,
) -> BiasedPeakCounts {
    let mut counts = BiasedPeakCounts::default();
    for output_peak in peaks {
        let values = output_peak.values();
        let (f, count) = match get_peak_bias(values, m_cutoff, p_cutoff) {
            PeakBias::Biased1 => (&mut *biased1, &mut counts.biased1),
            PeakBias::Biased2 => (&mut *biased2, &mut counts.biased2),
            PeakBias::Unbiased => (&mut *unbiased, &mut counts.unbiased),
            PeakBias::None => continue,
        };
        *count += 1;
        let peak = output_peak.peak;
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{:.5}",
            peak.chrom(),
            peak.start(),
            peak.end(),
            output_peak.group,
            values.m_normed
        )
        .unwrap();
    }
    counts
}

/// Write BED files of peaks biased toward either sample, and of unbiased peaks
///
pub fn write_biased_peaks(
    output_dir: &Utf8Path,
    model: &MaModel,
    m_cutoff: f64,
    p_cutoff: f64,
) -> BiasedPeakCounts {
    let m_cutoff = m_cutoff.abs();
    let prefix = get_output_prefix(&model.peaks1.name, &model.peaks2.name);
    let filters_dir = output_dir.join(FILTERS_DIRNAME);
    let biased1_filename =
        filters_dir.join(format!("{prefix}_M_above_{m_cutoff:?}_biased_peaks.bed"));
    let biased2_filename =
        filters_dir.join(format!("{prefix}_M_below_-{m_cutoff:?}_biased_peaks.bed"));
    let unbiased_filename = filters_dir.join(format!("{prefix}_unbiased_peaks.bed"));
    info!("Writing biased and unbiased peaks to directory: '{filters_dir}'");

    let mut biased1 = create_output_file(&biased1_filename, "biased peaks");
    let mut biased2 = create_output_file(&biased2_filename, "biased peaks");
    let mut unbiased = create_output_file(&unbiased_filename, "unbiased peaks");
    write_biased_peaks_impl(
        &mut biased1,
        &mut biased2,
        &mut unbiased,
        &get_unique_and_merged_peaks(model),
        m_cutoff,
        p_cutoff,
    )
}
