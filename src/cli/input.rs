use camino::Utf8PathBuf;
use clap::Args;
use serde::Serialize;
use simple_error::{SimpleResult, bail};

use super::defaults::{DEFAULT_PEAK_FORMAT, DEFAULT_READ_FORMAT, DEFAULT_SHIFT_SIZE};
use super::utils::{check_required_filename, get_default_sample_name};
use crate::peak_parsers::PeakFormat;
use crate::read_parsers::{ReadFormat, ReadSettings};

#[derive(Args, Serialize)]
#[command(next_help_heading = "Input")]
pub struct InputSettings {
    /// Peak file of sample 1
    #[arg(long = "peak1", visible_alias = "p1", value_name = "FILE")]
    pub peak1_filename: Utf8PathBuf,

    /// Peak file of sample 2
    #[arg(long = "peak2", visible_alias = "p2", value_name = "FILE")]
    pub peak2_filename: Utf8PathBuf,

    /// Format of both peak files
    #[arg(long, visible_alias = "pf", value_enum, default_value_t = DEFAULT_PEAK_FORMAT)]
    pub peak_format: PeakFormat,

    /// Read file of sample 1
    #[arg(long = "read1", visible_alias = "r1", value_name = "FILE")]
    pub read1_filename: Utf8PathBuf,

    /// Read file of sample 2
    #[arg(long = "read2", visible_alias = "r2", value_name = "FILE")]
    pub read2_filename: Utf8PathBuf,

    /// Format of both read files
    ///
    /// 'bed' reads are single-end only and 'bedpe' reads are paired-end only
    ///
    #[arg(long, visible_alias = "rf", value_enum, default_value_t = DEFAULT_READ_FORMAT)]
    pub read_format: ReadFormat,

    /// Name of sample 1, used in output file names and peak group labels. Defaults to the
    /// name of the sample 1 peak file without its extension.
    #[arg(long = "name1", visible_alias = "n1", value_name = "NAME")]
    #[serde(skip)]
    name1_option: Option<String>,

    /// Name of sample 2, used in output file names and peak group labels. Defaults to the
    /// name of the sample 2 peak file without its extension.
    #[arg(long = "name2", visible_alias = "n2", value_name = "NAME")]
    #[serde(skip)]
    name2_option: Option<String>,

    /// This value will be filled in by name1_option
    #[arg(skip)]
    pub name1: String,

    /// This value will be filled in by name2_option
    #[arg(skip)]
    pub name2: String,

    /// Shift size of sample 1 single-end reads in the 3' direction
    ///
    /// This should typically be half of the expected fragment size.
    ///
    #[arg(long = "shift-size1", visible_alias = "s1", value_name = "N", default_value_t = DEFAULT_SHIFT_SIZE)]
    pub shift_size1: i64,

    /// Shift size of sample 2 single-end reads in the 3' direction
    #[arg(long = "shift-size2", visible_alias = "s2", value_name = "N", default_value_t = DEFAULT_SHIFT_SIZE)]
    pub shift_size2: i64,

    /// Treat reads as paired-end, each read pair is represented by its fragment midpoint
    #[arg(long, visible_alias = "pe")]
    pub paired_end: bool,
}

impl InputSettings {
    pub fn read_settings1(&self) -> ReadSettings {
        ReadSettings {
            paired_end: self.paired_end,
            shift_size: self.shift_size1,
        }
    }

    pub fn read_settings2(&self) -> ReadSettings {
        ReadSettings {
            paired_end: self.paired_end,
            shift_size: self.shift_size2,
        }
    }
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_input_settings(
    mut settings: InputSettings,
) -> SimpleResult<InputSettings> {
    check_required_filename(&settings.peak1_filename, "sample 1 peak")?;
    check_required_filename(&settings.peak2_filename, "sample 2 peak")?;
    check_required_filename(&settings.read1_filename, "sample 1 read")?;
    check_required_filename(&settings.read2_filename, "sample 2 read")?;

    if let Err(e) = settings.read_format.check_mode(settings.paired_end) {
        bail!("{e}");
    }

    settings.name1 = match settings.name1_option.take() {
        Some(x) => x,
        None => get_default_sample_name(&settings.peak1_filename),
    };
    settings.name2 = match settings.name2_option.take() {
        Some(x) => x,
        None => get_default_sample_name(&settings.peak2_filename),
    };
    if settings.name1.is_empty() || settings.name2.is_empty() {
        bail!("Sample names must not be empty");
    }
    if settings.name1 == settings.name2 {
        bail!(
            "Sample names must be different, both samples are named '{}'",
            settings.name1
        );
    }

    Ok(settings)
}
