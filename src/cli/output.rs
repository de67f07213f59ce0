use camino::Utf8PathBuf;
use clap::Args;
use const_format::concatcp;
use serde::Serialize;
use simple_error::{SimpleResult, bail};

use super::defaults::{DEFAULT_M_CUTOFF, DEFAULT_P_CUTOFF};

#[derive(Args, Serialize)]
#[command(next_help_heading = "Output")]
pub struct OutputSettings {
    /// Absolute M value cutoff used to select biased and unbiased peaks
    #[arg(short = 'm', long, value_name = "CUTOFF", default_value_t = DEFAULT_M_CUTOFF)]
    pub m_cutoff: f64,

    /// P-value cutoff used to select biased peaks
    #[arg(short = 'p', long, value_name = "CUTOFF", default_value_t = DEFAULT_P_CUTOFF)]
    pub p_cutoff: f64,

    /// Directory for all output
    #[arg(short = 'o', long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_output"))]
    pub output_dir: Utf8PathBuf,

    /// Also write M-A values for the original peaks of each sample
    #[arg(long, visible_alias = "wa")]
    pub write_all: bool,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_output_settings(
    mut settings: OutputSettings,
) -> SimpleResult<OutputSettings> {
    if !settings.m_cutoff.is_finite() {
        bail!("--m-cutoff argument must be a finite number");
    }
    settings.m_cutoff = settings.m_cutoff.abs();

    if !(settings.p_cutoff > 0.0 && settings.p_cutoff <= 1.0) {
        bail!("--p-cutoff argument must be in (0,1]");
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_settings(m_cutoff: f64, p_cutoff: f64) -> OutputSettings {
        OutputSettings {
            m_cutoff,
            p_cutoff,
            output_dir: Utf8PathBuf::from("test_output"),
            write_all: false,
        }
    }

    #[test]
    fn test_validate_output_settings() {
        let settings = validate_and_fix_output_settings(get_test_settings(-2.0, 0.01)).unwrap();
        approx::assert_ulps_eq!(settings.m_cutoff, 2.0, max_ulps = 4);

        assert!(validate_and_fix_output_settings(get_test_settings(1.0, 1.0)).is_ok());
        assert!(validate_and_fix_output_settings(get_test_settings(1.0, 0.0)).is_err());
        assert!(validate_and_fix_output_settings(get_test_settings(1.0, 1.5)).is_err());
        assert!(validate_and_fix_output_settings(get_test_settings(f64::NAN, 0.01)).is_err());
    }
}
