use clap::Args;
use rand::Rng;
use serde::Serialize;
use simple_error::{SimpleResult, bail};

use super::defaults::{DEFAULT_RANDOM_REPEAT_COUNT, DEFAULT_WINDOW_SIZE};

#[derive(Args, Serialize)]
#[command(next_help_heading = "Model")]
pub struct ModelSettings {
    /// Size of the window centered on each peak summit used to count reads
    #[arg(short = 'w', long, value_name = "SIZE", default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window_size: i64,

    /// Maximum summit distance of merged common peaks used to fit the normalization model.
    /// Defaults to 1/4 of the window size.
    #[arg(long = "summit-dis", value_name = "DISTANCE")]
    #[serde(skip)]
    summit_dis_option: Option<i64>,

    /// This value will be filled in by summit_dis_option
    #[arg(skip)]
    pub summit_dis_cutoff: i64,

    /// Number of random peak sets generated to test common peak enrichment, 0 disables the test
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_RANDOM_REPEAT_COUNT)]
    pub n_random: usize,

    /// Random seed for the enrichment test. A seed is drawn and logged if this is not given.
    #[arg(long = "seed", value_name = "SEED")]
    #[serde(skip)]
    seed_option: Option<u64>,

    /// This value will be filled in by seed_option
    #[arg(skip)]
    pub seed: u64,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_model_settings(
    mut settings: ModelSettings,
) -> SimpleResult<ModelSettings> {
    if settings.window_size <= 1 {
        bail!("--window-size argument must be greater than 1");
    }

    settings.summit_dis_cutoff = match settings.summit_dis_option {
        Some(x) => {
            if x <= 0 {
                bail!("--summit-dis argument must be greater than 0");
            }
            x
        }
        None => std::cmp::max(settings.window_size / 4, 1),
    };

    settings.seed = match settings.seed_option {
        Some(x) => x,
        None => rand::thread_rng().r#gen::<u64>(),
    };

    Ok(settings)
}
