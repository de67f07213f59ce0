mod cli;
mod enrichment;
mod errors;
mod genomic_region;
mod globals;
mod int_range;
mod logger;
mod ma_model;
mod manorm_run;
mod merge_peaks;
mod os_utils;
mod overlap;
mod peak;
mod peak_collection;
mod peak_output;
mod peak_parsers;
mod read_index;
mod read_parsers;
mod robust_regression;
mod run_stats;
mod stats;

use std::process;

use hhmmss::Hhmmss;
use log::{error, info};

use crate::errors::ManormResult;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;
use crate::manorm_run::run_manorm;

fn run(settings: &cli::Settings) -> ManormResult<()> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    cli::write_settings(&settings.output.output_dir, settings);
    run_manorm(settings)?;

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        &settings.output.output_dir,
        settings.shared.clobber,
        settings.shared.verbose,
    );

    if let Err(err) = run(&settings) {
        error!("{err}");
        process::exit(err.exit_code());
    }
}
