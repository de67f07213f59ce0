mod defaults;
mod input;
mod model;
mod output;
mod shared;
mod utils;

use camino::Utf8Path;
use clap::Parser;
use serde::Serialize;
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use self::input::validate_and_fix_input_settings;
pub use self::input::InputSettings;
use self::model::validate_and_fix_model_settings;
pub use self::model::ModelSettings;
use self::output::validate_and_fix_output_settings;
pub use self::output::OutputSettings;
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;

pub const SETTINGS_FILENAME: &str = "run.settings.json";

#[derive(Parser, Serialize)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub input: InputSettings,

    #[command(flatten)]
    pub model: ModelSettings,

    #[command(flatten)]
    pub output: OutputSettings,

    #[command(flatten)]
    pub shared: SharedSettings,
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{label} already exists: \"{dirname}\"");
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
/// Assumes no logger has been configured yet
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;
    settings.input = validate_and_fix_input_settings(settings.input)?;
    settings.model = validate_and_fix_model_settings(settings.model)?;
    settings.output = validate_and_fix_output_settings(settings.output)?;
    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {msg}");
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}

/// Write the final run settings out in json format
pub fn write_settings(output_dir: &Utf8Path, settings: &Settings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing run settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create run settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Settings::command().debug_assert();
    }

    #[test]
    fn test_parse_settings() {
        let settings = Settings::try_parse_from([
            "manorm", "--p1", "a.bed", "--p2", "b.bed", "--r1", "a_reads.bed", "--r2",
            "b_reads.bed", "--pf", "macs2", "-w", "1000", "--wa", "--seed", "3",
        ])
        .unwrap();
        assert_eq!(settings.input.peak1_filename, "a.bed");
        assert_eq!(settings.input.peak_format, crate::peak_parsers::PeakFormat::Macs2);
        assert_eq!(settings.input.read_format, crate::read_parsers::ReadFormat::Bed);
        assert_eq!(settings.input.shift_size1, 100);
        assert_eq!(settings.model.window_size, 1000);
        assert_eq!(settings.model.n_random, 10);
        assert!(settings.output.write_all);
        assert_eq!(settings.output.output_dir, "manorm_output");

        let settings = validate_and_fix_settings_impl(settings);
        // Input files don't exist
        assert!(settings.is_err());
    }

    #[test]
    fn test_parse_format_names() {
        for (name, format) in [
            ("bed3-summit", crate::peak_parsers::PeakFormat::Bed3Summit),
            ("narrowpeak", crate::peak_parsers::PeakFormat::NarrowPeak),
            ("broadpeak", crate::peak_parsers::PeakFormat::BroadPeak),
        ] {
            let settings = Settings::try_parse_from([
                "manorm", "--p1", "a.bed", "--p2", "b.bed", "--r1", "a.bam", "--r2", "b.bam",
                "--rf", "bam", "--peak-format", name,
            ])
            .unwrap();
            assert_eq!(settings.input.peak_format, format);
        }
    }

    #[test]
    fn test_check_novel_dirname() {
        assert!(check_novel_dirname(Utf8Path::new("src"), "test").is_err());
        assert!(check_novel_dirname(Utf8Path::new("./not_there_dir"), "test").is_ok());
    }
}
