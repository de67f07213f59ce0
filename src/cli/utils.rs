use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &Utf8Path, label: &str) -> SimpleResult<()> {
    if filename.as_str().is_empty() {
        bail!("Must specify {label} file");
    }
    if !filename.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !filename.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Get the default sample name from an input filename
///
/// This is the file name without its final extension, or the full file name if there is no
/// extension.
///
pub fn get_default_sample_name(filename: &Utf8Path) -> String {
    match filename.file_stem() {
        Some(x) if !x.is_empty() => x.to_string(),
        _ => filename.to_string(),
    }
}
