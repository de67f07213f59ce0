//! Utilities pertaining to the filesystem
//!

use camino::Utf8Path;

/// Create a directory path if it does not exist already
///
/// If the directory already exists no operations are performed
///
/// * `label` - used to describe the directory in an error message
///
pub fn create_dir_all(dir: &Utf8Path, label: &str) {
    if !dir.is_dir() {
        match std::fs::create_dir_all(dir) {
            Ok(_) => {}
            Err(e) => {
                panic!("Can't create new {label} directory at '{dir}': {e}");
            }
        }
    }
}
