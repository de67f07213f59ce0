//! Error types shared by the peak, read and model components
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManormError {
    #[error("Invalid region {chrom}:{start}-{end} (summit {summit}): {reason}")]
    InvalidRegion {
        chrom: String,
        start: i64,
        end: i64,
        summit: i64,
        reason: &'static str,
    },

    #[error("Invalid read count range, expected start < end, got: start={start} end={end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("Invalid window size {0}, window size must be greater than 0")]
    InvalidWindowSize(i64),

    #[error(
        "Insufficient common peaks to fit the M-A model: {count} usable peak(s) after filtering, at least 2 are required"
    )]
    InsufficientData { count: usize },

    #[error("Unable to fit the M-A model, all {count} fitting peaks have the same A value")]
    SingularFit { count: usize },

    #[error("Unable to {step}, please {precursor} first")]
    ModelNotReady {
        step: &'static str,
        precursor: &'static str,
    },

    #[error("Reads have already been counted for peak {0}")]
    AlreadyCounted(String),

    #[error("Reads have not been counted for peak {0}")]
    NotCounted(String),

    #[error("Peak {0} has already been normalized")]
    AlreadyNormalized(String),

    #[error("Expected non-negative read densities, got: x={x} y={y}")]
    NegativeValue { x: f64, y: f64 },

    #[error("Invalid {format} format at line {line_num}: '{line}'")]
    FileFormat {
        format: &'static str,
        line_num: usize,
        line: String,
    },

    #[error("Read format '{format}' is in conflict with {mode} mode")]
    FormatModeConflict {
        format: &'static str,
        mode: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),
}

impl ManormError {
    /// Process exit code matching this error category
    ///
    pub fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            ManormError::Io(_) | ManormError::Htslib(_) => exitcode::IOERR,
            ManormError::FormatModeConflict { .. } => exitcode::USAGE,
            ManormError::ModelNotReady { .. }
            | ManormError::AlreadyCounted(_)
            | ManormError::NotCounted(_)
            | ManormError::AlreadyNormalized(_) => exitcode::SOFTWARE,
            _ => exitcode::DATAERR,
        }
    }
}

pub type ManormResult<T> = Result<T, ManormError>;
