use crate::peak_parsers::PeakFormat;
use crate::read_parsers::ReadFormat;

pub const DEFAULT_PEAK_FORMAT: PeakFormat = PeakFormat::Bed;
pub const DEFAULT_READ_FORMAT: ReadFormat = ReadFormat::Bed;
pub const DEFAULT_SHIFT_SIZE: i64 = 100;

pub const DEFAULT_WINDOW_SIZE: i64 = 2000;
pub const DEFAULT_RANDOM_REPEAT_COUNT: usize = 10;

pub const DEFAULT_M_CUTOFF: f64 = 1.0;
pub const DEFAULT_P_CUTOFF: f64 = 0.01;
