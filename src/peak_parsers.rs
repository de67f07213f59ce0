//! Parsers for the supported peak file formats
//!

use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use log::{debug, info};
use serde::Serialize;
use thousands::Separable;

use crate::errors::{ManormError, ManormResult};
use crate::genomic_region::GenomicRegion;
use crate::peak::Peak;
use crate::peak_collection::PeakCollection;

#[derive(
    Clone, Copy, Debug, PartialEq, Serialize, clap::ValueEnum, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PeakFormat {
    /// BED peaks, the summit is the peak midpoint
    Bed,

    /// BED peaks with the absolute summit position in column 4
    Bed3Summit,

    /// MACS xls peaks
    Macs,

    /// MACS2 xls peaks
    Macs2,

    /// ENCODE narrowPeak peaks
    #[value(name = "narrowpeak")]
    #[strum(serialize = "narrowpeak")]
    NarrowPeak,

    /// ENCODE broadPeak peaks, the summit is the peak midpoint
    #[value(name = "broadpeak")]
    #[strum(serialize = "broadpeak")]
    BroadPeak,
}

/// Fields parsed from a single peak line
type PeakFields<'a> = (&'a str, i64, i64, Option<i64>);

fn is_track_header(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("track") || line.starts_with("browser")
}

fn is_macs_header(line: &str) -> bool {
    line.starts_with('#') || line.split('\t').next() == Some("chr")
}

fn get_int_field(words: &[&str], index: usize) -> Option<i64> {
    words.get(index)?.trim().parse::<i64>().ok()
}

impl PeakFormat {
    fn label(&self) -> &'static str {
        self.into()
    }

    fn is_header(&self, line: &str) -> bool {
        match self {
            PeakFormat::Bed | PeakFormat::NarrowPeak | PeakFormat::BroadPeak => {
                is_track_header(line)
            }
            PeakFormat::Bed3Summit => line.starts_with('#'),
            PeakFormat::Macs | PeakFormat::Macs2 => is_macs_header(line),
        }
    }

    /// Parse one line of peak data, or return None if the line is malformed
    ///
    /// Returned coordinates are 0-based, and the summit is absolute.
    ///
    fn parse_line<'a>(&self, line: &'a str) -> Option<PeakFields<'a>> {
        let words = line.split('\t').collect::<Vec<_>>();
        let chrom = *words.first()?;
        let start = get_int_field(&words, 1)?;
        let end = get_int_field(&words, 2)?;
        let fields = match self {
            PeakFormat::Bed | PeakFormat::BroadPeak => (chrom, start, end, None),
            PeakFormat::Bed3Summit => (chrom, start, end, Some(get_int_field(&words, 3)?)),
            PeakFormat::Macs => {
                // Start is 1-based and the summit is relative to the 0-based start
                let start = start - 1;
                (chrom, start, end, Some(start + get_int_field(&words, 4)?))
            }
            PeakFormat::Macs2 => {
                // Start and absolute summit are both 1-based
                (chrom, start - 1, end, Some(get_int_field(&words, 4)? - 1))
            }
            PeakFormat::NarrowPeak => {
                let summit = match get_int_field(&words, 9)? {
                    -1 => None,
                    offset => Some(start + offset),
                };
                (chrom, start, end, summit)
            }
        };
        Some(fields)
    }
}

/// Parse peaks in `format` from `reader` into a new sorted peak collection
///
/// Header lines are only recognized before the first data line, and blank lines are skipped.
///
pub fn parse_peaks<R: BufRead>(
    reader: R,
    format: PeakFormat,
    name: &str,
) -> ManormResult<PeakCollection> {
    let mut peaks = PeakCollection::new(name);
    let mut expect_header = true;
    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        let line_num = line_index + 1;
        if line.is_empty() {
            continue;
        }
        if expect_header {
            if format.is_header(line) {
                debug!("Detected header at line {line_num}: '{line}'");
                continue;
            }
            expect_header = false;
        }

        let (chrom, start, end, summit) =
            format
                .parse_line(line)
                .ok_or_else(|| ManormError::FileFormat {
                    format: format.label(),
                    line_num,
                    line: line.to_string(),
                })?;
        peaks.add(Peak::new(GenomicRegion::new(chrom, start, end, summit)?));
    }
    peaks.sort();
    Ok(peaks)
}

/// Load peaks from a plain or compressed text file
///
pub fn load_peaks(
    filename: &Utf8Path,
    format: PeakFormat,
    name: &str,
) -> ManormResult<PeakCollection> {
    use rust_htslib::bgzf;

    info!("Loading {format} peaks of sample '{name}' from file '{filename}'");
    let reader = bgzf::Reader::from_path(filename)?;
    let peaks = parse_peaks(BufReader::new(reader), format, name)?;
    info!(
        "Loaded {} peaks of sample '{name}'",
        peaks.size().separate_with_commas()
    );
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_single_peak(format: PeakFormat, content: &str) -> Peak {
        let peaks = parse_peaks(content.as_bytes(), format, "test").unwrap();
        assert_eq!(peaks.size(), 1);
        peaks.iter().next().unwrap().clone()
    }

    #[test]
    fn test_parse_bed() {
        let content = "track name=test\nbrowser position chr1\n#comment\n\nchr1\t1\t100\tpeak1\n";
        let peak = get_single_peak(PeakFormat::Bed, content);
        assert_eq!(peak.chrom(), "chr1");
        assert_eq!((peak.start(), peak.end()), (1, 100));
        assert_eq!(peak.summit(), 50);
        assert!(!peak.is_common);
    }

    #[test]
    fn test_parse_bed3_summit() {
        let peak = get_single_peak(PeakFormat::Bed3Summit, "#header\nchr1\t1\t100\t20\n");
        assert_eq!((peak.start(), peak.end(), peak.summit()), (1, 100, 20));
    }

    #[test]
    fn test_parse_macs() {
        let content = "# MACS version\nchr\tstart\tend\tlength\tsummit\ttags\nchr1\t101\t200\t100\t30\t15\n";
        let peak = get_single_peak(PeakFormat::Macs, content);
        assert_eq!((peak.start(), peak.end(), peak.summit()), (100, 200, 130));
    }

    #[test]
    fn test_parse_macs2() {
        let content = "# MACS2 version\n\nchr\tstart\tend\tlength\tabs_summit\nchr1\t101\t200\t100\t130\n";
        let peak = get_single_peak(PeakFormat::Macs2, content);
        assert_eq!((peak.start(), peak.end(), peak.summit()), (100, 200, 129));
    }

    #[test]
    fn test_parse_narrowpeak() {
        let line = "chr1\t100\t200\tpeak1\t0\t.\t5.0\t10.0\t3.0\t30\n";
        let peak = get_single_peak(PeakFormat::NarrowPeak, line);
        assert_eq!(peak.summit(), 130);

        let line = "chr1\t100\t200\tpeak1\t0\t.\t5.0\t10.0\t3.0\t-1\n";
        let peak = get_single_peak(PeakFormat::NarrowPeak, line);
        assert_eq!(peak.summit(), 150);
    }

    #[test]
    fn test_parse_broadpeak() {
        let line = "chr1\t100\t201\tpeak1\t0\t.\t5.0\t10.0\t3.0\n";
        let peak = get_single_peak(PeakFormat::BroadPeak, line);
        assert_eq!(peak.summit(), 150);
    }

    #[test]
    fn test_parse_sorted() {
        let content = "chr2\t10\t20\nchr1\t500\t600\nchr1\t5\t10\n";
        let peaks = parse_peaks(content.as_bytes(), PeakFormat::Bed, "test").unwrap();
        assert_eq!(peaks.name, "test");
        let starts = peaks.iter().map(|x| x.start()).collect::<Vec<_>>();
        assert_eq!(starts, vec![5, 500, 10]);
    }

    #[test]
    fn test_header_only_before_data() {
        // A header-like line after the first data line is a format error
        let content = "chr1\t1\t100\n#comment\n";
        let result = parse_peaks(content.as_bytes(), PeakFormat::Bed, "test");
        assert!(matches!(
            result,
            Err(ManormError::FileFormat {
                format: "bed",
                line_num: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_format_errors() {
        for (format, content) in [
            (PeakFormat::Bed, "chr1\t1\n"),
            (PeakFormat::Bed, "chr1\ta\t100\n"),
            (PeakFormat::Bed3Summit, "chr1\t1\t100\n"),
            (PeakFormat::Macs2, "chr1\t1\t100\t99\n"),
            (PeakFormat::NarrowPeak, "chr1\t1\t100\tpeak1\t0\t.\t5.0\n"),
        ] {
            let result = parse_peaks(content.as_bytes(), format, "test");
            assert!(matches!(
                result,
                Err(ManormError::FileFormat { line_num: 1, .. })
            ));
        }
    }

    #[test]
    fn test_invalid_region() {
        let result = parse_peaks("chr1\t1\t100\t200\n".as_bytes(), PeakFormat::Bed3Summit, "test");
        assert!(matches!(result, Err(ManormError::InvalidRegion { .. })));

        let result = parse_peaks("chr1\t100\t100\n".as_bytes(), PeakFormat::Bed, "test");
        assert!(matches!(result, Err(ManormError::InvalidRegion { .. })));
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(PeakFormat::Bed3Summit.to_string(), "bed3-summit");
        assert_eq!(PeakFormat::NarrowPeak.to_string(), "narrowpeak");
        assert_eq!(PeakFormat::Macs2.label(), "macs2");
    }
}
