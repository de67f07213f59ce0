//! Parsers for the supported sequencing read file formats
//!
//! Each read, or read pair in paired-end mode, is reduced to a single representative position.
//!

use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use log::{debug, info};
use rust_htslib::bam::{self, Read};
use serde::Serialize;
use thousands::Separable;

use crate::errors::{ManormError, ManormResult};
use crate::read_index::ReadIndex;

#[derive(
    Clone, Copy, Debug, PartialEq, Serialize, clap::ValueEnum, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReadFormat {
    /// Single-end reads in BED format, with strand in column 6
    Bed,

    /// Paired-end reads in BEDPE format
    Bedpe,

    /// Read alignments in SAM format
    Sam,

    /// Read alignments in BAM format
    Bam,
}

/// Read position settings shared by all read formats
#[derive(Clone, Copy, Debug)]
pub struct ReadSettings {
    pub paired_end: bool,

    /// Shift applied to single-end reads in the 3' direction
    pub shift_size: i64,
}

impl ReadFormat {
    fn label(&self) -> &'static str {
        self.into()
    }

    /// Check that this format can be used in the selected single/paired-end mode
    ///
    pub fn check_mode(&self, paired_end: bool) -> ManormResult<()> {
        match (self, paired_end) {
            (ReadFormat::Bed, true) => Err(ManormError::FormatModeConflict {
                format: self.label(),
                mode: "paired-end",
            }),
            (ReadFormat::Bedpe, false) => Err(ManormError::FormatModeConflict {
                format: self.label(),
                mode: "single-end",
            }),
            _ => Ok(()),
        }
    }
}

fn is_track_header(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("track") || line.starts_with("browser")
}

fn get_int_field(words: &[&str], index: usize) -> Option<i64> {
    words.get(index)?.trim().parse::<i64>().ok()
}

/// Position of a single-end read after shifting it `shift_size` bases in the 3' direction
///
fn get_shifted_read_pos(start: i64, end: i64, is_reverse: bool, shift_size: i64) -> i64 {
    if is_reverse {
        end - shift_size
    } else {
        start + shift_size
    }
}

/// Parse a BED read line
///
/// Returns None for a malformed line
///
fn parse_bed_line(line: &str, shift_size: i64) -> Option<(&str, i64)> {
    let words = line.split('\t').collect::<Vec<_>>();
    let chrom = *words.first()?;
    let start = get_int_field(&words, 1)?;
    let end = get_int_field(&words, 2)?;
    let is_reverse = match *words.get(5)? {
        "+" => false,
        "-" => true,
        _ => return None,
    };
    Some((chrom, get_shifted_read_pos(start, end, is_reverse, shift_size)))
}

/// Parse a BEDPE read pair line
///
/// Returns Some(None) for a well-formed pair with reads on different chromosomes, which is
/// skipped, and None for a malformed line.
///
fn parse_bedpe_line(line: &str) -> Option<Option<(&str, i64)>> {
    let words = line.split('\t').collect::<Vec<_>>();
    let chrom1 = *words.first()?;
    let start1 = get_int_field(&words, 1)?;
    let end1 = get_int_field(&words, 2)?;
    let chrom2 = *words.get(3)?;
    let start2 = get_int_field(&words, 4)?;
    let end2 = get_int_field(&words, 5)?;
    if chrom1 != chrom2 {
        return Some(None);
    }
    let start = std::cmp::min(start1, start2);
    let end = std::cmp::max(end1, end2);
    Some(Some((chrom1, (start + end).div_euclid(2))))
}

/// Parse BED or BEDPE reads from `reader` and add them to `reads`
///
fn parse_text_reads<R: BufRead>(
    reader: R,
    format: ReadFormat,
    settings: &ReadSettings,
    reads: &mut ReadIndex,
) -> ManormResult<()> {
    let mut expect_header = true;
    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        let line_num = line_index + 1;
        if line.is_empty() {
            continue;
        }
        if expect_header {
            if is_track_header(line) {
                debug!("Detected header at line {line_num}: '{line}'");
                continue;
            }
            expect_header = false;
        }

        let read = match format {
            ReadFormat::Bed => parse_bed_line(line, settings.shift_size).map(Some),
            ReadFormat::Bedpe => parse_bedpe_line(line),
            ReadFormat::Sam | ReadFormat::Bam => {
                panic!("Unexpected text read format: {format}");
            }
        };
        match read {
            Some(Some((chrom, pos))) => reads.add(chrom, pos),
            Some(None) => {}
            None => {
                return Err(ManormError::FileFormat {
                    format: format.label(),
                    line_num,
                    line: line.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Get the representative position of an alignment record, or None if the record is filtered out
///
/// In single-end mode this is the shifted read position. In paired-end mode this is the midpoint
/// of the fragment, reported only for read 1 of a proper pair with both reads on the same
/// chromosome.
///
fn get_record_pos(record: &bam::Record, settings: &ReadSettings) -> Option<i64> {
    if record.is_unmapped()
        || record.is_quality_check_failed()
        || record.is_secondary()
        || record.is_supplementary()
    {
        return None;
    }

    let start = record.pos();
    let end = record.cigar().end_pos();
    if settings.paired_end {
        if !(record.is_paired()
            && record.is_first_in_template()
            && record.is_proper_pair()
            && !record.is_mate_unmapped())
        {
            return None;
        }
        if record.tid() != record.mtid() {
            return None;
        }
        let tlen = record.insert_size();
        let (frag_start, frag_end) = if record.is_reverse() {
            (end + tlen, end)
        } else {
            (start, start + tlen)
        };
        Some((frag_start + frag_end).div_euclid(2))
    } else {
        if record.is_paired() {
            return None;
        }
        Some(get_shifted_read_pos(
            start,
            end,
            record.is_reverse(),
            settings.shift_size,
        ))
    }
}

/// Read SAM or BAM alignments from `filename` and add them to `reads`
///
fn parse_alignment_reads(
    filename: &Utf8Path,
    settings: &ReadSettings,
    reads: &mut ReadIndex,
) -> ManormResult<()> {
    let mut reader = bam::Reader::from_path(filename)?;
    let chrom_names = reader
        .header()
        .target_names()
        .into_iter()
        .map(|x| String::from_utf8_lossy(x).to_string())
        .collect::<Vec<_>>();

    let mut skipped_count = 0;
    let mut record = bam::Record::new();
    while let Some(result) = reader.read(&mut record) {
        result?;
        match get_record_pos(&record, settings) {
            Some(pos) => reads.add(&chrom_names[record.tid() as usize], pos),
            None => skipped_count += 1,
        }
    }
    debug!(
        "Skipped {} filtered alignment records in file '{filename}'",
        skipped_count.separate_with_commas()
    );
    Ok(())
}

/// Load the read positions of one sample
///
pub fn load_reads(
    filename: &Utf8Path,
    format: ReadFormat,
    name: &str,
    settings: &ReadSettings,
) -> ManormResult<ReadIndex> {
    use rust_htslib::bgzf;

    format.check_mode(settings.paired_end)?;

    info!("Loading {format} reads of sample '{name}' from file '{filename}'");
    let mut reads = ReadIndex::new(name);
    match format {
        ReadFormat::Bed | ReadFormat::Bedpe => {
            let reader = bgzf::Reader::from_path(filename)?;
            parse_text_reads(BufReader::new(reader), format, settings, &mut reads)?;
        }
        ReadFormat::Sam | ReadFormat::Bam => {
            parse_alignment_reads(filename, settings, &mut reads)?;
        }
    }
    reads.sort();

    for chrom in reads.chroms() {
        debug!("Loaded {} reads on {chrom}", reads.positions(chrom).len());
    }
    info!(
        "Loaded {} reads of sample '{name}'",
        reads.size().separate_with_commas()
    );
    Ok(reads)
}
