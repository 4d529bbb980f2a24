// ==============================================================================
// parsers/vcf.rs - VCF record parser
// ==============================================================================
// Description: Line-oriented parser turning VCF text into RawVariantRecords
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// Format (tab-separated, eight fixed columns, optional FORMAT + samples):
//   #CHROM  POS    ID  REF  ALT  QUAL  FILTER  INFO         [FORMAT  SAMPLE...]
//   1       12345  .   A    G    100   PASS    AC=1;AF=0.5  GT       0/1
// ==============================================================================

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::identity::normalize_chromosome;
use crate::models::{InfoFields, InfoValue, RawVariantRecord};

/// Number of fixed leading VCF columns
pub const FIXED_COLUMNS: usize = 8;

/// Placeholder for missing values in VCF columns
pub const MISSING: &str = ".";

/// Why a data line was skipped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordParseError {
    #[error("Invalid position: '{0}'")]
    InvalidPosition(String),

    #[error("Invalid quality score: '{0}'")]
    InvalidQuality(String),

    #[error("Invalid chromosome: '{0}'")]
    InvalidChromosome(String),

    #[error("Invalid allele: '{0}' (expected A, C, G, T or N)")]
    InvalidAllele(String),
}

/// Whole-file read failures (the only fatal parser condition)
#[derive(Error, Debug)]
pub enum VcfReadError {
    #[error("Failed to open VCF file {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// A data line that could not be turned into a record
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 1-based line number in the input
    pub line_number: usize,
    pub reason: RecordParseError,
}

/// Result of parsing a whole file
#[derive(Debug, Clone, Default)]
pub struct ParsedVcf {
    pub records: Vec<RawVariantRecord>,
    pub skipped: Vec<SkippedLine>,
}

/// VCF parser with configuration options
///
/// Any contig name is accepted by default (e.g. "chrM", "GL000220.1").
#[derive(Debug, Clone, Default)]
pub struct VcfParser {
    /// Restrict chromosomes to 1-22, X, Y, M/MT
    pub strict_chromosomes: bool,
}

impl VcfParser {
    /// Create new VCF parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject contigs other than the human primary assembly (1-22, X, Y, M/MT)
    pub fn with_strict_chromosomes(mut self, strict: bool) -> Self {
        self.strict_chromosomes = strict;
        self
    }

    /// Parse a VCF file from disk (.vcf or .vcf.gz)
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<ParsedVcf, VcfReadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| VcfReadError::FileOpen {
            path: path.display().to_string(),
            source,
        })?;

        let is_gzip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        if is_gzip {
            self.parse_reader(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            self.parse_reader(BufReader::new(file))
        }
    }

    /// Parse VCF text from any buffered reader
    ///
    /// Malformed lines are collected in `skipped`; only I/O failure aborts.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<ParsedVcf, VcfReadError> {
        let mut parsed = ParsedVcf::default();

        for (idx, line) in reader.lines().enumerate() {
            let line_number = idx + 1;
            let line = line.map_err(|source| VcfReadError::Io {
                line: line_number,
                source,
            })?;

            match self.parse_line(&line) {
                Ok(Some(record)) => parsed.records.push(record),
                Ok(None) => {}
                Err(reason) => {
                    warn!("Skipping line {}: {}", line_number, reason);
                    parsed.skipped.push(SkippedLine { line_number, reason });
                }
            }
        }

        debug!(
            "Parsed {} records ({} lines skipped)",
            parsed.records.len(),
            parsed.skipped.len()
        );

        Ok(parsed)
    }

    /// Parse a single line
    ///
    /// Returns:
    /// - Ok(Some(record)) for a data line
    /// - Ok(None) for blank, header/comment ('#') or short (< 8 column) lines
    /// - Err if a field is malformed (caller skips the line)
    pub fn parse_line(&self, line: &str) -> Result<Option<RawVariantRecord>, RecordParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < FIXED_COLUMNS {
            return Ok(None);
        }

        let chrom = normalize_chromosome(fields[0]);
        if self.strict_chromosomes && !is_known_chromosome(&chrom) {
            return Err(RecordParseError::InvalidChromosome(fields[0].to_string()));
        }

        let pos = parse_position(fields[1])?;

        let external_id = match fields[2].trim() {
            "" | MISSING => None,
            id => Some(id.to_string()),
        };

        let ref_allele = fields[3].trim().to_ascii_uppercase();
        validate_allele(&ref_allele)?;

        // Only the first ALT allele is retained for multi-allelic sites
        let mut alts = fields[4].trim().split(',');
        let alt_allele = alts.next().unwrap_or_default().to_ascii_uppercase();
        validate_allele(&alt_allele)?;
        let dropped_alt_alleles = alts.count();
        if dropped_alt_alleles > 0 {
            debug!(
                "Multi-allelic site {}:{} - keeping first ALT '{}', dropping {}",
                chrom, pos, alt_allele, dropped_alt_alleles
            );
        }

        let qual = parse_quality(fields[5])?;

        let filter = match fields[6].trim() {
            "" | MISSING => "PASS".to_string(),
            f => f.to_string(),
        };

        let info = parse_info(fields[7]);

        let genotype = match (fields.get(8), fields.get(9)) {
            (Some(format), Some(sample)) => classify_genotype(format, sample),
            _ => None,
        };

        Ok(Some(RawVariantRecord {
            chrom,
            pos,
            external_id,
            ref_allele,
            alt_allele,
            qual,
            filter,
            info,
            genotype,
            dropped_alt_alleles,
        }))
    }
}

/// Parse one line with the default parser settings
pub fn parse_line(line: &str) -> Result<Option<RawVariantRecord>, RecordParseError> {
    VcfParser::default().parse_line(line)
}

/// Parse an INFO column into typed fields
///
/// `key=value` pairs are coerced (integer, float, boolean, string);
/// bare keys are flags and become `true`.
pub fn parse_info(info: &str) -> InfoFields {
    let mut fields = InfoFields::new();
    let info = info.trim();
    if info.is_empty() || info == MISSING {
        return fields;
    }

    for item in info.split(';').filter(|s| !s.is_empty()) {
        match item.split_once('=') {
            Some((key, value)) => {
                fields.insert(key.to_string(), InfoValue::coerce(value));
            }
            None => {
                fields.insert(item.to_string(), InfoValue::Boolean(true));
            }
        }
    }

    fields
}

fn parse_position(raw: &str) -> Result<u64, RecordParseError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(RecordParseError::InvalidPosition(raw.to_string())),
        Ok(pos) => Ok(pos),
    }
}

fn parse_quality(raw: &str) -> Result<Option<f64>, RecordParseError> {
    let raw = raw.trim();
    if raw == MISSING {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|q| q.is_finite())
        .map(Some)
        .ok_or_else(|| RecordParseError::InvalidQuality(raw.to_string()))
}

fn validate_allele(allele: &str) -> Result<(), RecordParseError> {
    let valid = !allele.is_empty()
        && allele
            .chars()
            .all(|c| matches!(c.to_ascii_uppercase(), 'A' | 'C' | 'G' | 'T' | 'N'));
    if valid {
        Ok(())
    } else {
        Err(RecordParseError::InvalidAllele(allele.to_string()))
    }
}

/// Human autosomes, sex chromosomes and mitochondrion (normalized form)
fn is_known_chromosome(chrom: &str) -> bool {
    match chrom {
        "x" | "y" | "m" | "mt" => true,
        _ => chrom
            .parse::<u8>()
            .map(|n| (1..=22).contains(&n))
            .unwrap_or(false),
    }
}

/// Classify the first sample's GT as "0/0", "0/1" or "1/1"
///
/// Phasing is ignored ("1|0" is "0/1"); any missing allele means no call.
fn classify_genotype(format: &str, sample: &str) -> Option<String> {
    let gt_index = format.split(':').position(|key| key == "GT")?;
    let gt = sample.split(':').nth(gt_index)?;

    let alleles: Vec<&str> = gt.split(['/', '|']).collect();
    if alleles.is_empty() || alleles.iter().any(|a| *a == MISSING || a.is_empty()) {
        return None;
    }

    let all_ref = alleles.iter().all(|a| *a == "0");
    let all_same = alleles.iter().all(|a| *a == alleles[0]);

    let class = if all_ref {
        "0/0"
    } else if all_same {
        "1/1"
    } else {
        "0/1"
    };
    Some(class.to_string())
}
