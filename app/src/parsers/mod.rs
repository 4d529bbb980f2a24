// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for variant file formats
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod vcf;

pub use vcf::{parse_info, parse_line, ParsedVcf, RecordParseError, SkippedLine, VcfParser, VcfReadError};
