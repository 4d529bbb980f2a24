// ==============================================================================
// identity.rs - Variant Identity Resolution
// ==============================================================================
// Description: Canonical chrom_pos_ref_alt keys shared by every pipeline path
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format:
//   {chrom}_{pos}_{ref}_{alt}   e.g. "1_12345_A_G", "x_100_AT_A"
//   chrom is normalized (lower-case, no "chr" prefix) before formatting, so
//   REST-path and batch-path variants resolve to the same key.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical variant key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantIdentity(String);

impl VariantIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for VariantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for VariantIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for VariantIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a chromosome name: lower-case, every leading "chr" stripped
///
/// Idempotent: `normalize_chromosome(normalize_chromosome(c)) == normalize_chromosome(c)`.
pub fn normalize_chromosome(chrom: &str) -> String {
    let lower = chrom.trim().to_lowercase();
    let mut name = lower.as_str();
    while let Some(rest) = name.strip_prefix("chr") {
        name = rest;
    }
    name.to_string()
}

/// Derive the identity of a variant from its four defining fields
///
/// Alleles are compared case-insensitively and always appear upper-case.
pub fn identity(chrom: &str, pos: u64, ref_allele: &str, alt_allele: &str) -> VariantIdentity {
    VariantIdentity(format!(
        "{}_{}_{}_{}",
        normalize_chromosome(chrom),
        pos,
        ref_allele.trim().to_ascii_uppercase(),
        alt_allele.trim().to_ascii_uppercase()
    ))
}
