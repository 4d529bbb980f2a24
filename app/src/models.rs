// ==============================================================================
// models.rs - Variant and Annotation Data Models
// ==============================================================================
// Description: Canonical variant records and the normalized annotation schema
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::identity::{self, VariantIdentity};

/// Typed INFO value, coerced in the order integer, float, boolean, string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl InfoValue {
    /// Coerce a raw INFO value string
    ///
    /// "100" stays an integer (never 100.0), floats must be finite so that
    /// "nan"/"inf" survive as strings.
    pub fn coerce(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            return InfoValue::Integer(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return InfoValue::Float(f);
            }
        }
        if raw.eq_ignore_ascii_case("true") {
            return InfoValue::Boolean(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return InfoValue::Boolean(false);
        }
        InfoValue::String(raw.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            InfoValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            InfoValue::Integer(n) => Some(*n as f64),
            InfoValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Integer(n) => write!(f, "{}", n),
            InfoValue::Float(v) => write!(f, "{}", v),
            InfoValue::Boolean(b) => write!(f, "{}", b),
            InfoValue::String(s) => f.write_str(s),
        }
    }
}

/// INFO key → typed value. Ordered so serialized output is stable.
pub type InfoFields = BTreeMap<String, InfoValue>;

/// One parsed variant line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVariantRecord {
    /// Chromosome, lower-case without "chr" prefix (e.g., "1", "x", "mt")
    pub chrom: String,

    /// 1-based position
    pub pos: u64,

    /// Database ID from the ID column (e.g., "rs12345"), never the store key
    pub external_id: Option<String>,

    /// Reference allele
    #[serde(rename = "ref")]
    pub ref_allele: String,

    /// First alternate allele only
    #[serde(rename = "alt")]
    pub alt_allele: String,

    /// QUAL column, None when "."
    pub qual: Option<f64>,

    /// FILTER column, "PASS" when absent
    pub filter: String,

    pub info: InfoFields,

    /// First sample genotype class ("0/0", "0/1", "1/1") if available
    pub genotype: Option<String>,

    /// ALT alleles beyond the first that were not retained
    #[serde(default)]
    pub dropped_alt_alleles: usize,
}

impl RawVariantRecord {
    pub fn identity(&self) -> VariantIdentity {
        identity::identity(&self.chrom, self.pos, &self.ref_allele, &self.alt_allele)
    }

    /// Chromosome as external services expect it ("x" → "X", "mt" → "MT")
    pub fn external_chrom(&self) -> String {
        self.chrom.to_uppercase()
    }
}

/// External annotation source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnnotationSource {
    /// Functional consequence (Ensembl VEP)
    #[serde(rename = "ensembl_vep")]
    EnsemblVep,
    /// Clinical significance (ClinVar)
    #[serde(rename = "clinvar")]
    ClinVar,
}

impl AnnotationSource {
    pub const ALL: [AnnotationSource; 2] = [AnnotationSource::EnsemblVep, AnnotationSource::ClinVar];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationSource::EnsemblVep => "ensembl_vep",
            AnnotationSource::ClinVar => "clinvar",
        }
    }

    /// Parse a comma-separated source selection ("all", "vep,clinvar", ...)
    pub fn parse_selection(selection: &str) -> Result<Vec<AnnotationSource>, UnknownSourceError> {
        let mut sources = Vec::new();
        for part in selection.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                return Ok(Self::ALL.to_vec());
            }
            let source = part.parse::<AnnotationSource>()?;
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        if sources.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        Ok(sources)
    }
}

impl fmt::Display for AnnotationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unknown annotation source: {0}")]
pub struct UnknownSourceError(pub String);

impl FromStr for AnnotationSource {
    type Err = UnknownSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vep" | "ensembl_vep" | "ensembl" => Ok(AnnotationSource::EnsemblVep),
            "clinvar" => Ok(AnnotationSource::ClinVar),
            other => Err(UnknownSourceError(other.to_string())),
        }
    }
}

/// Normalized functional-consequence annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsequenceAnnotation {
    /// Sequence Ontology terms across all transcript consequences
    pub consequence: Vec<String>,
    pub impact: Option<String>,
    pub gene: Option<String>,
    pub transcript: Option<String>,
    pub protein_change: Option<String>,
    /// Population allele frequency (gnomAD)
    pub gnomad_af: Option<f64>,
}

/// Normalized clinical-significance annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalAnnotation {
    pub clinical_significance: Option<String>,
    pub review_status: Option<String>,
    pub conditions: Vec<String>,
    pub variation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceAnnotation {
    Consequence(ConsequenceAnnotation),
    Clinical(ClinicalAnnotation),
}

/// Outcome of fetching one source for one variant
///
/// A source absent from the bundle was never fetched; a fetched source is
/// always present, either annotated, empty, or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnnotationEntry {
    Annotated {
        annotation: SourceAnnotation,
    },
    /// Fetched, but the source produced nothing for this variant
    NoAnnotation,
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
}

impl AnnotationEntry {
    pub fn error(message: impl Into<String>, status_code: Option<u16>) -> Self {
        AnnotationEntry::Error {
            message: message.into(),
            status_code,
        }
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, AnnotationEntry::Annotated { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnnotationEntry::Error { .. })
    }
}

impl From<ConsequenceAnnotation> for AnnotationEntry {
    fn from(annotation: ConsequenceAnnotation) -> Self {
        AnnotationEntry::Annotated {
            annotation: SourceAnnotation::Consequence(annotation),
        }
    }
}

impl From<ClinicalAnnotation> for AnnotationEntry {
    fn from(annotation: ClinicalAnnotation) -> Self {
        AnnotationEntry::Annotated {
            annotation: SourceAnnotation::Clinical(annotation),
        }
    }
}

/// Per-source annotation entries for one variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationBundle {
    entries: BTreeMap<AnnotationSource, AnnotationEntry>,
}

impl AnnotationBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: AnnotationSource, entry: AnnotationEntry) {
        self.entries.insert(source, entry);
    }

    pub fn get(&self, source: AnnotationSource) -> Option<&AnnotationEntry> {
        self.entries.get(&source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnnotationSource, &AnnotationEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Functional-consequence record, if that source was annotated
    pub fn consequence(&self) -> Option<&ConsequenceAnnotation> {
        match self.get(AnnotationSource::EnsemblVep) {
            Some(AnnotationEntry::Annotated {
                annotation: SourceAnnotation::Consequence(c),
            }) => Some(c),
            _ => None,
        }
    }

    /// Clinical-significance record, if that source was annotated
    pub fn clinical(&self) -> Option<&ClinicalAnnotation> {
        match self.get(AnnotationSource::ClinVar) {
            Some(AnnotationEntry::Annotated {
                annotation: SourceAnnotation::Clinical(c),
            }) => Some(c),
            _ => None,
        }
    }

    /// Copy of this bundle restricted to the given sources
    pub fn select(&self, sources: &[AnnotationSource]) -> AnnotationBundle {
        AnnotationBundle {
            entries: self
                .entries
                .iter()
                .filter(|(source, _)| sources.contains(source))
                .map(|(source, entry)| (*source, entry.clone()))
                .collect(),
        }
    }

    /// Overlay entries from another bundle, replacing same-source entries
    pub fn merge(&mut self, other: AnnotationBundle) {
        self.entries.extend(other.entries);
    }
}

/// Stored variant: parsed record + identity + annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedVariant {
    pub id: VariantIdentity,

    #[serde(flatten)]
    pub record: RawVariantRecord,

    pub annotations: AnnotationBundle,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnrichedVariant {
    pub fn new(record: RawVariantRecord, annotations: AnnotationBundle) -> Self {
        let now = Utc::now();
        Self {
            id: record.identity(),
            record,
            annotations,
            created_at: now,
            updated_at: now,
        }
    }
}
