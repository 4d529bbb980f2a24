// ==============================================================================
// annotation/normalize.rs - Response Normalization
// ==============================================================================
// Description: Typed upstream payloads and their mapping onto the canonical
//              annotation records
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Payload shapes:
//   VEP REST  - JSON list of per-variant objects, each with optional
//               transcript_consequences[] and colocated_variants[]
//   ClinVar   - flat JSON object
//   VEP batch - VCF INFO "CSQ" field, ','-separated entries of '|'-separated
//               columns described by the ##INFO=<ID=CSQ,...Format: ...> header
// Every field is optional: "absent" and "null" both map to None, and
// normalization is total over these structures.
// ==============================================================================

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::{AnnotationEntry, ClinicalAnnotation, ConsequenceAnnotation, InfoFields, InfoValue};

/// INFO key holding VEP consequence annotations
pub const CSQ_KEY: &str = "CSQ";

/// Column order VEP uses for CSQ when no header is available
const DEFAULT_CSQ_COLUMNS: &[&str] = &[
    "Allele",
    "Consequence",
    "IMPACT",
    "SYMBOL",
    "Gene",
    "Feature_type",
    "Feature",
    "BIOTYPE",
    "EXON",
    "INTRON",
    "HGVSc",
    "HGVSp",
    "cDNA_position",
    "CDS_position",
    "Protein_position",
    "Amino_acids",
    "Codons",
    "Existing_variation",
    "DISTANCE",
    "STRAND",
    "FLAGS",
    "SYMBOL_SOURCE",
    "HGNC_ID",
];

/// Frequency keys checked in a colocated variant's `frequencies` map
const FREQUENCY_KEYS: &[&str] = &["gnomade", "gnomad", "gnomadg", "af"];

/// CSQ columns checked for a population frequency
const CSQ_FREQUENCY_COLUMNS: &[&str] = &["gnomADe_AF", "gnomAD_AF", "gnomADg_AF", "AF"];

/// One element of the VEP REST response list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VepVariantResult {
    pub transcript_consequences: Option<Vec<TranscriptConsequence>>,
    pub colocated_variants: Option<Vec<ColocatedVariant>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptConsequence {
    pub consequence_terms: Option<Vec<String>>,
    pub impact: Option<String>,
    pub gene_symbol: Option<String>,
    pub transcript_id: Option<String>,
    pub hgvsp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColocatedVariant {
    pub gnomad: Option<GnomadFrequency>,
    /// allele → (population → frequency)
    pub frequencies: Option<BTreeMap<String, BTreeMap<String, f64>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GnomadFrequency {
    pub af: Option<f64>,
}

impl ColocatedVariant {
    /// Population frequency carried by this entry, if any
    pub fn population_frequency(&self, alt_allele: &str) -> Option<f64> {
        if let Some(af) = self.gnomad.as_ref().and_then(|g| g.af) {
            return Some(af);
        }
        let by_allele = self.frequencies.as_ref()?.get(alt_allele)?;
        FREQUENCY_KEYS.iter().find_map(|key| by_allele.get(*key).copied())
    }
}

/// ClinVar variation response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinVarResponse {
    pub clinical_significance: Option<String>,
    pub review_status: Option<String>,
    pub conditions: Option<Vec<String>>,
    pub variation_id: Option<StringOrNumber>,
}

/// Identifier that upstream may send as either a string or a number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

fn push_unique(terms: &mut Vec<String>, term: &str) {
    if !term.is_empty() && !terms.iter().any(|t| t == term) {
        terms.push(term.to_string());
    }
}

/// Normalize a VEP REST response
///
/// Gene, transcript, protein change and impact are first-non-empty across
/// all consequence objects (they arrive sorted by relevance). Consequence
/// terms are collected from every object, duplicates dropped. The frequency
/// comes from the first colocated variant that carries one.
pub fn normalize_vep_response(results: &[VepVariantResult], alt_allele: &str) -> ConsequenceAnnotation {
    let mut annotation = ConsequenceAnnotation::default();

    let consequences = results
        .iter()
        .filter_map(|r| r.transcript_consequences.as_ref())
        .flatten();

    for tc in consequences {
        for term in tc.consequence_terms.iter().flatten() {
            push_unique(&mut annotation.consequence, term);
        }
        if annotation.impact.is_none() {
            annotation.impact = non_empty(tc.impact.as_ref());
        }
        if annotation.gene.is_none() {
            annotation.gene = non_empty(tc.gene_symbol.as_ref());
        }
        if annotation.transcript.is_none() {
            annotation.transcript = non_empty(tc.transcript_id.as_ref());
        }
        if annotation.protein_change.is_none() {
            annotation.protein_change = non_empty(tc.hgvsp.as_ref());
        }
    }

    annotation.gnomad_af = results
        .iter()
        .filter_map(|r| r.colocated_variants.as_ref())
        .flatten()
        .find_map(|cv| cv.population_frequency(alt_allele));

    annotation
}

/// Normalize a ClinVar response (fields copied verbatim)
pub fn normalize_clinvar_response(response: ClinVarResponse) -> ClinicalAnnotation {
    ClinicalAnnotation {
        clinical_significance: response.clinical_significance,
        review_status: response.review_status,
        conditions: response.conditions.unwrap_or_default(),
        variation_id: response.variation_id.map(StringOrNumber::into_string),
    }
}

/// Column layout of the CSQ INFO field
#[derive(Debug, Clone, PartialEq)]
pub struct CsqFormat {
    columns: Vec<String>,
}

impl Default for CsqFormat {
    fn default() -> Self {
        Self {
            columns: DEFAULT_CSQ_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl CsqFormat {
    /// Read the layout from the CSQ header description
    /// (`"Consequence annotations from Ensembl VEP. Format: A|B|C"`)
    pub fn from_description(description: &str) -> Option<Self> {
        let (_, format) = description.split_once("Format:")?;
        let columns: Vec<String> = format
            .trim()
            .trim_matches('"')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return None;
        }
        Some(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Normalize a raw CSQ value with the same rules as the REST path
pub fn normalize_csq(csq: &str, format: &CsqFormat) -> ConsequenceAnnotation {
    let consequence_idx = format.index("Consequence");
    let impact_idx = format.index("IMPACT");
    let symbol_idx = format.index("SYMBOL");
    let feature_idx = format.index("Feature");
    let hgvsp_idx = format.index("HGVSp");
    let freq_idxs: Vec<usize> = CSQ_FREQUENCY_COLUMNS
        .iter()
        .filter_map(|c| format.index(c))
        .collect();

    let mut annotation = ConsequenceAnnotation::default();

    for entry in csq.split(',').filter(|e| !e.is_empty()) {
        let fields: Vec<&str> = entry.split('|').collect();
        let field = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| fields.get(i))
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };

        if let Some(terms) = field(consequence_idx) {
            for term in terms.split('&') {
                push_unique(&mut annotation.consequence, term);
            }
        }
        if annotation.impact.is_none() {
            annotation.impact = field(impact_idx);
        }
        if annotation.gene.is_none() {
            annotation.gene = field(symbol_idx);
        }
        if annotation.transcript.is_none() {
            annotation.transcript = field(feature_idx);
        }
        if annotation.protein_change.is_none() {
            annotation.protein_change = field(hgvsp_idx);
        }
        if annotation.gnomad_af.is_none() {
            annotation.gnomad_af = freq_idxs
                .iter()
                .filter_map(|i| fields.get(*i))
                .find_map(|v| v.parse::<f64>().ok().filter(|f| f.is_finite()));
        }
    }

    annotation
}

/// Map one batch output record's INFO fields onto a bundle entry
///
/// No CSQ field means the tool produced nothing for this variant.
pub fn normalize_batch_info(info: &InfoFields, format: &CsqFormat) -> AnnotationEntry {
    match info.get(CSQ_KEY) {
        None => AnnotationEntry::NoAnnotation,
        Some(InfoValue::String(csq)) => normalize_csq(csq, format).into(),
        Some(InfoValue::Boolean(true)) => AnnotationEntry::NoAnnotation,
        Some(other) => AnnotationEntry::error(
            format!("Failed to parse VEP output: unexpected CSQ value '{}'", other),
            None,
        ),
    }
}
