// ==============================================================================
// models.rs - API Data Models
// ==============================================================================
// Description: Request/response models for the variant annotation API
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use variant_annotator::{AnnotationEntry, AnnotationSource, VariantIdentity};

/// Upload query parameters
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    /// single | batch (aliases: rest, cli)
    pub mode: Option<String>,
    /// Legacy switch selecting batch mode
    #[serde(default)]
    pub batch: bool,
}

/// Upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub job_id: Uuid,
    pub file_name: String,
    /// Always 0: the count is only known once the job finishes
    pub variant_count: usize,
}

/// Variant listing query parameters
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    pub chrom: Option<String>,
    pub min_quality: Option<f64>,
}

fn default_limit() -> usize {
    100
}

/// Annotation query parameters
#[derive(Debug, Deserialize)]
pub struct AnnotationParams {
    #[serde(default = "default_include")]
    pub include: String,
    #[serde(default)]
    pub refresh: bool,
}

fn default_include() -> String {
    "all".to_string()
}

/// Per-variant annotations; `null` means the source was not fetched
#[derive(Debug, Serialize)]
pub struct AnnotationResponse {
    pub variant_id: VariantIdentity,
    pub ensembl_vep: Option<AnnotationEntry>,
    pub clinvar: Option<AnnotationEntry>,
}

/// Aggregate statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_variants: usize,
    pub variant_types: BTreeMap<String, usize>,
    pub annotation_success_rates: BTreeMap<AnnotationSource, f64>,
    pub last_processed: String,
}

/// API info response
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}
