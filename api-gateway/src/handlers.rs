// ==============================================================================
// handlers.rs - API Request Handlers
// ==============================================================================
// Description: HTTP request handlers for the variant annotation API
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use variant_annotator::annotation::UnknownModeError;
use variant_annotator::models::AnnotationSource;
use variant_annotator::store::VariantFilter;
use variant_annotator::{AnnotationMode, EnrichedVariant, JobRecord, ProcessingStatus};

use crate::{models::*, state::AppState, validator::FileValidator};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Root endpoint - API information
pub async fn root() -> Json<ApiInfoResponse> {
    let endpoints = BTreeMap::from([
        ("upload", "/api/v1/upload - Upload and process VCF files (POST)"),
        ("variants", "/api/v1/variants - List processed variants"),
        ("variant_details", "/api/v1/variants/{variant_id} - Get variant details"),
        (
            "annotations",
            "/api/v1/variants/{variant_id}/annotations - Get variant annotations",
        ),
        ("stats", "/api/v1/stats - Get annotation statistics"),
        ("status", "/api/v1/status - Current processing status"),
        ("jobs", "/api/v1/jobs/{job_id} - Status of one upload job"),
    ]);

    Json(ApiInfoResponse {
        message: "Welcome to the Variant Annotation and Interpretation API",
        version: VERSION,
        endpoints,
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        timestamp: Utc::now(),
    })
}

/// Upload a VCF file and start annotating it in the background
pub async fn upload_vcf(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mode = resolve_mode(&params)?;
    info!("Received VCF upload (mode: {})", mode);

    let validator = FileValidator::new(state.max_upload_size());
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.vcf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

        let validated = validator
            .validate_upload(&filename, &data)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((validated, data));
    }

    let (validated, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;

    let job_id = state.tracker().create_job(validated.original_name.clone(), mode);

    let saved_path = match save_upload(state.upload_dir(), job_id, &validated.safe_name, &data).await {
        Ok(path) => path,
        Err(e) => {
            state
                .tracker()
                .fail(job_id, format!("Failed to save upload: {}", e));
            return Err(AppError::Internal(e));
        }
    };

    info!(
        "Saved {} ({} bytes, sha256 {}) for job {}",
        saved_path.display(),
        validated.size,
        validated.hash_sha256,
        job_id
    );

    let pipeline = state.pipeline().clone();
    tokio::spawn(async move {
        // Outcome is recorded in the job tracker
        let _ = pipeline.run_job(job_id, saved_path, mode).await;
    });

    Ok(Json(UploadResponse {
        message: "VCF file uploaded successfully. Processing started...".to_string(),
        job_id,
        file_name: validated.original_name,
        variant_count: 0,
    }))
}

/// Write the upload to `<upload_dir>/<job_id>/<timestamp>_<safe_name>`
async fn save_upload(
    upload_dir: &std::path::Path,
    job_id: Uuid,
    safe_name: &str,
    data: &[u8],
) -> Result<std::path::PathBuf, String> {
    let job_dir = upload_dir.join(job_id.to_string());
    tokio::fs::create_dir_all(&job_dir)
        .await
        .map_err(|e| format!("Failed to create upload directory: {}", e))?;

    let saved_path = job_dir.join(format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), safe_name));
    tokio::fs::write(&saved_path, data)
        .await
        .map_err(|e| format!("Failed to write file: {}", e))?;
    Ok(saved_path)
}

fn resolve_mode(params: &UploadParams) -> Result<AnnotationMode, AppError> {
    if params.batch {
        return Ok(AnnotationMode::Batch);
    }
    match params.mode.as_deref() {
        None => Ok(AnnotationMode::default()),
        Some(mode) => mode
            .parse()
            .map_err(|e: UnknownModeError| AppError::BadRequest(e.to_string())),
    }
}

/// List processed variants with optional filtering
pub async fn list_variants(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<EnrichedVariant>> {
    let filter = VariantFilter {
        chrom: params.chrom,
        min_quality: params.min_quality,
    };
    Json(state.store().list(&filter, params.limit, params.offset))
}

/// Get one variant
pub async fn get_variant(
    State(state): State<AppState>,
    Path(variant_id): Path<String>,
) -> Result<Json<EnrichedVariant>, AppError> {
    state
        .store()
        .get(&variant_id)
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// Get a variant's annotations for the selected sources
pub async fn get_variant_annotations(
    State(state): State<AppState>,
    Path(variant_id): Path<String>,
    Query(params): Query<AnnotationParams>,
) -> Result<Json<AnnotationResponse>, AppError> {
    let sources = AnnotationSource::parse_selection(&params.include)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let variant = match params.refresh {
        true => state.pipeline().refresh(&variant_id, &sources).await,
        false => state.store().get(&variant_id),
    };
    let variant = variant.ok_or(AppError::NotFound)?;

    let bundle = variant.annotations.select(&sources);
    Ok(Json(AnnotationResponse {
        variant_id: variant.id,
        ensembl_vep: bundle.get(AnnotationSource::EnsemblVep).cloned(),
        clinvar: bundle.get(AnnotationSource::ClinVar).cloned(),
    }))
}

/// Aggregate statistics over stored variants
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.store().stats();
    Json(StatsResponse {
        total_variants: stats.total_variants,
        variant_types: stats.variant_types,
        annotation_success_rates: stats.annotation_success_rates,
        last_processed: state.tracker().latest().message,
    })
}

/// Process-wide processing status (last job to report wins)
pub async fn get_status(State(state): State<AppState>) -> Json<ProcessingStatus> {
    Json(state.tracker().latest())
}

/// Status of one upload job
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRecord>, AppError> {
    state.tracker().get(job_id).map(Json).ok_or_else(|| {
        warn!("Unknown job id {}", job_id);
        AppError::NotFound
    })
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound,
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse::new(error_message));
        (status, body).into_response()
    }
}
