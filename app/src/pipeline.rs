// ==============================================================================
// pipeline.rs - Annotation Pipeline Driver
// ==============================================================================
// Description: file → parser → dispatcher → store, with job status updates
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::annotation::{AnnotationMode, Annotator, BatchError};
use crate::jobs::JobTracker;
use crate::models::{AnnotationSource, EnrichedVariant};
use crate::parsers::{VcfParser, VcfReadError};
use crate::store::VariantStore;

/// Whole-job failures (reported through the job status)
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] VcfReadError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Outcome of one successful job
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub processed: usize,
    pub skipped: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl JobSummary {
    pub fn message(&self) -> String {
        format!(
            "Successfully processed {} variants in {:.2} seconds",
            self.processed,
            self.elapsed.as_secs_f64()
        )
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Pipeline over an explicitly owned store and tracker
#[derive(Debug, Clone)]
pub struct Pipeline {
    annotator: Annotator,
    store: Arc<VariantStore>,
    tracker: Arc<JobTracker>,
    parser: VcfParser,
    sources: Vec<AnnotationSource>,
}

impl Pipeline {
    pub fn new(annotator: Annotator, store: Arc<VariantStore>, tracker: Arc<JobTracker>) -> Self {
        Self {
            annotator,
            store,
            tracker,
            parser: VcfParser::new(),
            sources: AnnotationSource::ALL.to_vec(),
        }
    }

    /// Restrict which sources jobs fetch
    pub fn with_sources(mut self, sources: Vec<AnnotationSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_parser(mut self, parser: VcfParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn store(&self) -> &Arc<VariantStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// Register a new job and run it to completion
    pub async fn process_file(
        &self,
        path: impl AsRef<Path>,
        mode: AnnotationMode,
    ) -> Result<JobSummary, PipelineError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let job_id = self.tracker.create_job(file_name, mode);
        self.run_job(job_id, path, mode).await
    }

    /// Run an already registered job, recording its outcome in the tracker
    pub async fn run_job(
        &self,
        job_id: Uuid,
        path: impl AsRef<Path>,
        mode: AnnotationMode,
    ) -> Result<JobSummary, PipelineError> {
        self.tracker.start(job_id);
        let start = Instant::now();

        match self.execute(path.as_ref(), mode).await {
            Ok((processed, skipped)) => {
                let summary = JobSummary {
                    job_id,
                    processed,
                    skipped,
                    elapsed: start.elapsed(),
                };
                let message = summary.message();
                info!("Job {}: {}", job_id, message);
                self.tracker.complete(job_id, processed, skipped, message);
                Ok(summary)
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                self.tracker
                    .fail(job_id, format!("Error processing VCF file: {}", e));
                Err(e)
            }
        }
    }

    async fn execute(&self, path: &Path, mode: AnnotationMode) -> Result<(usize, usize), PipelineError> {
        let parsed = self.parser.parse_path(path)?;
        info!(
            "Parsed {} variants from {} ({} lines skipped)",
            parsed.records.len(),
            path.display(),
            parsed.skipped.len()
        );

        // A failed batch returns before anything is stored
        let bundles = self
            .annotator
            .annotate_all(&parsed.records, mode, &self.sources)
            .await?;

        let processed = parsed.records.len();
        for (record, bundle) in parsed.records.into_iter().zip(bundles) {
            self.store.upsert(EnrichedVariant::new(record, bundle));
        }

        Ok((processed, parsed.skipped.len()))
    }

    /// Re-fetch the given sources over REST for a stored variant
    ///
    /// Entries for other sources are kept; the merged result replaces the
    /// stored variant. Returns `None` for an unknown identity.
    pub async fn refresh(&self, id: &str, sources: &[AnnotationSource]) -> Option<EnrichedVariant> {
        let existing = self.store.get(id)?;
        let fresh = self.annotator.annotate(&existing.record, sources).await;

        let mut annotations = existing.annotations;
        annotations.merge(fresh);
        self.store
            .upsert(EnrichedVariant::new(existing.record, annotations));
        self.store.get(id)
    }
}
