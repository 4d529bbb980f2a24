// ==============================================================================
// jobs.rs - Job Status Tracking
// ==============================================================================
// Description: Per-job records plus the process-wide processing status
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Two views of the same transitions:
//   JobRecord        - one per submitted job, keyed by UUID, exact
//   ProcessingStatus - one per process, overwritten on every transition
// Nothing serializes jobs. With overlapping jobs the process-wide status
// shows whichever job wrote last; pollers that need a specific job's
// outcome must read its JobRecord.
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use crate::annotation::AnnotationMode;

pub const PROCESSING_MESSAGE: &str = "Processing VCF file...";

/// Job status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

/// Process-wide status, last writer wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub is_processing: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub file_name: String,
    pub mode: AnnotationMode,
    pub status: JobStatus,
    pub message: Option<String>,
    pub variant_count: usize,
    pub skipped_lines: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    jobs: HashMap<Uuid, JobRecord>,
    status: ProcessingStatus,
}

#[derive(Debug, Default)]
pub struct JobTracker {
    inner: RwLock<TrackerInner>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queued job (does not touch the process-wide status)
    pub fn create_job(&self, file_name: impl Into<String>, mode: AnnotationMode) -> Uuid {
        let job_id = Uuid::new_v4();
        let record = JobRecord {
            job_id,
            file_name: file_name.into(),
            mode,
            status: JobStatus::Queued,
            message: None,
            variant_count: 0,
            skipped_lines: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.update(|inner| {
            inner.jobs.insert(job_id, record);
        });
        job_id
    }

    pub fn start(&self, job_id: Uuid) {
        self.update(|inner| {
            if let Some(job) = inner.jobs.get_mut(&job_id) {
                job.status = JobStatus::Processing;
                job.message = Some(PROCESSING_MESSAGE.to_string());
                job.started_at = Some(Utc::now());
            }
            inner.status = ProcessingStatus {
                is_processing: true,
                message: PROCESSING_MESSAGE.to_string(),
            };
        });
    }

    pub fn complete(&self, job_id: Uuid, variant_count: usize, skipped_lines: usize, message: String) {
        self.finish(job_id, JobStatus::Complete, message, |job| {
            job.variant_count = variant_count;
            job.skipped_lines = skipped_lines;
        });
    }

    pub fn fail(&self, job_id: Uuid, message: String) {
        self.finish(job_id, JobStatus::Failed, message, |_| {});
    }

    pub fn get(&self, job_id: Uuid) -> Option<JobRecord> {
        self.read(|inner| inner.jobs.get(&job_id).cloned())
    }

    /// Process-wide status as last written by any job
    pub fn latest(&self) -> ProcessingStatus {
        self.read(|inner| inner.status.clone())
    }

    fn finish(
        &self,
        job_id: Uuid,
        status: JobStatus,
        message: String,
        apply: impl FnOnce(&mut JobRecord),
    ) {
        self.update(|inner| {
            if let Some(job) = inner.jobs.get_mut(&job_id) {
                job.status = status;
                job.message = Some(message.clone());
                job.completed_at = Some(Utc::now());
                apply(job);
            }
            inner.status = ProcessingStatus {
                is_processing: false,
                message,
            };
        });
    }

    fn update(&self, f: impl FnOnce(&mut TrackerInner)) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner);
    }

    fn read<T>(&self, f: impl FnOnce(&TrackerInner) -> T) -> T {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&inner)
    }
}
