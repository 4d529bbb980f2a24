// ==============================================================================
// annotation/error.rs - Annotation Error Types
// ==============================================================================
// Description: Source-level and batch-level annotation failures
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Propagation:
//   SourceError - one source, one variant. Absorbed into the bundle as an
//                 error marker, never aborts the job.
//   BatchError  - the external tool run as a whole failed. Fatal for the job.
// ==============================================================================

use thiserror::Error;

use crate::models::AnnotationEntry;

/// Failure fetching one annotation source for one variant
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("{api} request failed: {message}")]
    Transport { api: &'static str, message: String },

    #[error("{api} request timed out")]
    Timeout { api: &'static str },

    #[error("{api} API error: {status}")]
    Status { api: &'static str, status: u16 },

    #[error("Failed to parse {api} response: {message}")]
    Malformed { api: &'static str, message: String },
}

impl SourceError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Transport { .. } | SourceError::Timeout { .. } => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::ClientBuild(_) | SourceError::Malformed { .. } => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Error marker stored in the annotation bundle
    pub fn into_entry(self) -> AnnotationEntry {
        let status_code = self.status_code();
        AnnotationEntry::error(self.to_string(), status_code)
    }
}

/// Whole-batch failure of the external annotation tool
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to prepare temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Failed to run VEP ({program}): {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("VEP batch CLI execution failed (exit code {code:?}): {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("Failed to read VEP output: {0}")]
    ReadOutput(#[source] std::io::Error),

    #[error("Invalid VEP output header: {0}")]
    OutputHeader(#[source] std::io::Error),
}
