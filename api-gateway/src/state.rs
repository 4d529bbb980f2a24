// ==============================================================================
// state.rs - Application State Management
// ==============================================================================
// Description: Shared application state for API gateway
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use variant_annotator::{Annotator, JobTracker, Pipeline, VariantStore};

use crate::config::GatewayConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Pipeline owning the variant store and job tracker
    pipeline: Pipeline,

    /// Upload directory
    upload_dir: PathBuf,

    /// Largest accepted upload, in bytes
    max_upload_size: usize,
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: &GatewayConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .with_context(|| {
                format!("Failed to create upload directory {}", config.upload_dir.display())
            })?;

        let annotator =
            Annotator::new(&config.annotator).context("Failed to initialize annotator")?;
        let pipeline = Pipeline::new(
            annotator,
            Arc::new(VariantStore::new()),
            Arc::new(JobTracker::new()),
        );

        Ok(Self::from_parts(
            pipeline,
            config.upload_dir.clone(),
            config.max_upload_size,
        ))
    }

    /// Assemble state around an existing pipeline
    pub fn from_parts(pipeline: Pipeline, upload_dir: PathBuf, max_upload_size: usize) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                upload_dir,
                max_upload_size,
            }),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn store(&self) -> &VariantStore {
        self.inner.pipeline.store()
    }

    pub fn tracker(&self) -> &JobTracker {
        self.inner.pipeline.tracker()
    }

    pub fn upload_dir(&self) -> &Path {
        &self.inner.upload_dir
    }

    pub fn max_upload_size(&self) -> usize {
        self.inner.max_upload_size
    }
}
