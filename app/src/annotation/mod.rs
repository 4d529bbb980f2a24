// ==============================================================================
// annotation/mod.rs - Annotation Dispatcher
// ==============================================================================
// Description: Chooses the REST or batch path and owns retry/error wrapping
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod batch;
pub mod error;
pub mod normalize;
pub mod rest;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use batch::{BatchAnnotationClient, BatchOutput};
pub use error::{BatchError, SourceError};
pub use normalize::CsqFormat;
pub use rest::RestAnnotationClient;

use crate::config::AnnotatorConfig;
use crate::models::{AnnotationBundle, AnnotationEntry, AnnotationSource, RawVariantRecord};

/// How a collection of variants gets annotated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationMode {
    /// One REST request per variant per source
    #[default]
    Single,
    /// One offline VEP run over the whole collection
    Batch,
}

impl AnnotationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationMode::Single => "single",
            AnnotationMode::Batch => "batch",
        }
    }
}

impl fmt::Display for AnnotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unknown annotation mode: {0} (expected single or batch)")]
pub struct UnknownModeError(pub String);

impl FromStr for AnnotationMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "rest" => Ok(AnnotationMode::Single),
            "batch" | "cli" => Ok(AnnotationMode::Batch),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

/// Annotation dispatcher
///
/// Source failures never escape as errors: after retries they are stored
/// in the bundle as error markers. Only a failed batch run is returned as
/// an error, since it leaves the whole collection unannotated.
#[derive(Debug, Clone)]
pub struct Annotator {
    rest: RestAnnotationClient,
    batch: BatchAnnotationClient,
    max_retries: u32,
    retry_backoff: Duration,
    concurrency: usize,
}

impl Annotator {
    pub fn new(config: &AnnotatorConfig) -> Result<Self, SourceError> {
        Ok(Self {
            rest: RestAnnotationClient::new(config)?,
            batch: BatchAnnotationClient::from_config(config),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
            concurrency: config.rest_concurrency(),
        })
    }

    /// Swap the batch client (e.g. to pin its temp directory)
    pub fn with_batch_client(mut self, batch: BatchAnnotationClient) -> Self {
        self.batch = batch;
        self
    }

    /// Annotate one variant over REST, fetching the sources concurrently
    pub async fn annotate(
        &self,
        variant: &RawVariantRecord,
        sources: &[AnnotationSource],
    ) -> AnnotationBundle {
        let fetches = sources.iter().map(|&source| async move {
            let entry = match self.fetch_with_retry(source, variant).await {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("{} failed for {}: {}", source, variant.identity(), e);
                    e.into_entry()
                }
            };
            (source, entry)
        });

        let mut bundle = AnnotationBundle::new();
        for (source, entry) in join_all(fetches).await {
            bundle.insert(source, entry);
        }
        bundle
    }

    /// Annotate a whole collection; bundles come back in input order
    pub async fn annotate_all(
        &self,
        variants: &[RawVariantRecord],
        mode: AnnotationMode,
        sources: &[AnnotationSource],
    ) -> Result<Vec<AnnotationBundle>, BatchError> {
        info!(
            "Annotating {} variants in {} mode ({} sources)",
            variants.len(),
            mode,
            sources.len()
        );

        match mode {
            AnnotationMode::Single => {
                // Collected before streaming; a map closure here makes the
                // job future unusable with tokio::spawn
                let fetches: Vec<_> = variants
                    .iter()
                    .map(|variant| self.annotate(variant, sources))
                    .collect();
                Ok(stream::iter(fetches)
                    .buffered(self.concurrency)
                    .collect::<Vec<_>>()
                    .await)
            }
            AnnotationMode::Batch => self.annotate_batch(variants, sources).await,
        }
    }

    /// Batch path: consequence source only, clinical source left unfetched
    async fn annotate_batch(
        &self,
        variants: &[RawVariantRecord],
        sources: &[AnnotationSource],
    ) -> Result<Vec<AnnotationBundle>, BatchError> {
        if !sources.contains(&AnnotationSource::EnsemblVep) {
            debug!("Batch mode without the VEP source, nothing to run");
            return Ok(vec![AnnotationBundle::new(); variants.len()]);
        }

        let output = self.batch.annotate(variants).await?;

        Ok(variants
            .iter()
            .map(|variant| {
                let entry = match output.annotations.get(&variant.identity()) {
                    Some(info) => normalize::normalize_batch_info(info, &output.csq_format),
                    None => AnnotationEntry::NoAnnotation,
                };
                let mut bundle = AnnotationBundle::new();
                bundle.insert(AnnotationSource::EnsemblVep, entry);
                bundle
            })
            .collect())
    }

    async fn fetch_with_retry(
        &self,
        source: AnnotationSource,
        variant: &RawVariantRecord,
    ) -> Result<AnnotationEntry, SourceError> {
        let mut attempt: u32 = 0;
        loop {
            match self.rest.fetch(source, variant).await {
                Ok(entry) => return Ok(entry),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_backoff * attempt;
                    debug!(
                        "{} attempt {} for {} failed ({}), retrying in {:?}",
                        source,
                        attempt,
                        variant.identity(),
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
