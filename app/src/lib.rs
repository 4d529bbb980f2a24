// ==============================================================================
// lib.rs - Variant Annotator Library
// ==============================================================================
// Description: Library interface for the variant annotation pipeline
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod annotation;
pub mod config;
pub mod identity;
pub mod jobs;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod store;

pub use annotation::{AnnotationMode, Annotator};
pub use config::AnnotatorConfig;
pub use identity::{identity, VariantIdentity};
pub use jobs::{JobRecord, JobStatus, JobTracker, ProcessingStatus};
pub use models::{
    AnnotationBundle, AnnotationEntry, AnnotationSource, ClinicalAnnotation,
    ConsequenceAnnotation, EnrichedVariant, InfoValue, RawVariantRecord, SourceAnnotation,
};
pub use pipeline::{JobSummary, Pipeline, PipelineError};
pub use store::{StoreStats, VariantFilter, VariantStore};
