// ==============================================================================
// annotation/rest.rs - REST Annotation Client
// ==============================================================================
// Description: One HTTP request per variant per source (Ensembl VEP, ClinVar)
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Endpoints:
//   VEP:     GET {ensembl_vep_url}/vep/{species}/region/{CHROM}:{pos}-{pos}/{alt}
//   ClinVar: GET {clinvar_api_url}/variation/{CHROM}:{pos}-{pos}:{ref}:{alt}
// Both accept an optional bearer token and answer JSON.
// ==============================================================================

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::SourceError;
use super::normalize::{
    normalize_clinvar_response, normalize_vep_response, ClinVarResponse, VepVariantResult,
};
use crate::config::AnnotatorConfig;
use crate::models::{AnnotationEntry, AnnotationSource, RawVariantRecord};

const VEP_API: &str = "VEP REST";
const CLINVAR_API: &str = "ClinVar";

/// HTTP client for the per-variant annotation sources
#[derive(Debug, Clone)]
pub struct RestAnnotationClient {
    client: Client,
    ensembl_vep_url: String,
    clinvar_api_url: String,
    ensembl_api_key: Option<String>,
    clinvar_api_key: Option<String>,
    species: String,
}

impl RestAnnotationClient {
    /// Build a client whose every request carries the configured timeout
    pub fn new(config: &AnnotatorConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("variant-annotator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            ensembl_vep_url: config.ensembl_vep_url.trim_end_matches('/').to_string(),
            clinvar_api_url: config.clinvar_api_url.trim_end_matches('/').to_string(),
            ensembl_api_key: config.ensembl_api_key.clone(),
            clinvar_api_key: config.clinvar_api_key.clone(),
            species: config.species.clone(),
        })
    }

    pub fn vep_url(&self, variant: &RawVariantRecord) -> String {
        format!(
            "{}/vep/{}/region/{}:{}-{}/{}",
            self.ensembl_vep_url,
            self.species,
            variant.external_chrom(),
            variant.pos,
            variant.pos,
            variant.alt_allele
        )
    }

    pub fn clinvar_url(&self, variant: &RawVariantRecord) -> String {
        format!(
            "{}/variation/{}:{}-{}:{}:{}",
            self.clinvar_api_url,
            variant.external_chrom(),
            variant.pos,
            variant.pos,
            variant.ref_allele,
            variant.alt_allele
        )
    }

    /// Fetch one source for one variant (single attempt)
    pub async fn fetch(
        &self,
        source: AnnotationSource,
        variant: &RawVariantRecord,
    ) -> Result<AnnotationEntry, SourceError> {
        match source {
            AnnotationSource::EnsemblVep => self.fetch_consequence(variant).await,
            AnnotationSource::ClinVar => self.fetch_clinical(variant).await,
        }
    }

    /// Functional consequence; an empty result list means no annotation
    pub async fn fetch_consequence(
        &self,
        variant: &RawVariantRecord,
    ) -> Result<AnnotationEntry, SourceError> {
        let url = self.vep_url(variant);
        let results: Vec<VepVariantResult> =
            self.get_json(VEP_API, &url, self.ensembl_api_key.as_deref()).await?;

        if results.is_empty() {
            return Ok(AnnotationEntry::NoAnnotation);
        }
        Ok(normalize_vep_response(&results, &variant.alt_allele).into())
    }

    pub async fn fetch_clinical(
        &self,
        variant: &RawVariantRecord,
    ) -> Result<AnnotationEntry, SourceError> {
        let url = self.clinvar_url(variant);
        let response: ClinVarResponse =
            self.get_json(CLINVAR_API, &url, self.clinvar_api_key.as_deref()).await?;
        Ok(normalize_clinvar_response(response).into())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        api: &'static str,
        url: &str,
        api_key: Option<&str>,
    ) -> Result<T, SourceError> {
        debug!("{} request: {}", api, url);

        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| transport_error(api, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                api,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| transport_error(api, e))?;

        serde_json::from_slice(&body).map_err(|e| SourceError::Malformed {
            api,
            message: e.to_string(),
        })
    }
}

fn transport_error(api: &'static str, err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout { api }
    } else {
        SourceError::Transport {
            api,
            message: err.to_string(),
        }
    }
}
