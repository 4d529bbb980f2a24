// ==============================================================================
// config.rs - Annotator Configuration
// ==============================================================================
// Description: Settings for annotation sources, the batch VEP tool and retries
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENSEMBL_VEP_URL: &str = "https://rest.ensembl.org";
pub const DEFAULT_CLINVAR_API_URL: &str = "https://api.ncbi.nlm.nih.gov/variation/v0";

/// Annotation settings, shared by the CLI and the API gateway
///
/// Every flag can also be supplied through the environment variable of the
/// same name (e.g. `--ensembl-vep-url` / `ENSEMBL_VEP_URL`).
#[derive(Args, Debug, Clone)]
pub struct AnnotatorConfig {
    /// Base URL of the Ensembl REST service
    #[arg(long, env, default_value = DEFAULT_ENSEMBL_VEP_URL)]
    pub ensembl_vep_url: String,

    /// Base URL of the ClinVar variation service
    #[arg(long, env, default_value = DEFAULT_CLINVAR_API_URL)]
    pub clinvar_api_url: String,

    /// Bearer token for Ensembl requests
    #[arg(long, env, hide_env_values = true)]
    pub ensembl_api_key: Option<String>,

    /// Bearer token for ClinVar requests
    #[arg(long, env, hide_env_values = true)]
    pub clinvar_api_key: Option<String>,

    /// Timeout for each annotation request, in seconds
    #[arg(long = "request-timeout", env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Species passed to VEP (REST path segment and --species)
    #[arg(long = "species", env = "VEP_SPECIES", default_value = "homo_sapiens")]
    pub species: String,

    /// Genome assembly passed to VEP --assembly
    #[arg(long = "assembly", env = "VEP_ASSEMBLY", default_value = "GRCh38")]
    pub assembly: String,

    /// VEP executable (or launcher such as `sh`)
    #[arg(long = "vep-script", env = "VEP_SCRIPT", default_value = "vep")]
    pub vep_program: PathBuf,

    /// Arguments placed before the VEP flags (e.g. a script path when
    /// `--vep-script` is an interpreter)
    #[arg(long = "vep-launcher-arg", env = "VEP_LAUNCHER_ARGS", value_delimiter = ',')]
    pub vep_launcher_args: Vec<String>,

    /// VEP offline cache directory
    #[arg(long = "vep-data-dir", env = "VEP_DATA_DIR", default_value = "data/vep_data")]
    pub vep_data_dir: PathBuf,

    /// Retries per source after the first failed attempt
    #[arg(long, env, default_value_t = 2)]
    pub max_retries: u32,

    /// Backoff between retries, in milliseconds (multiplied by attempt number)
    #[arg(long = "retry-backoff-ms", env = "RETRY_BACKOFF_MS", default_value_t = 500)]
    pub retry_backoff_ms: u64,

    /// Variants annotated concurrently in single (REST) mode
    #[arg(long, env, default_value_t = 4)]
    pub rest_concurrency: usize,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            ensembl_vep_url: DEFAULT_ENSEMBL_VEP_URL.to_string(),
            clinvar_api_url: DEFAULT_CLINVAR_API_URL.to_string(),
            ensembl_api_key: None,
            clinvar_api_key: None,
            request_timeout_secs: 30,
            species: "homo_sapiens".to_string(),
            assembly: "GRCh38".to_string(),
            vep_program: PathBuf::from("vep"),
            vep_launcher_args: Vec::new(),
            vep_data_dir: PathBuf::from("data/vep_data"),
            max_retries: 2,
            retry_backoff_ms: 500,
            rest_concurrency: 4,
        }
    }
}

impl AnnotatorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Concurrency with a floor of one
    pub fn rest_concurrency(&self) -> usize {
        self.rest_concurrency.max(1)
    }
}
