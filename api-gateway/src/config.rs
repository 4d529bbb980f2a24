// ==============================================================================
// config.rs - Gateway Configuration
// ==============================================================================
// Description: Server settings plus the shared annotation settings
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use variant_annotator::AnnotatorConfig;

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Variant annotation HTTP API", long_about = None)]
pub struct GatewayConfig {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Where uploaded VCF files are saved
    #[arg(long, env, default_value = "data/uploads")]
    pub upload_dir: PathBuf,

    /// Largest accepted upload, in bytes
    #[arg(long, env, default_value_t = DEFAULT_MAX_UPLOAD_SIZE)]
    pub max_upload_size: usize,

    /// Allowed CORS origins (comma-separated)
    #[arg(
        long = "cors-allowed-origins",
        env = "CORS_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub cors_origins: Vec<String>,

    #[command(flatten)]
    pub annotator: AnnotatorConfig,
}
