// ==============================================================================
// validator.rs - File Upload Validation (API Gateway)
// ==============================================================================
// Description: Validates uploaded VCF files before writing to disk
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// Security: Allowlist-only file types, gzip magic check, size limits
// ==============================================================================

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("File is empty")]
    Empty,

    #[error("Invalid filename after sanitization")]
    InvalidName,

    #[error("Filename cannot start with '.'")]
    HiddenFile,

    #[error("Only VCF files are accepted (.vcf, .vcf.gz)")]
    UnsupportedType,

    #[error("File named .vcf.gz is not gzip compressed")]
    NotGzip,
}

#[derive(Debug)]
pub struct ValidatedFile {
    pub original_name: String,
    pub safe_name: String,
    pub size: usize,
    pub hash_sha256: String,
}

pub struct FileValidator {
    max_size: usize,
}

impl FileValidator {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Validate one uploaded VCF
    pub fn validate_upload(&self, filename: &str, data: &[u8]) -> Result<ValidatedFile, ValidationError> {
        // 1. Size check (before any processing)
        let size = data.len();
        if size > self.max_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_size,
            });
        }
        if size == 0 {
            return Err(ValidationError::Empty);
        }

        // 2. Filename sanitization
        let safe_name = sanitize_filename(filename)?;

        // 3. Extension allowlist
        let lower = safe_name.to_lowercase();
        if lower.ends_with(".vcf.gz") {
            // 4. Compressed uploads must really be gzip
            if !data.starts_with(&GZIP_MAGIC) {
                return Err(ValidationError::NotGzip);
            }
        } else if !lower.ends_with(".vcf") {
            return Err(ValidationError::UnsupportedType);
        }

        let hash = compute_sha256(data);
        debug!("Validated upload {} ({} bytes, sha256 {})", safe_name, size, hash);

        Ok(ValidatedFile {
            original_name: filename.to_string(),
            safe_name,
            size,
            hash_sha256: hash,
        })
    }
}

fn sanitize_filename(name: &str) -> Result<String, ValidationError> {
    // Drop any client-side directory part, then path separators and control chars
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let safe: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .take(255)
        .collect();

    if safe.is_empty() {
        return Err(ValidationError::InvalidName);
    }
    if safe.starts_with('.') {
        return Err(ValidationError::HiddenFile);
    }
    Ok(safe)
}

fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
