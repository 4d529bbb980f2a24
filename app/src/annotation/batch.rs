// ==============================================================================
// annotation/batch.rs - Batch VEP Client
// ==============================================================================
// Description: Whole-file annotation through one offline VEP subprocess run
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Protocol:
//   1. Write every variant to a temp VCF (ID "."; QUAL/FILTER/INFO ".")
//   2. Run: <vep> [launcher args] --input_file IN --output_file OUT
//           --format vcf --vcf --cache --offline --dir_cache DIR
//           --species S --assembly A --no_stats --force_overwrite
//   3. Non-zero exit fails the whole batch
//   4. Read OUT with noodles-vcf, keying each record by its own recomputed
//      identity and taking the CSQ layout from the header
//   5. Both temp files are dropped on every exit path
// The subprocess has no timeout: a hung tool blocks the caller until the
// future is dropped, at which point the child is killed.
// ==============================================================================

use noodles_vcf as vcf;
use noodles_vcf::variant::record::AlternateBases;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::{Builder, NamedTempFile};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::BatchError;
use super::normalize::{CsqFormat, CSQ_KEY};
use crate::config::AnnotatorConfig;
use crate::identity::{identity, VariantIdentity};
use crate::models::{InfoFields, RawVariantRecord};
use crate::parsers::parse_info;

/// Raw per-identity results of one tool run
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// CSQ column layout declared in the output header
    pub csq_format: CsqFormat,
    /// Output INFO fields, keyed by identity recomputed from the output record
    pub annotations: HashMap<VariantIdentity, InfoFields>,
}

/// Runs the offline VEP command line tool over a set of variants
#[derive(Debug, Clone)]
pub struct BatchAnnotationClient {
    program: PathBuf,
    launcher_args: Vec<String>,
    data_dir: PathBuf,
    species: String,
    assembly: String,
    temp_dir: Option<PathBuf>,
}

impl BatchAnnotationClient {
    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self {
            program: config.vep_program.clone(),
            launcher_args: config.vep_launcher_args.clone(),
            data_dir: config.vep_data_dir.clone(),
            species: config.species.clone(),
            assembly: config.assembly.clone(),
            temp_dir: None,
        }
    }

    /// Place temp files in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Annotate all variants in one tool invocation
    ///
    /// Variants the tool drops are simply absent from the returned mapping.
    pub async fn annotate(&self, variants: &[RawVariantRecord]) -> Result<BatchOutput, BatchError> {
        if variants.is_empty() {
            return Ok(BatchOutput::default());
        }

        let input = self.temp_file("vep_input_")?;
        write_input_vcf(input.as_file(), variants).map_err(BatchError::TempFile)?;
        let output = self.temp_file("vep_output_")?;

        self.run_tool(input.path(), output.path()).await?;

        let text = tokio::fs::read_to_string(output.path())
            .await
            .map_err(BatchError::ReadOutput)?;

        let parsed = parse_output(&text)?;
        debug!(
            "VEP returned {} of {} submitted variants",
            parsed.annotations.len(),
            variants.len()
        );
        Ok(parsed)
    }

    fn temp_file(&self, prefix: &str) -> Result<NamedTempFile, BatchError> {
        let mut builder = Builder::new();
        builder.prefix(prefix).suffix(".vcf");
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(BatchError::TempFile)
    }

    async fn run_tool(&self, input: &Path, output: &Path) -> Result<(), BatchError> {
        let program = self.program.display().to_string();
        info!("Running VEP batch annotation: {}", program);
        let start = Instant::now();

        let result = Command::new(&self.program)
            .args(&self.launcher_args)
            .arg("--input_file")
            .arg(input)
            .arg("--output_file")
            .arg(output)
            .args(["--format", "vcf", "--vcf", "--cache", "--offline"])
            .arg("--dir_cache")
            .arg(&self.data_dir)
            .arg("--species")
            .arg(&self.species)
            .arg("--assembly")
            .arg(&self.assembly)
            .args(["--no_stats", "--force_overwrite"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BatchError::Spawn { program, source })?;

        if !result.status.success() {
            return Err(BatchError::ToolFailed {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        debug!("VEP finished in {:.2}s", start.elapsed().as_secs_f64());
        Ok(())
    }
}

/// Minimal eight-column VCF the tool reads
fn write_input_vcf(mut file: &std::fs::File, variants: &[RawVariantRecord]) -> std::io::Result<()> {
    let mut out = String::from("##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n");
    for v in variants {
        out.push_str(&format!(
            "{}\t{}\t.\t{}\t{}\t.\t.\t.\n",
            v.external_chrom(),
            v.pos,
            v.ref_allele,
            v.alt_allele
        ));
    }
    file.write_all(out.as_bytes())?;
    file.flush()
}

/// Parse the tool's VCF output into identity → INFO fields
///
/// Output may be reordered or drop records. Identities are recomputed from
/// each record's CHROM, POS, REF and first ALT. When the same identity
/// appears twice the first record wins.
pub fn parse_output(text: &str) -> Result<BatchOutput, BatchError> {
    let mut output = BatchOutput::default();
    if text.trim().is_empty() {
        return Ok(output);
    }

    let mut reader = vcf::io::Reader::new(text.as_bytes());
    let header = reader.read_header().map_err(BatchError::OutputHeader)?;

    if let Some(format) = header
        .infos()
        .get(CSQ_KEY)
        .and_then(|csq| CsqFormat::from_description(csq.description()))
    {
        output.csq_format = format;
    }

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping VEP output record {}: {}", idx + 1, e);
                continue;
            }
        };

        match record_identity(&record) {
            Ok(id) => {
                output
                    .annotations
                    .entry(id)
                    .or_insert_with(|| parse_info(record.info().as_ref()));
            }
            Err(e) => warn!("Skipping VEP output record {}: {}", idx + 1, e),
        }
    }

    Ok(output)
}

fn record_identity(record: &vcf::Record) -> std::io::Result<VariantIdentity> {
    let pos = match record.variant_start() {
        Some(pos) => pos?.get(),
        None => return Err(invalid_record("missing position")),
    };
    let alternate_bases = record.alternate_bases();
    let alt = match alternate_bases.iter().next() {
        Some(alt) => alt?,
        None => return Err(invalid_record("missing ALT allele")),
    };

    Ok(identity(
        record.reference_sequence_name(),
        pos as u64,
        record.reference_bases(),
        alt,
    ))
}

fn invalid_record(message: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message.to_string())
}
