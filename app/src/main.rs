// ==============================================================================
// main.rs - Variant Annotator CLI
// ==============================================================================
// Description: Annotate a VCF file offline and print the enriched variants
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variant_annotator::models::AnnotationSource;
use variant_annotator::store::VariantFilter;
use variant_annotator::{
    AnnotationMode, Annotator, AnnotatorConfig, JobTracker, Pipeline, VariantStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// VCF file to annotate (.vcf or .vcf.gz)
    #[arg(short, long)]
    input: PathBuf,

    /// Annotation mode: single (REST per variant) or batch (offline VEP)
    #[arg(short, long, default_value = "single")]
    mode: AnnotationMode,

    /// Sources to fetch: all, or a comma-separated list of vep, clinvar
    #[arg(short, long, default_value = "all")]
    sources: String,

    /// Write JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    config: AnnotatorConfig,
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "variant_annotator=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let sources = AnnotationSource::parse_selection(&args.sources)?;

    info!("Variant Annotator starting...");
    info!("Input: {}", args.input.display());
    info!("Mode: {}", args.mode);

    let annotator = Annotator::new(&args.config).context("Failed to initialize annotator")?;
    let store = Arc::new(VariantStore::new());
    let pipeline = Pipeline::new(annotator, store.clone(), Arc::new(JobTracker::new()))
        .with_sources(sources);

    let summary = pipeline
        .process_file(&args.input, args.mode)
        .await
        .with_context(|| format!("Failed to annotate {}", args.input.display()))?;
    info!("{}", summary.message());

    let variants = store.list(&VariantFilter::default(), usize::MAX, 0);
    let json = serde_json::to_string_pretty(&variants).context("Failed to serialize variants")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} variants to {}", variants.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
