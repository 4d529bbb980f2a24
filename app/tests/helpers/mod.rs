//! Test helpers for annotation integration tests
//!
//! - StubUpstream: local axum server standing in for Ensembl VEP and ClinVar
//! - FakeVep: POSIX shell script standing in for the offline VEP tool

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use variant_annotator::AnnotatorConfig;

pub const BRCA1_LINE: &str = "1\t12345\t.\tA\tG\t100\tPASS\tAC=1;AF=0.5";

pub const CSQ_HEADER: &str = "##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL|Feature|HGVSp\">";

/// Canned answer for one upstream route
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: Value,
    /// Leading requests answered with 503 before the real response
    pub transient_failures: usize,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            transient_failures: 0,
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: serde_json::json!({"error": "stubbed failure"}),
            transient_failures: 0,
            delay: None,
        }
    }

    pub fn flaky(transient_failures: usize, body: Value) -> Self {
        Self {
            transient_failures,
            ..Self::ok(body)
        }
    }

    pub fn slow(delay: Duration, body: Value) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok(body)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct RouteStub {
    response: StubResponse,
    hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct StubState {
    vep: RouteStub,
    clinvar: RouteStub,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Running stub server; both sources share one base URL
pub struct StubUpstream {
    pub base_url: String,
    vep_hits: Arc<AtomicUsize>,
    clinvar_hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubUpstream {
    pub async fn start(vep: StubResponse, clinvar: StubResponse) -> Self {
        let vep_hits = Arc::new(AtomicUsize::new(0));
        let clinvar_hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = StubState {
            vep: RouteStub {
                response: vep,
                hits: vep_hits.clone(),
            },
            clinvar: RouteStub {
                response: clinvar,
                hits: clinvar_hits.clone(),
            },
            requests: requests.clone(),
        };

        let router = Router::new()
            .route("/vep/{species}/region/{region}/{alt}", get(vep_handler))
            .route("/variation/{variant}", get(clinvar_handler))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            vep_hits,
            clinvar_hits,
            requests,
        }
    }

    /// Config pointing both sources here, with fast retries
    pub fn config(&self) -> AnnotatorConfig {
        AnnotatorConfig {
            ensembl_vep_url: self.base_url.clone(),
            clinvar_api_url: self.base_url.clone(),
            request_timeout_secs: 5,
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    pub fn vep_hits(&self) -> usize {
        self.vep_hits.load(Ordering::SeqCst)
    }

    pub fn clinvar_hits(&self) -> usize {
        self.clinvar_hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn vep_handler(State(state): State<StubState>, uri: Uri, headers: HeaderMap) -> Response {
    respond(&state.vep, &state.requests, uri, headers).await
}

async fn clinvar_handler(State(state): State<StubState>, uri: Uri, headers: HeaderMap) -> Response {
    respond(&state.clinvar, &state.requests, uri, headers).await
}

async fn respond(
    stub: &RouteStub,
    requests: &Mutex<Vec<RecordedRequest>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let attempt = stub.hits.fetch_add(1, Ordering::SeqCst);
    requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    if let Some(delay) = stub.response.delay {
        tokio::time::sleep(delay).await;
    }
    if attempt < stub.response.transient_failures {
        return (StatusCode::SERVICE_UNAVAILABLE, "try again").into_response();
    }

    let status = StatusCode::from_u16(stub.response.status).unwrap();
    (status, Json(stub.response.body.clone())).into_response()
}

/// One consequence object for BRCA1 missense
pub fn brca1_vep_body() -> Value {
    serde_json::json!([{
        "input": "1 12345 . A G",
        "transcript_consequences": [{
            "gene_symbol": "BRCA1",
            "impact": "MODERATE",
            "consequence_terms": ["missense_variant"],
            "transcript_id": "ENST00000357654",
            "hgvsp": "ENSP00000350283.3:p.Arg123Gly"
        }],
        "colocated_variants": [{"frequencies": {"G": {"gnomade": 0.0004}}}]
    }])
}

pub fn brca1_clinvar_body() -> Value {
    serde_json::json!({
        "clinical_significance": "Pathogenic",
        "review_status": "criteria provided, multiple submitters, no conflicts",
        "conditions": ["Hereditary breast ovarian cancer syndrome"],
        "variation_id": "55555"
    })
}

/// Write a VCF file with the given data lines
pub fn write_vcf(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let mut text = String::from("##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n");
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Shell script run as `sh <script> <vep flags…>`
pub struct FakeVep {
    pub dir: TempDir,
    script: PathBuf,
}

impl FakeVep {
    /// Script that copies `fixture` to --output_file
    pub fn succeeding(fixture: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fixture.vcf"), fixture).unwrap();
        let d = dir.path().display();
        let body = format!(
            "echo \"$@\" > \"{d}/args.txt\"\n\
             while [ $# -gt 0 ]; do\n\
               case \"$1\" in\n\
                 --input_file) IN=\"$2\"; shift 2 ;;\n\
                 --output_file) OUT=\"$2\"; shift 2 ;;\n\
                 *) shift ;;\n\
               esac\n\
             done\n\
             cp \"$IN\" \"{d}/input_seen.vcf\"\n\
             cp \"{d}/fixture.vcf\" \"$OUT\"\n"
        );
        Self::with_body(dir, &body)
    }

    pub fn failing(code: i32, stderr: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("echo '{}' >&2\nexit {}\n", stderr, code);
        Self::with_body(dir, &body)
    }

    pub fn hanging() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self::with_body(dir, "sleep 30\n")
    }

    fn with_body(dir: TempDir, body: &str) -> Self {
        let script = dir.path().join("fake_vep.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
        Self { dir, script }
    }

    pub fn config(&self) -> AnnotatorConfig {
        AnnotatorConfig {
            vep_program: PathBuf::from("sh"),
            vep_launcher_args: vec![self.script.display().to_string()],
            vep_data_dir: self.dir.path().join("cache"),
            ..Default::default()
        }
    }

    pub fn recorded_args(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("args.txt")).unwrap()
    }

    pub fn input_seen(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("input_seen.vcf")).unwrap()
    }
}

/// VEP-style output holding the given data lines
pub fn vep_output(lines: &[&str]) -> String {
    let mut text = format!(
        "##fileformat=VCFv4.2\n{}\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
        CSQ_HEADER
    );
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}
