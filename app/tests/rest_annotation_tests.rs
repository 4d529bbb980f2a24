//! REST-mode annotation tests against a stubbed Ensembl VEP / ClinVar server

mod helpers;

use helpers::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use variant_annotator::parsers::parse_line;
use variant_annotator::{
    AnnotationEntry, AnnotationMode, AnnotationSource, Annotator, JobTracker, Pipeline,
    VariantStore,
};

fn pipeline_for(stub: &StubUpstream) -> Pipeline {
    Pipeline::new(
        Annotator::new(&stub.config()).unwrap(),
        Arc::new(VariantStore::new()),
        Arc::new(JobTracker::new()),
    )
}

#[tokio::test]
async fn test_end_to_end_brca1() {
    let stub = StubUpstream::start(
        StubResponse::ok(brca1_vep_body()),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_vcf(dir.path(), "brca1.vcf", &[BRCA1_LINE]);

    let pipeline = pipeline_for(&stub);
    let summary = pipeline.process_file(&input, AnnotationMode::Single).await.unwrap();
    assert_eq!(summary.processed, 1);

    let stored = pipeline.store().get("1_12345_A_G").expect("variant stored");
    assert_eq!(stored.id.as_str(), "1_12345_A_G");
    assert_eq!(stored.record.qual, Some(100.0));

    let consequence = stored.annotations.consequence().unwrap();
    assert_eq!(consequence.gene.as_deref(), Some("BRCA1"));
    assert_eq!(consequence.impact.as_deref(), Some("MODERATE"));
    assert_eq!(consequence.consequence, vec!["missense_variant"]);
    assert_eq!(consequence.gnomad_af, Some(0.0004));

    let clinical = stored.annotations.clinical().unwrap();
    assert_eq!(clinical.clinical_significance.as_deref(), Some("Pathogenic"));
    assert_eq!(clinical.variation_id.as_deref(), Some("55555"));

    let json = serde_json::to_value(&stored).unwrap();
    assert_eq!(json["annotations"]["ensembl_vep"]["annotation"]["gene"], "BRCA1");

    let paths: Vec<String> = stub.requests().into_iter().map(|r| r.path).collect();
    assert!(paths.contains(&"/vep/homo_sapiens/region/1:12345-12345/G".to_string()));
    assert!(paths.contains(&"/variation/1:12345-12345:A:G".to_string()));

    let status = pipeline.tracker().latest();
    assert!(!status.is_processing);
    assert!(status.message.starts_with("Successfully processed 1 variants in "));
}

#[tokio::test]
async fn test_non_success_status_becomes_marker() {
    let stub = StubUpstream::start(
        StubResponse::status(500),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let config = variant_annotator::AnnotatorConfig {
        max_retries: 0,
        ..stub.config()
    };
    let annotator = Annotator::new(&config).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    let bundle = annotator.annotate(&variant, &AnnotationSource::ALL).await;

    assert_eq!(
        bundle.get(AnnotationSource::EnsemblVep),
        Some(&AnnotationEntry::Error {
            message: "VEP REST API error: 500".to_string(),
            status_code: Some(500),
        })
    );
    assert!(bundle.get(AnnotationSource::ClinVar).unwrap().is_annotated());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let stub = StubUpstream::start(StubResponse::status(400), StubResponse::status(404)).await;
    let annotator = Annotator::new(&stub.config()).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    let bundle = annotator.annotate(&variant, &AnnotationSource::ALL).await;

    assert!(bundle.get(AnnotationSource::EnsemblVep).unwrap().is_error());
    assert!(bundle.get(AnnotationSource::ClinVar).unwrap().is_error());
    assert_eq!(stub.vep_hits(), 1);
    assert_eq!(stub.clinvar_hits(), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let stub = StubUpstream::start(
        StubResponse::flaky(2, brca1_vep_body()),
        StubResponse::flaky(5, brca1_clinvar_body()),
    )
    .await;
    let annotator = Annotator::new(&stub.config()).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    let bundle = annotator.annotate(&variant, &AnnotationSource::ALL).await;

    // Two 503s then success, within the default two retries
    assert!(bundle.get(AnnotationSource::EnsemblVep).unwrap().is_annotated());
    assert_eq!(stub.vep_hits(), 3);

    // Five 503s outlast the retries
    assert_eq!(
        bundle.get(AnnotationSource::ClinVar),
        Some(&AnnotationEntry::Error {
            message: "ClinVar API error: 503".to_string(),
            status_code: Some(503),
        })
    );
    assert_eq!(stub.clinvar_hits(), 3);
}

#[tokio::test]
async fn test_malformed_payload_degrades_only_that_source() {
    let stub = StubUpstream::start(
        StubResponse::ok(json!({"transcript_consequences": "not a list"})),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let annotator = Annotator::new(&stub.config()).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    let bundle = annotator.annotate(&variant, &AnnotationSource::ALL).await;

    match bundle.get(AnnotationSource::EnsemblVep) {
        Some(AnnotationEntry::Error { message, status_code }) => {
            assert!(message.starts_with("Failed to parse VEP REST response"));
            assert_eq!(*status_code, None);
        }
        other => panic!("expected error marker, got {:?}", other),
    }
    assert!(bundle.clinical().is_some());
    assert_eq!(stub.vep_hits(), 1);
}

#[tokio::test]
async fn test_empty_vep_list_is_no_annotation() {
    let stub = StubUpstream::start(
        StubResponse::ok(json!([])),
        StubResponse::ok(json!({})),
    )
    .await;
    let annotator = Annotator::new(&stub.config()).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    let bundle = annotator.annotate(&variant, &AnnotationSource::ALL).await;

    assert_eq!(
        bundle.get(AnnotationSource::EnsemblVep),
        Some(&AnnotationEntry::NoAnnotation)
    );
    let clinical = bundle.clinical().unwrap();
    assert!(clinical.conditions.is_empty());
    assert_eq!(clinical.clinical_significance, None);
}

#[tokio::test]
async fn test_request_timeout_becomes_marker() {
    let stub = StubUpstream::start(
        StubResponse::slow(Duration::from_secs(3), brca1_vep_body()),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let config = variant_annotator::AnnotatorConfig {
        request_timeout_secs: 1,
        max_retries: 0,
        ..stub.config()
    };
    let annotator = Annotator::new(&config).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    let bundle = annotator.annotate(&variant, &AnnotationSource::ALL).await;

    assert_eq!(
        bundle.get(AnnotationSource::EnsemblVep),
        Some(&AnnotationEntry::Error {
            message: "VEP REST request timed out".to_string(),
            status_code: None,
        })
    );
    assert!(bundle.clinical().is_some());
}

#[tokio::test]
async fn test_source_selection_leaves_others_unfetched() {
    let stub = StubUpstream::start(
        StubResponse::ok(brca1_vep_body()),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let annotator = Annotator::new(&stub.config()).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    let bundle = annotator.annotate(&variant, &[AnnotationSource::ClinVar]).await;

    assert_eq!(bundle.len(), 1);
    assert!(bundle.get(AnnotationSource::EnsemblVep).is_none());
    assert_eq!(stub.vep_hits(), 0);
}

#[tokio::test]
async fn test_bearer_tokens_are_sent() {
    let stub = StubUpstream::start(
        StubResponse::ok(brca1_vep_body()),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let config = variant_annotator::AnnotatorConfig {
        ensembl_api_key: Some("vep-token".to_string()),
        ..stub.config()
    };
    let annotator = Annotator::new(&config).unwrap();
    let variant = parse_line(BRCA1_LINE).unwrap().unwrap();

    annotator.annotate(&variant, &AnnotationSource::ALL).await;

    for request in stub.requests() {
        if request.path.starts_with("/vep/") {
            assert_eq!(request.authorization.as_deref(), Some("Bearer vep-token"));
        } else {
            assert_eq!(request.authorization, None);
        }
    }
}

#[tokio::test]
async fn test_rerun_produces_identical_bundles() {
    let stub = StubUpstream::start(
        StubResponse::ok(brca1_vep_body()),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_vcf(
        dir.path(),
        "calls.vcf",
        &[BRCA1_LINE, "2\t500\trs99\tC\tT\t60\tPASS\tDP=12", "X\t900\t.\tG\tA\t.\t.\t."],
    );
    let pipeline = pipeline_for(&stub);

    pipeline.process_file(&input, AnnotationMode::Single).await.unwrap();
    let first: Vec<String> = ["1_12345_A_G", "2_500_C_T", "x_900_G_A"]
        .iter()
        .map(|id| serde_json::to_string(&pipeline.store().get(id).unwrap().annotations).unwrap())
        .collect();

    pipeline.process_file(&input, AnnotationMode::Single).await.unwrap();
    let second: Vec<String> = ["1_12345_A_G", "2_500_C_T", "x_900_G_A"]
        .iter()
        .map(|id| serde_json::to_string(&pipeline.store().get(id).unwrap().annotations).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(pipeline.store().len(), 3);
}

#[tokio::test]
async fn test_bundles_keep_input_order_under_concurrency() {
    let stub = StubUpstream::start(
        StubResponse::ok(brca1_vep_body()),
        StubResponse::ok(brca1_clinvar_body()),
    )
    .await;
    let config = variant_annotator::AnnotatorConfig {
        rest_concurrency: 3,
        ..stub.config()
    };
    let annotator = Annotator::new(&config).unwrap();
    let variants: Vec<_> = (1..=8)
        .map(|pos| parse_line(&format!("1\t{}\t.\tA\tG\t50\tPASS\t.", pos)).unwrap().unwrap())
        .collect();

    let bundles = annotator
        .annotate_all(&variants, AnnotationMode::Single, &[AnnotationSource::EnsemblVep])
        .await
        .unwrap();

    assert_eq!(bundles.len(), 8);
    assert!(bundles.iter().all(|b| b.consequence().is_some()));

    let mut vep_paths: Vec<String> = stub
        .requests()
        .into_iter()
        .map(|r| r.path)
        .filter(|p| p.starts_with("/vep/"))
        .collect();
    vep_paths.sort();
    vep_paths.dedup();
    assert_eq!(vep_paths.len(), 8);
}
