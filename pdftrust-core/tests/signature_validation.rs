//! Document signature validation tests.
//!
//! Tests cover:
//! - Integrity and revision coverage of each signature
//! - Point of evidence moved back by document timestamps
//! - Embedded signature timestamps
//! - Certificates and revocation data from the DSS

mod common;

use chrono::{DateTime, Duration, Utc};
use common::*;
use pdftrust::document::EmbeddedTimestamp;
use pdftrust::signature::{SIGNATURE_VERIFICATION, TIMESTAMP_VERIFICATION};
use pdftrust::{
    Certificate, ContextSelector, Error, OcspCertStatus, ReportItemStatus,
    SignatureValidationProperties, ValidationResult, ValidatorChainBuilder,
};

fn expired_signer(pki: &Pki) -> Certificate {
    issued("CN=Former Employee", &pki.ca, 12)
        .validity(now() - Duration::days(400), now() - Duration::days(10))
        .build()
}

fn timestamp_time() -> DateTime<Utc> {
    now() - Duration::days(20)
}

// ============================================================================
// Single signatures
// ============================================================================

#[test]
fn test_valid_signature() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let document = FakeDocument::default().with("Signature1", FakeSignature::signed_by(&pki.leaf));

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{:#?}", report);
}

#[test]
fn test_broken_integrity_is_invalid() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let mut signature = FakeSignature::signed_by(&pki.leaf);
    signature.integrity = Ok(false);
    let document = FakeDocument::default().with("Signature1", signature);

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
    assert!(report
        .failures()
        .any(|i| i.check == SIGNATURE_VERIFICATION && i.message.contains("is not valid")));
}

#[test]
fn test_integrity_error_is_invalid_with_cause() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let mut signature = FakeSignature::signed_by(&pki.leaf);
    signature.integrity = Err(Error::SignatureContainer("truncated".into()));
    let document = FakeDocument::default().with("Signature1", signature);

    let report = chain.signature_validator().validate_signatures(&document);
    let item = report.failures().next().expect("failure");
    assert_eq!(item.status, ReportItemStatus::Invalid);
    assert!(item.cause.is_some());
}

#[test]
fn test_partial_coverage_is_invalid() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let mut signature = FakeSignature::signed_by(&pki.leaf);
    signature.covers_whole_revision = false;
    let document = FakeDocument::default().with("Signature1", signature);

    let report = chain.signature_validator().validate_signatures(&document);
    assert!(report.contains(ReportItemStatus::Invalid, "does not cover the entire revision"));
}

#[test]
fn test_missing_signing_certificate_is_indeterminate() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let mut signature = FakeSignature::signed_by(&pki.leaf);
    signature.signer = None;
    let document = FakeDocument::default().with("Signature1", signature);

    let report = chain.signature_validator().validate_signatures(&document);
    assert!(report.contains(ReportItemStatus::Indeterminate, "no signing certificate"));
}

#[test]
fn test_unsigned_document() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let document = FakeDocument::default();

    assert!(chain.signature_validator().validate_signatures(&document).is_empty());
    let report = chain.signature_validator().validate_latest_signature(&document);
    assert_eq!(report.items().len(), 1);
    assert!(report.contains(ReportItemStatus::Info, "no signatures"));
}

// ============================================================================
// Point of evidence
// ============================================================================

#[test]
fn test_expired_signer_without_timestamp_is_invalid() {
    let pki = Pki::new();
    let chain = pki.builder().with_crls(pki.clean_crls(timestamp_time())).build().unwrap();
    let document =
        FakeDocument::default().with("Signature1", FakeSignature::signed_by(&expired_signer(&pki)));

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
    assert!(report.contains(ReportItemStatus::Invalid, "expired"));
}

#[test]
fn test_document_timestamp_moves_point_of_evidence() {
    let pki = Pki::new();
    let chain = pki.builder().with_crls(pki.clean_crls(timestamp_time())).build().unwrap();
    let document = FakeDocument::default()
        .with("Signature1", FakeSignature::signed_by(&expired_signer(&pki)))
        .with(
            "Timestamp1",
            FakeSignature::document_timestamp(&pki.tsa, timestamp_time()),
        );

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{:#?}", report);
}

#[test]
fn test_untrusted_document_timestamp_does_not_move_point_of_evidence() {
    let pki = Pki::new();
    let rogue_tsa = Certificate::builder("CN=Rogue TSA", "CN=Rogue TSA", vec![66])
        .extended_key_usage([pdftrust::certificate::OID_TIME_STAMPING])
        .build();
    let chain = pki.builder().with_crls(pki.clean_crls(timestamp_time())).build().unwrap();
    let document = FakeDocument::default()
        .with("Signature1", FakeSignature::signed_by(&expired_signer(&pki)))
        .with(
            "Timestamp1",
            FakeSignature::document_timestamp(&rogue_tsa, timestamp_time()),
        );

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Invalid);
    assert!(report.contains(ReportItemStatus::Indeterminate, "self-signed and not trusted"));
}

#[test]
fn test_embedded_timestamp_sets_signing_date() {
    let pki = Pki::new();
    let chain = pki.builder().with_crls(pki.clean_crls(timestamp_time())).build().unwrap();
    let mut signature = FakeSignature::signed_by(&expired_signer(&pki));
    signature.embedded_timestamp = Some(EmbeddedTimestamp {
        signing_certificate: pki.tsa.clone(),
        generation_time: timestamp_time(),
        certificates: Vec::new(),
    });
    let document = FakeDocument::default().with("Signature1", signature);

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{:#?}", report);
}

#[test]
fn test_embedded_timestamp_with_bad_imprint_is_invalid() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let mut signature = FakeSignature::signed_by(&pki.leaf);
    signature.embedded_timestamp = Some(EmbeddedTimestamp {
        signing_certificate: pki.tsa.clone(),
        generation_time: timestamp_time(),
        certificates: Vec::new(),
    });
    signature.imprint = Ok(false);
    let document = FakeDocument::default().with("Signature1", signature);

    let report = chain.signature_validator().validate_signatures(&document);
    assert!(report
        .failures()
        .any(|i| i.check == TIMESTAMP_VERIFICATION && i.status == ReportItemStatus::Invalid));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_stop_after_invalid_signature() {
    let pki = Pki::new();
    let mut properties = SignatureValidationProperties::new();
    properties.set_continue_after_failure(ContextSelector::any(), false);
    let chain = pki
        .builder()
        .with_properties(properties)
        .with_crls(pki.clean_crls(now() - Duration::hours(1)))
        .build()
        .unwrap();
    let mut broken = FakeSignature::signed_by(&pki.leaf);
    broken.integrity = Ok(false);
    let document = FakeDocument::default()
        .with("Signature1", FakeSignature::signed_by(&pki.leaf))
        .with("Signature2", broken);

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.items().len(), 1);
    assert!(report.items()[0].message.contains("Signature2"));
}

#[test]
fn test_latest_signature_only() {
    let pki = Pki::new();
    let chain = pki.validating_chain();
    let mut broken = FakeSignature::signed_by(&pki.leaf);
    broken.integrity = Ok(false);
    let document = FakeDocument::default()
        .with("Signature1", broken)
        .with("Signature2", FakeSignature::signed_by(&pki.leaf));

    let report = chain.signature_validator().validate_latest_signature(&document);
    assert_eq!(report.validation_result(), ValidationResult::Valid);
}

// ============================================================================
// Document security store
// ============================================================================

fn root_only_builder(pki: &Pki) -> ValidatorChainBuilder {
    ValidatorChainBuilder::new()
        .with_trusted_certificates([pki.root.clone()])
        .with_signature_verifier(FakeVerifier)
        .with_reference_time(now())
}

#[test]
fn test_dss_supplies_intermediate_and_revocation_data() {
    let pki = Pki::new();
    let chain = root_only_builder(&pki).build().unwrap();
    let fresh = now() - Duration::hours(1);
    let mut document = FakeDocument::default().with("Signature1", FakeSignature::signed_by(&pki.leaf));

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Indeterminate);

    document.dss_certificates = vec![pki.ca.clone()];
    document.dss_ocsp = vec![
        ocsp_response(&pki.leaf, &pki.ca, &pki.ca, OcspCertStatus::Good, fresh),
        ocsp_response(&pki.ca, &pki.root, &pki.root, OcspCertStatus::Good, fresh),
    ];
    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{:#?}", report);
}

#[test]
fn test_embedded_revocation_data_is_used() {
    let pki = Pki::new();
    let chain = root_only_builder(&pki).build().unwrap();
    let mut signature = FakeSignature::signed_by(&pki.leaf);
    signature.certificates = vec![pki.ca.clone()];
    signature.crls = vec![
        crl(&pki.ca, now() - Duration::hours(1)),
        crl(&pki.root, now() - Duration::hours(1)),
    ];
    let document = FakeDocument::default().with("Signature1", signature);

    let report = chain.signature_validator().validate_signatures(&document);
    assert_eq!(report.validation_result(), ValidationResult::Valid, "{:#?}", report);
}
