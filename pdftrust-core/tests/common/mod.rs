//! Shared fixtures for the integration tests.
//!
//! Signatures are modelled without cryptography: an object counts as signed
//! by a certificate when its `encoded` bytes equal that certificate's public
//! key. An `encoded` value of [`BROKEN`] makes the verifier fail with an
//! error instead of answering.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use pdftrust::certificate::{CertificateBuilder, KeyUsageBit, OID_OCSP_SIGNING, OID_TIME_STAMPING};
use pdftrust::document::EmbeddedTimestamp;
use pdftrust::pdf::ObjectRef;
use pdftrust::revocation::ResponderId;
use pdftrust::{
    BasicOcspResponse, Certificate, Crl, Error, OcspCertId, OcspCertStatus, PdfDictionary,
    PdfObject, PdfSnapshot, Result, SignatureContainer, SignatureVerifier, SignedDocument,
    SingleResponse, TimeBasedContext, ValidationCrlClient, ValidationOcspClient, ValidatorChain,
    ValidatorChainBuilder,
};
use std::collections::BTreeMap;

pub const BROKEN: &[u8] = b"broken";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

// ============================================================================
// Verifier
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct FakeVerifier;

fn signed_by(encoded: &[u8], signer: &Certificate) -> Result<bool> {
    if encoded == BROKEN {
        return Err(Error::CryptoError("unsupported algorithm".into()));
    }
    Ok(encoded == signer.public_key.as_slice())
}

impl SignatureVerifier for FakeVerifier {
    fn verify_certificate_signature(&self, certificate: &Certificate, issuer: &Certificate) -> Result<bool> {
        signed_by(&certificate.encoded, issuer)
    }

    fn verify_crl_signature(&self, crl: &Crl, issuer: &Certificate) -> Result<bool> {
        signed_by(&crl.encoded, issuer)
    }

    fn verify_ocsp_response_signature(&self, response: &BasicOcspResponse, responder: &Certificate) -> Result<bool> {
        signed_by(&response.encoded, responder)
    }

    fn ocsp_issuer_matches(&self, cert_id: &OcspCertId, issuer: &Certificate) -> Result<bool> {
        Ok(cert_id.issuer_key_hash == issuer.public_key)
    }
}

// ============================================================================
// Certificates
// ============================================================================

/// A certificate issued (signed) by `issuer`.
pub fn issued(subject: &str, issuer: &Certificate, serial: u8) -> CertificateBuilder {
    Certificate::builder(subject, issuer.subject.clone(), vec![serial]).encoded(issuer.public_key.clone())
}

/// Root, intermediate CA, signer, OCSP responder and TSA.
#[derive(Debug, Clone)]
pub struct Pki {
    pub root: Certificate,
    pub ca: Certificate,
    pub leaf: Certificate,
    pub responder: Certificate,
    pub tsa: Certificate,
}

impl Pki {
    pub fn new() -> Self {
        let root = {
            let builder = Certificate::builder("CN=Root", "CN=Root", vec![1])
                .ca(None)
                .key_usage(&[KeyUsageBit::KeyCertSign, KeyUsageBit::CrlSign]);
            let key = builder.clone().build().public_key;
            builder.encoded(key).build()
        };
        let ca = issued("CN=Intermediate", &root, 2)
            .ca(Some(0))
            .key_usage(&[KeyUsageBit::KeyCertSign, KeyUsageBit::CrlSign])
            .build();
        let leaf = issued("CN=Signer", &ca, 3)
            .end_entity()
            .key_usage(&[KeyUsageBit::DigitalSignature, KeyUsageBit::NonRepudiation])
            .build();
        let responder = issued("CN=OCSP Responder", &ca, 4)
            .end_entity()
            .extended_key_usage([OID_OCSP_SIGNING])
            .ocsp_no_check()
            .build();
        let tsa = issued("CN=TSA", &ca, 5)
            .end_entity()
            .extended_key_usage([OID_TIME_STAMPING])
            .build();
        Self {
            root,
            ca,
            leaf,
            responder,
            tsa,
        }
    }

    /// Builder trusting the root and knowing the rest, with "now" fixed.
    pub fn builder(&self) -> ValidatorChainBuilder {
        ValidatorChainBuilder::new()
            .with_trusted_certificates([self.root.clone()])
            .with_known_certificates([self.ca.clone(), self.responder.clone(), self.tsa.clone()])
            .with_signature_verifier(FakeVerifier)
            .with_reference_time(now())
    }

    /// CRLs from root and intermediate listing nothing, issued at `this_update`.
    pub fn clean_crls(&self, this_update: DateTime<Utc>) -> ValidationCrlClient {
        let mut crls = ValidationCrlClient::new();
        crls.add_crl(crl(&self.root, this_update), this_update, TimeBasedContext::Present)
            .add_crl(crl(&self.ca, this_update), this_update, TimeBasedContext::Present);
        crls
    }

    /// A chain where every certificate has fresh, clean CRLs.
    pub fn validating_chain(&self) -> ValidatorChain {
        self.builder()
            .with_crls(self.clean_crls(now() - Duration::hours(1)))
            .build()
            .unwrap()
    }
}

// ============================================================================
// Revocation data
// ============================================================================

/// A CRL signed by `issuer`.
pub fn crl(issuer: &Certificate, this_update: DateTime<Utc>) -> Crl {
    let mut crl = Crl::new(issuer.subject.clone(), this_update);
    crl.encoded = issuer.public_key.clone();
    crl
}

pub fn cert_id(certificate: &Certificate, issuer: &Certificate) -> OcspCertId {
    OcspCertId {
        issuer_name_hash: issuer.subject.as_bytes().to_vec(),
        issuer_key_hash: issuer.public_key.clone(),
        serial: certificate.serial.clone(),
    }
}

/// An OCSP response about `certificate`, signed by `signer`.
pub fn ocsp_response(
    certificate: &Certificate,
    issuer: &Certificate,
    signer: &Certificate,
    status: OcspCertStatus,
    this_update: DateTime<Utc>,
) -> BasicOcspResponse {
    BasicOcspResponse {
        responder_id: ResponderId::ByName(signer.subject.clone()),
        produced_at: this_update,
        responses: vec![SingleResponse {
            cert_id: cert_id(certificate, issuer),
            status,
            this_update,
            next_update: None,
        }],
        certificates: Vec::new(),
        encoded: signer.public_key.clone(),
    }
}

pub fn ocsp_store(responses: impl IntoIterator<Item = BasicOcspResponse>) -> ValidationOcspClient {
    let mut store = ValidationOcspClient::new();
    for response in responses {
        store.add_response(response, now(), TimeBasedContext::Present);
    }
    store
}

// ============================================================================
// Signed documents
// ============================================================================

#[derive(Debug, Clone)]
pub struct FakeSignature {
    pub integrity: std::result::Result<bool, Error>,
    pub covers_whole_revision: bool,
    pub timestamp_time: Option<DateTime<Utc>>,
    pub signer: Option<Certificate>,
    pub certificates: Vec<Certificate>,
    pub embedded_timestamp: Option<EmbeddedTimestamp>,
    pub imprint: std::result::Result<bool, Error>,
    pub ocsp: Vec<BasicOcspResponse>,
    pub crls: Vec<Crl>,
}

impl FakeSignature {
    pub fn signed_by(signer: &Certificate) -> Self {
        Self {
            integrity: Ok(true),
            covers_whole_revision: true,
            timestamp_time: None,
            signer: Some(signer.clone()),
            certificates: Vec::new(),
            embedded_timestamp: None,
            imprint: Ok(true),
            ocsp: Vec::new(),
            crls: Vec::new(),
        }
    }

    pub fn document_timestamp(tsa: &Certificate, time: DateTime<Utc>) -> Self {
        Self {
            timestamp_time: Some(time),
            ..Self::signed_by(tsa)
        }
    }
}

impl SignatureContainer for FakeSignature {
    fn verify_integrity(&self) -> Result<bool> {
        self.integrity.clone()
    }

    fn is_timestamp(&self) -> bool {
        self.timestamp_time.is_some()
    }

    fn signing_certificate(&self) -> Option<Certificate> {
        self.signer.clone()
    }

    fn certificates(&self) -> Vec<Certificate> {
        self.certificates.clone()
    }

    fn timestamp_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp_time
    }

    fn embedded_timestamp(&self) -> Option<EmbeddedTimestamp> {
        self.embedded_timestamp.clone()
    }

    fn verify_timestamp_imprint(&self) -> Result<bool> {
        self.imprint.clone()
    }

    fn ocsp_responses(&self) -> Vec<BasicOcspResponse> {
        self.ocsp.clone()
    }

    fn crls(&self) -> Vec<Crl> {
        self.crls.clone()
    }
}

/// Signatures in document order, oldest first.
#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    pub signatures: Vec<(String, FakeSignature)>,
    pub dss_certificates: Vec<Certificate>,
    pub dss_ocsp: Vec<BasicOcspResponse>,
    pub dss_crls: Vec<Crl>,
}

impl FakeDocument {
    pub fn with(mut self, name: &str, signature: FakeSignature) -> Self {
        self.signatures.push((name.to_string(), signature));
        self
    }

    fn find(&self, name: &str) -> Result<&FakeSignature> {
        self.signatures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
            .ok_or_else(|| Error::SignatureNotFound(name.to_string()))
    }
}

impl SignedDocument for FakeDocument {
    fn signature_names(&self) -> Vec<String> {
        self.signatures.iter().map(|(n, _)| n.clone()).collect()
    }

    fn signature(&self, name: &str) -> Result<Box<dyn SignatureContainer + '_>> {
        Ok(Box::new(self.find(name)?.clone()))
    }

    fn signature_covers_whole_revision(&self, name: &str) -> Result<bool> {
        Ok(self.find(name)?.covers_whole_revision)
    }

    fn dss_ocsp_responses(&self) -> Vec<BasicOcspResponse> {
        self.dss_ocsp.clone()
    }

    fn dss_crls(&self) -> Vec<Crl> {
        self.dss_crls.clone()
    }

    fn dss_certificates(&self) -> Vec<Certificate> {
        self.dss_certificates.clone()
    }
}

// ============================================================================
// PDF snapshots
// ============================================================================

pub fn r(number: u32) -> PdfObject {
    PdfObject::reference(number)
}

pub fn oref(number: u32) -> ObjectRef {
    ObjectRef::new(number, 0)
}

pub fn dict(entries: &[(&str, PdfObject)]) -> PdfObject {
    PdfObject::dict(entries.iter().cloned())
}

pub fn array(items: impl IntoIterator<Item = PdfObject>) -> PdfObject {
    PdfObject::Array(items.into_iter().collect())
}

pub fn dict_of(object: &PdfObject) -> PdfDictionary {
    object.as_dict().cloned().unwrap_or_else(BTreeMap::new)
}

/// Object numbers of the base document.
pub mod objects {
    pub const CATALOG: u32 = 1;
    pub const ACRO_FORM: u32 = 2;
    pub const PAGES: u32 = 3;
    pub const PAGE: u32 = 4;
    pub const TEXT_FIELD: u32 = 5;
    pub const SIG_FIELD: u32 = 6;
    pub const SIG_VALUE: u32 = 7;
    pub const INFO: u32 = 8;
    pub const ANNOTATION: u32 = 9;
}

/// One page, one text field and one unsigned signature field.
pub fn base_document() -> PdfSnapshot {
    use objects::*;
    let mut doc = PdfSnapshot::new();
    doc.set_trailer("Root", r(CATALOG)).set_trailer("Info", r(INFO));
    doc.insert(
        oref(CATALOG),
        dict(&[
            ("Type", PdfObject::name("Catalog")),
            ("AcroForm", r(ACRO_FORM)),
            ("Pages", r(PAGES)),
        ]),
    );
    doc.insert(
        oref(ACRO_FORM),
        dict(&[
            ("Fields", array([r(TEXT_FIELD), r(SIG_FIELD)])),
            ("SigFlags", PdfObject::Integer(3)),
        ]),
    );
    doc.insert(
        oref(PAGES),
        dict(&[
            ("Type", PdfObject::name("Pages")),
            ("Kids", array([r(PAGE)])),
            ("Count", PdfObject::Integer(1)),
        ]),
    );
    doc.insert(
        oref(PAGE),
        dict(&[
            ("Type", PdfObject::name("Page")),
            ("Parent", r(PAGES)),
            (
                "MediaBox",
                array([0, 0, 612, 792].map(PdfObject::Integer)),
            ),
            ("Annots", array([r(TEXT_FIELD), r(SIG_FIELD)])),
        ]),
    );
    doc.insert(
        oref(TEXT_FIELD),
        dict(&[
            ("T", PdfObject::string("name")),
            ("FT", PdfObject::name("Tx")),
            ("Subtype", PdfObject::name("Widget")),
            ("P", r(PAGE)),
        ]),
    );
    doc.insert(oref(SIG_FIELD), signature_field(None));
    doc.insert(oref(INFO), dict(&[("Producer", PdfObject::string("test"))]));
    doc
}

/// The signature field, optionally pointing at a signature value.
pub fn signature_field(value: Option<u32>) -> PdfObject {
    let mut entries = vec![
        ("T", PdfObject::string("Signature1")),
        ("FT", PdfObject::name("Sig")),
        ("Subtype", PdfObject::name("Widget")),
        ("P", r(objects::PAGE)),
    ];
    if let Some(value) = value {
        entries.push(("V", r(value)));
    }
    dict(&entries)
}

/// A signature value whose byte range ends at `eof_offset`.
pub fn signature_value(kind: &str, eof_offset: i64, reference: Option<PdfObject>) -> PdfObject {
    let mut entries = vec![
        ("Type", PdfObject::name(kind)),
        (
            "ByteRange",
            array([0, 100, 200, eof_offset - 200].map(PdfObject::Integer)),
        ),
    ];
    if let Some(reference) = reference {
        entries.push(("Reference", array([reference])));
    }
    dict(&entries)
}

/// A DocMDP transform with permission level `p`.
pub fn doc_mdp(p: i64) -> PdfObject {
    dict(&[
        ("Type", PdfObject::name("SigRef")),
        ("TransformMethod", PdfObject::name("DocMDP")),
        (
            "TransformParams",
            dict(&[
                ("Type", PdfObject::name("TransformParams")),
                ("P", PdfObject::Integer(p)),
            ]),
        ),
    ])
}

/// The base document signed in the revision ending at `eof_offset`.
pub fn signed_document(eof_offset: i64, certification: Option<i64>) -> PdfSnapshot {
    let mut doc = base_document();
    doc.insert(oref(objects::SIG_FIELD), signature_field(Some(objects::SIG_VALUE)));
    doc.insert(
        oref(objects::SIG_VALUE),
        signature_value("Sig", eof_offset, certification.map(doc_mdp)),
    );
    doc
}

/// Replace one entry of an object's dictionary.
pub fn set_entry(doc: &mut PdfSnapshot, number: u32, key: &str, value: PdfObject) {
    let mut entries = doc.get(oref(number)).map(dict_of).unwrap_or_default();
    entries.insert(key.to_string(), value);
    doc.insert(oref(number), PdfObject::Dictionary(entries));
}
