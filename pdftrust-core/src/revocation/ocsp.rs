//! OCSP data and validation of one single response against one certificate.

use super::OcspEvidence;
use crate::builder::ValidatorChain;
use crate::certificate::Certificate;
use crate::context::{CertificateSource, ValidationContext, ValidatorStage};
use crate::report::{ReportItem, ReportItemStatus, ValidationReport, ValidationResult};
use crate::revocation::crl::CrlReason;
use crate::session::ValidationSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const OCSP_CHECK: &str = "OCSP response check";

/// Identifies the certificate a single response is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OcspCertId {
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OcspCertStatus {
    Good,
    Revoked {
        revocation_time: DateTime<Utc>,
        #[serde(default)]
        reason: Option<CrlReason>,
    },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleResponse {
    pub cert_id: OcspCertId,
    pub status: OcspCertStatus,
    pub this_update: DateTime<Utc>,
    #[serde(default)]
    pub next_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderId {
    ByName(String),
    ByKeyHash(Vec<u8>),
}

/// A decoded `BasicOCSPResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicOcspResponse {
    pub responder_id: ResponderId,
    pub produced_at: DateTime<Utc>,
    pub responses: Vec<SingleResponse>,
    /// Certificates shipped with the response, usually the delegated responder.
    pub certificates: Vec<Certificate>,
    /// Original DER encoding, opaque to pdftrust.
    pub encoded: Vec<u8>,
}

impl BasicOcspResponse {
    /// Single responses whose serial number matches the certificate.
    pub fn responses_for<'r>(
        &'r self,
        certificate: &'r Certificate,
    ) -> impl Iterator<Item = &'r SingleResponse> + 'r {
        self.responses
            .iter()
            .filter(move |r| r.cert_id.serial == certificate.serial)
    }
}

/// Validates one OCSP single response against one certificate.
#[derive(Clone, Copy)]
pub struct OcspValidator<'a> {
    chain: &'a ValidatorChain,
}

impl<'a> OcspValidator<'a> {
    pub(crate) fn new(chain: &'a ValidatorChain) -> Self {
        Self { chain }
    }

    /// Check `certificate` against the single response in `evidence` at `validation_date`.
    pub fn validate(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        context: ValidationContext,
        certificate: &Certificate,
        evidence: &OcspEvidence,
        validation_date: DateTime<Utc>,
    ) {
        let context = context.with_stage(ValidatorStage::Ocsp);
        let single = &evidence.single;
        let item = |message: String, status| {
            ReportItem::for_certificate(certificate, OCSP_CHECK, message, status)
        };

        if certificate.is_self_signed() {
            report.add(item(
                "certificate is self-signed, OCSP check is not needed".into(),
                ReportItemStatus::Info,
            ));
            return;
        }

        if single.cert_id.serial != certificate.serial {
            report.add(item(
                "OCSP response serial number does not match the certificate".into(),
                ReportItemStatus::Indeterminate,
            ));
            return;
        }

        let issuer = match self.find_issuer(report, session, certificate, single) {
            Some(issuer) => issuer,
            None => return,
        };

        let freshness = self.chain.properties().freshness(context);
        let stale = validation_date
            .checked_sub_signed(freshness)
            .map(|earliest| single.this_update < earliest)
            .unwrap_or(false);
        if stale {
            report.add(item(
                format!(
                    "OCSP response from {} is not fresh enough for {}",
                    single.this_update, validation_date
                ),
                ReportItemStatus::Indeterminate,
            ));
            return;
        }

        if let Some(next_update) = single.next_update {
            if validation_date > next_update {
                report.add(item(
                    format!("OCSP response next update {} has passed", next_update),
                    ReportItemStatus::Indeterminate,
                ));
                return;
            }
        }

        match &single.status {
            OcspCertStatus::Good => {
                self.verify_responder(report, session, context, certificate, &issuer, evidence);
            }
            OcspCertStatus::Revoked {
                revocation_time, ..
            } if *revocation_time > validation_date => {
                if self.verify_responder(report, session, context, certificate, &issuer, evidence) {
                    report.add(item(
                        format!(
                            "certificate will be revoked at {}, after the validation date",
                            revocation_time
                        ),
                        ReportItemStatus::Info,
                    ));
                }
            }
            OcspCertStatus::Revoked {
                revocation_time, ..
            } => {
                report.add(item(
                    format!("certificate was revoked at {}", revocation_time),
                    ReportItemStatus::Invalid,
                ));
            }
            OcspCertStatus::Unknown => {
                report.add(item(
                    "OCSP responder does not know the certificate".into(),
                    ReportItemStatus::Indeterminate,
                ));
            }
        }
    }

    fn find_issuer(
        &self,
        report: &mut ValidationReport,
        session: &ValidationSession,
        certificate: &Certificate,
        single: &SingleResponse,
    ) -> Option<Certificate> {
        let candidates = session.issuer_candidates(self.chain.retriever(), certificate);
        if candidates.is_empty() {
            report.add(ReportItem::for_certificate(
                certificate,
                OCSP_CHECK,
                "issuer certificate not found, OCSP response cannot be matched",
                ReportItemStatus::Indeterminate,
            ));
            return None;
        }

        let mut last_error = None;
        for candidate in candidates {
            match self
                .chain
                .verifier()
                .ocsp_issuer_matches(&single.cert_id, &candidate)
            {
                Ok(true) => return Some(candidate),
                Ok(false) => {}
                Err(e) => last_error = Some(e),
            }
        }

        let mut finding = ReportItem::for_certificate(
            certificate,
            OCSP_CHECK,
            "OCSP response issuer hashes do not match the certificate issuer",
            ReportItemStatus::Indeterminate,
        );
        if let Some(e) = last_error {
            finding = finding.with_cause(e);
        }
        report.add(finding);
        None
    }

    /// Establish that the response comes from an authorized responder.
    fn verify_responder(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        context: ValidationContext,
        certificate: &Certificate,
        issuer: &Certificate,
        evidence: &OcspEvidence,
    ) -> bool {
        let response = &evidence.response;
        let verifier = self.chain.verifier();
        let retriever = self.chain.retriever();
        let item = |message: &str, status| {
            ReportItem::for_certificate(certificate, OCSP_CHECK, message, status)
        };

        match verifier.verify_ocsp_response_signature(response, issuer) {
            Ok(true) => {
                report.add(item(
                    "OCSP response is signed by the certificate issuer",
                    ReportItemStatus::Info,
                ));
                return true;
            }
            Ok(false) => {}
            Err(e) => debug!(error = %e, "issuer signature check on OCSP response failed"),
        }

        let mut candidates: Vec<Certificate> = response.certificates.clone();
        if let ResponderId::ByName(name) = &response.responder_id {
            for cert in session.certificates_by_subject(retriever, name) {
                if !candidates.contains(&cert) {
                    candidates.push(cert);
                }
            }
        }

        let mut last_error = None;
        let mut responder = None;
        for candidate in candidates.into_iter().filter(|c| c != issuer) {
            match verifier.verify_ocsp_response_signature(response, &candidate) {
                Ok(true) => {
                    responder = Some(candidate);
                    break;
                }
                Ok(false) => {}
                Err(e) => last_error = Some(e),
            }
        }

        let responder = match responder {
            Some(responder) => responder,
            None => {
                let mut finding = item(
                    "OCSP response signature could not be verified",
                    ReportItemStatus::Indeterminate,
                );
                if let Some(e) = last_error {
                    finding = finding.with_cause(e);
                }
                report.add(finding);
                return false;
            }
        };

        if retriever
            .trust_roles(&responder)
            .iter()
            .any(|r| r.applies_to(CertificateSource::OcspIssuer))
        {
            report.add(item(
                "OCSP response is signed by a trusted responder",
                ReportItemStatus::Info,
            ));
            return true;
        }

        let delegated = if responder.issuer == issuer.subject {
            match verifier.verify_certificate_signature(&responder, issuer) {
                Ok(valid) => valid,
                Err(e) => {
                    warn!(responder = %responder, error = %e, "responder certificate signature check failed");
                    report.add(
                        item(
                            "OCSP responder certificate signature could not be verified",
                            ReportItemStatus::Indeterminate,
                        )
                        .with_cause(e),
                    );
                    return false;
                }
            }
        } else {
            false
        };
        if !delegated {
            report.add(item(
                "OCSP responder is not authorized by the certificate issuer",
                ReportItemStatus::Indeterminate,
            ));
            return false;
        }

        let mut sub = ValidationReport::new();
        self.chain.certificate_chain_validator().validate(
            &mut sub,
            session,
            context.with_source(CertificateSource::OcspIssuer),
            &responder,
            evidence.generation_date,
        );
        if sub.validation_result() == ValidationResult::Valid {
            report.merge(sub);
            report.add(item(
                "OCSP response is signed by a delegated responder",
                ReportItemStatus::Info,
            ));
            true
        } else {
            report.merge_with_status(sub, ReportItemStatus::Info);
            report.add(item(
                "OCSP responder certificate is not valid",
                ReportItemStatus::Indeterminate,
            ));
            false
        }
    }
}
