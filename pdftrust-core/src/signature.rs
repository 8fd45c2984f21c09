//! Signature validation.
//!
//! Signatures are processed newest first. Each successfully validated
//! document timestamp moves the point of evidence (PoE) back to its
//! generation time, so older signatures are checked at the latest moment
//! they are known to have existed rather than at "now":
//!
//! ```text
//!  rev 1: signature A ──────────── validated at PoE = t(TS2)
//!  rev 2: signature B ──────────── validated at PoE = t(TS2)
//!  rev 3: doc timestamp TS2 ────── validated at PoE = now, then PoE := t(TS2)
//! ```
//!
//! The PoE never moves forward.

use crate::builder::ValidatorChain;
use crate::certificate::Certificate;
use crate::context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorStage};
use crate::document::{SignatureContainer, SignedDocument};
use crate::report::{ReportItem, ReportItemStatus, ValidationReport, ValidationResult};
use crate::session::ValidationSession;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub const SIGNATURE_VERIFICATION: &str = "Signature verification check";
pub const TIMESTAMP_VERIFICATION: &str = "Timestamp verification check";

/// Validates the signatures of a document.
#[derive(Clone, Copy)]
pub struct SignatureValidator<'a> {
    chain: &'a ValidatorChain,
}

impl<'a> SignatureValidator<'a> {
    pub(crate) fn new(chain: &'a ValidatorChain) -> Self {
        Self { chain }
    }

    /// Validate every signature, newest first.
    pub fn validate_signatures(&self, document: &dyn SignedDocument) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut session = ValidationSession::new();
        let now = self.chain.now();
        let mut poe = now;
        self.load_dss(&mut session, document, now);

        let context = ValidationContext::signer();
        let names = document.signature_names();
        info!(signatures = names.len(), "validating document signatures");
        for name in names.iter().rev() {
            self.validate_signature(&mut report, &mut session, document, name, &mut poe);
            if report.validation_result() == ValidationResult::Invalid
                && !self.chain.properties().continue_after_failure(context)
            {
                debug!(signature = %name, "stopping after invalid signature");
                break;
            }
        }
        report
    }

    /// Validate only the most recent signature.
    pub fn validate_latest_signature(&self, document: &dyn SignedDocument) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut session = ValidationSession::new();
        let now = self.chain.now();
        let mut poe = now;
        self.load_dss(&mut session, document, now);

        match document.signature_names().last() {
            Some(name) => {
                self.validate_signature(&mut report, &mut session, document, name, &mut poe)
            }
            None => report.add(ReportItem::new(
                SIGNATURE_VERIFICATION,
                "document contains no signatures",
                ReportItemStatus::Info,
            )),
        }
        report
    }

    fn load_dss(&self, session: &mut ValidationSession, document: &dyn SignedDocument, now: DateTime<Utc>) {
        session.add_known_certificates(document.dss_certificates());
        for response in document.dss_ocsp_responses() {
            session.add_ocsp_response(response, now, TimeBasedContext::Present);
        }
        for crl in document.dss_crls() {
            session.add_crl(crl, now, TimeBasedContext::Present);
        }
    }

    fn validate_signature(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        document: &dyn SignedDocument,
        name: &str,
        poe: &mut DateTime<Utc>,
    ) {
        let context = ValidationContext::signer();
        let container = match document.signature(name) {
            Ok(container) => container,
            Err(e) => {
                warn!(signature = %name, error = %e, "signature could not be read");
                report.add(
                    ReportItem::new(
                        SIGNATURE_VERIFICATION,
                        format!("signature {} could not be read", name),
                        ReportItemStatus::Indeterminate,
                    )
                    .with_cause(e),
                );
                return;
            }
        };

        match container.verify_integrity() {
            Ok(true) => {}
            Ok(false) => report.add(ReportItem::new(
                SIGNATURE_VERIFICATION,
                format!("signature {} is not valid", name),
                ReportItemStatus::Invalid,
            )),
            Err(e) => report.add(
                ReportItem::new(
                    SIGNATURE_VERIFICATION,
                    format!("signature {} could not be verified", name),
                    ReportItemStatus::Invalid,
                )
                .with_cause(e),
            ),
        }

        match document.signature_covers_whole_revision(name) {
            Ok(true) => {}
            Ok(false) => report.add(ReportItem::new(
                SIGNATURE_VERIFICATION,
                format!("signature {} does not cover the entire revision", name),
                ReportItemStatus::Invalid,
            )),
            Err(e) => report.add(
                ReportItem::new(
                    SIGNATURE_VERIFICATION,
                    format!("coverage of signature {} could not be determined", name),
                    ReportItemStatus::Indeterminate,
                )
                .with_cause(e),
            ),
        }

        if report.validation_result() == ValidationResult::Invalid
            && !self.chain.properties().continue_after_failure(context)
        {
            return;
        }

        self.learn_from_container(session, container.as_ref(), *poe);

        if container.is_timestamp() {
            self.validate_document_timestamp(report, session, container.as_ref(), name, poe);
            return;
        }

        let mut signing_date = *poe;
        if let Some(timestamp) = container.embedded_timestamp() {
            match container.verify_timestamp_imprint() {
                Ok(true) => {
                    session.add_known_certificates(timestamp.certificates.clone());
                    let mut sub = ValidationReport::new();
                    self.validate_chain(
                        &mut sub,
                        session,
                        CertificateSource::Timestamp,
                        &timestamp.signing_certificate,
                        *poe,
                    );
                    if sub.validation_result() == ValidationResult::Valid
                        && timestamp.generation_time < signing_date
                    {
                        signing_date = timestamp.generation_time;
                    }
                    report.merge(sub);
                }
                Ok(false) => report.add(ReportItem::new(
                    TIMESTAMP_VERIFICATION,
                    format!("timestamp imprint of signature {} does not match", name),
                    ReportItemStatus::Invalid,
                )),
                Err(e) => report.add(
                    ReportItem::new(
                        TIMESTAMP_VERIFICATION,
                        format!("timestamp imprint of signature {} could not be verified", name),
                        ReportItemStatus::Invalid,
                    )
                    .with_cause(e),
                ),
            }
        }

        match container.signing_certificate() {
            Some(signer) => {
                self.validate_chain(report, session, CertificateSource::Signer, &signer, signing_date)
            }
            None => report.add(ReportItem::new(
                SIGNATURE_VERIFICATION,
                format!("signature {} has no signing certificate", name),
                ReportItemStatus::Indeterminate,
            )),
        }
    }

    fn validate_document_timestamp(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        container: &dyn SignatureContainer,
        name: &str,
        poe: &mut DateTime<Utc>,
    ) {
        let signer = match container.signing_certificate() {
            Some(signer) => signer,
            None => {
                report.add(ReportItem::new(
                    TIMESTAMP_VERIFICATION,
                    format!("document timestamp {} has no signing certificate", name),
                    ReportItemStatus::Indeterminate,
                ));
                return;
            }
        };

        let mut sub = ValidationReport::new();
        self.validate_chain(&mut sub, session, CertificateSource::Timestamp, &signer, *poe);
        if sub.validation_result() == ValidationResult::Valid {
            if let Some(time) = container.timestamp_time() {
                if time < *poe {
                    debug!(timestamp = %name, poe = %time, "point of evidence moved back");
                    *poe = time;
                }
            }
        }
        report.merge(sub);
    }

    fn learn_from_container(
        &self,
        session: &mut ValidationSession,
        container: &dyn SignatureContainer,
        poe: DateTime<Utc>,
    ) {
        let time = TimeBasedContext::for_date(poe, self.chain.now());
        session.add_known_certificates(container.certificates());
        for response in container.ocsp_responses() {
            session.add_ocsp_response(response, poe, time);
        }
        for crl in container.crls() {
            session.add_crl(crl, poe, time);
        }
    }

    fn validate_chain(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        source: CertificateSource,
        certificate: &Certificate,
        date: DateTime<Utc>,
    ) {
        let context = ValidationContext::new(
            ValidatorStage::Signature,
            source,
            TimeBasedContext::for_date(date, self.chain.now()),
        );
        self.chain
            .certificate_chain_validator()
            .validate(report, session, context, certificate, date);
    }
}
