//! Certificate chain validation.
//!
//! Walks from a certificate towards a trust anchor, one link per call:
//!
//! ```text
//! validity period ─► required extensions ─► trusted? ──yes──► done (INFO)
//!                                              │ no
//!                                              ▼
//!                         self-signed? ──yes──► INDETERMINATE
//!                                              │ no
//!                                              ▼
//!                 revocation ─► issuer lookup ─► signature ─► recurse (CertIssuer)
//! ```
//!
//! Trust and failure both terminate the walk. A certificate that shows up
//! again while its own validation is still in progress is reported as a
//! circular chain instead of being followed.

use crate::builder::ValidatorChain;
use crate::certificate::Certificate;
use crate::context::{CertificateSource, ValidationContext, ValidatorStage};
use crate::report::{ReportItem, ReportItemStatus, ValidationReport, ValidationResult};
use crate::session::ValidationSession;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub const VALIDITY_CHECK: &str = "Certificate validity period check";
pub const EXTENSIONS_CHECK: &str = "Required certificate extensions check";
pub const TRUST_CHECK: &str = "Certificate trust check";
pub const ISSUER_CHECK: &str = "Certificate issuer check";

/// Validates a certificate and, recursively, its issuers.
#[derive(Clone, Copy)]
pub struct CertificateChainValidator<'a> {
    chain: &'a ValidatorChain,
}

impl<'a> CertificateChainValidator<'a> {
    pub(crate) fn new(chain: &'a ValidatorChain) -> Self {
        Self { chain }
    }

    /// Validate `certificate` in the role given by `context` at `validation_date`.
    pub fn validate(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        context: ValidationContext,
        certificate: &Certificate,
        validation_date: DateTime<Utc>,
    ) {
        let context = context.with_stage(ValidatorStage::CertificateChain);
        let id = certificate.id();
        if !session.enter(id.clone()) {
            warn!(certificate = %certificate, "circular certificate chain");
            report.add(ReportItem::for_certificate(
                certificate,
                ISSUER_CHECK,
                "circular certificate chain, certificate is already being validated",
                ReportItemStatus::Indeterminate,
            ));
            return;
        }
        debug!(
            certificate = %certificate,
            context = %context,
            depth = session.depth(),
            "validating certificate"
        );
        self.validate_link(report, session, context, certificate, validation_date);
        session.leave(&id);
    }

    fn validate_link(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        context: ValidationContext,
        certificate: &Certificate,
        validation_date: DateTime<Utc>,
    ) {
        let properties = self.chain.properties();
        let retriever = self.chain.retriever();

        if validation_date < certificate.not_before {
            report.add(ReportItem::for_certificate(
                certificate,
                VALIDITY_CHECK,
                format!(
                    "certificate is not yet valid at {} (valid from {})",
                    validation_date, certificate.not_before
                ),
                ReportItemStatus::Invalid,
            ));
        } else if validation_date > certificate.not_after {
            report.add(ReportItem::for_certificate(
                certificate,
                VALIDITY_CHECK,
                format!(
                    "certificate expired at {}, before {}",
                    certificate.not_after, validation_date
                ),
                ReportItemStatus::Invalid,
            ));
        }

        for extension in properties.required_extensions(context) {
            if !extension.is_satisfied_by(certificate) {
                report.add(ReportItem::for_certificate(
                    certificate,
                    EXTENSIONS_CHECK,
                    format!(
                        "required extension {} is missing for a {:?} certificate",
                        extension, context.source
                    ),
                    ReportItemStatus::Invalid,
                ));
            }
        }

        if self.should_stop(report, context) {
            return;
        }

        let roles = retriever.trust_roles(certificate);
        if roles.iter().any(|r| r.applies_to(context.source)) {
            report.add(ReportItem::for_certificate(
                certificate,
                TRUST_CHECK,
                "certificate is trusted, no further checks are needed",
                ReportItemStatus::Info,
            ));
            return;
        }
        if !roles.is_empty() {
            let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
            report.add(ReportItem::for_certificate(
                certificate,
                TRUST_CHECK,
                format!(
                    "certificate is trusted for {}, but is used as {:?}",
                    roles.join(", "),
                    context.source
                ),
                ReportItemStatus::Info,
            ));
        }

        if certificate.is_self_signed() {
            report.add(ReportItem::for_certificate(
                certificate,
                TRUST_CHECK,
                "certificate is self-signed and not trusted",
                ReportItemStatus::Indeterminate,
            ));
            return;
        }

        self.chain.revocation_data_validator().validate(
            report,
            session,
            context,
            certificate,
            validation_date,
        );
        if self.should_stop(report, context) {
            return;
        }

        let candidates = session.issuer_candidates(retriever, certificate);
        if candidates.is_empty() {
            report.add(ReportItem::for_certificate(
                certificate,
                ISSUER_CHECK,
                format!("issuer certificate {} not found", certificate.issuer),
                ReportItemStatus::Indeterminate,
            ));
            return;
        }

        let mut last_error = None;
        let mut issuer = None;
        for candidate in candidates {
            match self
                .chain
                .verifier()
                .verify_certificate_signature(certificate, &candidate)
            {
                Ok(true) => {
                    issuer = Some(candidate);
                    break;
                }
                Ok(false) => {}
                Err(e) => last_error = Some(e),
            }
        }

        let issuer = match issuer {
            Some(issuer) => issuer,
            None => {
                let mut item = ReportItem::for_certificate(
                    certificate,
                    ISSUER_CHECK,
                    "certificate signature does not verify against any issuer candidate",
                    ReportItemStatus::Invalid,
                );
                if let Some(e) = last_error {
                    item = item.with_cause(e);
                }
                report.add(item);
                return;
            }
        };

        self.validate(
            report,
            session,
            context.with_source(CertificateSource::CertIssuer),
            &issuer,
            validation_date,
        );
    }

    fn should_stop(&self, report: &ValidationReport, context: ValidationContext) -> bool {
        report.validation_result() == ValidationResult::Invalid
            && !self.chain.properties().continue_after_failure(context)
    }
}
