//! Revocation status of one certificate from all available evidence.

use super::{sort_by_recency, CrlEvidence, OcspEvidence, RevocationEvidence};
use crate::builder::ValidatorChain;
use crate::certificate::Certificate;
use crate::context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorStage};
use crate::properties::OnlineFetching;
use crate::report::{ReportItem, ReportItemStatus, ValidationReport, ValidationResult};
use crate::session::ValidationSession;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub const REVOCATION_DATA_CHECK: &str = "Revocation data check";

/// Gathers OCSP and CRL evidence for a certificate and evaluates it newest first.
#[derive(Clone, Copy)]
pub struct RevocationDataValidator<'a> {
    chain: &'a ValidatorChain,
}

impl<'a> RevocationDataValidator<'a> {
    pub(crate) fn new(chain: &'a ValidatorChain) -> Self {
        Self { chain }
    }

    pub fn validate(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        context: ValidationContext,
        certificate: &Certificate,
        validation_date: DateTime<Utc>,
    ) {
        let context = context.with_stage(ValidatorStage::Revocation);
        let info = |message: &str| {
            ReportItem::for_certificate(
                certificate,
                REVOCATION_DATA_CHECK,
                message,
                ReportItemStatus::Info,
            )
        };

        if certificate.is_self_signed() {
            report.add(info("certificate is self-signed, revocation check is not needed"));
            return;
        }
        if context.source == CertificateSource::OcspIssuer && certificate.ocsp_no_check {
            report.add(info(
                "OCSP responder certificate carries id-pkix-ocsp-nocheck, revocation check is not needed",
            ));
            return;
        }
        if certificate.validity_assured_short_term {
            report.add(info(
                "certificate is a validity-assured short-term certificate, revocation check is not needed",
            ));
            return;
        }

        let mut evidence = self.static_evidence(session, certificate);
        let fetch_online = match self.chain.properties().online_fetching(context) {
            OnlineFetching::Always => true,
            OnlineFetching::IfNoOtherData => evidence.is_empty(),
            OnlineFetching::Never => false,
        };
        if fetch_online {
            evidence.extend(self.online_evidence(report, session, certificate));
        }

        sort_by_recency(&mut evidence);
        debug!(
            certificate = %certificate,
            count = evidence.len(),
            online = fetch_online,
            "evaluating revocation evidence"
        );

        for piece in &evidence {
            let sub_context = context.with_time(piece.time());
            let mut sub = ValidationReport::new();
            match piece {
                RevocationEvidence::Ocsp(ocsp) => self.chain.ocsp_validator().validate(
                    &mut sub,
                    session,
                    sub_context,
                    certificate,
                    ocsp,
                    validation_date,
                ),
                RevocationEvidence::Crl(crl) => self.chain.crl_validator().validate(
                    &mut sub,
                    session,
                    sub_context,
                    certificate,
                    crl,
                    validation_date,
                ),
            }
            if sub.validation_result() != ValidationResult::Indeterminate {
                report.merge(sub);
                return;
            }
            report.merge_with_status(sub, ReportItemStatus::Info);
        }

        report.add(ReportItem::for_certificate(
            certificate,
            REVOCATION_DATA_CHECK,
            "no revocation data available to determine the certificate status",
            ReportItemStatus::Indeterminate,
        ));
    }

    fn static_evidence(
        &self,
        session: &ValidationSession,
        certificate: &Certificate,
    ) -> Vec<RevocationEvidence> {
        let mut evidence = self.chain.static_ocsp().evidence_for(certificate);
        evidence.extend(self.chain.static_crls().evidence_for(certificate));
        for piece in session
            .ocsp_store()
            .evidence_for(certificate)
            .into_iter()
            .chain(session.crl_store().evidence_for(certificate))
        {
            if !evidence.contains(&piece) {
                evidence.push(piece);
            }
        }
        evidence
    }

    fn online_evidence(
        &self,
        report: &mut ValidationReport,
        session: &ValidationSession,
        certificate: &Certificate,
    ) -> Vec<RevocationEvidence> {
        let now = self.chain.now();
        let mut evidence = Vec::new();

        let issuer = session
            .issuer_candidates(self.chain.retriever(), certificate)
            .into_iter()
            .next();
        match &issuer {
            Some(issuer) => {
                for client in self.chain.ocsp_clients() {
                    match client.fetch(certificate, issuer) {
                        Ok(Some(response)) => {
                            for single in response.responses_for(certificate) {
                                evidence.push(RevocationEvidence::Ocsp(OcspEvidence {
                                    response: response.clone(),
                                    single: single.clone(),
                                    generation_date: now,
                                    time: TimeBasedContext::Present,
                                }));
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(certificate = %certificate, error = %e, "OCSP fetch failed");
                            report.add(
                                ReportItem::for_certificate(
                                    certificate,
                                    REVOCATION_DATA_CHECK,
                                    "OCSP response could not be fetched",
                                    ReportItemStatus::Info,
                                )
                                .with_cause(e),
                            );
                        }
                    }
                }
            }
            None => debug!(certificate = %certificate, "no issuer known, skipping OCSP fetch"),
        }

        for client in self.chain.crl_clients() {
            match client.fetch(certificate) {
                Ok(crls) => evidence.extend(crls.into_iter().map(|crl| {
                    RevocationEvidence::Crl(CrlEvidence {
                        crl,
                        generation_date: now,
                        time: TimeBasedContext::Present,
                    })
                })),
                Err(e) => {
                    warn!(certificate = %certificate, error = %e, "CRL fetch failed");
                    report.add(
                        ReportItem::for_certificate(
                            certificate,
                            REVOCATION_DATA_CHECK,
                            "CRL could not be fetched",
                            ReportItemStatus::Info,
                        )
                        .with_cause(e),
                    );
                }
            }
        }

        evidence
    }
}
