//! CRL data and validation of one CRL against one certificate.
//!
//! A single CRL rarely settles a certificate's status on its own. Issuing
//! distribution points may partition a CA's revocations by reason code, so
//! every CRL that passes the scope and issuer checks contributes its reasons
//! to a per-certificate [`ReasonsMask`] kept in the
//! [`ValidationSession`]. Only when the accumulated mask covers every reason
//! is absence from the CRLs taken as proof of non-revocation.

use super::CrlEvidence;
use crate::builder::ValidatorChain;
use crate::certificate::Certificate;
use crate::context::{CertificateSource, ValidationContext, ValidatorStage};
use crate::report::{ReportItem, ReportItemStatus, ValidationReport, ValidationResult};
use crate::session::ValidationSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub const CRL_CHECK: &str = "CRL response check";

// ============================================================================
// Reasons
// ============================================================================

/// `CRLReason` codes of a revoked entry (RFC 5280 §5.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrlReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

/// Set of `ReasonFlags` (RFC 5280 §4.2.1.13), one bit per flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReasonsMask(u32);

impl ReasonsMask {
    pub const UNUSED: u32 = 1 << 0;
    pub const KEY_COMPROMISE: u32 = 1 << 1;
    pub const CA_COMPROMISE: u32 = 1 << 2;
    pub const AFFILIATION_CHANGED: u32 = 1 << 3;
    pub const SUPERSEDED: u32 = 1 << 4;
    pub const CESSATION_OF_OPERATION: u32 = 1 << 5;
    pub const CERTIFICATE_HOLD: u32 = 1 << 6;
    pub const PRIVILEGE_WITHDRAWN: u32 = 1 << 7;
    pub const AA_COMPROMISE: u32 = 1 << 8;

    /// Every reason flag except `unused`.
    pub const ALL: ReasonsMask = ReasonsMask(0x1FE);

    pub const fn empty() -> Self {
        ReasonsMask(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        ReasonsMask(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn union(self, other: ReasonsMask) -> Self {
        ReasonsMask(self.0 | other.0)
    }

    pub fn contains(self, other: ReasonsMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn covers_all(self) -> bool {
        self.contains(Self::ALL)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ReasonsMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#05x}", self.0)
    }
}

// ============================================================================
// CRL
// ============================================================================

/// One entry of the revoked certificates list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedCertificate {
    pub serial: Vec<u8>,
    pub revocation_date: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<CrlReason>,
}

/// Issuing distribution point extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuingDistributionPoint {
    #[serde(default)]
    pub only_contains_user_certs: bool,
    #[serde(default)]
    pub only_contains_ca_certs: bool,
    #[serde(default)]
    pub only_contains_attribute_certs: bool,
    #[serde(default)]
    pub only_some_reasons: Option<ReasonsMask>,
    #[serde(default)]
    pub indirect_crl: bool,
}

impl IssuingDistributionPoint {
    /// Why the certificate falls outside this partition, if it does.
    pub fn scope_violation(&self, certificate: &Certificate) -> Option<&'static str> {
        if self.only_contains_user_certs && certificate.is_ca() {
            Some("CRL only covers end-entity certificates")
        } else if self.only_contains_ca_certs && !certificate.is_ca() {
            Some("CRL only covers CA certificates")
        } else if self.only_contains_attribute_certs {
            Some("CRL only covers attribute certificates")
        } else {
            None
        }
    }

    /// Reasons this partition covers.
    pub fn reasons(&self) -> ReasonsMask {
        self.only_some_reasons.unwrap_or(ReasonsMask::ALL)
    }
}

/// A decoded certificate revocation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crl {
    pub issuer: String,
    pub this_update: DateTime<Utc>,
    #[serde(default)]
    pub next_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked: Vec<RevokedCertificate>,
    #[serde(default)]
    pub issuing_distribution_point: Option<IssuingDistributionPoint>,
    /// `ExpiredCertsOnCRL` extension date.
    #[serde(default)]
    pub expired_certs_on_crl: Option<DateTime<Utc>>,
    /// Original DER encoding, opaque to pdftrust.
    #[serde(default)]
    pub encoded: Vec<u8>,
}

impl Crl {
    pub fn new(issuer: impl Into<String>, this_update: DateTime<Utc>) -> Self {
        Self {
            issuer: issuer.into(),
            this_update,
            next_update: None,
            revoked: Vec::new(),
            issuing_distribution_point: None,
            expired_certs_on_crl: None,
            encoded: Vec::new(),
        }
    }

    pub fn revoked_entry(&self, serial: &[u8]) -> Option<&RevokedCertificate> {
        self.revoked.iter().find(|r| r.serial == serial)
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Validates one CRL against one certificate.
#[derive(Clone, Copy)]
pub struct CrlValidator<'a> {
    chain: &'a ValidatorChain,
}

impl<'a> CrlValidator<'a> {
    pub(crate) fn new(chain: &'a ValidatorChain) -> Self {
        Self { chain }
    }

    /// Check `certificate` against the CRL in `evidence` at `validation_date`.
    pub fn validate(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        context: ValidationContext,
        certificate: &Certificate,
        evidence: &CrlEvidence,
        validation_date: DateTime<Utc>,
    ) {
        let context = context.with_stage(ValidatorStage::Crl);
        let crl = &evidence.crl;
        let item = |message: String, status| {
            ReportItem::for_certificate(certificate, CRL_CHECK, message, status)
        };

        if certificate.is_self_signed() {
            report.add(item(
                "certificate is self-signed, CRL check is not needed".into(),
                ReportItemStatus::Info,
            ));
            return;
        }

        let freshness = self.chain.properties().freshness(context);
        let stale = crl
            .this_update
            .checked_add_signed(freshness)
            .map(|limit| limit < validation_date)
            .unwrap_or(false);
        if stale {
            report.add(item(
                format!(
                    "CRL issued at {} is not fresh enough for {}",
                    crl.this_update, validation_date
                ),
                ReportItemStatus::Indeterminate,
            ));
            return;
        }

        if let Some(next_update) = crl.next_update {
            if next_update < validation_date {
                report.add(item(
                    format!("CRL next update {} has passed", next_update),
                    ReportItemStatus::Indeterminate,
                ));
                return;
            }
        }

        if certificate.not_after < crl.this_update {
            let covered = crl
                .expired_certs_on_crl
                .map(|d| d <= certificate.not_after)
                .unwrap_or(false);
            if !covered {
                report.add(item(
                    format!(
                        "certificate expired at {} before the CRL was issued",
                        certificate.not_after
                    ),
                    ReportItemStatus::Indeterminate,
                ));
                return;
            }
        }

        let interim_reasons = match &crl.issuing_distribution_point {
            Some(idp) => {
                if let Some(why) = idp.scope_violation(certificate) {
                    report.add(item(
                        format!("certificate is not in the CRL scope: {}", why),
                        ReportItemStatus::Indeterminate,
                    ));
                    return;
                }
                idp.reasons()
            }
            None => ReasonsMask::ALL,
        };

        if !self.verify_crl_issuer(report, session, context, certificate, evidence) {
            return;
        }

        let mut found = false;
        match crl.revoked_entry(&certificate.serial) {
            Some(entry) if entry.reason == Some(CrlReason::RemoveFromCrl) => {
                found = true;
                report.add(item(
                    "certificate was unrevoked (removeFromCRL)".into(),
                    ReportItemStatus::Info,
                ));
            }
            Some(entry) if entry.revocation_date <= validation_date => {
                found = true;
                report.add(item(
                    format!("certificate was revoked at {}", entry.revocation_date),
                    ReportItemStatus::Invalid,
                ));
            }
            Some(entry) => {
                found = true;
                report.add(item(
                    format!(
                        "certificate will be revoked at {}, after the validation date",
                        entry.revocation_date
                    ),
                    ReportItemStatus::Info,
                ));
            }
            None => {}
        }

        let mask = session.add_reasons(certificate.id(), interim_reasons);
        debug!(certificate = %certificate, reasons = %mask, "accumulated CRL reasons");
        if !mask.covers_all() {
            report.add(item(
                "not all reasons covered by the examined CRLs".into(),
                ReportItemStatus::Indeterminate,
            ));
        } else if !found {
            report.add(item(
                "certificate is not revoked according to the CRL".into(),
                ReportItemStatus::Info,
            ));
        }
    }

    /// Find and validate the certificate that signed the CRL.
    fn verify_crl_issuer(
        &self,
        report: &mut ValidationReport,
        session: &mut ValidationSession,
        context: ValidationContext,
        certificate: &Certificate,
        evidence: &CrlEvidence,
    ) -> bool {
        let crl = &evidence.crl;
        let retriever = self.chain.retriever();
        let item = |message: &str| {
            ReportItem::for_certificate(
                certificate,
                CRL_CHECK,
                message,
                ReportItemStatus::Indeterminate,
            )
        };

        let candidates = session.certificates_by_subject(retriever, &crl.issuer);
        if candidates.is_empty() {
            report.add(item("CRL issuer certificate not found"));
            return false;
        }

        let root = session.root_certificate(retriever, certificate);
        let mut root_mismatch = false;
        let mut last_error = None;
        let mut issuer = None;
        for candidate in candidates {
            if session.root_certificate(retriever, &candidate) != root {
                root_mismatch = true;
                continue;
            }
            match self.chain.verifier().verify_crl_signature(crl, &candidate) {
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
                let finding = match last_error {
                    Some(e) => item("CRL signature could not be verified").with_cause(e),
                    None if root_mismatch => {
                        item("CRL issuer does not share a trust root with the certificate")
                    }
                    None => item("CRL signature is not valid"),
                };
                report.add(finding);
                return false;
            }
        };

        let mut sub = ValidationReport::new();
        self.chain.certificate_chain_validator().validate(
            &mut sub,
            session,
            context.with_source(CertificateSource::CrlIssuer),
            &issuer,
            evidence.generation_date,
        );
        if sub.validation_result() == ValidationResult::Valid {
            report.merge(sub);
            true
        } else {
            report.merge_with_status(sub, ReportItemStatus::Info);
            report.add(item("CRL issuer certificate is not valid"));
            false
        }
    }
}
