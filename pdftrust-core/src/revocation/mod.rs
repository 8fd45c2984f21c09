//! Revocation evidence and its validators.
//!
//! ```text
//!                     RevocationDataValidator
//!                    /                       \
//!          OcspValidator                  CrlValidator
//!                    \                       /
//!                 CertificateChainValidator (responder / CRL issuer)
//! ```
//!
//! Evidence is gathered from static sources (pre-registered on the chain,
//! or learned from the document during a session) and from live clients,
//! then evaluated newest first until one piece of evidence gives a
//! determinate answer.

pub mod clients;
pub mod crl;
pub mod ocsp;
pub mod validator;

pub use clients::{CrlClient, OcspClient, ValidationCrlClient, ValidationOcspClient};
pub use crl::{Crl, CrlReason, CrlValidator, IssuingDistributionPoint, ReasonsMask, RevokedCertificate};
pub use ocsp::{
    BasicOcspResponse, OcspCertId, OcspCertStatus, OcspValidator, ResponderId, SingleResponse,
};
pub use validator::RevocationDataValidator;

use crate::context::TimeBasedContext;
use chrono::{DateTime, Utc};

/// One OCSP single response together with the response that carries it.
#[derive(Debug, Clone, PartialEq)]
pub struct OcspEvidence {
    pub response: BasicOcspResponse,
    pub single: SingleResponse,
    /// When the evidence was known to exist.
    pub generation_date: DateTime<Utc>,
    pub time: TimeBasedContext,
}

/// One CRL.
#[derive(Debug, Clone, PartialEq)]
pub struct CrlEvidence {
    pub crl: Crl,
    /// When the evidence was known to exist.
    pub generation_date: DateTime<Utc>,
    pub time: TimeBasedContext,
}

/// A piece of revocation evidence, OCSP or CRL.
#[derive(Debug, Clone, PartialEq)]
pub enum RevocationEvidence {
    Ocsp(OcspEvidence),
    Crl(CrlEvidence),
}

impl RevocationEvidence {
    pub fn this_update(&self) -> DateTime<Utc> {
        match self {
            Self::Ocsp(e) => e.single.this_update,
            Self::Crl(e) => e.crl.this_update,
        }
    }

    pub fn generation_date(&self) -> DateTime<Utc> {
        match self {
            Self::Ocsp(e) => e.generation_date,
            Self::Crl(e) => e.generation_date,
        }
    }

    pub fn time(&self) -> TimeBasedContext {
        match self {
            Self::Ocsp(e) => e.time,
            Self::Crl(e) => e.time,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ocsp(_) => "OCSP",
            Self::Crl(_) => "CRL",
        }
    }
}

/// Sort newest first by `this_update`. Ties keep their gathering order.
pub fn sort_by_recency(evidence: &mut [RevocationEvidence]) {
    evidence.sort_by(|a, b| b.this_update().cmp(&a.this_update()));
}
