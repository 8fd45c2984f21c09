//! Validation context.
//!
//! Every validator call carries a [`ValidationContext`]: which validator is
//! running, in which role the certificate at hand is being used, and whether
//! the validation looks at the present or at a point in the past. The context
//! is used to look up configuration in
//! [`SignatureValidationProperties`](crate::properties::SignatureValidationProperties)
//! and to decide whether a trust-store entry applies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which validator is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStage {
    Signature,
    CertificateChain,
    Revocation,
    Ocsp,
    Crl,
}

/// Role of the certificate being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateSource {
    /// Signed the document.
    Signer,
    /// Issued another certificate in the chain.
    CertIssuer,
    /// Signed a CRL.
    CrlIssuer,
    /// Signed an OCSP response.
    OcspIssuer,
    /// Signed a timestamp token.
    Timestamp,
    /// Came straight from the trust store.
    Trusted,
}

/// Time perspective of a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasedContext {
    Present,
    Historical,
}

impl TimeBasedContext {
    /// `Historical` when `date` lies before `now`.
    pub fn for_date(date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if date < now {
            Self::Historical
        } else {
            Self::Present
        }
    }
}

/// Immutable `{stage, source, time}` tuple threaded through validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidationContext {
    pub stage: ValidatorStage,
    pub source: CertificateSource,
    pub time: TimeBasedContext,
}

impl ValidationContext {
    pub fn new(stage: ValidatorStage, source: CertificateSource, time: TimeBasedContext) -> Self {
        Self {
            stage,
            source,
            time,
        }
    }

    /// Context for validating a signer certificate in the present.
    pub fn signer() -> Self {
        Self::new(
            ValidatorStage::Signature,
            CertificateSource::Signer,
            TimeBasedContext::Present,
        )
    }

    pub fn with_stage(self, stage: ValidatorStage) -> Self {
        Self { stage, ..self }
    }

    pub fn with_source(self, source: CertificateSource) -> Self {
        Self { source, ..self }
    }

    pub fn with_time(self, time: TimeBasedContext) -> Self {
        Self { time, ..self }
    }
}

impl fmt::Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}/{:?}", self.stage, self.source, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_contexts_compose() {
        let ctx = ValidationContext::signer()
            .with_stage(ValidatorStage::CertificateChain)
            .with_source(CertificateSource::CertIssuer);
        assert_eq!(ctx.stage, ValidatorStage::CertificateChain);
        assert_eq!(ctx.source, CertificateSource::CertIssuer);
        assert_eq!(ctx.time, TimeBasedContext::Present);
    }

    #[test]
    fn test_time_based_context() {
        let now = Utc::now();
        assert_eq!(
            TimeBasedContext::for_date(now - Duration::days(1), now),
            TimeBasedContext::Historical
        );
        assert_eq!(TimeBasedContext::for_date(now, now), TimeBasedContext::Present);
    }
}
