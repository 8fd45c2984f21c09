//! Cryptographic primitives consumed by the validators.
//!
//! pdftrust performs no signature math itself. A [`SignatureVerifier`] is
//! plugged into the [`ValidatorChainBuilder`](crate::builder::ValidatorChainBuilder)
//! and answers the four questions the validators ask. Implementations return
//! `Ok(false)` for a signature that does not verify and `Err` when the
//! question could not be answered at all (unsupported algorithm, broken
//! encoding); the validators treat the two differently only in the cause they
//! attach to the report item.

use crate::certificate::Certificate;
use crate::error::Result;
use crate::revocation::crl::Crl;
use crate::revocation::ocsp::{BasicOcspResponse, OcspCertId};

/// Signature verification backend.
pub trait SignatureVerifier: Send + Sync {
    /// Whether `certificate` carries a valid signature by `issuer`'s key.
    fn verify_certificate_signature(&self, certificate: &Certificate, issuer: &Certificate) -> Result<bool>;

    /// Whether `crl` carries a valid signature by `issuer`'s key.
    fn verify_crl_signature(&self, crl: &Crl, issuer: &Certificate) -> Result<bool>;

    /// Whether `response` carries a valid signature by `responder`'s key.
    fn verify_ocsp_response_signature(
        &self,
        response: &BasicOcspResponse,
        responder: &Certificate,
    ) -> Result<bool>;

    /// Whether the issuer name and key hashes of `cert_id` were computed from `issuer`.
    fn ocsp_issuer_matches(&self, cert_id: &OcspCertId, issuer: &Certificate) -> Result<bool>;
}
