//! Per-call validation state.
//!
//! Everything a validation run accumulates lives in a [`ValidationSession`]
//! that the caller creates and passes down by `&mut`: the reason masks of
//! examined CRLs, the certificates currently being chain-validated, and the
//! certificates and revocation data learned from the document. Nothing is
//! shared between sessions, so independent validations never interfere.

use crate::certificate::{Certificate, CertificateId};
use crate::revocation::crl::{Crl, ReasonsMask};
use crate::revocation::ocsp::BasicOcspResponse;
use crate::revocation::{ValidationCrlClient, ValidationOcspClient};
use crate::context::TimeBasedContext;
use crate::trust::{CertificateRetriever, TrustRole};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct ValidationSession {
    reasons: HashMap<CertificateId, ReasonsMask>,
    active: Vec<CertificateId>,
    known_certificates: Vec<Certificate>,
    ocsp: ValidationOcspClient,
    crls: ValidationCrlClient,
}

impl ValidationSession {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Reason masks
    // ------------------------------------------------------------------------

    /// Reasons covered so far for a certificate.
    pub fn reasons_mask(&self, id: &CertificateId) -> ReasonsMask {
        self.reasons.get(id).copied().unwrap_or_default()
    }

    /// Add reasons for a certificate and return the accumulated mask.
    pub fn add_reasons(&mut self, id: CertificateId, reasons: ReasonsMask) -> ReasonsMask {
        let mask = self.reasons.entry(id).or_default();
        *mask = mask.union(reasons);
        *mask
    }

    // ------------------------------------------------------------------------
    // Chain loop guard
    // ------------------------------------------------------------------------

    pub fn is_active(&self, id: &CertificateId) -> bool {
        self.active.contains(id)
    }

    /// Mark a certificate as being validated. Returns `false` if it already is.
    pub fn enter(&mut self, id: CertificateId) -> bool {
        if self.is_active(&id) {
            return false;
        }
        self.active.push(id);
        true
    }

    pub fn leave(&mut self, id: &CertificateId) {
        if let Some(pos) = self.active.iter().rposition(|a| a == id) {
            self.active.remove(pos);
        }
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    // ------------------------------------------------------------------------
    // Learned data
    // ------------------------------------------------------------------------

    pub fn add_known_certificates(&mut self, certificates: impl IntoIterator<Item = Certificate>) {
        for cert in certificates {
            if !self.known_certificates.contains(&cert) {
                self.known_certificates.push(cert);
            }
        }
    }

    pub fn known_certificates(&self) -> &[Certificate] {
        &self.known_certificates
    }

    pub fn add_ocsp_response(
        &mut self,
        response: BasicOcspResponse,
        generation_date: DateTime<Utc>,
        time: TimeBasedContext,
    ) {
        self.add_known_certificates(response.certificates.clone());
        self.ocsp.add_response(response, generation_date, time);
    }

    pub fn add_crl(&mut self, crl: Crl, generation_date: DateTime<Utc>, time: TimeBasedContext) {
        self.crls.add_crl(crl, generation_date, time);
    }

    pub fn ocsp_store(&self) -> &ValidationOcspClient {
        &self.ocsp
    }

    pub fn crl_store(&self) -> &ValidationCrlClient {
        &self.crls
    }

    // ------------------------------------------------------------------------
    // Retrieval including learned certificates
    // ------------------------------------------------------------------------

    pub fn issuer_candidates(
        &self,
        retriever: &dyn CertificateRetriever,
        certificate: &Certificate,
    ) -> Vec<Certificate> {
        self.retriever(retriever)
            .retrieve_issuer_certificates(certificate)
    }

    pub fn certificates_by_subject(
        &self,
        retriever: &dyn CertificateRetriever,
        subject: &str,
    ) -> Vec<Certificate> {
        self.retriever(retriever).certificates_by_subject(subject)
    }

    pub fn root_certificate(
        &self,
        retriever: &dyn CertificateRetriever,
        certificate: &Certificate,
    ) -> Certificate {
        self.retriever(retriever).root_certificate(certificate)
    }

    fn retriever<'a>(&'a self, inner: &'a dyn CertificateRetriever) -> SessionRetriever<'a> {
        SessionRetriever {
            inner,
            known: &self.known_certificates,
        }
    }
}

/// A retriever that also sees the certificates learned in a session.
struct SessionRetriever<'a> {
    inner: &'a dyn CertificateRetriever,
    known: &'a [Certificate],
}

impl CertificateRetriever for SessionRetriever<'_> {
    fn certificates_by_subject(&self, subject: &str) -> Vec<Certificate> {
        let mut found = self.inner.certificates_by_subject(subject);
        for cert in self.known.iter().filter(|c| c.subject == subject) {
            if !found.contains(cert) {
                found.push(cert.clone());
            }
        }
        found
    }

    fn trust_roles(&self, certificate: &Certificate) -> BTreeSet<TrustRole> {
        self.inner.trust_roles(certificate)
    }

    fn retrieve_issuer_certificates(&self, certificate: &Certificate) -> Vec<Certificate> {
        let mut found = self.inner.retrieve_issuer_certificates(certificate);
        for cert in self.known.iter().filter(|c| c.subject == certificate.issuer) {
            if !found.contains(cert) {
                found.push(cert.clone());
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::IssuingCertificateRetriever;

    #[test]
    fn test_reasons_accumulate_per_certificate() {
        let a = Certificate::builder("CN=A", "CN=CA", vec![1]).build().id();
        let b = Certificate::builder("CN=B", "CN=CA", vec![2]).build().id();
        let mut session = ValidationSession::new();

        let key = ReasonsMask::from_bits(ReasonsMask::KEY_COMPROMISE);
        assert_eq!(session.add_reasons(a.clone(), key), key);
        assert_eq!(session.add_reasons(a.clone(), key), key);
        assert!(session.reasons_mask(&b).is_empty());
        assert!(session.add_reasons(a, ReasonsMask::ALL).covers_all());
    }

    #[test]
    fn test_loop_guard() {
        let id = Certificate::builder("CN=A", "CN=CA", vec![1]).build().id();
        let mut session = ValidationSession::new();
        assert!(session.enter(id.clone()));
        assert!(!session.enter(id.clone()));
        session.leave(&id);
        assert_eq!(session.depth(), 0);
        assert!(session.enter(id));
    }

    #[test]
    fn test_learned_certificates_become_candidates() {
        let ca = Certificate::builder("CN=CA", "CN=Root", vec![1]).build();
        let leaf = Certificate::builder("CN=Leaf", "CN=CA", vec![2]).build();
        let retriever = IssuingCertificateRetriever::default();
        let mut session = ValidationSession::new();
        assert!(session.issuer_candidates(&retriever, &leaf).is_empty());

        session.add_known_certificates([ca.clone(), ca.clone()]);
        assert_eq!(session.known_certificates().len(), 1);
        assert_eq!(session.issuer_candidates(&retriever, &leaf), vec![ca.clone()]);
        assert_eq!(session.root_certificate(&retriever, &leaf), ca);
    }
}
