//! Trust store and issuer retrieval.
//!
//! A [`TrustedCertificatesStore`] records, per certificate, the roles it is
//! trusted for. The classification says nothing about the context a
//! certificate is currently used in; the chain validator decides whether a
//! role applies via [`TrustRole::applies_to`].
//!
//! ```text
//! role        | applies to source
//! ------------+---------------------------
//! General     | every source
//! Ca          | CertIssuer
//! Ocsp        | OcspIssuer
//! Crl         | CrlIssuer
//! Timestamp   | Timestamp
//! ```

use crate::certificate::{Certificate, CertificateId};
use crate::context::CertificateSource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Capacity a trust-store entry vouches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustRole {
    General,
    Ca,
    Timestamp,
    Ocsp,
    Crl,
}

impl TrustRole {
    /// Whether this role makes a certificate trusted in the given role.
    pub fn applies_to(self, source: CertificateSource) -> bool {
        matches!(
            (self, source),
            (TrustRole::General, _)
                | (_, CertificateSource::Trusted)
                | (TrustRole::Ca, CertificateSource::CertIssuer)
                | (TrustRole::Ocsp, CertificateSource::OcspIssuer)
                | (TrustRole::Crl, CertificateSource::CrlIssuer)
                | (TrustRole::Timestamp, CertificateSource::Timestamp)
        )
    }
}

impl fmt::Display for TrustRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::General => "general",
            Self::Ca => "ca",
            Self::Timestamp => "timestamp",
            Self::Ocsp => "ocsp",
            Self::Crl => "crl",
        })
    }
}

#[derive(Debug, Clone)]
struct TrustEntry {
    certificate: Certificate,
    roles: BTreeSet<TrustRole>,
}

/// Certificates trusted for one or more [`TrustRole`]s.
#[derive(Debug, Clone, Default)]
pub struct TrustedCertificatesStore {
    entries: HashMap<CertificateId, TrustEntry>,
}

impl TrustedCertificatesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust a certificate for a role. Roles accumulate.
    pub fn add(&mut self, certificate: Certificate, role: TrustRole) -> &mut Self {
        self.entries
            .entry(certificate.id())
            .or_insert_with(|| TrustEntry {
                certificate,
                roles: BTreeSet::new(),
            })
            .roles
            .insert(role);
        self
    }

    pub fn add_generally_trusted(&mut self, certificates: impl IntoIterator<Item = Certificate>) -> &mut Self {
        for cert in certificates {
            self.add(cert, TrustRole::General);
        }
        self
    }

    pub fn add_ca_trusted(&mut self, certificates: impl IntoIterator<Item = Certificate>) -> &mut Self {
        for cert in certificates {
            self.add(cert, TrustRole::Ca);
        }
        self
    }

    pub fn add_timestamp_trusted(&mut self, certificates: impl IntoIterator<Item = Certificate>) -> &mut Self {
        for cert in certificates {
            self.add(cert, TrustRole::Timestamp);
        }
        self
    }

    pub fn add_ocsp_trusted(&mut self, certificates: impl IntoIterator<Item = Certificate>) -> &mut Self {
        for cert in certificates {
            self.add(cert, TrustRole::Ocsp);
        }
        self
    }

    pub fn add_crl_trusted(&mut self, certificates: impl IntoIterator<Item = Certificate>) -> &mut Self {
        for cert in certificates {
            self.add(cert, TrustRole::Crl);
        }
        self
    }

    /// Roles the certificate is trusted for. Empty if untrusted.
    pub fn roles(&self, certificate: &Certificate) -> BTreeSet<TrustRole> {
        self.entries
            .get(&certificate.id())
            .map(|e| e.roles.clone())
            .unwrap_or_default()
    }

    pub fn is_trusted_for(&self, certificate: &Certificate, role: TrustRole) -> bool {
        self.entries
            .get(&certificate.id())
            .map(|e| e.roles.contains(&role))
            .unwrap_or(false)
    }

    /// Trusted certificates with the given subject.
    pub fn certificates_by_subject(&self, subject: &str) -> Vec<Certificate> {
        let mut found: Vec<Certificate> = self
            .entries
            .values()
            .filter(|e| e.certificate.subject == subject)
            .map(|e| e.certificate.clone())
            .collect();
        found.sort_by(|a, b| a.id().cmp(&b.id()));
        found
    }

    pub fn certificates(&self) -> impl Iterator<Item = &Certificate> {
        self.entries.values().map(|e| &e.certificate)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves issuers and trust classification for certificates.
pub trait CertificateRetriever: Send + Sync {
    /// Every certificate known to this retriever with the given subject.
    fn certificates_by_subject(&self, subject: &str) -> Vec<Certificate>;

    /// Roles the certificate is trusted for.
    fn trust_roles(&self, certificate: &Certificate) -> BTreeSet<TrustRole>;

    /// Candidate issuers of `certificate`, most preferred first.
    fn retrieve_issuer_certificates(&self, certificate: &Certificate) -> Vec<Certificate> {
        self.certificates_by_subject(&certificate.issuer)
    }

    /// Root of the issuer chain of `certificate`.
    ///
    /// Follows the first candidate issuer until a self-signed certificate, a
    /// certificate without known issuer, or a loop is reached.
    fn root_certificate(&self, certificate: &Certificate) -> Certificate {
        let mut current = certificate.clone();
        let mut visited = HashSet::new();
        visited.insert(current.id());
        while !current.is_self_signed() {
            let next = self
                .retrieve_issuer_certificates(&current)
                .into_iter()
                .find(|c| !visited.contains(&c.id()));
            match next {
                Some(issuer) => {
                    visited.insert(issuer.id());
                    current = issuer;
                }
                None => break,
            }
        }
        current
    }
}

/// Default retriever over a trust store plus a pool of known certificates.
///
/// Trusted certificates are preferred as issuer candidates.
#[derive(Debug, Clone, Default)]
pub struct IssuingCertificateRetriever {
    trusted: TrustedCertificatesStore,
    known: Vec<Certificate>,
}

impl IssuingCertificateRetriever {
    pub fn new(trusted: TrustedCertificatesStore) -> Self {
        Self {
            trusted,
            known: Vec::new(),
        }
    }

    /// Make certificates available as issuer candidates without trusting them.
    pub fn add_known_certificates(&mut self, certificates: impl IntoIterator<Item = Certificate>) {
        for cert in certificates {
            if !self.known.contains(&cert) {
                self.known.push(cert);
            }
        }
    }

    pub fn trust_store(&self) -> &TrustedCertificatesStore {
        &self.trusted
    }
}

impl CertificateRetriever for IssuingCertificateRetriever {
    fn certificates_by_subject(&self, subject: &str) -> Vec<Certificate> {
        let mut found = self.trusted.certificates_by_subject(subject);
        for cert in self.known.iter().filter(|c| c.subject == subject) {
            if !found.contains(cert) {
                found.push(cert.clone());
            }
        }
        found
    }

    fn trust_roles(&self, certificate: &Certificate) -> BTreeSet<TrustRole> {
        self.trusted.roles(certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(subject: &str, issuer: &str, serial: u8) -> Certificate {
        Certificate::builder(subject, issuer, vec![serial]).build()
    }

    #[test]
    fn test_role_mapping() {
        assert!(TrustRole::General.applies_to(CertificateSource::Signer));
        assert!(TrustRole::Ca.applies_to(CertificateSource::CertIssuer));
        assert!(!TrustRole::Ca.applies_to(CertificateSource::OcspIssuer));
        assert!(TrustRole::Ocsp.applies_to(CertificateSource::OcspIssuer));
        assert!(!TrustRole::Timestamp.applies_to(CertificateSource::Signer));
        assert!(TrustRole::Crl.applies_to(CertificateSource::Trusted));
    }

    #[test]
    fn test_roles_accumulate() {
        let root = cert("CN=Root", "CN=Root", 1);
        let mut store = TrustedCertificatesStore::new();
        store
            .add_ca_trusted([root.clone()])
            .add_crl_trusted([root.clone()]);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.roles(&root).into_iter().collect::<Vec<_>>(),
            vec![TrustRole::Ca, TrustRole::Crl]
        );
        assert!(!store.is_trusted_for(&root, TrustRole::General));
    }

    #[test]
    fn test_root_walk() {
        let root = cert("CN=Root", "CN=Root", 1);
        let inter = cert("CN=Inter", "CN=Root", 2);
        let leaf = cert("CN=Leaf", "CN=Inter", 3);

        let mut store = TrustedCertificatesStore::new();
        store.add_generally_trusted([root.clone()]);
        let mut retriever = IssuingCertificateRetriever::new(store);
        retriever.add_known_certificates([inter.clone()]);

        assert_eq!(retriever.retrieve_issuer_certificates(&leaf), vec![inter]);
        assert_eq!(retriever.root_certificate(&leaf), root);
    }

    #[test]
    fn test_root_walk_terminates_on_loop() {
        let a = cert("CN=A", "CN=B", 1);
        let b = cert("CN=B", "CN=A", 2);
        let mut retriever = IssuingCertificateRetriever::default();
        retriever.add_known_certificates([a.clone(), b.clone()]);
        let root = retriever.root_certificate(&a);
        assert_eq!(root, b);
    }
}
