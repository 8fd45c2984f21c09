//! Revocation data sources.
//!
//! [`OcspClient`] and [`CrlClient`] are the live sources, typically backed
//! by an HTTP stack the caller owns. [`ValidationOcspClient`] and
//! [`ValidationCrlClient`] hold evidence that is already at hand, such as
//! responses embedded in the document, together with the date the evidence
//! was known to exist.

use super::{CrlEvidence, OcspEvidence, RevocationEvidence};
use crate::certificate::Certificate;
use crate::context::TimeBasedContext;
use crate::error::Result;
use crate::revocation::crl::Crl;
use crate::revocation::ocsp::BasicOcspResponse;
use chrono::{DateTime, Utc};

/// Live OCSP source.
pub trait OcspClient: Send + Sync {
    /// Ask a responder about `certificate`. `Ok(None)` means no responder.
    fn fetch(&self, certificate: &Certificate, issuer: &Certificate) -> Result<Option<BasicOcspResponse>>;
}

/// Live CRL source.
pub trait CrlClient: Send + Sync {
    /// Download the CRLs that may cover `certificate`.
    fn fetch(&self, certificate: &Certificate) -> Result<Vec<Crl>>;
}

#[derive(Debug, Clone)]
struct StoredOcspResponse {
    response: BasicOcspResponse,
    generation_date: DateTime<Utc>,
    time: TimeBasedContext,
}

/// Pre-registered OCSP responses.
#[derive(Debug, Clone, Default)]
pub struct ValidationOcspClient {
    responses: Vec<StoredOcspResponse>,
}

impl ValidationOcspClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(
        &mut self,
        response: BasicOcspResponse,
        generation_date: DateTime<Utc>,
        time: TimeBasedContext,
    ) -> &mut Self {
        if !self.responses.iter().any(|s| s.response == response) {
            self.responses.push(StoredOcspResponse {
                response,
                generation_date,
                time,
            });
        }
        self
    }

    /// One evidence entry per single response about `certificate`.
    pub fn evidence_for(&self, certificate: &Certificate) -> Vec<RevocationEvidence> {
        self.responses
            .iter()
            .flat_map(|stored| {
                stored.response.responses_for(certificate).map(move |single| {
                    RevocationEvidence::Ocsp(OcspEvidence {
                        response: stored.response.clone(),
                        single: single.clone(),
                        generation_date: stored.generation_date,
                        time: stored.time,
                    })
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl OcspClient for ValidationOcspClient {
    fn fetch(&self, certificate: &Certificate, _issuer: &Certificate) -> Result<Option<BasicOcspResponse>> {
        Ok(self
            .responses
            .iter()
            .find(|s| s.response.responses_for(certificate).next().is_some())
            .map(|s| s.response.clone()))
    }
}

#[derive(Debug, Clone)]
struct StoredCrl {
    crl: Crl,
    generation_date: DateTime<Utc>,
    time: TimeBasedContext,
}

/// Pre-registered CRLs.
#[derive(Debug, Clone, Default)]
pub struct ValidationCrlClient {
    crls: Vec<StoredCrl>,
}

impl ValidationCrlClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_crl(&mut self, crl: Crl, generation_date: DateTime<Utc>, time: TimeBasedContext) -> &mut Self {
        if !self.crls.iter().any(|s| s.crl == crl) {
            self.crls.push(StoredCrl {
                crl,
                generation_date,
                time,
            });
        }
        self
    }

    /// CRLs issued under the name that issued `certificate`.
    pub fn evidence_for(&self, certificate: &Certificate) -> Vec<RevocationEvidence> {
        self.crls
            .iter()
            .filter(|s| s.crl.issuer == certificate.issuer)
            .map(|s| {
                RevocationEvidence::Crl(CrlEvidence {
                    crl: s.crl.clone(),
                    generation_date: s.generation_date,
                    time: s.time,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.crls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crls.is_empty()
    }
}

impl CrlClient for ValidationCrlClient {
    fn fetch(&self, certificate: &Certificate) -> Result<Vec<Crl>> {
        Ok(self
            .crls
            .iter()
            .filter(|s| s.crl.issuer == certificate.issuer)
            .map(|s| s.crl.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::ocsp::{OcspCertId, OcspCertStatus, ResponderId, SingleResponse};

    #[test]
    fn test_crl_store_filters_by_issuer_and_dedups() {
        let now = Utc::now();
        let leaf = Certificate::builder("CN=Leaf", "CN=CA", vec![7]).build();
        let mut store = ValidationCrlClient::new();
        store
            .add_crl(Crl::new("CN=CA", now), now, TimeBasedContext::Present)
            .add_crl(Crl::new("CN=CA", now), now, TimeBasedContext::Present)
            .add_crl(Crl::new("CN=Other", now), now, TimeBasedContext::Present);
        assert_eq!(store.len(), 2);
        assert_eq!(store.evidence_for(&leaf).len(), 1);
        assert_eq!(store.fetch(&leaf).unwrap().len(), 1);
    }

    #[test]
    fn test_ocsp_store_yields_one_entry_per_matching_single() {
        let now = Utc::now();
        let leaf = Certificate::builder("CN=Leaf", "CN=CA", vec![7]).build();
        let single = |serial: u8| SingleResponse {
            cert_id: OcspCertId {
                issuer_name_hash: vec![],
                issuer_key_hash: vec![],
                serial: vec![serial],
            },
            status: OcspCertStatus::Good,
            this_update: now,
            next_update: None,
        };
        let response = BasicOcspResponse {
            responder_id: ResponderId::ByName("CN=CA".into()),
            produced_at: now,
            responses: vec![single(7), single(8)],
            certificates: vec![],
            encoded: vec![],
        };
        let mut store = ValidationOcspClient::new();
        store.add_response(response, now, TimeBasedContext::Historical);
        let evidence = store.evidence_for(&leaf);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].time(), TimeBasedContext::Historical);
        assert!(store.fetch(&leaf, &leaf).unwrap().is_some());
    }
}
