//! Assembly of the validator graph.
//!
//! The validators call each other recursively: the chain validator asks the
//! revocation validator about every link, which dispatches to the OCSP and
//! CRL validators, which in turn chain-validate responders and CRL issuers.
//! Rather than wiring them to each other, every validator borrows one
//! [`ValidatorChain`] holding the shared, read-only collaborators and asks
//! it for the next validator when needed. Mutable state travels separately
//! in a [`ValidationSession`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let chain = ValidatorChainBuilder::new()
//!     .with_trusted_certificates([root.clone()])
//!     .with_known_certificates([intermediate.clone()])
//!     .with_signature_verifier(MyVerifier::default())
//!     .with_crl_client(HttpCrlClient::new())
//!     .build()?;
//!
//! let report = chain.validate_certificate(ValidationContext::signer(), &leaf, Utc::now());
//! assert_eq!(report.validation_result(), ValidationResult::Valid);
//! ```

use crate::certificate::Certificate;
use crate::chain::CertificateChainValidator;
use crate::context::{CertificateSource, TimeBasedContext, ValidationContext};
use crate::crypto::SignatureVerifier;
use crate::error::{Error, Result};
use crate::properties::SignatureValidationProperties;
use crate::report::ValidationReport;
use crate::revocation::crl::CrlValidator;
use crate::revocation::ocsp::OcspValidator;
use crate::revocation::{
    CrlClient, OcspClient, RevocationDataValidator, ValidationCrlClient, ValidationOcspClient,
};
use crate::session::ValidationSession;
use crate::signature::SignatureValidator;
use crate::trust::{CertificateRetriever, IssuingCertificateRetriever, TrustedCertificatesStore};
use chrono::{DateTime, Utc};

/// Builder for [`ValidatorChain`].
#[derive(Default)]
pub struct ValidatorChainBuilder {
    properties: SignatureValidationProperties,
    trust_store: TrustedCertificatesStore,
    known_certificates: Vec<Certificate>,
    retriever: Option<Box<dyn CertificateRetriever>>,
    verifier: Option<Box<dyn SignatureVerifier>>,
    static_ocsp: ValidationOcspClient,
    static_crls: ValidationCrlClient,
    ocsp_clients: Vec<Box<dyn OcspClient>>,
    crl_clients: Vec<Box<dyn CrlClient>>,
    reference_time: Option<DateTime<Utc>>,
}

impl ValidatorChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(mut self, properties: SignatureValidationProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Replace the trust store.
    pub fn with_trust_store(mut self, store: TrustedCertificatesStore) -> Self {
        self.trust_store = store;
        self
    }

    /// Trust certificates for every role.
    pub fn with_trusted_certificates(mut self, certificates: impl IntoIterator<Item = Certificate>) -> Self {
        self.trust_store.add_generally_trusted(certificates);
        self
    }

    /// Make certificates available as issuer candidates without trusting them.
    pub fn with_known_certificates(mut self, certificates: impl IntoIterator<Item = Certificate>) -> Self {
        self.known_certificates.extend(certificates);
        self
    }

    /// Use a custom retriever instead of the one built from the trust store
    /// and known certificates.
    pub fn with_certificate_retriever(mut self, retriever: impl CertificateRetriever + 'static) -> Self {
        self.retriever = Some(Box::new(retriever));
        self
    }

    pub fn with_signature_verifier(mut self, verifier: impl SignatureVerifier + 'static) -> Self {
        self.verifier = Some(Box::new(verifier));
        self
    }

    /// Pre-registered OCSP responses.
    pub fn with_ocsp_responses(mut self, responses: ValidationOcspClient) -> Self {
        self.static_ocsp = responses;
        self
    }

    /// Pre-registered CRLs.
    pub fn with_crls(mut self, crls: ValidationCrlClient) -> Self {
        self.static_crls = crls;
        self
    }

    /// Live OCSP source, used according to the online fetching policy.
    pub fn with_ocsp_client(mut self, client: impl OcspClient + 'static) -> Self {
        self.ocsp_clients.push(Box::new(client));
        self
    }

    /// Live CRL source, used according to the online fetching policy.
    pub fn with_crl_client(mut self, client: impl CrlClient + 'static) -> Self {
        self.crl_clients.push(Box::new(client));
        self
    }

    /// Fix "now" instead of reading the system clock.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    pub fn build(self) -> Result<ValidatorChain> {
        let verifier = self
            .verifier
            .ok_or_else(|| Error::MissingField("signature verifier".into()))?;
        if let Err(errors) = self.properties.validate() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(Error::Config(messages.join("; ")));
        }

        let retriever: Box<dyn CertificateRetriever> = match self.retriever {
            Some(retriever) => retriever,
            None => {
                let mut retriever = IssuingCertificateRetriever::new(self.trust_store);
                retriever.add_known_certificates(self.known_certificates);
                Box::new(retriever)
            }
        };

        Ok(ValidatorChain {
            properties: self.properties,
            retriever,
            verifier,
            static_ocsp: self.static_ocsp,
            static_crls: self.static_crls,
            ocsp_clients: self.ocsp_clients,
            crl_clients: self.crl_clients,
            reference_time: self.reference_time,
        })
    }
}

/// Shared collaborators of one validator configuration.
///
/// Immutable once built; can be shared between threads and reused for any
/// number of validations.
pub struct ValidatorChain {
    properties: SignatureValidationProperties,
    retriever: Box<dyn CertificateRetriever>,
    verifier: Box<dyn SignatureVerifier>,
    static_ocsp: ValidationOcspClient,
    static_crls: ValidationCrlClient,
    ocsp_clients: Vec<Box<dyn OcspClient>>,
    crl_clients: Vec<Box<dyn CrlClient>>,
    reference_time: Option<DateTime<Utc>>,
}

impl ValidatorChain {
    pub fn properties(&self) -> &SignatureValidationProperties {
        &self.properties
    }

    pub fn retriever(&self) -> &dyn CertificateRetriever {
        self.retriever.as_ref()
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    pub fn static_ocsp(&self) -> &ValidationOcspClient {
        &self.static_ocsp
    }

    pub fn static_crls(&self) -> &ValidationCrlClient {
        &self.static_crls
    }

    pub fn ocsp_clients(&self) -> impl Iterator<Item = &dyn OcspClient> {
        self.ocsp_clients.iter().map(|c| c.as_ref())
    }

    pub fn crl_clients(&self) -> impl Iterator<Item = &dyn CrlClient> {
        self.crl_clients.iter().map(|c| c.as_ref())
    }

    /// Reference time, or the system clock if none was fixed.
    pub fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    pub fn certificate_chain_validator(&self) -> CertificateChainValidator<'_> {
        CertificateChainValidator::new(self)
    }

    pub fn revocation_data_validator(&self) -> RevocationDataValidator<'_> {
        RevocationDataValidator::new(self)
    }

    pub fn ocsp_validator(&self) -> OcspValidator<'_> {
        OcspValidator::new(self)
    }

    pub fn crl_validator(&self) -> CrlValidator<'_> {
        CrlValidator::new(self)
    }

    pub fn signature_validator(&self) -> SignatureValidator<'_> {
        SignatureValidator::new(self)
    }

    /// Validate one certificate in a fresh session.
    ///
    /// The time perspective of `context` is replaced by the one implied by
    /// `validation_date`.
    pub fn validate_certificate(
        &self,
        context: ValidationContext,
        certificate: &Certificate,
        validation_date: DateTime<Utc>,
    ) -> ValidationReport {
        let context = context.with_time(TimeBasedContext::for_date(validation_date, self.now()));
        let mut report = ValidationReport::new();
        let mut session = ValidationSession::new();
        self.certificate_chain_validator().validate(
            &mut report,
            &mut session,
            context,
            certificate,
            validation_date,
        );
        report
    }

    /// Validate a certificate taken straight from the trust store.
    pub fn validate_trusted_certificate(
        &self,
        certificate: &Certificate,
        validation_date: DateTime<Utc>,
    ) -> ValidationReport {
        self.validate_certificate(
            ValidationContext::signer().with_source(CertificateSource::Trusted),
            certificate,
            validation_date,
        )
    }
}
