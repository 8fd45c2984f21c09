//! # pdftrust
//!
//! Trust-chain, revocation and incremental-revision validation for signed
//! PDF documents.
//!
//! The library answers two questions about a signed document:
//!
//! - **Is every signature backed by a trusted, unrevoked certificate chain
//!   at the time it was made?** The [`SignatureValidator`] walks signatures
//!   newest first, moving the point of evidence back with every document
//!   timestamp, and hands each signer to the [`CertificateChainValidator`],
//!   which consults OCSP responses and CRLs through the
//!   [`RevocationDataValidator`].
//! - **Were the revisions written after signing allowed?** The
//!   [`DocumentRevisionsValidator`] diffs consecutive revisions under the
//!   DocMDP/FieldMDP permissions in force.
//!
//! Both produce a [`ValidationReport`]: an ordered log of INFO,
//! INDETERMINATE and INVALID findings whose worst status is the result.
//!
//! Parsing (DER, CMS, PDF bytes) and cryptography are out of scope. Callers
//! provide decoded [`Certificate`]s, [`Crl`]s, [`BasicOcspResponse`]s and
//! [`PdfSnapshot`]s, and a [`SignatureVerifier`] for the math.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pdftrust::{ValidatorChainBuilder, ValidationContext, ValidationResult};
//!
//! let chain = ValidatorChainBuilder::new()
//!     .with_trusted_certificates([root])
//!     .with_known_certificates([intermediate])
//!     .with_signature_verifier(verifier)
//!     .build()?;
//!
//! let report = chain.validate_certificate(ValidationContext::signer(), &leaf, chain.now());
//! if report.validation_result() != ValidationResult::Valid {
//!     for item in report.failures() {
//!         eprintln!("{}", item);
//!     }
//! }
//! ```

pub mod builder;
pub mod certificate;
pub mod chain;
pub mod context;
pub mod crypto;
pub mod document;
pub mod error;
pub mod pdf;
pub mod properties;
pub mod report;
pub mod revisions;
pub mod revocation;
pub mod session;
pub mod signature;
pub mod trust;

pub use builder::{ValidatorChain, ValidatorChainBuilder};
pub use certificate::{
    BasicConstraints, Certificate, CertificateBuilder, CertificateExtension, CertificateId,
    KeyUsage, KeyUsageBit,
};
pub use chain::CertificateChainValidator;
pub use context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorStage};
pub use crypto::SignatureVerifier;
pub use document::{
    DocumentHistory, DocumentRevision, EmbeddedTimestamp, InMemoryHistory, SignatureContainer,
    SignedDocument, XrefEntry,
};
pub use error::{Error, ErrorKind, Result};
pub use pdf::{ObjectRef, PdfDictionary, PdfObject, PdfSnapshot, PdfStream};
pub use properties::{
    ConfigError, ContextSelector, OnlineFetching, SignatureValidationProperties,
};
pub use report::{ReportItem, ReportItemStatus, ValidationReport, ValidationResult};
pub use revisions::{AccessPermissions, DocumentRevisionsValidator};
pub use revocation::{
    BasicOcspResponse, Crl, CrlClient, CrlReason, OcspCertId, OcspCertStatus, OcspClient,
    ReasonsMask, RevocationDataValidator, SingleResponse, ValidationCrlClient,
    ValidationOcspClient,
};
pub use session::ValidationSession;
pub use signature::SignatureValidator;
pub use trust::{
    CertificateRetriever, IssuingCertificateRetriever, TrustRole, TrustedCertificatesStore,
};
