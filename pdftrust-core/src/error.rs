//! Error types for pdftrust.
//!
//! Validators never return these errors to their callers. They are produced
//! by collaborators (revocation clients, the cryptographic verifier, document
//! access) and caught at the point of use, where they become the `cause` of a
//! [`ReportItem`](crate::report::ReportItem). The only fallible public entry
//! points are configuration loading and [`ValidatorChainBuilder::build`].
//!
//! [`ValidatorChainBuilder::build`]: crate::builder::ValidatorChainBuilder::build

use thiserror::Error;

/// Result type alias for pdftrust operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`], used when an error is rendered into a
/// validation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or transport problem while fetching revocation data.
    Fetch,
    /// A cryptographic primitive failed or could not be evaluated.
    Crypto,
    /// A document revision could not be read.
    DocumentIo,
    /// Collaborator handed back data that does not make sense.
    Malformed,
    /// Builder or configuration problem.
    Setup,
}

impl ErrorKind {
    /// Machine-readable name (kebab-case).
    pub fn name(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Crypto => "crypto",
            Self::DocumentIo => "document-io",
            Self::Malformed => "malformed",
            Self::Setup => "setup",
        }
    }
}

/// Errors that can occur while talking to validation collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Revocation data sources
    // =========================================================================
    /// An OCSP responder could not be reached or returned an error.
    #[error("OCSP fetch failed: {0}")]
    OcspFetchFailed(String),

    /// A CRL distribution point could not be reached or returned an error.
    #[error("CRL fetch failed: {0}")]
    CrlFetchFailed(String),

    // =========================================================================
    // Cryptographic primitives
    // =========================================================================
    /// Signature verification could not be performed.
    #[error("cryptographic error: {0}")]
    CryptoError(String),

    /// The signature container could not be decoded or verified.
    #[error("signature container error: {0}")]
    SignatureContainer(String),

    /// The embedded timestamp token could not be decoded or verified.
    #[error("timestamp token error: {0}")]
    TimestampToken(String),

    // =========================================================================
    // Document access
    // =========================================================================
    /// A revision or signature could not be read from the document.
    #[error("document read error: {0}")]
    DocumentIo(String),

    /// The requested signature does not exist in the document.
    #[error("signature not found: {0}")]
    SignatureNotFound(String),

    /// A collaborator returned structurally inconsistent data.
    #[error("malformed data: {0}")]
    Malformed(String),

    // =========================================================================
    // Setup
    // =========================================================================
    /// A required builder component was not provided.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OcspFetchFailed(_) | Self::CrlFetchFailed(_) => ErrorKind::Fetch,
            Self::CryptoError(_) | Self::SignatureContainer(_) | Self::TimestampToken(_) => {
                ErrorKind::Crypto
            }
            Self::DocumentIo(_) | Self::SignatureNotFound(_) => ErrorKind::DocumentIo,
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::MissingField(_) | Self::Config(_) => ErrorKind::Setup,
        }
    }
}

impl From<crate::properties::ConfigError> for Error {
    fn from(e: crate::properties::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
