//! Document access.
//!
//! pdftrust does not parse PDF files or CMS containers. These traits are
//! the narrow views the validators need; callers implement them on top of
//! their own document and cryptography stacks.

use crate::certificate::Certificate;
use crate::error::{Error, Result};
use crate::pdf::{ObjectRef, PdfSnapshot};
use crate::revocation::crl::Crl;
use crate::revocation::ocsp::BasicOcspResponse;
use chrono::{DateTime, Utc};

// ============================================================================
// Signatures
// ============================================================================

/// A signature timestamp embedded in a signature container
/// (`id-aa-signatureTimeStampToken`).
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedTimestamp {
    pub signing_certificate: Certificate,
    pub generation_time: DateTime<Utc>,
    /// Certificates carried in the timestamp token.
    pub certificates: Vec<Certificate>,
}

/// A decoded signature container (CMS / PKCS#7).
pub trait SignatureContainer {
    /// Integrity and authenticity of the signature over the bytes it covers.
    fn verify_integrity(&self) -> Result<bool>;

    /// Whether this is a document timestamp rather than a signature.
    fn is_timestamp(&self) -> bool;

    fn signing_certificate(&self) -> Option<Certificate>;

    /// Certificates carried in the container.
    fn certificates(&self) -> Vec<Certificate>;

    /// Generation time of a document timestamp.
    fn timestamp_time(&self) -> Option<DateTime<Utc>>;

    fn embedded_timestamp(&self) -> Option<EmbeddedTimestamp>;

    /// Whether the embedded timestamp's message imprint matches the signature value.
    fn verify_timestamp_imprint(&self) -> Result<bool>;

    /// OCSP responses embedded in the container (`adbe-revocationInfoArchival`).
    fn ocsp_responses(&self) -> Vec<BasicOcspResponse> {
        Vec::new()
    }

    /// CRLs embedded in the container.
    fn crls(&self) -> Vec<Crl> {
        Vec::new()
    }
}

/// A signed document as seen by the signature validator.
pub trait SignedDocument {
    /// Signature field names in document order, oldest first.
    fn signature_names(&self) -> Vec<String>;

    fn signature(&self, name: &str) -> Result<Box<dyn SignatureContainer + '_>>;

    /// Whether the signature covers the whole revision it was added in.
    fn signature_covers_whole_revision(&self, name: &str) -> Result<bool>;

    /// OCSP responses from the document security store.
    fn dss_ocsp_responses(&self) -> Vec<BasicOcspResponse> {
        Vec::new()
    }

    /// CRLs from the document security store.
    fn dss_crls(&self) -> Vec<Crl> {
        Vec::new()
    }

    /// Certificates from the document security store.
    fn dss_certificates(&self) -> Vec<Certificate> {
        Vec::new()
    }
}

// ============================================================================
// Revisions
// ============================================================================

/// One cross-reference entry written by a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XrefEntry {
    pub reference: ObjectRef,
    pub free: bool,
}

impl XrefEntry {
    pub fn in_use(reference: ObjectRef) -> Self {
        Self {
            reference,
            free: false,
        }
    }

    pub fn free(reference: ObjectRef) -> Self {
        Self {
            reference,
            free: true,
        }
    }
}

/// One incremental update of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRevision {
    /// Position in the document, 0 for the original.
    pub index: usize,
    /// Byte offset just past the `%%EOF` marker of this revision.
    pub eof_offset: u64,
    /// Entries of this revision's cross-reference section.
    pub entries: Vec<XrefEntry>,
}

impl DocumentRevision {
    pub fn new(index: usize, eof_offset: u64, entries: Vec<XrefEntry>) -> Self {
        Self {
            index,
            eof_offset,
            entries,
        }
    }
}

/// Access to the incremental revisions of a document.
pub trait DocumentHistory {
    /// Revisions, oldest first.
    fn revisions(&self) -> Vec<DocumentRevision>;

    /// Open the document as it was at the end of `revision`.
    fn open_revision(&self, revision: &DocumentRevision) -> Result<PdfSnapshot>;
}

/// Revisions that are already decoded.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    revisions: Vec<(DocumentRevision, Option<PdfSnapshot>)>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a revision. Its index is set to its position.
    pub fn push(&mut self, eof_offset: u64, entries: Vec<XrefEntry>, snapshot: PdfSnapshot) -> &mut Self {
        let index = self.revisions.len();
        self.revisions
            .push((DocumentRevision::new(index, eof_offset, entries), Some(snapshot)));
        self
    }

    /// Append a revision that fails to open.
    pub fn push_unreadable(&mut self, eof_offset: u64, entries: Vec<XrefEntry>) -> &mut Self {
        let index = self.revisions.len();
        self.revisions
            .push((DocumentRevision::new(index, eof_offset, entries), None));
        self
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl DocumentHistory for InMemoryHistory {
    fn revisions(&self) -> Vec<DocumentRevision> {
        self.revisions.iter().map(|(r, _)| r.clone()).collect()
    }

    fn open_revision(&self, revision: &DocumentRevision) -> Result<PdfSnapshot> {
        match self.revisions.get(revision.index) {
            Some((_, Some(snapshot))) => Ok(snapshot.clone()),
            Some((_, None)) => Err(Error::DocumentIo(format!(
                "revision {} could not be parsed",
                revision.index
            ))),
            None => Err(Error::DocumentIo(format!(
                "revision {} does not exist",
                revision.index
            ))),
        }
    }
}
