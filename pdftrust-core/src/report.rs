//! Validation reports.
//!
//! A [`ValidationReport`] is an append-only log of [`ReportItem`]s. Each item
//! records one finding and carries a [`ReportItemStatus`]; the overall
//! [`ValidationResult`] is the worst status present:
//!
//! ```text
//! INVALID  >  INDETERMINATE  >  VALID (INFO items only, or no items)
//! ```
//!
//! Reports are the only output of the validators. They are statements of
//! confidence, not booleans: a report can be VALID while still logging why a
//! particular revocation source was skipped.

use crate::certificate::Certificate;
use crate::error::Error;
use serde::{Serialize, Serializer};
use std::fmt;

/// Status of a single report item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportItemStatus {
    /// Expected or benign finding.
    Info,
    /// No conclusion could be reached.
    Indeterminate,
    /// Positive proof of a violation.
    Invalid,
}

impl fmt::Display for ReportItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Indeterminate => "INDETERMINATE",
            Self::Invalid => "INVALID",
        })
    }
}

/// Aggregate result of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationResult {
    Valid,
    Indeterminate,
    Invalid,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "VALID",
            Self::Indeterminate => "INDETERMINATE",
            Self::Invalid => "INVALID",
        })
    }
}

/// Lightweight reference to the certificate a report item is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CertificateRef {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
}

impl From<&Certificate> for CertificateRef {
    fn from(cert: &Certificate) -> Self {
        Self {
            subject: cert.subject.clone(),
            issuer: cert.issuer.clone(),
            serial: cert.serial_hex(),
        }
    }
}

impl CertificateRef {
    /// Whether this reference points at the given certificate.
    pub fn refers_to(&self, cert: &Certificate) -> bool {
        self.issuer == cert.issuer && self.serial == cert.serial_hex()
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportItem {
    /// Certificate the finding is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateRef>,
    /// Name of the check that produced the finding.
    pub check: String,
    /// Human-readable message.
    pub message: String,
    pub status: ReportItemStatus,
    /// Collaborator error that led to this finding.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_cause"
    )]
    pub cause: Option<Error>,
}

fn serialize_cause<S: Serializer>(cause: &Option<Error>, s: S) -> Result<S::Ok, S::Error> {
    match cause {
        Some(e) => s.serialize_str(&e.to_string()),
        None => s.serialize_none(),
    }
}

impl ReportItem {
    /// Create an item that is not about a particular certificate.
    pub fn new(
        check: impl Into<String>,
        message: impl Into<String>,
        status: ReportItemStatus,
    ) -> Self {
        Self {
            certificate: None,
            check: check.into(),
            message: message.into(),
            status,
            cause: None,
        }
    }

    /// Create an item about a certificate.
    pub fn for_certificate(
        certificate: &Certificate,
        check: impl Into<String>,
        message: impl Into<String>,
        status: ReportItemStatus,
    ) -> Self {
        Self {
            certificate: Some(certificate.into()),
            ..Self::new(check, message, status)
        }
    }

    /// Attach the error that caused this finding.
    pub fn with_cause(mut self, cause: Error) -> Self {
        self.cause = Some(cause);
        self
    }
}

impl fmt::Display for ReportItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.check, self.message)?;
        if let Some(cert) = &self.certificate {
            write!(f, " (certificate: {})", cert.subject)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {})", cause)?;
        }
        Ok(())
    }
}

/// Ordered log of findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    items: Vec<ReportItem>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item.
    pub fn add(&mut self, item: ReportItem) {
        self.items.push(item);
    }

    /// Append all items of `other`, keeping their status.
    pub fn merge(&mut self, other: ValidationReport) {
        self.items.extend(other.items);
    }

    /// Append all items of `other`, rewriting their status.
    ///
    /// Used to keep the audit trail of attempts whose outcome should not
    /// influence the aggregate result.
    pub fn merge_with_status(&mut self, other: ValidationReport, status: ReportItemStatus) {
        self.items.extend(other.items.into_iter().map(|mut item| {
            item.status = status;
            item
        }));
    }

    /// All items in insertion order.
    pub fn items(&self) -> &[ReportItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Worst status present.
    pub fn validation_result(&self) -> ValidationResult {
        match self.items.iter().map(|i| i.status).max() {
            Some(ReportItemStatus::Invalid) => ValidationResult::Invalid,
            Some(ReportItemStatus::Indeterminate) => ValidationResult::Indeterminate,
            _ => ValidationResult::Valid,
        }
    }

    /// Whether any item is INVALID.
    pub fn has_invalid(&self) -> bool {
        self.items
            .iter()
            .any(|i| i.status == ReportItemStatus::Invalid)
    }

    /// INVALID and INDETERMINATE items.
    pub fn failures(&self) -> impl Iterator<Item = &ReportItem> {
        self.items
            .iter()
            .filter(|i| i.status != ReportItemStatus::Info)
    }

    /// Failures that concern a certificate.
    pub fn certificate_failures(&self) -> impl Iterator<Item = &ReportItem> {
        self.failures().filter(|i| i.certificate.is_some())
    }

    /// INFO items.
    pub fn logs(&self) -> impl Iterator<Item = &ReportItem> {
        self.items
            .iter()
            .filter(|i| i.status == ReportItemStatus::Info)
    }

    /// Items produced by a given check.
    pub fn items_for_check<'a>(&'a self, check: &'a str) -> impl Iterator<Item = &'a ReportItem> {
        self.items.iter().filter(move |i| i.check == check)
    }

    /// Whether some item has the given status and a message containing `needle`.
    pub fn contains(&self, status: ReportItemStatus, needle: &str) -> bool {
        self.items
            .iter()
            .any(|i| i.status == status && i.message.contains(needle))
    }

    /// Render the report as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&ReportJson {
            result: self.validation_result(),
            items: &self.items,
        })
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    result: ValidationResult,
    items: &'a [ReportItem],
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ValidationReport: {}", self.validation_result())?;
        for item in &self.items {
            writeln!(f, "  {}", item)?;
        }
        Ok(())
    }
}
