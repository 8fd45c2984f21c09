//! Certificate handles.
//!
//! pdftrust does not parse X.509. Callers decode certificates with whatever
//! ASN.1 stack they already use and hand over a [`Certificate`] value holding
//! the fields the validators need. The original encoding travels along in
//! [`Certificate::encoded`] so that a [`SignatureVerifier`] can do the actual
//! cryptography.
//!
//! [`SignatureVerifier`]: crate::crypto::SignatureVerifier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `id-kp-OCSPSigning`
pub const OID_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";
/// `id-kp-timeStamping`
pub const OID_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
/// `anyExtendedKeyUsage`
pub const OID_ANY_EXTENDED_KEY_USAGE: &str = "2.5.29.37.0";

// ============================================================================
// Extensions
// ============================================================================

/// A single key usage bit (RFC 5280 §4.2.1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsageBit {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl KeyUsageBit {
    fn mask(self) -> u16 {
        1 << (self as u16)
    }
}

/// Key usage extension value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyUsage(u16);

impl KeyUsage {
    /// Build from a list of bits.
    pub fn from_bits(bits: &[KeyUsageBit]) -> Self {
        Self(bits.iter().fold(0, |acc, b| acc | b.mask()))
    }

    /// Check whether a bit is asserted.
    pub fn contains(&self, bit: KeyUsageBit) -> bool {
        self.0 & bit.mask() != 0
    }

    /// Check whether every bit of `other` is asserted.
    pub fn contains_all(&self, other: KeyUsage) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Basic constraints extension value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasicConstraints {
    pub ca: bool,
    pub path_len: Option<u32>,
}

/// An extension a certificate must carry to be acceptable in a given role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CertificateExtension {
    /// Key usage must assert all listed bits.
    KeyUsage { bits: Vec<KeyUsageBit> },
    /// Basic constraints must be present with the given CA flag.
    BasicConstraints { ca: bool },
    /// Extended key usage must list all OIDs (or `anyExtendedKeyUsage`).
    ExtendedKeyUsage { oids: Vec<String> },
}

impl CertificateExtension {
    /// `keyCertSign` key usage.
    pub fn key_cert_sign() -> Self {
        Self::KeyUsage {
            bits: vec![KeyUsageBit::KeyCertSign],
        }
    }

    /// `cRLSign` key usage.
    pub fn crl_sign() -> Self {
        Self::KeyUsage {
            bits: vec![KeyUsageBit::CrlSign],
        }
    }

    /// CA basic constraints.
    pub fn ca() -> Self {
        Self::BasicConstraints { ca: true }
    }

    /// OCSP signing extended key usage.
    pub fn ocsp_signing() -> Self {
        Self::ExtendedKeyUsage {
            oids: vec![OID_OCSP_SIGNING.to_string()],
        }
    }

    /// Time stamping extended key usage.
    pub fn time_stamping() -> Self {
        Self::ExtendedKeyUsage {
            oids: vec![OID_TIME_STAMPING.to_string()],
        }
    }

    /// Check whether the certificate carries this extension.
    pub fn is_satisfied_by(&self, certificate: &Certificate) -> bool {
        match self {
            Self::KeyUsage { bits } => certificate
                .key_usage
                .map(|ku| ku.contains_all(KeyUsage::from_bits(bits)))
                .unwrap_or(false),
            Self::BasicConstraints { ca } => certificate
                .basic_constraints
                .map(|bc| bc.ca == *ca)
                .unwrap_or(false),
            Self::ExtendedKeyUsage { oids } => match &certificate.extended_key_usage {
                Some(provided) => {
                    provided.iter().any(|o| o == OID_ANY_EXTENDED_KEY_USAGE)
                        || oids.iter().all(|o| provided.contains(o))
                }
                None => false,
            },
        }
    }
}

impl fmt::Display for CertificateExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyUsage { bits } => write!(f, "key usage {:?}", bits),
            Self::BasicConstraints { ca } => write!(f, "basic constraints (ca={})", ca),
            Self::ExtendedKeyUsage { oids } => write!(f, "extended key usage {:?}", oids),
        }
    }
}

// ============================================================================
// Certificate
// ============================================================================

/// Identity of a certificate: issuer name, serial number and public key.
///
/// Two handles describing the same certificate compare equal even if they
/// were decoded separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CertificateId {
    pub issuer: String,
    pub serial: Vec<u8>,
    pub public_key: Vec<u8>,
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.issuer, hex::encode(&self.serial))
    }
}

/// A decoded certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub subject: String,
    pub issuer: String,
    pub serial: Vec<u8>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub public_key: Vec<u8>,
    pub key_usage: Option<KeyUsage>,
    pub basic_constraints: Option<BasicConstraints>,
    pub extended_key_usage: Option<Vec<String>>,
    /// `id-pkix-ocsp-nocheck` is present.
    pub ocsp_no_check: bool,
    /// `id-etsi-ext-valassured-ST-certs` is present.
    pub validity_assured_short_term: bool,
    /// Original DER encoding, opaque to pdftrust.
    pub encoded: Vec<u8>,
}

impl Certificate {
    /// Start building a certificate.
    pub fn builder(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        serial: impl Into<Vec<u8>>,
    ) -> CertificateBuilder {
        CertificateBuilder::new(subject.into(), issuer.into(), serial.into())
    }

    /// Identity used for set membership.
    pub fn id(&self) -> CertificateId {
        CertificateId {
            issuer: self.issuer.clone(),
            serial: self.serial.clone(),
            public_key: self.public_key.clone(),
        }
    }

    /// Serial number as lowercase hex.
    pub fn serial_hex(&self) -> String {
        hex::encode(&self.serial)
    }

    /// Subject and issuer names are equal.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    /// Basic constraints mark this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        self.basic_constraints.map(|bc| bc.ca).unwrap_or(false)
    }

    /// `not_before <= date <= not_after`
    pub fn is_valid_at(&self, date: DateTime<Utc>) -> bool {
        self.not_before <= date && date <= self.not_after
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.issuer == other.issuer
            && self.serial == other.serial
            && self.public_key == other.public_key
    }
}

impl Eq for Certificate {}

impl std::hash::Hash for Certificate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.issuer.hash(state);
        self.serial.hash(state);
        self.public_key.hash(state);
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial {})", self.subject, self.serial_hex())
    }
}

/// Builder for [`Certificate`].
///
/// Defaults to a certificate valid for all representable time with no
/// extensions and subject plus serial as its public key.
#[derive(Debug, Clone)]
pub struct CertificateBuilder {
    cert: Certificate,
}

impl CertificateBuilder {
    fn new(subject: String, issuer: String, serial: Vec<u8>) -> Self {
        let public_key = [subject.as_bytes(), serial.as_slice()].concat();
        Self {
            cert: Certificate {
                subject,
                issuer,
                serial,
                not_before: DateTime::<Utc>::MIN_UTC,
                not_after: DateTime::<Utc>::MAX_UTC,
                public_key,
                key_usage: None,
                basic_constraints: None,
                extended_key_usage: None,
                ocsp_no_check: false,
                validity_assured_short_term: false,
                encoded: Vec::new(),
            },
        }
    }

    pub fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.cert.not_before = not_before;
        self.cert.not_after = not_after;
        self
    }

    pub fn public_key(mut self, public_key: impl Into<Vec<u8>>) -> Self {
        self.cert.public_key = public_key.into();
        self
    }

    pub fn key_usage(mut self, bits: &[KeyUsageBit]) -> Self {
        self.cert.key_usage = Some(KeyUsage::from_bits(bits));
        self
    }

    pub fn ca(mut self, path_len: Option<u32>) -> Self {
        self.cert.basic_constraints = Some(BasicConstraints { ca: true, path_len });
        self
    }

    pub fn end_entity(mut self) -> Self {
        self.cert.basic_constraints = Some(BasicConstraints {
            ca: false,
            path_len: None,
        });
        self
    }

    pub fn extended_key_usage<I, S>(mut self, oids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cert.extended_key_usage = Some(oids.into_iter().map(Into::into).collect());
        self
    }

    pub fn ocsp_no_check(mut self) -> Self {
        self.cert.ocsp_no_check = true;
        self
    }

    pub fn validity_assured_short_term(mut self) -> Self {
        self.cert.validity_assured_short_term = true;
        self
    }

    pub fn encoded(mut self, der: impl Into<Vec<u8>>) -> Self {
        self.cert.encoded = der.into();
        self
    }

    pub fn build(self) -> Certificate {
        self.cert
    }
}
