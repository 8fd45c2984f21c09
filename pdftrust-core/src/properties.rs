//! Signature validation properties.
//!
//! Per-context configuration: freshness windows for revocation data, whether
//! to keep validating after an INVALID finding, which extensions certificates
//! must carry in a given role, and when to fetch revocation data online.
//!
//! # Lookup
//!
//! Rules are keyed by a [`ContextSelector`] in which each of the three context
//! dimensions is either fixed or a wildcard. For a concrete context
//! `(stage, source, time)` the rules are consulted most specific first:
//!
//! ```text
//! 1. (stage, source, time)     5. (stage, *,      *   )
//! 2. (stage, source, *   )     6. (*,     source, *   )
//! 3. (stage, *,      time)     7. (*,     *,      time)
//! 4. (*,     source, time)     8. (*,     *,      *   )
//! ```
//!
//! The first rule that sets the requested property wins; if none does, the
//! built-in default for the context applies.
//!
//! # Configuration File Format
//!
//! ```yaml
//! rules:
//!   - continue_after_failure: false
//!   - stage: ocsp
//!     time: present
//!     freshness_secs: 86400
//!   - source: timestamp
//!     required_extensions:
//!       - type: extended_key_usage
//!         oids: ["1.3.6.1.5.5.7.3.8"]
//!   - stage: revocation
//!     online_fetching: never
//! ```

use crate::certificate::CertificateExtension;
use crate::context::{CertificateSource, TimeBasedContext, ValidationContext, ValidatorStage};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Default freshness of revocation data when validating in the present.
pub const DEFAULT_FRESHNESS_PRESENT_DAYS: i64 = 30;

/// Default freshness of revocation data when validating historically.
pub const DEFAULT_FRESHNESS_HISTORICAL_SECS: i64 = 60;

/// Largest accepted freshness window, one hundred years.
pub const MAX_FRESHNESS_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Default for continuing after an INVALID finding.
pub const DEFAULT_CONTINUE_AFTER_FAILURE: bool = true;

/// When revocation data may be fetched from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineFetching {
    /// Always query live sources in addition to static ones.
    Always,
    /// Query live sources only when no static evidence is available.
    IfNoOtherData,
    /// Never query live sources.
    Never,
}

/// Rule key. `None` in a dimension matches any value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<ValidatorStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CertificateSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeBasedContext>,
}

impl ContextSelector {
    /// Matches every context.
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches exactly one context.
    pub fn exact(context: ValidationContext) -> Self {
        Self {
            stage: Some(context.stage),
            source: Some(context.source),
            time: Some(context.time),
        }
    }

    pub fn for_stage(mut self, stage: ValidatorStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn for_source(mut self, source: CertificateSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn for_time(mut self, time: TimeBasedContext) -> Self {
        self.time = Some(time);
        self
    }

    /// Selectors matching `context`, most specific first.
    pub fn lookup_order(context: ValidationContext) -> [ContextSelector; 8] {
        let (s, c, t) = (Some(context.stage), Some(context.source), Some(context.time));
        let sel = |stage, source, time| ContextSelector {
            stage,
            source,
            time,
        };
        [
            sel(s, c, t),
            sel(s, c, None),
            sel(s, None, t),
            sel(None, c, t),
            sel(s, None, None),
            sel(None, c, None),
            sel(None, None, t),
            sel(None, None, None),
        ]
    }
}

/// Properties set by one rule. Unset fields fall through to less specific rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness_secs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_after_failure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_extensions: Option<Vec<CertificateExtension>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_fetching: Option<OnlineFetching>,
}

/// One entry of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRule {
    #[serde(flatten)]
    pub selector: ContextSelector,
    #[serde(flatten)]
    pub properties: ContextProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PropertiesFile {
    #[serde(default)]
    rules: Vec<PropertyRule>,
}

/// Per-context validation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PropertiesFile", into = "PropertiesFile")]
pub struct SignatureValidationProperties {
    rules: HashMap<ContextSelector, ContextProperties>,
}

impl From<PropertiesFile> for SignatureValidationProperties {
    fn from(file: PropertiesFile) -> Self {
        let mut props = Self::default();
        for rule in file.rules {
            props.merge_rule(rule.selector, rule.properties);
        }
        props
    }
}

impl From<SignatureValidationProperties> for PropertiesFile {
    fn from(props: SignatureValidationProperties) -> Self {
        let mut rules: Vec<PropertyRule> = props
            .rules
            .into_iter()
            .map(|(selector, properties)| PropertyRule {
                selector,
                properties,
            })
            .collect();
        rules.sort_by_key(|r| (r.selector.stage, r.selector.source, r.selector.time));
        PropertiesFile { rules }
    }
}

impl SignatureValidationProperties {
    /// Properties with no rules: every lookup yields the built-in default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let props: Self = serde_yaml::from_str(yaml)?;
        if let Err(errors) = props.validate() {
            return Err(ConfigError::Invalid(errors));
        }
        Ok(props)
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(path.as_ref().display().to_string(), e))?;
        Self::from_yaml(&content)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the rules for values that cannot be meant.
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        for (selector, props) in &self.rules {
            if let Some(secs) = props.freshness_secs {
                if secs < 0 {
                    errors.push(ConfigValidationError {
                        location: format!("{:?}", selector),
                        message: format!("freshness must not be negative, got {}", secs),
                    });
                } else if secs > MAX_FRESHNESS_SECS {
                    errors.push(ConfigValidationError {
                        location: format!("{:?}", selector),
                        message: format!(
                            "freshness must not exceed {} seconds, got {}",
                            MAX_FRESHNESS_SECS, secs
                        ),
                    });
                }
            }
            if let Some(exts) = &props.required_extensions {
                for ext in exts {
                    let empty = match ext {
                        CertificateExtension::KeyUsage { bits } => bits.is_empty(),
                        CertificateExtension::ExtendedKeyUsage { oids } => oids.is_empty(),
                        CertificateExtension::BasicConstraints { .. } => false,
                    };
                    if empty {
                        errors.push(ConfigValidationError {
                            location: format!("{:?}", selector),
                            message: format!("required extension '{}' lists nothing", ext),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn merge_rule(&mut self, selector: ContextSelector, properties: ContextProperties) {
        let entry = self.rules.entry(selector).or_default();
        if properties.freshness_secs.is_some() {
            entry.freshness_secs = properties.freshness_secs;
        }
        if properties.continue_after_failure.is_some() {
            entry.continue_after_failure = properties.continue_after_failure;
        }
        if properties.required_extensions.is_some() {
            entry.required_extensions = properties.required_extensions;
        }
        if properties.online_fetching.is_some() {
            entry.online_fetching = properties.online_fetching;
        }
    }

    fn resolve<T>(
        &self,
        context: ValidationContext,
        get: impl Fn(&ContextProperties) -> Option<T>,
    ) -> Option<T> {
        ContextSelector::lookup_order(context)
            .iter()
            .filter_map(|sel| self.rules.get(sel))
            .find_map(get)
    }

    // ------------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------------

    pub fn set_freshness(&mut self, selector: ContextSelector, freshness: Duration) -> &mut Self {
        self.rules.entry(selector).or_default().freshness_secs = Some(freshness.num_seconds());
        self
    }

    pub fn set_continue_after_failure(&mut self, selector: ContextSelector, value: bool) -> &mut Self {
        self.rules.entry(selector).or_default().continue_after_failure = Some(value);
        self
    }

    pub fn set_required_extensions(
        &mut self,
        selector: ContextSelector,
        extensions: Vec<CertificateExtension>,
    ) -> &mut Self {
        self.rules.entry(selector).or_default().required_extensions = Some(extensions);
        self
    }

    pub fn set_online_fetching(&mut self, selector: ContextSelector, value: OnlineFetching) -> &mut Self {
        self.rules.entry(selector).or_default().online_fetching = Some(value);
        self
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Maximum tolerated age of revocation data.
    pub fn freshness(&self, context: ValidationContext) -> Duration {
        self.resolve(context, |p| p.freshness_secs)
            .and_then(|secs| Duration::try_seconds(secs.clamp(0, MAX_FRESHNESS_SECS)))
            .unwrap_or_else(|| match context.time {
                TimeBasedContext::Present => Duration::days(DEFAULT_FRESHNESS_PRESENT_DAYS),
                TimeBasedContext::Historical => {
                    Duration::seconds(DEFAULT_FRESHNESS_HISTORICAL_SECS)
                }
            })
    }

    /// Whether validation continues after an INVALID finding.
    pub fn continue_after_failure(&self, context: ValidationContext) -> bool {
        self.resolve(context, |p| p.continue_after_failure)
            .unwrap_or(DEFAULT_CONTINUE_AFTER_FAILURE)
    }

    /// Extensions a certificate must carry in the context's role.
    pub fn required_extensions(&self, context: ValidationContext) -> Vec<CertificateExtension> {
        self.resolve(context, |p| p.required_extensions.clone())
            .unwrap_or_else(|| default_required_extensions(context.source))
    }

    /// Online fetching policy.
    pub fn online_fetching(&self, context: ValidationContext) -> OnlineFetching {
        self.resolve(context, |p| p.online_fetching)
            .unwrap_or(OnlineFetching::IfNoOtherData)
    }
}

fn default_required_extensions(source: CertificateSource) -> Vec<CertificateExtension> {
    match source {
        CertificateSource::CertIssuer => vec![
            CertificateExtension::ca(),
            CertificateExtension::key_cert_sign(),
        ],
        CertificateSource::OcspIssuer => vec![CertificateExtension::ocsp_signing()],
        CertificateSource::CrlIssuer => vec![CertificateExtension::crl_sign()],
        CertificateSource::Timestamp => vec![CertificateExtension::time_stamping()],
        CertificateSource::Signer | CertificateSource::Trusted => Vec::new(),
    }
}

/// Configuration loading error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// YAML parsing error
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    /// File reading error
    #[error("failed to read {0}: {1}")]
    FileRead(String, #[source] std::io::Error),
    /// Semantically invalid rules
    #[error("invalid configuration: {}", format_errors(.0))]
    Invalid(Vec<ConfigValidationError>),
}

fn format_errors(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Rule the problem was found in
    pub location: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}
