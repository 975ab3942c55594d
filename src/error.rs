//! Error handling module for the upgrade planner
//!
//! Two document kinds, two error enums: `ConfigError` for the repository
//! mapping document and `ParseError` for the package-event document. Both are
//! fatal to the caller. Resolution misses are not errors; see
//! [`crate::diagnostics`].

use thiserror::Error;

/// Structural problems in the repository mapping document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document text is not JSON at all
    #[error("Malformed repository mapping document: {reason}")]
    MalformedDocument { reason: String },

    /// `version_format` differs from the supported schema string
    #[error("Unsupported repository mapping schema version '{found}' (supported: {supported})")]
    UnsupportedSchemaVersion { found: String, supported: String },

    /// A required field is absent or null
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// A field is present but has the wrong type or an unknown value
    #[error("Invalid value for '{field}' in {context}: {reason}")]
    InvalidValue {
        field: String,
        context: String,
        reason: String,
    },

    /// A mapping targets a family with no repositories at the target version
    #[error(
        "Mapping {source_major}->{target_major} targets family '{pesid}' \
         which has no repositories for major version {target_major}"
    )]
    OrphanMappingTarget {
        pesid: String,
        source_major: String,
        target_major: String,
    },

    /// A mapping entry's `target` is not a list of strings
    #[error("Mapping target for source family '{source_pesid}' must be a list of family ids")]
    MalformedTargetList { source_pesid: String },
}

/// Structural problems in the package-event document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The document text is not JSON at all
    #[error("Malformed package event document: {reason}")]
    MalformedDocument { reason: String },

    /// A required field is absent or null
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// `action` is not an integer in 0..=7
    #[error("Event {event_id}: invalid action {value}")]
    InvalidAction { event_id: u64, value: String },

    /// An architecture string outside the supported set
    #[error("Event {event_id}: invalid architecture '{value}'")]
    InvalidArchitecture { event_id: u64, value: String },

    /// `in_packageset` / `out_packageset` is not a package list
    #[error("Event {event_id}: malformed {field}: {reason}")]
    MalformedPackageSet {
        event_id: u64,
        field: String,
        reason: String,
    },

    /// A release object without integer major/minor versions
    #[error("Event {event_id}: invalid {field}: {reason}")]
    InvalidRelease {
        event_id: u64,
        field: String,
        reason: String,
    },
}

/// Crate-level error type.
#[derive(Error, Debug)]
pub enum UpgradeError {
    /// Repository mapping document errors
    #[error("Repository mapping error: {0}")]
    Config(#[from] ConfigError),

    /// Package event document errors
    #[error("Package event error: {0}")]
    Parse(#[from] ParseError),

    /// Upgrade context errors (inconsistent versions, missing defaults)
    #[error("Upgrade context error: {0}")]
    Context(String),

    /// System facts that are not valid JSON of the expected shape
    #[error("System facts error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for planner operations
pub type Result<T> = std::result::Result<T, UpgradeError>;

impl UpgradeError {
    /// Create an upgrade context error
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }
}

impl ConfigError {
    pub(crate) fn missing(field: &str, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.to_string(),
            context: context.into(),
        }
    }

    pub(crate) fn invalid(
        field: &str,
        context: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::MalformedDocument {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::MalformedDocument {
            reason: err.to_string(),
        }
    }
}
