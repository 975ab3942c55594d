//! Non-fatal findings produced while resolving and planning.
//!
//! A diagnostic never stops planning. Whether a given miss blocks the upgrade
//! is a policy decision left to the caller.

use serde::Serialize;
use std::fmt;

use crate::types::Architecture;

/// A resolution miss or a dropped input, surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An enabled source repoid is not in the repository catalog
    UnknownSourceRepository { repoid: String },

    /// The repoid is known, but neither a record for the provider nor a CDN
    /// record exists
    AmbiguousSourceRepository { repoid: String, cloud_provider: String },

    /// A source family has no mapping rule for this upgrade path
    UnmappedSourceFamily { pesid: String },

    /// No target repository could be chosen for a mapped family
    MissingTargetRepository { pesid: String },

    /// A package event was dropped because it targets other architectures
    ForeignArchitectureEvent { event_id: u64, architecture: Architecture },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSourceRepository { repoid } => {
                write!(f, "repository '{}' is not known to the repository mapping", repoid)
            }
            Self::AmbiguousSourceRepository { repoid, cloud_provider } => write!(
                f,
                "repository '{}' has no record for cloud provider '{}' or the CDN",
                repoid, cloud_provider
            ),
            Self::UnmappedSourceFamily { pesid } => {
                write!(f, "family '{}' has no mapping for this upgrade path", pesid)
            }
            Self::MissingTargetRepository { pesid } => {
                write!(f, "no target repository found for family '{}'", pesid)
            }
            Self::ForeignArchitectureEvent { event_id, architecture } => write!(
                f,
                "package event {} does not apply to {}",
                event_id, architecture
            ),
        }
    }
}
