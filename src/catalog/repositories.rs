//! Repository Catalog
//!
//! Parses the repository mapping document:
//!
//! ```json
//! {
//!   "version_format": "1.0.0",
//!   "repositories": [
//!     { "pesid": "rhel9-BaseOS",
//!       "entries": [ { "repoid": "rhel-9-for-x86_64-baseos-rpms", "arch": "x86_64",
//!                      "major_version": "9", "repo_type": "rpm",
//!                      "channel": "ga", "rhui": "" } ] }
//!   ],
//!   "mapping": [
//!     { "source_major_version": "8", "target_major_version": "9",
//!       "entries": [ { "source": "rhel8-BaseOS", "target": ["rhel9-BaseOS"] } ] }
//!   ]
//! }
//! ```
//!
//! Loading fails closed: the first structural problem is returned and no
//! catalog is produced.

use crate::error::ConfigError;
use crate::types::{Architecture, Channel};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// The only `version_format` this crate understands.
pub const SUPPORTED_SCHEMA_VERSION: &str = "1.0.0";

/// One concrete repository (a repoid on one arch/major/channel/mirror).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRecord {
    /// Family that owns this record
    pub pesid: String,
    pub repoid: String,
    pub arch: Architecture,
    pub major_version: String,
    pub repo_type: String,
    pub channel: Channel,
    /// Cloud-mirror tag; empty for CDN repositories
    pub rhui: String,
}

impl RepositoryRecord {
    /// True for the CDN flavour of a repository (no cloud-mirror tag).
    pub fn is_cdn(&self) -> bool {
        self.rhui.is_empty()
    }
}

/// A source family and the sorted set of families it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub source: String,
    pub targets: Vec<String>,
}

/// Baseline family per major version, used to attribute repositories the
/// catalog does not know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultFamilies(BTreeMap<String, String>);

impl DefaultFamilies {
    pub fn new(families: BTreeMap<String, String>) -> Self {
        Self(families)
    }

    pub fn get(&self, major_version: &str) -> Option<&str> {
        self.0.get(major_version).map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl Default for DefaultFamilies {
    fn default() -> Self {
        Self(
            [
                ("7", "rhel7-base"),
                ("8", "rhel8-BaseOS"),
                ("9", "rhel9-BaseOS"),
            ]
            .into_iter()
            .map(|(major, pesid)| (major.to_string(), pesid.to_string()))
            .collect(),
        )
    }
}

type VersionPair = (String, String);

/// Validated repository families and cross-version mapping rules.
#[derive(Debug, Clone)]
pub struct RepositoryCatalog {
    /// pesid -> records, in document order
    repositories: BTreeMap<String, Vec<RepositoryRecord>>,
    /// (source major, target major) -> source pesid -> target pesids
    mapping: BTreeMap<VersionPair, BTreeMap<String, BTreeSet<String>>>,
    defaults: DefaultFamilies,
}

impl RepositoryCatalog {
    /// Parse and validate a repository mapping document.
    pub fn load(document: &Value, defaults: DefaultFamilies) -> Result<Self, ConfigError> {
        let root = as_object(document, "version_format", "document")?;

        let version = string_field(root, "version_format", "document")?;
        if version != SUPPORTED_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchemaVersion {
                found: version,
                supported: SUPPORTED_SCHEMA_VERSION.to_string(),
            });
        }

        let repositories = parse_repositories(array_field(root, "repositories", "document")?)?;
        let mapping = parse_mapping(array_field(root, "mapping", "document")?)?;

        let catalog = Self {
            repositories,
            mapping,
            defaults,
        };
        catalog.check_mapping_targets()?;

        info!(
            "Loaded repository catalog: {} families, {} records, {} mapping rules",
            catalog.repositories.len(),
            catalog.repositories.values().map(Vec::len).sum::<usize>(),
            catalog.mapping.len()
        );
        Ok(catalog)
    }

    /// Parse document text; syntax errors become `MalformedDocument`.
    pub fn from_json_str(text: &str, defaults: DefaultFamilies) -> Result<Self, ConfigError> {
        let document: Value = serde_json::from_str(text)?;
        Self::load(&document, defaults)
    }

    /// Records of a family at one major version, in document order.
    pub fn families_at(&self, pesid: &str, major_version: &str) -> Vec<&RepositoryRecord> {
        self.repositories
            .get(pesid)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.major_version == major_version)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mapping rules for a version pair, sorted by source family.
    ///
    /// Returns `None` iff the document declares no rule for the pair.
    pub fn mapping_for(&self, source_major: &str, target_major: &str) -> Option<Vec<MappingEntry>> {
        let rules = self
            .mapping
            .get(&(source_major.to_string(), target_major.to_string()))?;
        Some(
            rules
                .iter()
                .map(|(source, targets)| MappingEntry {
                    source: source.clone(),
                    targets: targets.iter().cloned().collect(),
                })
                .collect(),
        )
    }

    /// Sorted target families of one source family; empty when unmapped.
    pub fn targets_of(&self, pesid: &str, source_major: &str, target_major: &str) -> Vec<String> {
        self.mapping
            .get(&(source_major.to_string(), target_major.to_string()))
            .and_then(|rules| rules.get(pesid))
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every record carrying `repoid` at `major_version`, across families.
    pub fn records_by_repoid(&self, repoid: &str, major_version: &str) -> Vec<&RepositoryRecord> {
        self.repositories
            .values()
            .flatten()
            .filter(|r| r.repoid == repoid && r.major_version == major_version)
            .collect()
    }

    pub fn default_family(&self, major_version: &str) -> Option<&str> {
        self.defaults.get(major_version)
    }

    pub fn family_ids(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(String::as_str)
    }

    fn check_mapping_targets(&self) -> Result<(), ConfigError> {
        for ((source_major, target_major), rules) in &self.mapping {
            for pesid in rules.values().flatten() {
                if self.families_at(pesid, target_major).is_empty() {
                    return Err(ConfigError::OrphanMappingTarget {
                        pesid: pesid.clone(),
                        source_major: source_major.clone(),
                        target_major: target_major.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Document walking
// ============================================================================

fn parse_repositories(
    families: &[Value],
) -> Result<BTreeMap<String, Vec<RepositoryRecord>>, ConfigError> {
    let mut repositories: BTreeMap<String, Vec<RepositoryRecord>> = BTreeMap::new();

    for (i, family) in families.iter().enumerate() {
        let ctx = format!("repositories[{}]", i);
        let family = as_object(family, "pesid", &ctx)?;
        let pesid = string_field(family, "pesid", &ctx)?;

        for (j, entry) in array_field(family, "entries", &ctx)?.iter().enumerate() {
            let ctx = format!("repositories[{}].entries[{}]", i, j);
            let entry = as_object(entry, "repoid", &ctx)?;

            let arch_name = string_field(entry, "arch", &ctx)?;
            let arch = arch_name.parse::<Architecture>().map_err(|_| {
                ConfigError::invalid("arch", &ctx, format!("unknown architecture '{}'", arch_name))
            })?;

            let rhui = match entry.get("rhui") {
                None | Some(Value::Null) => String::new(),
                Some(_) => string_field(entry, "rhui", &ctx)?,
            };

            let record = RepositoryRecord {
                pesid: pesid.clone(),
                repoid: string_field(entry, "repoid", &ctx)?,
                arch,
                major_version: version_field(entry, "major_version", &ctx)?,
                repo_type: string_field(entry, "repo_type", &ctx)?,
                channel: Channel::from(string_field(entry, "channel", &ctx)?.as_str()),
                rhui,
            };
            repositories.entry(pesid.clone()).or_default().push(record);
        }
    }

    Ok(repositories)
}

fn parse_mapping(
    rules: &[Value],
) -> Result<BTreeMap<VersionPair, BTreeMap<String, BTreeSet<String>>>, ConfigError> {
    let mut mapping: BTreeMap<VersionPair, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();

    for (i, rule) in rules.iter().enumerate() {
        let ctx = format!("mapping[{}]", i);
        let rule = as_object(rule, "source_major_version", &ctx)?;
        let source_major = version_field(rule, "source_major_version", &ctx)?;
        let target_major = version_field(rule, "target_major_version", &ctx)?;

        let by_source = mapping
            .entry((source_major.clone(), target_major.clone()))
            .or_default();

        for (j, entry) in array_field(rule, "entries", &ctx)?.iter().enumerate() {
            let ctx = format!("mapping[{}].entries[{}]", i, j);
            let entry = as_object(entry, "source", &ctx)?;
            let source = string_field(entry, "source", &ctx)?;
            let targets = target_list(entry, &source, &ctx)?;

            // Repeated source entries for one version pair extend each other.
            if by_source.contains_key(&source) {
                debug!(
                    "Merging repeated mapping entry for '{}' ({} -> {})",
                    source, source_major, target_major
                );
            }
            by_source.entry(source).or_default().extend(targets);
        }
    }

    Ok(mapping)
}

fn target_list(
    entry: &Map<String, Value>,
    source: &str,
    ctx: &str,
) -> Result<Vec<String>, ConfigError> {
    let malformed = || ConfigError::MalformedTargetList {
        source_pesid: source.to_string(),
    };
    let items = required(entry, "target", ctx)?
        .as_array()
        .ok_or_else(malformed)?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(malformed))
        .collect()
}

fn as_object<'a>(
    value: &'a Value,
    first_field: &str,
    ctx: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| ConfigError::invalid(first_field, ctx, "expected a JSON object"))
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    ctx: &str,
) -> Result<&'a Value, ConfigError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ConfigError::missing(field, ctx)),
        Some(value) => Ok(value),
    }
}

fn string_field(obj: &Map<String, Value>, field: &str, ctx: &str) -> Result<String, ConfigError> {
    required(obj, field, ctx)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::invalid(field, ctx, "expected a string"))
}

/// Major versions appear both as `"8"` and `8` in the wild.
fn version_field(obj: &Map<String, Value>, field: &str, ctx: &str) -> Result<String, ConfigError> {
    match required(obj, field, ctx)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if n.is_u64() => Ok(n.to_string()),
        _ => Err(ConfigError::invalid(
            field,
            ctx,
            "expected a major version string or integer",
        )),
    }
}

fn array_field<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    ctx: &str,
) -> Result<&'a Vec<Value>, ConfigError> {
    required(obj, field, ctx)?
        .as_array()
        .ok_or_else(|| ConfigError::invalid(field, ctx, "expected a list"))
}

// ============================================================================
// Tests
// ============================================================================
