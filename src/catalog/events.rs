//! Package Event Catalog
//!
//! Parses the package-evolution-event document (`packageinfo`) into concrete
//! [`PackageEvent`]s. A single document record may cover several module
//! streams at once; such records are decompressed into one event per input
//! stream.
//!
//! # Decompression
//!
//! | Record shape                        | Events produced                               |
//! |-------------------------------------|-----------------------------------------------|
//! | `modulestream_maps` present         | One per `in_modulestream`, mapped outputs only |
//! | no maps, modular input packages     | One per input stream, mapped to "no stream"   |
//! | no maps, non-modular input packages | Exactly one (no stream → no stream)           |
//!
//! Packages that do not carry the stream an event is about are left out of
//! that event.

use crate::error::ParseError;
use crate::types::{Architecture, EventAction, ModuleStream, Release};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

// ============================================================================
// Event Types
// ============================================================================

/// A package inside a concrete event: exactly one module-stream identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PackageRef {
    pub name: String,
    /// Repository family label the package comes from
    pub repository: String,
    pub modulestream: Option<ModuleStream>,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            modulestream: None,
        }
    }

    pub fn with_stream(mut self, stream: ModuleStream) -> Self {
        self.modulestream = Some(stream);
        self
    }
}

/// A package as written in a document record: it may belong to several
/// module streams at once. An empty list means non-modular.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    pub repository: String,
    pub modulestreams: Vec<Option<ModuleStream>>,
}

impl PackageEntry {
    fn streams(&self) -> Vec<Option<ModuleStream>> {
        if self.modulestreams.is_empty() {
            vec![None]
        } else {
            self.modulestreams.clone()
        }
    }

    fn carries(&self, stream: &Option<ModuleStream>) -> bool {
        self.streams().contains(stream)
    }

    fn as_ref_in(&self, stream: &Option<ModuleStream>) -> PackageRef {
        PackageRef {
            name: self.name.clone(),
            repository: self.repository.clone(),
            modulestream: stream.clone(),
        }
    }
}

/// One concrete package evolution event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEvent {
    pub id: u64,
    pub action: EventAction,
    pub in_packages: BTreeSet<PackageRef>,
    pub out_packages: BTreeSet<PackageRef>,
    pub initial_release: Release,
    pub release: Release,
    /// Empty means the event applies to every architecture
    pub architectures: Vec<Architecture>,
}

impl PackageEvent {
    pub fn applies_to(&self, arch: Architecture) -> bool {
        self.architectures.is_empty() || self.architectures.contains(&arch)
    }

    /// Sorted, deduplicated input package names.
    pub fn in_names(&self) -> BTreeSet<&str> {
        self.in_packages.iter().map(|p| p.name.as_str()).collect()
    }

    /// Sorted, deduplicated output package names.
    pub fn out_names(&self) -> BTreeSet<&str> {
        self.out_packages.iter().map(|p| p.name.as_str()).collect()
    }
}

/// All concrete events of one document, in document order.
#[derive(Debug, Clone, Default)]
pub struct PackageEventCatalog {
    events: Vec<PackageEvent>,
}

impl PackageEventCatalog {
    /// Parse and decompress a package event document.
    pub fn parse(document: &Value) -> Result<Self, ParseError> {
        let root = document.as_object().ok_or_else(|| ParseError::MalformedDocument {
            reason: "expected a JSON object at the top level".to_string(),
        })?;
        let records = match root.get("packageinfo") {
            None | Some(Value::Null) => {
                return Err(ParseError::MissingField {
                    field: "packageinfo".to_string(),
                    context: "document".to_string(),
                });
            }
            Some(value) => value.as_array().ok_or_else(|| ParseError::MalformedDocument {
                reason: "'packageinfo' must be a list".to_string(),
            })?,
        };

        let mut events = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let record = EventRecord::parse(record, &format!("packageinfo[{}]", i))?;
            events.extend(record.decompress());
        }

        info!(
            "Loaded package event catalog: {} records, {} concrete events",
            records.len(),
            events.len()
        );
        Ok(Self { events })
    }

    /// Parse document text; syntax errors become `MalformedDocument`.
    pub fn from_json_str(text: &str) -> Result<Self, ParseError> {
        let document: Value = serde_json::from_str(text)?;
        Self::parse(&document)
    }

    pub fn events(&self) -> &[PackageEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Keep events whose architecture whitelist is empty or contains `arch`.
pub fn filter_by_architecture(events: &[PackageEvent], arch: Architecture) -> Vec<PackageEvent> {
    let kept: Vec<PackageEvent> = events
        .iter()
        .filter(|e| e.applies_to(arch))
        .cloned()
        .collect();
    debug!(
        "Architecture filter ({}): kept {} of {} events",
        arch,
        kept.len(),
        events.len()
    );
    kept
}

/// Keep events whose release falls in `(source, target]`, ordered by
/// (release, id) so they can be applied in upgrade order.
pub fn filter_by_release(
    events: &[PackageEvent],
    source: Release,
    target: Release,
) -> Vec<PackageEvent> {
    let mut kept: Vec<PackageEvent> = events
        .iter()
        .filter(|e| e.release > source && e.release <= target)
        .cloned()
        .collect();
    kept.sort_by_key(|e| (e.release, e.id));
    kept
}

// ============================================================================
// Record parsing and decompression
// ============================================================================

/// A document record before decompression.
struct EventRecord {
    id: u64,
    action: EventAction,
    in_packages: Vec<PackageEntry>,
    out_packages: Vec<PackageEntry>,
    initial_release: Release,
    release: Release,
    architectures: Vec<Architecture>,
    stream_maps: Vec<(Option<ModuleStream>, Option<ModuleStream>)>,
}

impl EventRecord {
    fn parse(value: &Value, ctx: &str) -> Result<Self, ParseError> {
        let obj = value.as_object().ok_or_else(|| ParseError::MalformedDocument {
            reason: format!("{} must be an object", ctx),
        })?;

        let id = match required(obj, "id", ctx)?.as_u64() {
            Some(id) => id,
            None => {
                return Err(ParseError::MalformedDocument {
                    reason: format!("{}: 'id' must be a non-negative integer", ctx),
                });
            }
        };

        let action_value = required(obj, "action", ctx)?;
        let action = action_value
            .as_u64()
            .and_then(EventAction::from_code)
            .ok_or_else(|| ParseError::InvalidAction {
                event_id: id,
                value: action_value.to_string(),
            })?;

        let in_set = required(obj, "in_packageset", ctx)?;
        let in_packages = parse_package_set(in_set, id, "in_packageset")?;
        let out_packages = match obj.get("out_packageset") {
            None | Some(Value::Null) => Vec::new(),
            Some(set) => parse_package_set(set, id, "out_packageset")?,
        };

        Ok(Self {
            id,
            action,
            in_packages,
            out_packages,
            initial_release: parse_release(
                required(obj, "initial_release", ctx)?,
                id,
                "initial_release",
            )?,
            release: parse_release(required(obj, "release", ctx)?, id, "release")?,
            architectures: parse_architectures(obj.get("architectures"), id)?,
            stream_maps: parse_stream_maps(obj.get("modulestream_maps"), id)?,
        })
    }

    fn decompress(self) -> Vec<PackageEvent> {
        let mut groups: BTreeMap<Option<ModuleStream>, BTreeSet<Option<ModuleStream>>> =
            BTreeMap::new();

        if self.stream_maps.is_empty() {
            // No maps: every input stream is de-modularized.
            for stream in self.in_packages.iter().flat_map(PackageEntry::streams) {
                groups.entry(stream).or_default().insert(None);
            }
        } else {
            for (from, to) in &self.stream_maps {
                groups.entry(from.clone()).or_default().insert(to.clone());
            }
        }

        let mut events = Vec::with_capacity(groups.len());
        for (in_stream, out_streams) in groups {
            let in_packages: BTreeSet<PackageRef> = self
                .in_packages
                .iter()
                .filter(|p| p.carries(&in_stream))
                .map(|p| p.as_ref_in(&in_stream))
                .collect();

            if in_packages.is_empty() {
                debug!(
                    "Event {}: no input package carries stream {:?}, skipping",
                    self.id, in_stream
                );
                continue;
            }

            let out_packages: BTreeSet<PackageRef> = self
                .out_packages
                .iter()
                .flat_map(|p| {
                    p.streams()
                        .into_iter()
                        .filter(|s| out_streams.contains(s))
                        .map(move |s| p.as_ref_in(&s))
                })
                .collect();

            events.push(PackageEvent {
                id: self.id,
                action: self.action,
                in_packages,
                out_packages,
                initial_release: self.initial_release,
                release: self.release,
                architectures: self.architectures.clone(),
            });
        }

        events
    }
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    ctx: &str,
) -> Result<&'a Value, ParseError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ParseError::MissingField {
            field: field.to_string(),
            context: ctx.to_string(),
        }),
        Some(value) => Ok(value),
    }
}

fn parse_package_set(value: &Value, id: u64, field: &str) -> Result<Vec<PackageEntry>, ParseError> {
    let malformed = |reason: &str| ParseError::MalformedPackageSet {
        event_id: id,
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let packages = value
        .get("package")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("expected an object with a 'package' list"))?;

    packages
        .iter()
        .map(|pkg| {
            let name = pkg
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("package without a string 'name'"))?;
            let repository = pkg
                .get("repository")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("package without a string 'repository'"))?;
            let modulestreams = match pkg.get("modulestreams") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| {
                        parse_stream(item).ok_or_else(|| malformed("invalid module stream"))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(malformed("'modulestreams' must be a list")),
            };
            Ok(PackageEntry {
                name: name.to_string(),
                repository: repository.to_string(),
                modulestreams,
            })
        })
        .collect()
}

/// `null` is "no stream"; anything else must carry string name and stream.
/// The outer `None` signals a malformed value.
fn parse_stream(value: &Value) -> Option<Option<ModuleStream>> {
    match value {
        Value::Null => Some(None),
        Value::Object(obj) => {
            let name = obj.get("name")?.as_str()?;
            let stream = obj.get("stream")?.as_str()?;
            Some(Some(ModuleStream::new(name, stream)))
        }
        _ => None,
    }
}

fn parse_release(value: &Value, id: u64, field: &str) -> Result<Release, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidRelease {
        event_id: id,
        field: field.to_string(),
        reason: reason.to_string(),
    };
    let major = value
        .get("major_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid("missing integer 'major_version'"))?;
    let minor = value
        .get("minor_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid("missing integer 'minor_version'"))?;
    let major = u32::try_from(major).map_err(|_| invalid("'major_version' out of range"))?;
    let minor = u32::try_from(minor).map_err(|_| invalid("'minor_version' out of range"))?;
    Ok(Release::new(major, minor))
}

fn parse_architectures(value: Option<&Value>, id: u64) -> Result<Vec<Architecture>, ParseError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ParseError::InvalidArchitecture {
                event_id: id,
                value: other.to_string(),
            });
        }
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| s.parse::<Architecture>().ok())
                .ok_or_else(|| ParseError::InvalidArchitecture {
                    event_id: id,
                    value: item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()),
                })
        })
        .collect()
}

fn parse_stream_maps(
    value: Option<&Value>,
    id: u64,
) -> Result<Vec<(Option<ModuleStream>, Option<ModuleStream>)>, ParseError> {
    let malformed = || ParseError::MalformedPackageSet {
        event_id: id,
        field: "modulestream_maps".to_string(),
        reason: "expected a list of {in_modulestream, out_modulestream} objects".to_string(),
    };

    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(malformed()),
    };

    items
        .iter()
        .map(|item| {
            let obj = item.as_object().ok_or_else(malformed)?;
            let from = parse_stream(obj.get("in_modulestream").unwrap_or(&Value::Null))
                .ok_or_else(malformed)?;
            let to = parse_stream(obj.get("out_modulestream").unwrap_or(&Value::Null))
                .ok_or_else(malformed)?;
            Ok((from, to))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
