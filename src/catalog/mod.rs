//! Catalogs: validated, read-only views over the upgrade data documents.
//!
//! Both catalogs are built once from an immutable document snapshot and never
//! mutated afterwards. Parsing walks `serde_json::Value` by hand so every
//! structural problem maps to a typed error kind instead of a serde message.
//!
//! # Modules
//!
//! - `repositories`: repository families and cross-version mapping rules
//! - `events`: package evolution events, with module-stream decompression

pub mod events;
pub mod repositories;

pub use events::{
    PackageEntry, PackageEvent, PackageEventCatalog, PackageRef, filter_by_architecture,
    filter_by_release,
};
pub use repositories::{
    DefaultFamilies, MappingEntry, RepositoryCatalog, RepositoryRecord, SUPPORTED_SCHEMA_VERSION,
};
