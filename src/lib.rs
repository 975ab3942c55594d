//! Upgrade Planner Library
//!
//! Repository mapping and package evolution planning for OS major-version
//! upgrades. Everything here is a pure computation over immutable document
//! snapshots: no command execution, no network, no on-disk changes.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logic;
pub mod types;
pub mod upgrade;

// Re-export main types for convenience
pub use catalog::{
    DefaultFamilies, MappingEntry, PackageEvent, PackageEventCatalog, PackageRef,
    RepositoryCatalog, RepositoryRecord, SUPPORTED_SCHEMA_VERSION, filter_by_architecture,
    filter_by_release,
};
pub use config::UpgradeContext;
pub use diagnostics::Diagnostic;
pub use error::{ConfigError, ParseError, Result, UpgradeError};
pub use types::{Architecture, Channel, EventAction, ModuleStream, Release};

// Resolver and planner
pub use logic::planner::{InstalledPackage, TransactionPlan, plan, plan_with_streams};
pub use logic::resolver::{RepositoryResolver, TargetRepoPlan};

// Whole-pipeline assembly
pub use upgrade::{SystemFacts, UpgradePlan, load_catalogs, plan_upgrade};
