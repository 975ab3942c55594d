//! Package Transaction Planner
//!
//! Turns the package events relevant to this system into install and remove
//! sets for the upgrade transaction.
//!
//! # Design
//!
//! - **Pure logic**: No I/O; the caller supplies the installed package set
//! - **Deterministic**: All outputs are sorted sets
//! - **Union semantics**: Several events touching one package contribute it
//!   once
//!
//! An event applies when any of its input packages is installed. It then
//! contributes every input name to `to_remove`, every output name to
//! `to_install`, and the repository labels of its outputs to
//! `repos_to_enable`. Those labels are target family ids; turning them into
//! concrete repoids is the resolver's job.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::catalog::{PackageEvent, PackageRef};
use crate::types::ModuleStream;

/// Package changes for the upgrade transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionPlan {
    pub to_install: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    /// Target family ids the installed packages will come from
    pub repos_to_enable: BTreeSet<String>,
}

impl TransactionPlan {
    /// Names both removed and installed: the package survives but is
    /// re-provided by another repository or stream (Present, Moved).
    pub fn reprovided(&self) -> Vec<&str> {
        self.to_install
            .intersection(&self.to_remove)
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.to_install.is_empty() && self.to_remove.is_empty()
    }

    fn apply(&mut self, event: &PackageEvent) {
        self.to_remove
            .extend(event.in_packages.iter().map(|p| p.name.clone()));
        self.to_install
            .extend(event.out_packages.iter().map(|p| p.name.clone()));
        self.repos_to_enable
            .extend(event.out_packages.iter().map(|p| p.repository.clone()));
    }
}

/// An installed package together with the module stream it was installed
/// from (`None` for non-modular packages).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    #[serde(default)]
    pub modulestream: Option<ModuleStream>,
}

impl InstalledPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modulestream: None,
        }
    }

    pub fn with_stream(mut self, stream: ModuleStream) -> Self {
        self.modulestream = Some(stream);
        self
    }
}

/// Plan the transaction for installed package names.
///
/// Matching is by name only; use [`plan_with_streams`] when the installed
/// module streams are known.
pub fn plan(events: &[PackageEvent], installed: &BTreeSet<String>) -> TransactionPlan {
    plan_matching(events, |pkg| installed.contains(&pkg.name))
}

/// Plan the transaction for installed (name, module stream) pairs.
///
/// An event input only matches an installed package from the same stream,
/// so a record decompressed per stream applies only to the stream in use.
pub fn plan_with_streams(
    events: &[PackageEvent],
    installed: &BTreeSet<InstalledPackage>,
) -> TransactionPlan {
    plan_matching(events, |pkg| {
        installed.iter().any(|i| i.name == pkg.name && i.modulestream == pkg.modulestream)
    })
}

fn plan_matching<F>(events: &[PackageEvent], is_installed: F) -> TransactionPlan
where
    F: Fn(&PackageRef) -> bool,
{
    let mut plan = TransactionPlan::default();
    for event in events {
        if event.in_packages.iter().any(&is_installed) {
            debug!("Applying {} event {}", event.action, event.id);
            plan.apply(event);
        }
    }
    debug!(
        "Transaction plan: {} to install, {} to remove",
        plan.to_install.len(),
        plan.to_remove.len()
    );
    plan
}

// ============================================================================
// Tests
// ============================================================================
