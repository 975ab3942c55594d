//! Upgrade plan assembly
//!
//! Runs the whole pipeline for one upgrade attempt over already-loaded
//! catalogs: event filtering, the package transaction, and target repository
//! selection (including the families the transaction needs).
//!
//! # What This Explicitly Refuses To Do
//!
//! - Decide whether the upgrade may proceed: diagnostics are returned, not
//!   judged
//! - Touch the system: enabling repositories and running the transaction
//!   belong to the caller

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::catalog::{
    PackageEventCatalog, RepositoryCatalog, RepositoryRecord, filter_by_architecture,
    filter_by_release,
};
use crate::config::UpgradeContext;
use crate::diagnostics::Diagnostic;
use crate::error::{Result, UpgradeError};
use crate::logic::planner::{InstalledPackage, TransactionPlan, plan_with_streams};
use crate::logic::resolver::RepositoryResolver;
use crate::types::Release;

/// Facts about the running system, gathered by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFacts {
    #[serde(default)]
    pub enabled_repoids: Vec<String>,
    #[serde(default)]
    pub installed: BTreeSet<InstalledPackage>,
}

impl SystemFacts {
    /// Parse facts gathered by the caller.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Everything the orchestrator needs to perform the upgrade transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePlan {
    pub source: Release,
    pub target: Release,
    /// Target family -> chosen repository, or `None` when unresolved
    pub target_repos: BTreeMap<String, Option<RepositoryRecord>>,
    pub transaction: TransactionPlan,
    pub diagnostics: Vec<Diagnostic>,
}

impl UpgradePlan {
    /// Sorted repoids to enable on the target system.
    pub fn target_repoids(&self) -> Vec<&str> {
        let repoids: BTreeSet<&str> = self
            .target_repos
            .values()
            .flatten()
            .map(|r| r.repoid.as_str())
            .collect();
        repoids.into_iter().collect()
    }
}

/// Build both catalogs for the upgrade path described by `context`.
///
/// Fails when either document is malformed or when the repository mapping
/// has no rules at all for the context's source -> target major versions.
pub fn load_catalogs(
    repomap_text: &str,
    events_text: &str,
    context: &UpgradeContext,
) -> Result<(RepositoryCatalog, PackageEventCatalog)> {
    let repositories = RepositoryCatalog::from_json_str(repomap_text, context.default_families())?;
    if repositories
        .mapping_for(&context.source_major(), &context.target_major())
        .is_none()
    {
        return Err(UpgradeError::context(format!(
            "repository mapping has no rules for {} -> {}",
            context.source_major(),
            context.target_major()
        )));
    }
    let events = PackageEventCatalog::from_json_str(events_text)?;
    Ok((repositories, events))
}

/// Build the upgrade plan for one system.
pub fn plan_upgrade(
    repositories: &RepositoryCatalog,
    events: &PackageEventCatalog,
    context: &UpgradeContext,
    facts: &SystemFacts,
) -> UpgradePlan {
    let arch = context.architecture;
    let in_window = filter_by_release(events.events(), context.source, context.target);

    // Only events on this upgrade path can be reported as dropped.
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for event in in_window.iter().filter(|e| !e.applies_to(arch)) {
        let diagnostic = Diagnostic::ForeignArchitectureEvent {
            event_id: event.id,
            architecture: arch,
        };
        warn!("{}", diagnostic);
        diagnostics.push(diagnostic);
    }

    let relevant = filter_by_architecture(&in_window, arch);
    let transaction = plan_with_streams(&relevant, &facts.installed);

    let resolver = RepositoryResolver::new(repositories, context);
    let mut repos = resolver.plan_target_repos(&facts.enabled_repoids);
    resolver.extend_with_families(&mut repos, &transaction.repos_to_enable);

    diagnostics.extend(repos.diagnostics);
    diagnostics.sort();
    diagnostics.dedup();

    info!(
        "Upgrade plan {} -> {}: {} events applied, {} target repositories, {} diagnostics",
        context.source,
        context.target,
        relevant.len(),
        repos.targets.len(),
        diagnostics.len()
    );

    UpgradePlan {
        source: context.source,
        target: context.target,
        target_repos: repos.targets,
        transaction,
        diagnostics,
    }
}
