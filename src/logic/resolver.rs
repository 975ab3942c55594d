//! Repository Resolver
//!
//! Chooses, for every enabled source repository, the target repository that
//! should supply the same content after the upgrade.
//!
//! # Design
//!
//! - **Pure logic**: Queries over a [`RepositoryCatalog`] and an
//!   [`UpgradeContext`]; no I/O, no mutable state
//! - **Deterministic**: Enabled repoids are processed in sorted order and all
//!   outputs are ordered maps or sorted lists
//! - **Misses are data**: An unresolved family is a [`Diagnostic`], never an
//!   error
//!
//! # Resolution Rules
//!
//! | Step              | Rule |
//! |-------------------|------|
//! | Source lookup     | Same repoid at the source major; cloud tag == provider, else CDN |
//! | Candidate filter  | Target family at target major, same cloud tag, same arch, `rpm` |
//! | Channel           | Preferred channel (or the source's), then fallbacks in order |
//! | Collisions        | Several sources into one family: highest channel priority wins |

use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::catalog::{RepositoryCatalog, RepositoryRecord};
use crate::config::UpgradeContext;
use crate::diagnostics::Diagnostic;
use crate::types::Channel;

const RPM_REPO_TYPE: &str = "rpm";

// ============================================================================
// Resolution Result
// ============================================================================

/// Target repository chosen per target family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetRepoPlan {
    /// Target family -> chosen record, or `None` when nothing matched
    pub targets: BTreeMap<String, Option<RepositoryRecord>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TargetRepoPlan {
    /// Sorted repoids of every resolved family.
    pub fn resolved_repoids(&self) -> Vec<&str> {
        let repoids: BTreeSet<&str> = self
            .targets
            .values()
            .flatten()
            .map(|r| r.repoid.as_str())
            .collect();
        repoids.into_iter().collect()
    }

    /// Families for which no repository was found.
    pub fn unresolved(&self) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|(_, record)| record.is_none())
            .map(|(pesid, _)| pesid.as_str())
            .collect()
    }

    fn finish(&mut self) {
        self.diagnostics.sort();
        self.diagnostics.dedup();
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Read-only resolver over one catalog and one upgrade context.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryResolver<'a> {
    catalog: &'a RepositoryCatalog,
    context: &'a UpgradeContext,
}

impl<'a> RepositoryResolver<'a> {
    pub fn new(catalog: &'a RepositoryCatalog, context: &'a UpgradeContext) -> Self {
        Self { catalog, context }
    }

    /// Find the target-family record equivalent to `source`.
    ///
    /// Candidates must share the source's cloud-mirror tag, run on the
    /// context architecture, and be `rpm` repositories. The preferred channel
    /// (or the source's own channel) wins; otherwise the fallback channels are
    /// tried in order.
    pub fn resolve_equivalent(
        &self,
        source: &RepositoryRecord,
        target_pesid: &str,
    ) -> Option<&'a RepositoryRecord> {
        let candidates: Vec<&RepositoryRecord> = self
            .catalog
            .families_at(target_pesid, &self.context.target_major())
            .into_iter()
            .filter(|r| {
                r.rhui == source.rhui
                    && r.arch == self.context.architecture
                    && r.repo_type == RPM_REPO_TYPE
            })
            .collect();

        let wanted = self
            .context
            .preferred_channel
            .as_ref()
            .unwrap_or(&source.channel);
        let chosen = pick_by_channel(&candidates, wanted, &self.context.fallback_channels);

        debug!(
            "Equivalent of {} in {}: {:?}",
            source.repoid,
            target_pesid,
            chosen.map(|r| r.repoid.as_str())
        );
        chosen
    }

    /// Look up the record behind a repoid.
    ///
    /// Public-cloud mirrors reuse repoids, so several records may match. The
    /// record tagged with `cloud_provider` wins, then the CDN record; if
    /// neither exists `None` is returned. A repoid known only as another
    /// provider's mirror is never handed to this system.
    pub fn resolve_by_repoid(
        &self,
        repoid: &str,
        major_version: &str,
        cloud_provider: &str,
    ) -> Option<&'a RepositoryRecord> {
        let records = self.catalog.records_by_repoid(repoid, major_version);
        let same_arch: Vec<&RepositoryRecord> = records
            .iter()
            .copied()
            .filter(|r| r.arch == self.context.architecture)
            .collect();
        let records = if same_arch.is_empty() { records } else { same_arch };

        records
            .iter()
            .find(|r| r.rhui == cloud_provider)
            .or_else(|| records.iter().find(|r| r.is_cdn()))
            .copied()
    }

    /// Choose a target repository for every family reachable from the
    /// enabled source repositories.
    ///
    /// # What This Explicitly Refuses To Do
    ///
    /// - Fail on a miss: unresolved families are kept as `None` with a
    ///   diagnostic; the caller decides whether that blocks the upgrade
    /// - Guess for unknown repoids: custom repositories are reported, not
    ///   mapped
    pub fn plan_target_repos<S: AsRef<str>>(&self, enabled_repoids: &[S]) -> TargetRepoPlan {
        let source_major = self.context.source_major();
        let target_major = self.context.target_major();
        let provider = self.context.cloud_provider.as_str();

        let enabled: BTreeSet<&str> = enabled_repoids.iter().map(|s| s.as_ref()).collect();
        let mut plan = TargetRepoPlan::default();

        for repoid in enabled {
            let Some(source) = self.resolve_by_repoid(repoid, &source_major, provider) else {
                let known = !self.catalog.records_by_repoid(repoid, &source_major).is_empty();
                let diagnostic = if known {
                    Diagnostic::AmbiguousSourceRepository {
                        repoid: repoid.to_string(),
                        cloud_provider: provider.to_string(),
                    }
                } else {
                    Diagnostic::UnknownSourceRepository {
                        repoid: repoid.to_string(),
                    }
                };
                warn!("Skipping enabled repository: {}", diagnostic);
                plan.diagnostics.push(diagnostic);
                continue;
            };

            let target_pesids = self
                .catalog
                .targets_of(&source.pesid, &source_major, &target_major);
            if target_pesids.is_empty() {
                let diagnostic = Diagnostic::UnmappedSourceFamily {
                    pesid: source.pesid.clone(),
                };
                warn!("{}", diagnostic);
                plan.diagnostics.push(diagnostic);
                continue;
            }

            for target_pesid in target_pesids {
                let candidate = self.resolve_equivalent(source, &target_pesid);
                merge_candidate(&mut plan.targets, target_pesid, candidate);
            }
        }

        for (pesid, record) in &plan.targets {
            if record.is_none() {
                let diagnostic = Diagnostic::MissingTargetRepository {
                    pesid: pesid.clone(),
                };
                warn!("{}", diagnostic);
                plan.diagnostics.push(diagnostic);
            }
        }

        plan.finish();
        plan
    }

    /// Choose a target record for a family that no source repository maps
    /// to (e.g. one named by a package event).
    pub fn resolve_family(&self, target_pesid: &str) -> Option<&'a RepositoryRecord> {
        let candidates: Vec<&RepositoryRecord> = self
            .catalog
            .families_at(target_pesid, &self.context.target_major())
            .into_iter()
            .filter(|r| {
                r.rhui == self.context.cloud_provider
                    && r.arch == self.context.architecture
                    && r.repo_type == RPM_REPO_TYPE
            })
            .collect();

        let wanted = self.context.preferred_channel.clone().unwrap_or(Channel::Ga);
        pick_by_channel(&candidates, &wanted, &self.context.fallback_channels)
    }

    /// Add families requested by the package transaction to a plan.
    ///
    /// Families already present are left untouched.
    pub fn extend_with_families<I, S>(&self, plan: &mut TargetRepoPlan, pesids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pesid in pesids {
            let pesid = pesid.as_ref();
            if plan.targets.contains_key(pesid) {
                continue;
            }
            let record = self.resolve_family(pesid).cloned();
            if record.is_none() {
                let diagnostic = Diagnostic::MissingTargetRepository {
                    pesid: pesid.to_string(),
                };
                warn!("{}", diagnostic);
                plan.diagnostics.push(diagnostic);
            }
            plan.targets.insert(pesid.to_string(), record);
        }
        plan.finish();
    }

    /// Family owning a source repoid; unknown repoids fall back to the
    /// default family of the source major version.
    pub fn source_family_of(&self, repoid: &str) -> Option<String> {
        let source_major = self.context.source_major();
        if let Some(record) =
            self.resolve_by_repoid(repoid, &source_major, &self.context.cloud_provider)
        {
            return Some(record.pesid.clone());
        }
        match self.catalog.records_by_repoid(repoid, &source_major).first() {
            Some(record) => Some(record.pesid.clone()),
            None => self.catalog.default_family(&source_major).map(str::to_string),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn pick_by_channel<'r>(
    candidates: &[&'r RepositoryRecord],
    wanted: &Channel,
    fallbacks: &[Channel],
) -> Option<&'r RepositoryRecord> {
    candidates
        .iter()
        .find(|r| &r.channel == wanted)
        .or_else(|| {
            fallbacks
                .iter()
                .find_map(|channel| candidates.iter().find(|r| &r.channel == channel))
        })
        .copied()
}

/// Keep the higher-priority channel when two sources land on one family.
/// Ties keep the record seen first.
fn merge_candidate(
    targets: &mut BTreeMap<String, Option<RepositoryRecord>>,
    pesid: String,
    candidate: Option<&RepositoryRecord>,
) {
    match targets.entry(pesid) {
        Entry::Vacant(slot) => {
            slot.insert(candidate.cloned());
        }
        Entry::Occupied(mut slot) => {
            let Some(candidate) = candidate else { return };
            let replace = match slot.get() {
                None => true,
                Some(current) => candidate.channel.priority() > current.channel.priority(),
            };
            if replace {
                slot.insert(Some(candidate.clone()));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
