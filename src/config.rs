//! Upgrade context: the caller-supplied facts every query is parameterized by.
//!
//! The context is loaded (or built) before any catalog query runs, so the
//! source/target versions and default families are explicit constructor
//! inputs rather than ambient state.
//!
//! ```json
//! {
//!   "source": "8.10",
//!   "target": "9.4",
//!   "architecture": "x86_64",
//!   "cloud_provider": "aws",
//!   "preferred_channel": "eus",
//!   "fallback_channels": ["ga"]
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::catalog::DefaultFamilies;
use crate::types::{Architecture, Channel, Release};

/// Parameters of one upgrade attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeContext {
    /// Currently running release
    pub source: Release,
    /// Release being upgraded to
    pub target: Release,
    #[serde(default)]
    pub architecture: Architecture,
    /// Cloud-mirror tag of the running system; empty on CDN
    #[serde(default)]
    pub cloud_provider: String,
    /// Overrides the source repository's channel when picking a target repo
    #[serde(default)]
    pub preferred_channel: Option<Channel>,
    /// Channels tried in order when no exact channel match exists
    #[serde(default = "default_fallback_channels")]
    pub fallback_channels: Vec<Channel>,
    /// Baseline family per major version
    #[serde(default = "default_family_table")]
    pub default_families: BTreeMap<String, String>,
}

fn default_fallback_channels() -> Vec<Channel> {
    vec![Channel::Ga]
}

fn default_family_table() -> BTreeMap<String, String> {
    DefaultFamilies::default().into_inner()
}

impl UpgradeContext {
    /// CDN context with default channel handling.
    pub fn new(source: Release, target: Release, architecture: Architecture) -> Self {
        Self {
            source,
            target,
            architecture,
            cloud_provider: String::new(),
            preferred_channel: None,
            fallback_channels: default_fallback_channels(),
            default_families: default_family_table(),
        }
    }

    pub fn with_cloud_provider(mut self, provider: impl Into<String>) -> Self {
        self.cloud_provider = provider.into();
        self
    }

    pub fn with_preferred_channel(mut self, channel: Channel) -> Self {
        self.preferred_channel = Some(channel);
        self
    }

    pub fn with_fallback_channels(mut self, channels: Vec<Channel>) -> Self {
        self.fallback_channels = channels;
        self
    }

    pub fn source_major(&self) -> String {
        self.source.major_version()
    }

    pub fn target_major(&self) -> String {
        self.target.major_version()
    }

    /// The default family table in the form the repository catalog takes.
    pub fn default_families(&self) -> DefaultFamilies {
        DefaultFamilies::new(self.default_families.clone())
    }

    /// Load a context from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read upgrade context from {:?}", path.as_ref()))?;

        let context: Self =
            serde_json::from_str(&content).context("Failed to parse upgrade context JSON")?;

        Ok(context)
    }

    /// Validate the context
    pub fn validate(&self) -> Result<()> {
        if self.target.major <= self.source.major {
            bail!(
                "Target release {} must be a newer major version than source release {}",
                self.target,
                self.source
            );
        }

        if !self.default_families.contains_key(&self.source_major()) {
            bail!(
                "No default repository family configured for source major version {}",
                self.source_major()
            );
        }

        if self
            .cloud_provider
            .chars()
            .any(|c| c.is_whitespace() || c.is_ascii_uppercase())
        {
            bail!(
                "Cloud provider tag '{}' must be lowercase without whitespace",
                self.cloud_provider
            );
        }

        Ok(())
    }
}
