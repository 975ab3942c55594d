use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Upgrade Planner - repository mapping and package evolution planning
#[derive(Parser)]
#[command(name = "upgrade-planner")]
#[command(
    about = "Resolve target repositories and package changes for an OS major-version upgrade"
)]
#[command(version)]
pub struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a repository mapping document
    ValidateRepomap {
        /// Path to the repository mapping JSON document
        document: PathBuf,

        /// Print the mapping rules for SOURCE:TARGET major versions (e.g. 8:9)
        #[arg(long)]
        mapping: Option<String>,
    },
    /// Validate a package event document
    ValidateEvents {
        /// Path to the package event JSON document
        document: PathBuf,
    },
    /// Compute the upgrade plan for one system
    Plan {
        /// Repository mapping document
        #[arg(long)]
        repomap: PathBuf,

        /// Package event document
        #[arg(long)]
        events: PathBuf,

        /// Upgrade context (source/target release, architecture, channels)
        #[arg(long)]
        context: PathBuf,

        /// System facts (enabled repoids, installed packages)
        #[arg(long)]
        facts: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Split a `SOURCE:TARGET` major version pair.
pub fn parse_version_pair(pair: &str) -> Option<(String, String)> {
    let (source, target) = pair.split_once(':')?;
    let (source, target) = (source.trim(), target.trim());
    if source.is_empty() || target.is_empty() {
        return None;
    }
    Some((source.to_string(), target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_command() {
        let cli = Cli::try_parse_from([
            "upgrade-planner",
            "--pretty",
            "plan",
            "--repomap",
            "repomap.json",
            "--events",
            "pes-events.json",
            "--context",
            "context.json",
            "--facts",
            "facts.json",
        ])
        .unwrap();
        assert!(cli.pretty);
        match cli.command {
            Commands::Plan { repomap, events, .. } => {
                assert_eq!(repomap, PathBuf::from("repomap.json"));
                assert_eq!(events, PathBuf::from("pes-events.json"));
            }
            _ => panic!("expected plan command"),
        }
    }

    #[test]
    fn test_plan_requires_all_inputs() {
        let result = Cli::try_parse_from(["upgrade-planner", "plan", "--repomap", "r.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_version_pair() {
        assert_eq!(
            parse_version_pair("8:9"),
            Some(("8".to_string(), "9".to_string()))
        );
        assert_eq!(parse_version_pair("8"), None);
        assert_eq!(parse_version_pair(":9"), None);
    }
}
