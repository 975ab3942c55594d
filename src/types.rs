//! Type-safe vocabulary shared by the catalogs, resolver, and planner
//!
//! Enumerations with a closed value set use strum derives; `Channel` keeps an
//! `Other` variant because support tracks are added upstream without notice.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

/// CPU architecture of a repository or a package event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize, Display, EnumString, EnumIter)]
pub enum Architecture {
    #[default]
    #[strum(serialize = "x86_64")]
    #[serde(rename = "x86_64")]
    X86_64,
    #[strum(serialize = "aarch64")]
    #[serde(rename = "aarch64")]
    Aarch64,
    #[strum(serialize = "ppc64le")]
    #[serde(rename = "ppc64le")]
    Ppc64le,
    #[strum(serialize = "s390x")]
    #[serde(rename = "s390x")]
    S390x,
}

/// Package evolution action, encoded as 0..=7 in the event document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Present,
    Removed,
    Deprecated,
    Replaced,
    Split,
    Merged,
    Moved,
    Renamed,
}

impl EventAction {
    /// Decode the integer action code used by the event document.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Present),
            1 => Some(Self::Removed),
            2 => Some(Self::Deprecated),
            3 => Some(Self::Replaced),
            4 => Some(Self::Split),
            5 => Some(Self::Merged),
            6 => Some(Self::Moved),
            7 => Some(Self::Renamed),
            _ => None,
        }
    }

    pub fn code(&self) -> u64 {
        *self as u64
    }
}

/// Repository support track.
///
/// Priority when several candidates compete for one target family:
/// `beta < ga < anything else`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Beta,
    Ga,
    Eus,
    E4s,
    Aus,
    Tus,
    Other(String),
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Channel::Beta => "beta",
            Channel::Ga => "ga",
            Channel::Eus => "eus",
            Channel::E4s => "e4s",
            Channel::Aus => "aus",
            Channel::Tus => "tus",
            Channel::Other(value) => value.as_str(),
        }
    }

    /// Tie-break rank; higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            Channel::Beta => 0,
            Channel::Ga => 1,
            _ => 2,
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "beta" => Channel::Beta,
            "ga" => Channel::Ga,
            "eus" => Channel::Eus,
            "e4s" => Channel::E4s,
            "aus" => Channel::Aus,
            "tus" => Channel::Tus,
            other => Channel::Other(other.to_string()),
        }
    }
}

impl From<&str> for Channel {
    fn from(value: &str) -> Self {
        Channel::parse(value)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Channel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Channel::parse(&value))
    }
}

/// An OS release such as `8.10`. Orders by (major, minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Release {
    pub major: u32,
    pub minor: u32,
}

impl Release {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Major version in the string form the repository document uses.
    pub fn major_version(&self) -> String {
        self.major.to_string()
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Release {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("release '{}' must look like MAJOR.MINOR", s))?;
        let major = major
            .parse()
            .map_err(|_| format!("invalid major version in '{}'", s))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("invalid minor version in '{}'", s))?;
        Ok(Self { major, minor })
    }
}

impl Serialize for Release {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Release {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// A (module name, stream) identity. `Option<ModuleStream>::None` is a
/// non-modular package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleStream {
    pub name: String,
    pub stream: String,
}

impl ModuleStream {
    pub fn new(name: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
        }
    }
}

impl fmt::Display for ModuleStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_architecture_strings() {
        assert_eq!(Architecture::X86_64.to_string(), "x86_64");
        assert_eq!("s390x".parse::<Architecture>().unwrap(), Architecture::S390x);
        assert!("i686".parse::<Architecture>().is_err());
        let json = serde_json::to_string(&Architecture::Ppc64le).unwrap();
        assert_eq!(json, "\"ppc64le\"");
    }

    #[test]
    fn test_action_codes_follow_declaration_order() {
        for (code, action) in EventAction::iter().enumerate() {
            assert_eq!(EventAction::from_code(code as u64), Some(action));
            assert_eq!(action.code(), code as u64);
        }
        assert_eq!(EventAction::from_code(8), None);
        assert_eq!(EventAction::Split.to_string(), "split");
    }

    #[test]
    fn test_channel_priority() {
        assert!(Channel::Beta.priority() < Channel::Ga.priority());
        assert!(Channel::Ga.priority() < Channel::Eus.priority());
        assert_eq!(
            Channel::Other("htb".into()).priority(),
            Channel::E4s.priority()
        );
    }

    #[test]
    fn test_channel_keeps_unknown_values() {
        let parsed: Channel = serde_json::from_str("\"htb\"").unwrap();
        assert_eq!(parsed, Channel::Other("htb".into()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"htb\"");
        assert_eq!(Channel::from("eus"), Channel::Eus);
    }

    #[test]
    fn test_release_parse_and_order() {
        let r: Release = "8.10".parse().unwrap();
        assert_eq!(r, Release::new(8, 10));
        assert!(Release::new(8, 9) < Release::new(8, 10));
        assert!(Release::new(8, 10) < Release::new(9, 0));
        assert_eq!(r.major_version(), "8");
        assert!("8".parse::<Release>().is_err());
        assert!("eight.1".parse::<Release>().is_err());
    }
}
