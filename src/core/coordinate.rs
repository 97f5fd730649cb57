//! Purpose: Parsed value types for dependency declarations.
//! Exports: `Coordinate`, `Scope`, `ExclusionPattern`, `DependencyDecl`.
//! Role: Strictly-validated inputs shared by the resolver and publish client.
//! Invariants: A `Coordinate` always has non-empty group/name/version segments.
//! Invariants: Exclusion matching treats `*` as a whole-module wildcard only.
use std::fmt;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Coordinate {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl Coordinate {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let mut parts = raw.split(':');
        let (group, name, version) = match (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(group), Some(name), Some(version), None) => (group, name, version),
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("coordinate must be group:name:version")
                    .with_coordinate(raw));
            }
        };
        for segment in [group, name, version] {
            if segment.is_empty() || segment.chars().any(char::is_whitespace) {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("coordinate segments must be non-empty and whitespace-free")
                    .with_coordinate(raw));
            }
        }
        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Version-independent identity used for conflict detection.
    pub fn module_id(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }

    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}.jar", self.name, self.version)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    CompileOnly,
    Bundled,
    Api,
}

impl Scope {
    pub fn bundled(self) -> bool {
        matches!(self, Scope::Bundled | Scope::Api)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::CompileOnly => "compile-only",
            Scope::Bundled => "bundled",
            Scope::Api => "api",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ExclusionPattern {
    pub group: String,
    pub module: String,
}

impl ExclusionPattern {
    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        self.group == coordinate.group && (self.module == "*" || self.module == coordinate.name)
    }
}

#[derive(Clone, Debug)]
pub struct DependencyDecl {
    pub coordinate: Coordinate,
    pub scope: Scope,
    pub exclusions: Vec<ExclusionPattern>,
}

#[cfg(test)]
mod tests {
    use super::{Coordinate, ExclusionPattern, Scope};

    #[test]
    fn parse_accepts_three_segments() {
        let coordinate = Coordinate::parse("dev.rosewood:rosegarden:1.5.1").unwrap();
        assert_eq!(coordinate.group, "dev.rosewood");
        assert_eq!(coordinate.name, "rosegarden");
        assert_eq!(coordinate.version, "1.5.1");
        assert_eq!(coordinate.module_id(), "dev.rosewood:rosegarden");
        assert_eq!(coordinate.group_path(), "dev/rosewood");
        assert_eq!(coordinate.file_name(), "rosegarden-1.5.1.jar");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for raw in ["", "a:b", "a:b:c:d", "a::c", "a:b :1.0"] {
            assert!(Coordinate::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn exclusion_wildcard_matches_whole_group() {
        let rule = ExclusionPattern {
            group: "net.kyori".to_string(),
            module: "*".to_string(),
        };
        let adventure = Coordinate::parse("net.kyori:adventure-api:4.17.0").unwrap();
        let other = Coordinate::parse("net.kyori.moved:adventure-api:4.17.0").unwrap();
        assert!(rule.matches(&adventure));
        assert!(!rule.matches(&other));
    }

    #[test]
    fn scope_bundling() {
        assert!(Scope::Bundled.bundled());
        assert!(Scope::Api.bundled());
        assert!(!Scope::CompileOnly.bundled());
    }
}
