//! Purpose: Load and validate the `shadepack.toml` project descriptor.
//! Exports: `ProjectConfig`, `PackageInfo`, `MinimizeConfig`, `PublishConfig`, `load`.
//! Role: Single place where raw configuration becomes typed pipeline input.
//! Invariants: A loaded `ProjectConfig` is fully validated; later stages never
//! re-check coordinate syntax, rule syntax, or destination uniqueness.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::coordinate::{Coordinate, DependencyDecl, ExclusionPattern, Scope};
use crate::core::error::{Error, ErrorKind};
use crate::core::minimize::KeepPattern;
use crate::core::relocate::{RelocationRule, is_namespace_prefix};

pub const DEFAULT_CONFIG_FILE: &str = "shadepack.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    package: PackageSection,
    #[serde(default)]
    dependency: Vec<DependencySection>,
    #[serde(default)]
    relocation: Vec<RelocationSection>,
    #[serde(default)]
    minimize: MinimizeSection,
    publish: Option<PublishConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageSection {
    name: String,
    group: String,
    version: String,
    entry_point: String,
    author: String,
    #[serde(default)]
    description: String,
    api_version: String,
    #[serde(default)]
    depend: Vec<String>,
    #[serde(default)]
    soft_depend: Vec<String>,
    classes: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencySection {
    coordinate: String,
    scope: Scope,
    #[serde(default)]
    exclude: Vec<ExclusionPattern>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelocationSection {
    from: String,
    to: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MinimizeSection {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    keep: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    pub release_url: String,
    pub snapshot_url: String,
}

#[derive(Clone, Debug)]
pub struct PackageInfo {
    pub name: String,
    pub group: String,
    pub version: String,
    pub entry_point: String,
    pub author: String,
    pub description: String,
    pub api_version: String,
    pub depend: Vec<String>,
    pub soft_depend: Vec<String>,
    /// Compiled class tree, relative to the project directory.
    pub classes: PathBuf,
}

#[derive(Clone, Debug)]
pub struct MinimizeConfig {
    pub enabled: bool,
    pub keep: Vec<KeepPattern>,
}

#[derive(Clone, Debug)]
pub struct ProjectConfig {
    pub package: PackageInfo,
    pub dependencies: Vec<DependencyDecl>,
    pub relocations: Vec<RelocationRule>,
    pub minimize: MinimizeConfig,
    pub publish: Option<PublishConfig>,
}

pub fn load(path: &Path) -> Result<ProjectConfig, Error> {
    let text = fs::read_to_string(path).map_err(|err| {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::Io
        };
        Error::new(kind)
            .with_message("cannot read project configuration")
            .with_path(path)
            .with_hint("Run from the project directory, or pass --config.")
            .with_source(err)
    })?;
    let raw: ConfigFile = toml::from_str(&text).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid project configuration")
            .with_path(path)
            .with_source(err)
    })?;
    validate(raw, path)
}

fn validate(raw: ConfigFile, path: &Path) -> Result<ProjectConfig, Error> {
    let usage = |message: &str| {
        Error::new(ErrorKind::Usage)
            .with_message(message.to_string())
            .with_path(path)
    };

    for (field, value) in [
        ("package.name", &raw.package.name),
        ("package.group", &raw.package.group),
        ("package.version", &raw.package.version),
        ("package.entry_point", &raw.package.entry_point),
        ("package.author", &raw.package.author),
        ("package.api_version", &raw.package.api_version),
    ] {
        if value.is_empty() {
            return Err(usage(&format!("{field} must not be empty")));
        }
    }
    if raw.package.name.contains(['/', '\\']) || raw.package.name.chars().any(char::is_whitespace)
    {
        return Err(usage("package.name must not contain separators or whitespace"));
    }

    let mut dependencies = Vec::with_capacity(raw.dependency.len());
    for section in raw.dependency {
        let coordinate = Coordinate::parse(&section.coordinate)?;
        if dependencies
            .iter()
            .any(|decl: &DependencyDecl| decl.coordinate.module_id() == coordinate.module_id())
        {
            return Err(usage(&format!(
                "dependency {} is declared more than once",
                coordinate.module_id()
            )));
        }
        dependencies.push(DependencyDecl {
            coordinate,
            scope: section.scope,
            exclusions: section.exclude,
        });
    }

    let mut relocations: Vec<RelocationRule> = Vec::with_capacity(raw.relocation.len());
    for section in &raw.relocation {
        let rule = RelocationRule::new(&section.from, &section.to)?;
        for existing in &relocations {
            if is_namespace_prefix(existing.source(), rule.source())
                || is_namespace_prefix(rule.source(), existing.source())
            {
                return Err(usage(&format!(
                    "relocation sources {} and {} overlap",
                    existing.source(),
                    rule.source()
                )));
            }
            if is_namespace_prefix(existing.dest(), rule.dest())
                || is_namespace_prefix(rule.dest(), existing.dest())
            {
                return Err(usage(&format!(
                    "relocation destinations {} and {} overlap; destinations must be unique",
                    existing.dest(),
                    rule.dest()
                )));
            }
            if is_namespace_prefix(existing.dest(), rule.source())
                || is_namespace_prefix(rule.dest(), existing.source())
            {
                return Err(usage(&format!(
                    "relocation source {} overlaps another rule's destination",
                    rule.source()
                )));
            }
        }
        relocations.push(rule);
    }

    let mut keep = Vec::with_capacity(raw.minimize.keep.len());
    for pattern in &raw.minimize.keep {
        keep.push(KeepPattern::parse(pattern)?);
    }

    Ok(ProjectConfig {
        package: PackageInfo {
            name: raw.package.name,
            group: raw.package.group,
            version: raw.package.version,
            entry_point: raw.package.entry_point,
            author: raw.package.author,
            description: raw.package.description,
            api_version: raw.package.api_version,
            depend: raw.package.depend,
            soft_depend: raw.package.soft_depend,
            classes: raw.package.classes,
        },
        dependencies,
        relocations,
        minimize: MinimizeConfig {
            enabled: raw.minimize.enabled,
            keep,
        },
        publish: raw.publish,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::load;
    use crate::core::coordinate::Scope;
    use crate::core::error::ErrorKind;

    const MINIMAL: &str = r#"
[package]
name = "fishing"
group = "dev.oribuin"
version = "1.0"
entry_point = "dev.oribuin.fishing.FishingPlugin"
author = "Oribuin"
description = "hello"
api_version = "1.21"
soft_depend = ["Vault"]
classes = "build/classes"
"#;

    fn write_config(dir: &Path, text: &str) -> std::path::PathBuf {
        let path = dir.join("shadepack.toml");
        std::fs::write(&path, text).expect("write config");
        path
    }

    #[test]
    fn minimal_config_loads() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = load(&write_config(temp.path(), MINIMAL)).unwrap();
        assert_eq!(config.package.name, "fishing");
        assert_eq!(config.package.soft_depend, ["Vault"]);
        assert!(config.dependencies.is_empty());
        assert!(!config.minimize.enabled);
        assert!(config.publish.is_none());
    }

    #[test]
    fn full_config_loads_typed_sections() {
        let temp = tempfile::tempdir().expect("tempdir");
        let text = format!(
            r#"{MINIMAL}
[[dependency]]
coordinate = "dev.rosewood:rosegarden:1.5.1"
scope = "api"

[[dependency]]
coordinate = "io.papermc.paper:paper-api:1.21.5-R0.1-SNAPSHOT"
scope = "compile-only"

[[dependency]]
coordinate = "dev.triumphteam:triumph-gui:3.1.11"
scope = "bundled"
exclude = [{{ group = "net.kyori", module = "*" }}]

[[relocation]]
from = "dev.rosewood.rosegarden"
to = "dev.oribuin.fishing.libs.rosegarden"

[minimize]
enabled = true
keep = ["dev.oribuin.fishing.hook.*"]

[publish]
release_url = "https://repo.example.io/releases/"
snapshot_url = "https://repo.example.io/snapshots/"
"#
        );
        let config = load(&write_config(temp.path(), &text)).unwrap();
        assert_eq!(config.dependencies.len(), 3);
        assert_eq!(config.dependencies[0].scope, Scope::Api);
        assert_eq!(config.dependencies[1].scope, Scope::CompileOnly);
        assert_eq!(config.dependencies[2].exclusions.len(), 1);
        assert_eq!(config.relocations.len(), 1);
        assert!(config.minimize.enabled);
        assert_eq!(config.minimize.keep.len(), 1);
        assert!(config.publish.is_some());
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load(&temp.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn overlapping_destinations_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let text = format!(
            r#"{MINIMAL}
[[relocation]]
from = "com.zaxxer"
to = "dev.oribuin.fishing.libs"

[[relocation]]
from = "org.slf4j"
to = "dev.oribuin.fishing.libs.slf4j"
"#
        );
        let err = load(&write_config(temp.path(), &text)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().unwrap().contains("destinations"));
    }

    #[test]
    fn duplicate_modules_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let text = format!(
            r#"{MINIMAL}
[[dependency]]
coordinate = "com.acme:alpha:1.0"
scope = "bundled"

[[dependency]]
coordinate = "com.acme:alpha:2.0"
scope = "bundled"
"#
        );
        let err = load(&write_config(temp.path(), &text)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
