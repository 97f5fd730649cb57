//! Purpose: Local artifact repository layout and metadata lookup.
//! Exports: `Repository`, `ArtifactMetadata`, `default_repo_dir`, `artifact_rel_path`.
//! Role: Keep CLI and resolver path semantics aligned from one source.
//! Invariants: Layout is `<group as path>/<name>/<version>/<name>-<version>.jar`
//! with a sibling `<name>-<version>.deps.json` metadata file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::coordinate::Coordinate;
use crate::core::error::{Error, ErrorKind};

pub fn default_repo_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".shadepack").join("repo")
}

/// Repository-relative artifact path, shared by local lookup and publishing.
pub fn artifact_rel_path(coordinate: &Coordinate) -> String {
    format!(
        "{}/{}/{}/{}",
        coordinate.group_path(),
        coordinate.name,
        coordinate.version,
        coordinate.file_name()
    )
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ArtifactMetadata {
    pub coordinate: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.root.join(artifact_rel_path(coordinate))
    }

    pub fn metadata_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.artifact_path(coordinate)
            .with_file_name(format!(
                "{}-{}.deps.json",
                coordinate.name, coordinate.version
            ))
    }

    /// Resolves a coordinate to its on-disk artifact, verifying presence.
    pub fn locate(&self, coordinate: &Coordinate) -> Result<PathBuf, Error> {
        let path = self.artifact_path(coordinate);
        if !path.is_file() {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message("artifact not present in repository")
                .with_coordinate(coordinate.to_string())
                .with_path(path)
                .with_hint("Install the artifact into the repository, or fix the coordinate."));
        }
        Ok(path)
    }

    pub fn load_metadata(&self, coordinate: &Coordinate) -> Result<ArtifactMetadata, Error> {
        let path = self.metadata_path(coordinate);
        let text = fs::read_to_string(&path).map_err(|err| {
            Error::new(ErrorKind::NotFound)
                .with_message("artifact metadata not present in repository")
                .with_coordinate(coordinate.to_string())
                .with_path(&path)
                .with_source(err)
        })?;
        let metadata: ArtifactMetadata = serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("artifact metadata is not valid JSON")
                .with_coordinate(coordinate.to_string())
                .with_path(&path)
                .with_source(err)
        })?;
        Ok(metadata)
    }
}
