//! Purpose: Orchestrate the packaging pipeline stages in order.
//! Exports: `BuildOptions`, `BuildReport`, `run_build`, `run_resolve`, `run_check`.
//! Role: Threads explicit values between stages; owns no stage logic itself.
//! Invariants: Stage order is resolve, relocate, merge, minimize, stamp,
//! manifest, write, publish; a failed stage aborts before the next one runs.
//! Invariants: No partial artifact is left at the output path on failure.
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::api::{Credentials, artifact_url, publish, select_base_url};
use crate::core::archive::{self, Archive, Entry};
use crate::core::config::{self, ProjectConfig};
use crate::core::error::{Error, ErrorKind};
use crate::core::manifest::{self, MANIFEST_ENTRY};
use crate::core::merge;
use crate::core::minimize;
use crate::core::relocate::{RelocationStats, relocate_archive, rewrite_archive_contents};
use crate::core::repo::Repository;
use crate::core::resolve::{Resolution, resolve};
use crate::core::stamp::{StampOutcome, stamp_version};

#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub config_path: PathBuf,
    pub project_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub output_dir: PathBuf,
    pub strict_stamp: bool,
    /// CLI override for `[minimize] enabled`.
    pub minimize_override: Option<bool>,
    pub credentials: Option<Credentials>,
    pub stamp_timeout: Duration,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublishOutcome {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BuildReport {
    pub project: String,
    pub artifact: PathBuf,
    pub version: String,
    pub stamped: bool,
    pub prerelease: bool,
    pub digest: String,
    pub entries: usize,
    pub plugin_entries: usize,
    pub bundled_artifacts: usize,
    pub renamed_paths: usize,
    pub rewritten_entries: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shadowed: Vec<String>,
    pub removed_classes: usize,
    pub publish: PublishOutcome,
    /// Reason the stamp fell back, for notice emission; not part of the report.
    #[serde(skip)]
    pub stamp_fallback: Option<String>,
}

pub fn run_build(options: &BuildOptions) -> Result<BuildReport, Error> {
    let config = config::load(&options.config_path)?;
    let repo = Repository::new(&options.repo_dir);

    info!(project = %config.package.name, "resolving dependencies");
    let resolution = resolve(&repo, &config.dependencies)?;

    let classes_dir = options.project_dir.join(&config.package.classes);
    let plugin = archive::read_class_dir(&classes_dir)?;
    let plugin_entries = plugin.entries.len();
    // Plugin classes keep their paths; only their references are rewritten.
    let (plugin, plugin_rewritten) = rewrite_archive_contents(plugin, &config.relocations);

    info!(artifacts = resolution.bundled().count(), "relocating bundled dependencies");
    let mut stats = RelocationStats::default();
    stats.rewritten_entries += plugin_rewritten;
    let mut bundled: Vec<Archive> = Vec::new();
    for artifact in resolution.bundled() {
        let read = archive::read_archive(&artifact.path)?;
        let (relocated, artifact_stats) = relocate_archive(read, &config.relocations);
        stats.renamed_paths += artifact_stats.renamed_paths;
        stats.rewritten_entries += artifact_stats.rewritten_entries;
        bundled.push(relocated);
    }
    let bundled_artifacts = bundled.len();

    let merged = merge::merge(plugin, bundled);
    let mut shadowed = merged.shadowed;
    let mut archive = merged.archive;

    let minimize_enabled = options.minimize_override.unwrap_or(config.minimize.enabled);
    let removed_classes = if minimize_enabled {
        let outcome =
            minimize::minimize(archive, &config.package.entry_point, &config.minimize.keep)?;
        archive = outcome.archive;
        outcome.removed.len()
    } else {
        0
    };

    let outcome = stamp_version(
        &options.project_dir,
        options.stamp_timeout,
        &config.package.version,
    );
    let stamp_fallback = match &outcome {
        StampOutcome::Stamped(_) => None,
        StampOutcome::Fallback { reason, .. } => {
            if options.strict_stamp {
                return Err(Error::new(ErrorKind::Internal)
                    .with_message(format!("version stamp failed: {reason}"))
                    .with_hint("Build inside a git checkout, or drop --strict-stamp."));
            }
            Some(reason.clone())
        }
    };
    let context = outcome.context().clone();

    let generated = manifest::generate(&config.package, &context);
    if archive.find(MANIFEST_ENTRY).is_some() {
        archive.entries.retain(|entry| entry.path != MANIFEST_ENTRY);
        shadowed.push(MANIFEST_ENTRY.to_string());
    }
    archive.entries.insert(
        0,
        Entry {
            path: MANIFEST_ENTRY.to_string(),
            bytes: generated.to_yaml()?.into_bytes(),
        },
    );

    std::fs::create_dir_all(&options.output_dir).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_path(&options.output_dir)
            .with_source(err)
    })?;
    let artifact_path = options
        .output_dir
        .join(format!("{}-{}.jar", config.package.name, context.version));
    archive::write_archive(&artifact_path, &archive)?;

    let bytes = std::fs::read(&artifact_path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_path(&artifact_path)
            .with_source(err)
    })?;
    let hash = Sha256::digest(&bytes);
    let mut digest = String::with_capacity(7 + hash.len() * 2);
    digest.push_str("sha256:");
    for byte in hash.iter() {
        digest.push_str(&format!("{byte:02x}"));
    }
    info!(artifact = %artifact_path.display(), version = %context.version, "artifact written");

    let publish_outcome = run_publish_stage(&config, &context, &artifact_path, options)?;

    Ok(BuildReport {
        project: config.package.name.clone(),
        artifact: artifact_path,
        version: context.version.clone(),
        stamped: context.stamped,
        prerelease: context.prerelease(),
        digest,
        entries: archive.entries.len(),
        plugin_entries,
        bundled_artifacts,
        renamed_paths: stats.renamed_paths,
        rewritten_entries: stats.rewritten_entries,
        shadowed,
        removed_classes,
        publish: publish_outcome,
        stamp_fallback,
    })
}

fn run_publish_stage(
    config: &ProjectConfig,
    context: &crate::core::stamp::BuildContext,
    artifact: &std::path::Path,
    options: &BuildOptions,
) -> Result<PublishOutcome, Error> {
    let Some(publish_config) = &config.publish else {
        return Ok(PublishOutcome {
            status: "disabled",
            destination: None,
            reason: None,
        });
    };
    let Some(credentials) = &options.credentials else {
        return Ok(PublishOutcome {
            status: "skipped",
            destination: None,
            reason: Some("no publish credentials provided".to_string()),
        });
    };
    let base = select_base_url(publish_config, context);
    let url = artifact_url(base, &config.package, context)?;
    publish(artifact, &url, credentials)?;
    Ok(PublishOutcome {
        status: "uploaded",
        destination: Some(url.to_string()),
        reason: None,
    })
}

#[derive(Clone, Debug, Serialize)]
pub struct ResolveReport {
    pub project: String,
    pub artifacts: Vec<ResolveReportArtifact>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResolveReportArtifact {
    pub coordinate: String,
    pub scope: &'static str,
    pub bundled: bool,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

pub fn run_resolve(config_path: &PathBuf, repo_dir: &PathBuf) -> Result<ResolveReport, Error> {
    let config = config::load(config_path)?;
    let repo = Repository::new(repo_dir);
    let resolution = resolve(&repo, &config.dependencies)?;
    Ok(resolve_report(&config, &resolution))
}

fn resolve_report(config: &ProjectConfig, resolution: &Resolution) -> ResolveReport {
    ResolveReport {
        project: config.package.name.clone(),
        artifacts: resolution
            .artifacts
            .iter()
            .map(|artifact| ResolveReportArtifact {
                coordinate: artifact.coordinate.to_string(),
                scope: artifact.scope.as_str(),
                bundled: artifact.scope.bundled(),
                path: artifact.path.clone(),
                via: artifact.via.as_ref().map(|via| via.to_string()),
            })
            .collect(),
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckReport {
    pub project: String,
    pub classes_dir: &'static str,
    pub dependencies: Vec<CheckReportDependency>,
    pub resolution: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckReportDependency {
    pub coordinate: String,
    pub scope: &'static str,
    pub artifact: &'static str,
    pub metadata: &'static str,
}

impl CheckReport {
    pub fn healthy(&self) -> bool {
        self.classes_dir == "ok"
            && self.resolution == "ok"
            && self
                .dependencies
                .iter()
                .all(|dep| dep.artifact == "ok" && dep.metadata == "ok")
    }
}

pub fn run_check(
    config_path: &PathBuf,
    project_dir: &PathBuf,
    repo_dir: &PathBuf,
) -> Result<CheckReport, Error> {
    let config = config::load(config_path)?;
    let repo = Repository::new(repo_dir);

    let mut dependencies = Vec::with_capacity(config.dependencies.len());
    for declaration in &config.dependencies {
        let artifact = if repo.locate(&declaration.coordinate).is_ok() {
            "ok"
        } else {
            "missing"
        };
        let metadata = match repo.load_metadata(&declaration.coordinate) {
            Ok(_) => "ok",
            Err(err) if err.kind() == ErrorKind::Corrupt => "corrupt",
            Err(_) => "missing",
        };
        dependencies.push(CheckReportDependency {
            coordinate: declaration.coordinate.to_string(),
            scope: declaration.scope.as_str(),
            artifact,
            metadata,
        });
    }

    let (resolution, resolution_error) = match resolve(&repo, &config.dependencies) {
        Ok(_) => ("ok", None),
        Err(err) => ("failed", Some(err.to_string())),
    };
    let classes_dir = if project_dir.join(&config.package.classes).is_dir() {
        "ok"
    } else {
        "missing"
    };

    Ok(CheckReport {
        project: config.package.name.clone(),
        classes_dir,
        dependencies,
        resolution,
        resolution_error,
    })
}
