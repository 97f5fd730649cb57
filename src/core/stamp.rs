//! Purpose: Version stamping from source control.
//! Exports: `BuildContext`, `StampOutcome`, `stamp_version`, `query_revision`.
//! Role: Produces the immutable build context consumed by manifest generation
//! and publish-destination selection.
//! Invariants: The git query is bounded; the child is killed on deadline.
//! Invariants: Fallback keeps the declared base version and is observable via
//! `stamped: false`; it never silently impersonates a stamped build.
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_STAMP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildContext {
    pub version: String,
    pub stamped: bool,
}

impl BuildContext {
    /// Pre-release builds publish to the snapshot repository.
    pub fn prerelease(&self) -> bool {
        self.version.ends_with("SNAPSHOT")
    }
}

#[derive(Clone, Debug)]
pub enum StampOutcome {
    Stamped(BuildContext),
    Fallback { context: BuildContext, reason: String },
}

impl StampOutcome {
    pub fn context(&self) -> &BuildContext {
        match self {
            StampOutcome::Stamped(context) => context,
            StampOutcome::Fallback { context, .. } => context,
        }
    }
}

pub fn stamp_version(project_dir: &Path, timeout: Duration, base_version: &str) -> StampOutcome {
    match query_revision(project_dir, timeout) {
        Ok(revision) => {
            debug!(revision = %revision, "stamped build from source control");
            StampOutcome::Stamped(BuildContext {
                version: revision,
                stamped: true,
            })
        }
        Err(err) => StampOutcome::Fallback {
            context: BuildContext {
                version: base_version.to_string(),
                stamped: false,
            },
            reason: err.to_string(),
        },
    }
}

/// Short revision hash of the project directory's HEAD.
pub fn query_revision(project_dir: &Path, timeout: Duration) -> Result<String, Error> {
    let mut child = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(project_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to invoke git")
                .with_source(err)
        })?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::new(ErrorKind::Io)
                        .with_message("git rev-parse timed out")
                        .with_hint("Source control is unresponsive; the stamp fails closed."));
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("failed waiting for git")
                    .with_source(err));
            }
        }
    };

    let mut output = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        use std::io::Read;
        stdout
            .read_to_string(&mut output)
            .map_err(|err| Error::new(ErrorKind::Io).with_source(err))?;
    }
    if !status.success() {
        return Err(Error::new(ErrorKind::Io).with_message(format!(
            "git rev-parse failed with status {}",
            status.code().map_or("signal".to_string(), |c| c.to_string())
        )));
    }
    let revision = output.trim();
    if revision.is_empty() {
        return Err(Error::new(ErrorKind::Io).with_message("git returned an empty revision"));
    }
    Ok(revision.to_string())
}
