//! Purpose: Hold top-level CLI command dispatch for `shadepack`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Command behavior, output envelopes, and exit code semantics stay stable.
//! Invariants: Notices go to stderr as JSON lines; reports go to stdout.

use super::*;

use serde_json::Map;

use shadepack::api::Credentials;
use shadepack::core::stamp::DEFAULT_STAMP_TIMEOUT;
use shadepack::notice::{Notice, notice_json, now_rfc3339};
use shadepack::pipeline::{self, BuildOptions};

pub(super) fn dispatch_command(command: Command, repo_dir: PathBuf) -> Result<RunOutcome, Error> {
    match command {
        Command::Build {
            project,
            output,
            strict_stamp,
            minimize,
            no_minimize,
            maven_user,
            maven_password,
        } => {
            let minimize_override = if minimize {
                Some(true)
            } else if no_minimize {
                Some(false)
            } else {
                None
            };
            let credentials = match (maven_user, maven_password) {
                (Some(user), Some(password)) => Some(Credentials { user, password }),
                (None, None) => Credentials::from_env(),
                _ => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("--maven-user and --maven-password must be given together")
                        .with_hint(
                            "Pass both flags, or export SHADEPACK_MAVEN_USER and \
                             SHADEPACK_MAVEN_PASSWORD.",
                        ));
                }
            };
            let options = BuildOptions {
                config_path: project.config_path(),
                project_dir: project.project_dir.clone(),
                repo_dir,
                output_dir: output,
                strict_stamp,
                minimize_override,
                credentials,
                stamp_timeout: DEFAULT_STAMP_TIMEOUT,
            };
            let report = pipeline::run_build(&options)?;

            if let Some(reason) = &report.stamp_fallback {
                let mut details = Map::new();
                details.insert("fallback_version".to_string(), json!(report.version));
                details.insert("reason".to_string(), json!(reason));
                emit_notice(&report.project, "build", "stamp-fallback",
                    "source control unavailable; using configured base version", details);
            }
            if report.publish.status == "skipped" {
                let mut details = Map::new();
                if let Some(reason) = &report.publish.reason {
                    details.insert("reason".to_string(), json!(reason));
                }
                emit_notice(&report.project, "build", "publish-skipped",
                    "publish stage skipped", details);
            }

            let value = serde_json::to_value(&report)
                .map_err(|err| Error::new(ErrorKind::Internal).with_source(err))?;
            emit_json(json!({ "build": value }));
            Ok(RunOutcome::ok())
        }
        Command::Resolve { project } => {
            let report = pipeline::run_resolve(&project.config_path(), &repo_dir)?;
            let value = serde_json::to_value(&report)
                .map_err(|err| Error::new(ErrorKind::Internal).with_source(err))?;
            emit_json(json!({ "resolve": value }));
            Ok(RunOutcome::ok())
        }
        Command::Check { project } => {
            let report =
                pipeline::run_check(&project.config_path(), &project.project_dir, &repo_dir)?;
            let healthy = report.healthy();
            let corrupt = report.dependencies.iter().any(|dep| dep.metadata == "corrupt");
            let value = serde_json::to_value(&report)
                .map_err(|err| Error::new(ErrorKind::Internal).with_source(err))?;
            emit_json(json!({ "check": value }));
            let exit_code = if corrupt {
                to_exit_code(ErrorKind::Corrupt)
            } else if !healthy {
                to_exit_code(ErrorKind::NotFound)
            } else {
                0
            };
            Ok(RunOutcome::with_code(exit_code))
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "shadepack", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_json(json!({
                "name": "shadepack",
                "version": env!("CARGO_PKG_VERSION"),
            }));
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_notice(project: &str, cmd: &str, kind: &str, message: &str, details: Map<String, Value>) {
    let notice = Notice {
        kind: kind.to_string(),
        time: now_rfc3339(),
        cmd: cmd.to_string(),
        project: project.to_string(),
        message: message.to_string(),
        details,
    };
    let json = serde_json::to_string(&notice_json(&notice))
        .unwrap_or_else(|_| "{\"notice\":{\"kind\":\"encode-failed\"}}".to_string());
    eprintln!("{json}");
}
