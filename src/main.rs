//! Purpose: `shadepack` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs the pipeline, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (pretty JSON on a TTY).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Stage logic lives in the library; this file is parse/emit glue.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use shadepack::api::{Error, ErrorKind, to_exit_code};
use shadepack::core::repo::default_repo_dir;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(err.to_string().lines().next().unwrap_or("bad usage").to_string())
                    .with_hint("See `shadepack --help` for usage."));
            }
        },
    };

    let repo_dir = cli.repo.unwrap_or_else(default_repo_dir);
    command_dispatch::dispatch_command(cli.command, repo_dir)
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env("SHADEPACK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "shadepack",
    version,
    about = "Relocation-aware packager for host-loaded plugins",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Packages a plugin and its bundled libraries into one archive,
relocating library namespaces so two plugins bundling the same library
cannot collide in one host process.

Mental model:
  - `resolve` shows what would be bundled
  - `build` produces the shaded artifact
  - `check` verifies the project without building
"#,
    after_help = r#"EXAMPLES
  $ shadepack check
  $ shadepack resolve
  $ shadepack build
  $ shadepack build --strict-stamp --output dist

LEARN MORE
  $ shadepack <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        help = "Artifact repository root (default: ~/.shadepack/repo)",
        value_hint = ValueHint::DirPath
    )]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ProjectArgs {
    #[arg(
        long,
        help = "Project configuration file (default: <project-dir>/shadepack.toml)",
        value_hint = ValueHint::FilePath
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        default_value = ".",
        help = "Project directory; stamping and relative paths resolve here",
        value_hint = ValueHint::DirPath
    )]
    project_dir: PathBuf,
}

impl ProjectArgs {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| {
            self.project_dir
                .join(shadepack::api::DEFAULT_CONFIG_FILE)
        })
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Run the full packaging pipeline",
        long_about = r#"Resolve, relocate, merge, stamp, and write the shaded artifact.

Publishing runs only when a [publish] section is configured and credentials
are provided (flags or SHADEPACK_MAVEN_USER / SHADEPACK_MAVEN_PASSWORD)."#,
        after_help = r#"EXAMPLES
  $ shadepack build
  $ shadepack build --output dist --no-minimize
  $ shadepack build --maven-user ci --maven-password "$TOKEN"

NOTES
  - The version is the short git revision; without git the configured
    base version is used and a stamp-fallback notice is emitted
  - `--strict-stamp` turns that fallback into a fatal error"#
    )]
    Build {
        #[command(flatten)]
        project: ProjectArgs,
        #[arg(
            long,
            default_value = "dist",
            help = "Output directory for the artifact",
            value_hint = ValueHint::DirPath
        )]
        output: PathBuf,
        #[arg(long, help = "Fail the build when source control stamping fails")]
        strict_stamp: bool,
        #[arg(long, help = "Force minimization on", conflicts_with = "no_minimize")]
        minimize: bool,
        #[arg(long, help = "Force minimization off")]
        no_minimize: bool,
        #[arg(long, help = "Publish username", value_name = "USER")]
        maven_user: Option<String>,
        #[arg(long, help = "Publish password", value_name = "PASSWORD")]
        maven_password: Option<String>,
    },
    #[command(
        about = "Resolve the dependency closure without building",
        after_help = r#"EXAMPLES
  $ shadepack resolve
  $ shadepack resolve --config other/shadepack.toml"#
    )]
    Resolve {
        #[command(flatten)]
        project: ProjectArgs,
    },
    #[command(
        about = "Validate configuration and repository availability",
        after_help = r#"EXAMPLES
  $ shadepack check

NOTES
  - Exit code 3 when artifacts or metadata are missing, 5 when corrupt"#
    )]
    Check {
        #[command(flatten)]
        project: ProjectArgs,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    #[command(about = "Print tool version information")]
    Version,
}

fn emit_json(value: Value) {
    let is_tty = io::stdout().is_terminal();
    let json = if is_tty {
        serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_text(err: &Error) -> String {
    let mut text = format!("error: {err}");
    if let Some(hint) = err.hint() {
        text.push_str(&format!("\n  hint: {hint}"));
    }
    text
}

fn error_json(err: &Error) -> Value {
    let mut inner = serde_json::Map::new();
    inner.insert("kind".to_string(), json!(err.kind().as_str()));
    if let Some(message) = err.message() {
        inner.insert("message".to_string(), json!(message));
    }
    if let Some(coordinate) = err.coordinate() {
        inner.insert("coordinate".to_string(), json!(coordinate));
    }
    if let Some(entry) = err.entry() {
        inner.insert("entry".to_string(), json!(entry));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    json!({ "error": inner })
}
