//! Purpose: Define the stable public Rust API boundary for shadepack.
//! Exports: Core types and operations needed by the CLI and tests.
//! Role: Public, additive-only surface; hides internal stage modules.
//! Invariants: This module is the only public path library consumers need.

mod publish;

pub use crate::core::config::{
    DEFAULT_CONFIG_FILE, MinimizeConfig, PackageInfo, ProjectConfig, PublishConfig,
    load as load_config,
};
pub use crate::core::coordinate::{Coordinate, DependencyDecl, ExclusionPattern, Scope};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::manifest::{MANIFEST_ENTRY, PluginManifest};
pub use crate::core::repo::{ArtifactMetadata, Repository, default_repo_dir};
pub use crate::core::resolve::{Resolution, ResolvedArtifact, resolve};
pub use crate::core::stamp::{BuildContext, DEFAULT_STAMP_TIMEOUT, StampOutcome};
pub use publish::{Credentials, artifact_url, publish, select_base_url};
