//! Purpose: Generate the host-loader manifest bundled into the artifact.
//! Exports: `PluginManifest`, `MANIFEST_ENTRY`, `generate`.
//! Role: Fixed-schema contract value; the host resolves `main` at its own
//! runtime, so the entry point stays an opaque identifier string here.
//! Invariants: `version` always equals the build context's version.
use serde::Serialize;

use crate::core::config::PackageInfo;
use crate::core::error::{Error, ErrorKind};
use crate::core::stamp::BuildContext;

pub const MANIFEST_ENTRY: &str = "plugin.yml";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PluginManifest {
    pub name: String,
    pub main: String,
    pub version: String,
    pub author: String,
    pub description: String,
    #[serde(rename = "api-version")]
    pub api_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depend: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub softdepend: Vec<String>,
}

pub fn generate(package: &PackageInfo, context: &BuildContext) -> PluginManifest {
    PluginManifest {
        name: package.name.clone(),
        main: package.entry_point.clone(),
        version: context.version.clone(),
        author: package.author.clone(),
        description: package.description.clone(),
        api_version: package.api_version.clone(),
        depend: package.depend.clone(),
        softdepend: package.soft_depend.clone(),
    }
}

impl PluginManifest {
    pub fn to_yaml(&self) -> Result<String, Error> {
        serde_yaml::to_string(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode plugin manifest")
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::generate;
    use crate::core::config::PackageInfo;
    use crate::core::stamp::BuildContext;

    fn package() -> PackageInfo {
        PackageInfo {
            name: "fishing".to_string(),
            group: "dev.oribuin".to_string(),
            version: "1.0".to_string(),
            entry_point: "dev.oribuin.fishing.FishingPlugin".to_string(),
            author: "Oribuin".to_string(),
            description: "hello".to_string(),
            api_version: "1.21".to_string(),
            depend: Vec::new(),
            soft_depend: vec!["Vault".to_string()],
            classes: PathBuf::from("build/classes"),
        }
    }

    #[test]
    fn manifest_version_tracks_build_context() {
        let context = BuildContext {
            version: "4f2c1d9".to_string(),
            stamped: true,
        };
        let manifest = generate(&package(), &context);
        assert_eq!(manifest.version, "4f2c1d9");
        assert_eq!(manifest.main, "dev.oribuin.fishing.FishingPlugin");
    }

    #[test]
    fn yaml_uses_host_loader_field_names() {
        let context = BuildContext {
            version: "1.0".to_string(),
            stamped: false,
        };
        let yaml = generate(&package(), &context).to_yaml().unwrap();
        assert!(yaml.contains("main: dev.oribuin.fishing.FishingPlugin"));
        assert!(yaml.contains("api-version: '1.21'"));
        assert!(yaml.contains("softdepend:"));
        assert!(yaml.contains("- Vault"));
        assert!(!yaml.contains("\ndepend:"), "empty depend list must be omitted:\n{yaml}");
    }
}
