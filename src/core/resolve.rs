//! Purpose: Resolve declared dependencies to a concrete transitive closure.
//! Exports: `resolve`, `Resolution`, `ResolvedArtifact`.
//! Role: Planning stage; reads repository metadata, performs no artifact I/O.
//! Invariants: Exclusions prune subtrees before relocation ever sees them.
//! Invariants: The same module at two versions is fatal; no mediation.
//! Invariants: Output order is deterministic (sorted by coordinate).
use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::core::coordinate::{Coordinate, DependencyDecl, Scope};
use crate::core::error::{Error, ErrorKind};
use crate::core::repo::Repository;

#[derive(Clone, Debug)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub scope: Scope,
    pub path: PathBuf,
    /// Parent coordinate for transitive nodes, `None` for declared roots.
    pub via: Option<Coordinate>,
}

#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub artifacts: Vec<ResolvedArtifact>,
}

impl Resolution {
    pub fn bundled(&self) -> impl Iterator<Item = &ResolvedArtifact> {
        self.artifacts
            .iter()
            .filter(|artifact| artifact.scope.bundled())
    }
}

struct Node {
    coordinate: Coordinate,
    scope: Scope,
    path: PathBuf,
    via: Option<Coordinate>,
    children: Vec<Coordinate>,
}

pub fn resolve(repo: &Repository, declarations: &[DependencyDecl]) -> Result<Resolution, Error> {
    let mut nodes: HashMap<String, Node> = HashMap::new();

    for declaration in declarations {
        let mut queue: Vec<(Coordinate, Option<Coordinate>)> =
            vec![(declaration.coordinate.clone(), None)];

        while let Some((coordinate, via)) = queue.pop() {
            // Exclusions never apply to the declared artifact itself.
            if via.is_some()
                && declaration
                    .exclusions
                    .iter()
                    .any(|rule| rule.matches(&coordinate))
            {
                debug!(coordinate = %coordinate, "excluded transitive artifact");
                continue;
            }

            let module_id = coordinate.module_id();
            if let Some(existing) = nodes.get_mut(&module_id) {
                if existing.coordinate.version != coordinate.version {
                    return Err(version_conflict(existing, &coordinate, via.as_ref()));
                }
                if existing.scope >= declaration.scope {
                    continue;
                }
                // Scope widened (e.g. compile-only subtree re-demanded as
                // bundled); children must be revisited at the wider scope.
                existing.scope = declaration.scope;
                let children = existing.children.clone();
                let parent = existing.coordinate.clone();
                queue.extend(
                    children
                        .into_iter()
                        .map(|child| (child, Some(parent.clone()))),
                );
                continue;
            }

            let path = repo.locate(&coordinate)?;
            let metadata = repo.load_metadata(&coordinate)?;
            let mut children = Vec::with_capacity(metadata.dependencies.len());
            for raw in &metadata.dependencies {
                let child = Coordinate::parse(raw).map_err(|err| {
                    Error::new(ErrorKind::Corrupt)
                        .with_message("artifact metadata lists a malformed coordinate")
                        .with_coordinate(coordinate.to_string())
                        .with_entry(raw.clone())
                        .with_source(err)
                })?;
                children.push(child);
            }
            debug!(coordinate = %coordinate, children = children.len(), "resolved artifact");
            queue.extend(
                children
                    .iter()
                    .cloned()
                    .map(|child| (child, Some(coordinate.clone()))),
            );
            nodes.insert(
                module_id,
                Node {
                    coordinate,
                    scope: declaration.scope,
                    path,
                    via,
                    children,
                },
            );
        }
    }

    let mut artifacts: Vec<ResolvedArtifact> = nodes
        .into_values()
        .map(|node| ResolvedArtifact {
            coordinate: node.coordinate,
            scope: node.scope,
            path: node.path,
            via: node.via,
        })
        .collect();
    artifacts.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
    Ok(Resolution { artifacts })
}

fn version_conflict(existing: &Node, demanded: &Coordinate, via: Option<&Coordinate>) -> Error {
    let existing_via = existing
        .via
        .as_ref()
        .map(|parent| parent.to_string())
        .unwrap_or_else(|| "declared".to_string());
    let demanded_via = via
        .map(|parent| parent.to_string())
        .unwrap_or_else(|| "declared".to_string());
    Error::new(ErrorKind::Conflict)
        .with_message(format!(
            "version conflict for {}: {} (via {}) vs {} (via {})",
            demanded.module_id(),
            existing.coordinate.version,
            existing_via,
            demanded.version,
            demanded_via,
        ))
        .with_coordinate(demanded.to_string())
        .with_hint("Align the demanded versions or exclude one of the paths.")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::resolve;
    use crate::core::coordinate::{Coordinate, DependencyDecl, ExclusionPattern, Scope};
    use crate::core::error::ErrorKind;
    use crate::core::repo::Repository;

    fn install(root: &Path, coordinate: &str, dependencies: &[&str]) {
        let coordinate = Coordinate::parse(coordinate).unwrap();
        let repo = Repository::new(root);
        let jar = repo.artifact_path(&coordinate);
        fs::create_dir_all(jar.parent().unwrap()).expect("mkdir");
        fs::write(&jar, b"stub").expect("jar");
        let metadata = serde_json::json!({
            "coordinate": coordinate.to_string(),
            "dependencies": dependencies,
        });
        fs::write(repo.metadata_path(&coordinate), metadata.to_string()).expect("metadata");
    }

    fn decl(coordinate: &str, scope: Scope) -> DependencyDecl {
        DependencyDecl {
            coordinate: Coordinate::parse(coordinate).unwrap(),
            scope,
            exclusions: Vec::new(),
        }
    }

    #[test]
    fn transitive_closure_is_walked_and_sorted() {
        let temp = tempfile::tempdir().expect("tempdir");
        install(temp.path(), "com.acme:alpha:1.0", &["com.acme:beta:2.0"]);
        install(temp.path(), "com.acme:beta:2.0", &["org.util:gamma:0.3"]);
        install(temp.path(), "org.util:gamma:0.3", &[]);

        let repo = Repository::new(temp.path());
        let resolution = resolve(&repo, &[decl("com.acme:alpha:1.0", Scope::Bundled)]).unwrap();
        let names: Vec<String> = resolution
            .artifacts
            .iter()
            .map(|artifact| artifact.coordinate.to_string())
            .collect();
        assert_eq!(
            names,
            ["com.acme:alpha:1.0", "com.acme:beta:2.0", "org.util:gamma:0.3"]
        );
        assert!(resolution.artifacts.iter().all(|a| a.scope.bundled()));
        assert!(resolution.artifacts[0].via.is_none());
        assert_eq!(
            resolution.artifacts[2].via.as_ref().unwrap().to_string(),
            "com.acme:beta:2.0"
        );
    }

    #[test]
    fn version_conflict_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        install(temp.path(), "com.acme:alpha:1.0", &["org.util:gamma:0.3"]);
        install(temp.path(), "com.acme:beta:2.0", &["org.util:gamma:0.4"]);
        install(temp.path(), "org.util:gamma:0.3", &[]);
        install(temp.path(), "org.util:gamma:0.4", &[]);

        let repo = Repository::new(temp.path());
        let err = resolve(
            &repo,
            &[
                decl("com.acme:alpha:1.0", Scope::Bundled),
                decl("com.acme:beta:2.0", Scope::Bundled),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let message = err.message().unwrap();
        assert!(message.contains("org.util:gamma"));
        assert!(message.contains("0.3"));
        assert!(message.contains("0.4"));
    }

    #[test]
    fn exclusions_prune_subtrees() {
        let temp = tempfile::tempdir().expect("tempdir");
        install(
            temp.path(),
            "com.acme:alpha:1.0",
            &["net.kyori:adventure:4.0", "org.util:gamma:0.3"],
        );
        install(temp.path(), "net.kyori:adventure:4.0", &["net.kyori:examination:1.0"]);
        install(temp.path(), "org.util:gamma:0.3", &[]);

        let repo = Repository::new(temp.path());
        let mut declaration = decl("com.acme:alpha:1.0", Scope::Bundled);
        declaration.exclusions.push(ExclusionPattern {
            group: "net.kyori".to_string(),
            module: "*".to_string(),
        });
        let resolution = resolve(&repo, &[declaration]).unwrap();
        let names: Vec<String> = resolution
            .artifacts
            .iter()
            .map(|artifact| artifact.coordinate.module_id())
            .collect();
        assert_eq!(names, ["com.acme:alpha", "org.util:gamma"]);
    }

    #[test]
    fn missing_artifact_aborts_resolution() {
        let temp = tempfile::tempdir().expect("tempdir");
        install(temp.path(), "com.acme:alpha:1.0", &["org.util:gamma:0.3"]);

        let repo = Repository::new(temp.path());
        let err = resolve(&repo, &[decl("com.acme:alpha:1.0", Scope::Bundled)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.coordinate(), Some("org.util:gamma:0.3"));
    }

    #[test]
    fn compile_only_subtree_is_widened_when_redemanded() {
        let temp = tempfile::tempdir().expect("tempdir");
        install(temp.path(), "com.acme:alpha:1.0", &["org.util:gamma:0.3"]);
        install(temp.path(), "org.util:gamma:0.3", &["org.util:delta:0.1"]);
        install(temp.path(), "org.util:delta:0.1", &[]);

        let repo = Repository::new(temp.path());
        let resolution = resolve(
            &repo,
            &[
                decl("com.acme:alpha:1.0", Scope::CompileOnly),
                decl("org.util:gamma:0.3", Scope::Bundled),
            ],
        )
        .unwrap();
        let bundled: Vec<String> = resolution
            .bundled()
            .map(|artifact| artifact.coordinate.module_id())
            .collect();
        assert_eq!(bundled, ["org.util:delta", "org.util:gamma"]);
    }
}
