//! Purpose: Combine the plugin class tree with relocated dependency archives.
//! Exports: `merge`, `MergeOutcome`.
//! Role: Pure stage; deterministic first-writer-wins entry union.
//! Invariants: Plugin entries always precede dependency entries.
//! Invariants: Dependency archive metadata (manifests, signatures, module
//! descriptors) never reaches the merged artifact.
use std::collections::HashSet;

use crate::core::archive::Archive;

#[derive(Clone, Debug, Default)]
pub struct MergeOutcome {
    pub archive: Archive,
    /// Entry paths that lost to an earlier writer, in encounter order.
    pub shadowed: Vec<String>,
}

pub fn merge(plugin: Archive, dependencies: Vec<Archive>) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut seen: HashSet<String> = HashSet::new();

    for entry in plugin.entries {
        if seen.insert(entry.path.clone()) {
            outcome.archive.entries.push(entry);
        } else {
            outcome.shadowed.push(entry.path);
        }
    }
    for dependency in dependencies {
        for entry in dependency.entries {
            if dropped_dependency_metadata(&entry.path) {
                continue;
            }
            if seen.insert(entry.path.clone()) {
                outcome.archive.entries.push(entry);
            } else {
                outcome.shadowed.push(entry.path);
            }
        }
    }
    outcome
}

fn dropped_dependency_metadata(path: &str) -> bool {
    if path == "META-INF/MANIFEST.MF" || path == "module-info.class" {
        return true;
    }
    if let Some(name) = path.strip_prefix("META-INF/") {
        if !name.contains('/')
            && (name.ends_with(".SF") || name.ends_with(".DSA") || name.ends_with(".RSA"))
        {
            return true;
        }
    }
    false
}
