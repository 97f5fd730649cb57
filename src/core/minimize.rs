//! Purpose: Drop class entries unreachable from the plugin entry point.
//! Exports: `minimize`, `KeepPattern`, `MinimizeOutcome`.
//! Role: Mark-and-sweep over scanned class references; resources always survive.
//! Invariants: Roots are the entry point plus explicit keep patterns; nothing
//! reachable only reflectively is inferred.
//! Invariants: The entry-point class and its static closure are never removed.
use std::collections::HashSet;

use tracing::debug;

use crate::core::archive::{Archive, class_namespace, is_class_entry};
use crate::core::error::{Error, ErrorKind};
use crate::core::relocate::{is_namespace_prefix, namespace_present};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeepPattern {
    Exact(String),
    Prefix(String),
}

impl KeepPattern {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        if raw.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("empty keep pattern"));
        }
        if let Some(prefix) = raw.strip_suffix(".*") {
            if prefix.is_empty() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("keep pattern needs a namespace before .*")
                    .with_entry(raw));
            }
            return Ok(KeepPattern::Prefix(prefix.to_string()));
        }
        Ok(KeepPattern::Exact(raw.to_string()))
    }

    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            KeepPattern::Exact(exact) => exact == namespace,
            KeepPattern::Prefix(prefix) => is_namespace_prefix(prefix, namespace),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MinimizeOutcome {
    pub archive: Archive,
    /// Removed class namespaces, sorted.
    pub removed: Vec<String>,
}

pub fn minimize(
    archive: Archive,
    entry_point: &str,
    keep: &[KeepPattern],
) -> Result<MinimizeOutcome, Error> {
    struct Class {
        namespace: String,
        slashed: Vec<u8>,
        entry: usize,
    }

    let classes: Vec<Class> = archive
        .entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| is_class_entry(&entry.path))
        .filter_map(|(index, entry)| {
            class_namespace(&entry.path).map(|namespace| Class {
                slashed: namespace.replace('.', "/").into_bytes(),
                namespace,
                entry: index,
            })
        })
        .collect();

    let mut marked: HashSet<usize> = HashSet::new();
    let mut stack: Vec<usize> = Vec::new();

    let entry_index = classes
        .iter()
        .position(|class| class.namespace == entry_point)
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("entry-point class is not present in the merged archive")
                .with_entry(entry_point)
                .with_hint("Check [package] entry_point, or disable minimization.")
        })?;
    stack.push(entry_index);
    marked.insert(entry_index);

    for (index, class) in classes.iter().enumerate() {
        if keep.iter().any(|pattern| pattern.matches(&class.namespace)) && marked.insert(index) {
            stack.push(index);
        }
    }

    while let Some(current) = stack.pop() {
        let bytes = &archive.entries[classes[current].entry].bytes;
        for (index, class) in classes.iter().enumerate() {
            if marked.contains(&index) {
                continue;
            }
            if namespace_present(bytes, class.namespace.as_bytes(), &class.slashed) {
                marked.insert(index);
                stack.push(index);
            }
        }
    }

    let swept: HashSet<usize> = classes
        .iter()
        .enumerate()
        .filter(|(index, _)| !marked.contains(index))
        .map(|(_, class)| class.entry)
        .collect();
    let mut removed: Vec<String> = classes
        .iter()
        .enumerate()
        .filter(|(index, _)| !marked.contains(index))
        .map(|(_, class)| class.namespace.clone())
        .collect();
    removed.sort();
    debug!(
        kept = classes.len() - removed.len(),
        removed = removed.len(),
        "minimization sweep"
    );

    let entries = archive
        .entries
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !swept.contains(index))
        .map(|(_, entry)| entry)
        .collect();
    Ok(MinimizeOutcome {
        archive: Archive { entries },
        removed,
    })
}
