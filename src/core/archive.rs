//! Purpose: Archive and class-tree I/O for the packaging pipeline.
//! Exports: `Archive`, `Entry`, read/write helpers, class-entry classification.
//! Role: Only module that touches zip encoding; later stages see entry lists.
//! Invariants: Entry order is preserved; readers produce deterministic order.
//! Invariants: Output archives are written to a temporary sibling and renamed,
//! never mutated in place.
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub path: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Archive {
    pub entries: Vec<Entry>,
}

impl Archive {
    pub fn find(&self, path: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.path == path)
    }
}

pub fn is_class_entry(path: &str) -> bool {
    path.ends_with(".class")
}

/// Dotted class name for a class entry path, `None` for resources.
pub fn class_namespace(path: &str) -> Option<String> {
    path.strip_suffix(".class")
        .map(|stem| stem.replace('/', "."))
}

pub fn read_archive(path: &Path) -> Result<Archive, Error> {
    let file = File::open(path)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(path).with_source(err))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("not a readable zip archive")
            .with_path(path)
            .with_source(err)
    })?;

    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("unreadable archive entry")
                .with_path(path)
                .with_source(err)
        })?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("truncated archive entry")
                .with_path(path)
                .with_entry(name.clone())
                .with_source(err)
        })?;
        entries.push(Entry { path: name, bytes });
    }
    Ok(Archive { entries })
}

/// Reads a compiled class tree from disk into archive entries, sorted by path.
pub fn read_class_dir(root: &Path) -> Result<Archive, Error> {
    if !root.is_dir() {
        return Err(Error::new(ErrorKind::NotFound)
            .with_message("compiled class directory not found")
            .with_path(root)
            .with_hint("Check the [package] classes path in shadepack.toml."));
    }
    let mut entries = Vec::new();
    for item in WalkDir::new(root).sort_by_file_name() {
        let item = item.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to walk class directory")
                .with_path(root)
                .with_source(err)
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        let relative = item
            .path()
            .strip_prefix(root)
            .map_err(|err| Error::new(ErrorKind::Internal).with_source(err))?;
        let path = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = fs::read(item.path()).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_path(item.path())
                .with_source(err)
        })?;
        entries.push(Entry { path, bytes });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(Archive { entries })
}

pub fn write_archive(path: &Path, archive: &Archive) -> Result<(), Error> {
    let temp = path.with_extension("jar.tmp");
    let file = File::create(&temp)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(&temp).with_source(err))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();
    for entry in &archive.entries {
        zip.start_file(entry.path.as_str(), options).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to start archive entry")
                .with_entry(entry.path.clone())
                .with_path(&temp)
                .with_source(err)
        })?;
        zip.write_all(&entry.bytes).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_entry(entry.path.clone())
                .with_path(&temp)
                .with_source(err)
        })?;
    }
    zip.finish()
        .map_err(|err| Error::new(ErrorKind::Io).with_path(&temp).with_source(err))?;
    fs::rename(&temp, path)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(path).with_source(err))?;
    Ok(())
}
