//! Source file discovery
//!
//! Expands the command-line paths into the sorted list of `.java` files to
//! process. Directories are walked recursively; ignore files are not
//! consulted since decompiler output rarely carries them, but version
//! control metadata is skipped.

use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

fn is_java(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "java")
}

/// Files named directly are taken as they are; directories contribute their
/// `.java` files. Missing paths are reported and skipped.
pub fn discover(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();

    for path in paths {
        if path.is_file() {
            if !is_java(path) {
                tracing::debug!("{} does not end in .java, processing anyway", path.display());
            }
            found.insert(path.clone());
        } else if path.is_dir() {
            walk(path, &mut found);
        } else {
            tracing::warn!("{} does not exist, skipping", path.display());
        }
    }

    tracing::debug!("Discovered {} source files", found.len());
    found.into_iter().collect()
}

fn walk(root: &Path, found: &mut BTreeSet<PathBuf>) {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && SKIPPED_DIRS.iter().any(|name| entry.file_name() == *name))
        })
        .build();

    for entry in walker {
        match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
                if is_file && is_java(entry.path()) {
                    found.insert(entry.into_path());
                }
            }
            Err(e) => tracing::warn!("Walking {}: {}", root.display(), e),
        }
    }
}
