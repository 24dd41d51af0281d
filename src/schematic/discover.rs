// src/schematic/discover.rs

//! Walking a spec tree into a fresh [`Schematic`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{AssemblyError, Result};
use crate::parsing::SpecLoader;
use crate::schematic::{LevelRecord, Schematic, METADATA_FILENAME};

/// Walk `root_dir` and seed one level record per directory.
///
/// Directories whose base name starts with `_` or `.` are private and
/// skipped together with everything below them; the root itself is never
/// skipped, whatever it is called. Spec files are the direct children of
/// each directory with a supported extension, excluding the metadata file
/// and files starting with `_` or `.`.
pub fn discover(root_dir: &Path, loader: &SpecLoader) -> Result<Schematic> {
    if !root_dir.is_dir() {
        return Err(AssemblyError::MissingDagRoot(root_dir.to_path_buf()));
    }
    let root = root_dir.canonicalize()?;

    let mut levels: BTreeMap<PathBuf, LevelRecord> = BTreeMap::new();

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !hidden_entry(entry));

    for entry in walker {
        let entry = entry.map_err(|err| AssemblyError::IoError(err.into()))?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.path().to_path_buf();
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root")
            .to_string();
        let parent_id = if entry.depth() == 0 {
            None
        } else {
            dir.parent().map(Path::to_path_buf)
        };

        let mut level = LevelRecord::new(dir.clone(), name, parent_id, entry.depth());
        scan_dir_files(&dir, loader, &mut level)?;

        debug!(
            level = %dir.display(),
            depth = level.depth,
            specs = level.spec_paths.len(),
            has_metadata = level.metadata_path.is_some(),
            "discovered level"
        );
        levels.insert(dir, level);
    }

    debug!(root = %root.display(), levels = levels.len(), "discovered schematic");
    Ok(Schematic::new(root, levels))
}

/// Fill `spec_paths` and `metadata_path` from the direct children of
/// `dir`.
fn scan_dir_files(dir: &Path, loader: &SpecLoader, level: &mut LevelRecord) -> Result<()> {
    for child in fs::read_dir(dir)? {
        let child = child?;
        if !child.file_type()?.is_file() {
            continue;
        }
        let Some(file_name) = child.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let path = child.path();

        if file_name == METADATA_FILENAME {
            level.metadata_path = Some(path);
            continue;
        }
        if hidden_name(&file_name) {
            continue;
        }
        if loader.supports(&path) {
            level.spec_paths.push(path);
        }
    }
    level.spec_paths.sort();
    Ok(())
}

fn hidden_name(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

fn hidden_entry(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(hidden_name)
        .unwrap_or(false)
}
