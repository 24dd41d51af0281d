#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use specdag::schematic::METADATA_FILENAME;
use tempfile::TempDir;

/// Builder for an on-disk spec directory to simplify test setup.
///
/// Files live under a [`TempDir`], so the tree disappears when the builder
/// is dropped; keep it alive for the duration of the test.
pub struct DagDirBuilder {
    root: TempDir,
}

impl DagDirBuilder {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir for test DAG"),
        }
    }

    /// Path of the DAG root directory.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Create a (possibly nested) subdirectory under the root.
    pub fn with_dir(self, rel: &str) -> Self {
        fs::create_dir_all(self.root.path().join(rel))
            .expect("Failed to create test subdirectory");
        self
    }

    /// Write a file at `rel`, creating parent directories as needed.
    pub fn with_file(self, rel: &str, content: &str) -> Self {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write test spec file");
        self
    }

    /// Write a `METADATA.yml` for the directory at `rel` (`"."` for the root).
    pub fn with_metadata(self, rel: &str, content: &str) -> Self {
        let dir = self.join(rel);
        fs::create_dir_all(&dir).expect("Failed to create metadata directory");
        fs::write(dir.join(METADATA_FILENAME), content)
            .expect("Failed to write test metadata file");
        self
    }

    fn join(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }
}

impl Default for DagDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}
