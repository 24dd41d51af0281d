// src/parsing/mod.rs

//! Turning spec files into flat records.
//!
//! [`SpecLoader`] owns the extension → parser mapping and the tag decoder.
//! Its one entry point, [`SpecLoader::load`], never fails: a file that
//! cannot be decoded degrades to a minimal record so one malformed file
//! does not block assembly of the whole tree.

pub mod loaders;
pub mod parsers;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::SpecMap;

pub use loaders::{TagConstructor, TagDecoder};

/// Parser for one file format: reads the file at `path` and produces a
/// flat record, using `decoder` for any embedded YAML.
pub type ParseHook = Arc<dyn Fn(&Path, &TagDecoder) -> Result<SpecMap> + Send + Sync>;

/// Loads spec files through per-extension parsers.
#[derive(Clone)]
pub struct SpecLoader {
    parsers: BTreeMap<String, ParseHook>,
    decoder: TagDecoder,
}

impl SpecLoader {
    /// Loader with the default parsers (`yml`, `yaml`, `py`, `sql`,
    /// `ipynb`) and the given decoder.
    pub fn new(decoder: TagDecoder) -> Self {
        let mut loader = Self {
            parsers: BTreeMap::new(),
            decoder,
        };
        loader.register("yml", Arc::new(parsers::parse_yaml));
        loader.register("yaml", Arc::new(parsers::parse_yaml));
        loader.register("py", Arc::new(parsers::parse_py));
        loader.register("sql", Arc::new(parsers::parse_sql));
        loader.register("ipynb", Arc::new(parsers::parse_ipynb));
        loader
    }

    /// Register a parser for a file extension (without the leading dot).
    ///
    /// Registering an already-mapped extension replaces its parser.
    pub fn register(&mut self, extension: impl Into<String>, hook: ParseHook) {
        self.parsers.insert(extension.into(), hook);
    }

    /// Extensions this loader can parse. The discoverer uses this set to
    /// decide which files count as spec files.
    pub fn supported_extensions(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(|s| s.as_str())
    }

    /// Whether `path` has an extension this loader can parse.
    pub fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.parsers.contains_key(ext))
    }

    /// Load one spec file.
    ///
    /// Always returns a record: a decode failure is logged and degrades to
    /// `{task_id, file_path}` only. `task_id` is derived from the file
    /// stem unless the file content overrides it; `file_path` is always
    /// set from `path`.
    pub fn load(&self, path: &Path) -> SpecMap {
        let mut spec = match self.parse(path) {
            Ok(spec) => spec,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "spec file could not be decoded, degrading to a minimal record"
                );
                SpecMap::new()
            }
        };

        if !spec.contains_key("task_id") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                spec.insert("task_id".to_string(), Value::String(stem.to_string()));
            }
        }
        spec.insert(
            "file_path".to_string(),
            Value::String(path.display().to_string()),
        );

        debug!(path = %path.display(), keys = spec.len(), "loaded spec file");
        spec
    }

    fn parse(&self, path: &Path) -> Result<SpecMap> {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        match self.parsers.get(extension) {
            Some(hook) => hook(path, &self.decoder),
            // The discoverer only hands us supported files; an unmapped
            // extension just means no content to merge.
            None => Ok(SpecMap::new()),
        }
    }
}

impl fmt::Debug for SpecLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecLoader")
            .field("extensions", &self.parsers.keys().collect::<Vec<_>>())
            .field("decoder", &self.decoder)
            .finish()
    }
}
