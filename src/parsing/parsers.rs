// src/parsing/parsers.rs

//! Default per-format spec parsers.
//!
//! Each parser reads one file and produces a flat spec record:
//!
//! - `.yml` / `.yaml`: the whole file is one YAML mapping.
//! - `.py`: YAML front matter between `---` markers in the leading `#`
//!   comment block; a file without front matter yields an empty record.
//! - `.sql`: same, with `--` comments.
//! - `.ipynb`: notebook JSON; the first raw or markdown cell carries the
//!   spec, optionally wrapped in `---` markers.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{AssemblyError, Result};
use crate::parsing::loaders::TagDecoder;
use crate::types::SpecMap;

pub fn parse_yaml(path: &Path, decoder: &TagDecoder) -> Result<SpecMap> {
    let text = fs::read_to_string(path)?;
    decoder.decode_map(&text, path)
}

pub fn parse_py(path: &Path, decoder: &TagDecoder) -> Result<SpecMap> {
    let text = fs::read_to_string(path)?;
    match comment_front_matter(&text, "#", path)? {
        Some(block) => decoder.decode_map(&block, path),
        None => Ok(SpecMap::new()),
    }
}

pub fn parse_sql(path: &Path, decoder: &TagDecoder) -> Result<SpecMap> {
    let text = fs::read_to_string(path)?;
    match comment_front_matter(&text, "--", path)? {
        Some(block) => decoder.decode_map(&block, path),
        None => Ok(SpecMap::new()),
    }
}

pub fn parse_ipynb(path: &Path, decoder: &TagDecoder) -> Result<SpecMap> {
    let text = fs::read_to_string(path)?;
    let notebook: Notebook =
        serde_json::from_str(&text).map_err(|err| AssemblyError::DecodeError {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    let Some(cell) = notebook
        .cells
        .iter()
        .find(|cell| cell.cell_type == "raw" || cell.cell_type == "markdown")
    else {
        return Ok(SpecMap::new());
    };

    let source = cell.source.joined();
    let block = document_front_matter(&source).unwrap_or(source.as_str());
    decoder.decode_map(block, path)
}

/// Minimal slice of the Jupyter notebook format: we only need cell types
/// and sources.
#[derive(Debug, Deserialize)]
struct Notebook {
    #[serde(default)]
    cells: Vec<NotebookCell>,
}

#[derive(Debug, Deserialize)]
struct NotebookCell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// Cell sources are stored either as one string or as a list of lines that
/// keep their trailing newlines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl CellSource {
    fn joined(&self) -> String {
        match self {
            CellSource::Text(text) => text.clone(),
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

/// Extract a YAML front-matter block from the leading comment lines of a
/// script.
///
/// The block opens with a comment line whose content is `---` and closes
/// with the next such line; everything between has the comment marker (and
/// at most one following space) stripped. Returns `Ok(None)` when the file
/// does not start with front matter; an opened block that never closes is
/// a decode error.
fn comment_front_matter(text: &str, marker: &str, origin: &Path) -> Result<Option<String>> {
    let mut in_block = false;
    let mut collected: Vec<&str> = Vec::new();

    for line in text.lines() {
        if !in_block {
            if line.trim().is_empty() {
                continue;
            }
            match comment_content(line, marker) {
                Some(content) if content.trim_end() == "---" => in_block = true,
                // Tolerate a shebang above the front matter.
                Some(content) if content.starts_with('!') => continue,
                _ => return Ok(None),
            }
        } else {
            match comment_content(line, marker) {
                Some(content) if content.trim_end() == "---" => {
                    return Ok(Some(collected.join("\n")));
                }
                Some(content) => collected.push(content),
                None => {
                    return Err(AssemblyError::DecodeError {
                        path: origin.to_path_buf(),
                        message: "front matter not terminated by a closing '---'".to_string(),
                    });
                }
            }
        }
    }

    if in_block {
        return Err(AssemblyError::DecodeError {
            path: origin.to_path_buf(),
            message: "front matter not terminated by a closing '---'".to_string(),
        });
    }
    Ok(None)
}

fn comment_content<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Extract a bare `---` delimited block from the start of a text, as used
/// inside notebook cells. Returns `None` when the text is not delimited;
/// the caller then decodes the whole text.
fn document_front_matter(text: &str) -> Option<&str> {
    let mut rest = text;
    loop {
        let (line, tail) = rest.split_once('\n')?;
        if line.trim().is_empty() {
            rest = tail;
            continue;
        }
        if line.trim_end() != "---" {
            return None;
        }
        rest = tail;
        break;
    }
    // split_inclusive keeps the line terminators, so the running offset
    // stays byte-exact whatever the line endings are.
    let end = rest
        .split_inclusive('\n')
        .scan(0usize, |offset, line| {
            let start = *offset;
            *offset += line.len();
            Some((start, line))
        })
        .find(|(_, line)| line.trim_end() == "---")
        .map(|(start, _)| start)?;
    Some(&rest[..end])
}
