//! Where raw JSON documents (datasets or model descriptions) come from.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, VizError};
use crate::samples::label_from_file_name;

#[derive(Debug, Clone)]
enum Body {
    File(PathBuf),
    Inline(String),
}

/// One named JSON document. File contents are only read by [`NamedDocument::read`], so a batch
/// holds at most one document in memory at a time.
#[derive(Debug, Clone)]
pub struct NamedDocument {
    pub label: String,
    body: Body,
}

impl NamedDocument {
    pub fn file(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            body: Body::File(path.into()),
        }
    }

    pub fn inline(label: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: Body::Inline(raw.into()),
        }
    }

    /// The raw JSON text.
    pub fn read(&self) -> Result<String> {
        match &self.body {
            Body::File(path) => fs::read_to_string(path).map_err(|e| VizError::io(path, e)),
            Body::Inline(raw) => Ok(raw.clone()),
        }
    }
}

/// Yields `(label, raw_json)` documents.
pub trait DocumentSource {
    fn documents(&self) -> Result<Vec<NamedDocument>>;
}

/// Every non-hidden `*.json` file of a directory, sorted by file name.
///
/// Labels are the file name up to its first `.`. When two files share that label, the later one is
/// labelled by its full stem instead (`a.run1.json` → `a.run1`) so their outputs do not collide.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentSource for DirectorySource {
    fn documents(&self) -> Result<Vec<NamedDocument>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| VizError::io(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VizError::io(&self.dir, e))?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let json = path.extension().is_some_and(|ext| ext == "json");
            if path.is_file() && json && !hidden {
                paths.push(path);
            }
        }
        paths.sort();

        let mut used = BTreeSet::new();
        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut label = label_from_file_name(&file_name).to_owned();
            if used.contains(&label) {
                let stem = file_name.strip_suffix(".json").unwrap_or(&file_name).to_owned();
                warn!("{file_name}: label `{label}` is taken, using `{stem}`");
                label = stem;
            }
            used.insert(label.clone());
            docs.push(NamedDocument::file(label, path));
        }
        Ok(docs)
    }
}

/// Documents held in memory, mostly for tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    docs: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: impl Into<String>, raw: impl Into<String>) -> Self {
        self.docs.push((label.into(), raw.into()));
        self
    }
}

impl DocumentSource for MemorySource {
    fn documents(&self) -> Result<Vec<NamedDocument>> {
        Ok(self
            .docs
            .iter()
            .map(|(label, raw)| NamedDocument::inline(label.as_str(), raw.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_directory_source_sorted_and_labelled() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "[1]").unwrap();
        fs::write(dir.path().join("a.run1.json"), "[2]").unwrap();
        fs::write(dir.path().join(".hidden.json"), "[3]").unwrap();
        fs::write(dir.path().join("notes.txt"), "[4]").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let docs = DirectorySource::new(dir.path()).documents().unwrap();
        let labels: Vec<&str> = docs.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["a", "b"]);
        assert_eq!(docs[0].read().unwrap(), "[2]");
    }

    #[test]
    fn test_shared_labels_get_distinct_stems() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "[1]").unwrap();
        fs::write(dir.path().join("a.run1.json"), "[2]").unwrap();
        fs::write(dir.path().join("b.json"), "[3]").unwrap();

        let docs = DirectorySource::new(dir.path()).documents().unwrap();
        let labels: Vec<&str> = docs.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["a", "a.run1", "b"]);
        assert_eq!(docs[1].read().unwrap(), "[2]");
    }

    #[test]
    fn test_files_are_read_on_demand() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("late.json");
        fs::write(&path, "[1]").unwrap();
        let docs = DirectorySource::new(dir.path()).documents().unwrap();

        fs::write(&path, "[2]").unwrap();
        assert_eq!(docs[0].read().unwrap(), "[2]");
        fs::remove_file(&path).unwrap();
        assert!(matches!(docs[0].read(), Err(VizError::Io { .. })));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = DirectorySource::new(dir.path().join("nope"));
        assert!(matches!(missing.documents(), Err(VizError::Io { .. })));
    }

    #[test]
    fn test_memory_source_keeps_insertion_order() {
        let src = MemorySource::new().with("z", "[]").with("a", "[]");
        let labels: Vec<String> = src.documents().unwrap().into_iter().map(|d| d.label).collect();
        assert_eq!(labels, ["z", "a"]);
    }
}
