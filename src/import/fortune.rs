//! Legacy fortune files: records separated by lines holding a single `%`.
//!
//! ```text
//! redfish
//! %
//! onefish
//! twofish
//! %
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::vec;

use crate::import::ImportRecord;
use crate::types::error::{EpigramError, ImportError};

const DELIMITER: &str = "%";

/// Split fortune text into records.
///
/// Each record is right-trimmed. Blank records are dropped, and a final
/// record without a closing delimiter is kept.
pub fn parse_fortunes(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line == DELIMITER {
            push_record(&mut records, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_record(&mut records, &current);

    records
}

fn push_record(records: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim_end();
    if !trimmed.is_empty() {
        records.push(trimmed.to_string());
    }
}

/// Category name derived from a fortune file: its stem (`fishes.txt` -> `fishes`).
pub fn category_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// A fortune file, or a directory of them, as a lazy import stream.
#[derive(Debug, Clone)]
pub struct FortuneSource {
    files: Vec<PathBuf>,
    category: Option<String>,
}

impl FortuneSource {
    /// Resolve `path` to the files it names. Directory entries are taken in
    /// name order; subdirectories and dotfiles are skipped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::MissingPath(path.to_path_buf()));
        }

        let files = if path.is_dir() {
            let read_err = |source| ImportError::Read {
                path: path.to_path_buf(),
                source,
            };
            let mut files = Vec::new();
            for entry in fs::read_dir(path).map_err(read_err)? {
                let entry_path = entry.map_err(read_err)?.path();
                if entry_path.is_file() && !is_hidden(&entry_path) {
                    files.push(entry_path);
                }
            }
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        tracing::debug!(path = %path.display(), files = files.len(), "resolved fortune source");
        Ok(Self { files, category: None })
    }

    /// Put every record in `name` instead of deriving it from the file name.
    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        self.category = Some(name.into());
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn records(self) -> FortuneRecords {
        FortuneRecords {
            files: self.files.into_iter(),
            category: self.category,
            current: Vec::new().into_iter(),
            current_category: String::new(),
        }
    }
}

impl IntoIterator for FortuneSource {
    type Item = Result<ImportRecord, EpigramError>;
    type IntoIter = FortuneRecords;

    fn into_iter(self) -> Self::IntoIter {
        self.records()
    }
}

/// Reads one file at a time. After a read error the stream ends.
#[derive(Debug)]
pub struct FortuneRecords {
    files: vec::IntoIter<PathBuf>,
    category: Option<String>,
    current: vec::IntoIter<String>,
    current_category: String,
}

impl Iterator for FortuneRecords {
    type Item = Result<ImportRecord, EpigramError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(content) = self.current.next() {
                return Some(Ok(ImportRecord::new(content, self.current_category.clone())));
            }

            let path = self.files.next()?;
            match fs::read_to_string(&path) {
                Ok(text) => {
                    self.current_category = match &self.category {
                        Some(name) => name.clone(),
                        None => category_for(&path),
                    };
                    self.current = parse_fortunes(&text).into_iter();
                    tracing::debug!(path = %path.display(), category = %self.current_category, "reading fortune file");
                }
                Err(source) => {
                    self.files = Vec::new().into_iter();
                    return Some(Err(ImportError::Read { path, source }.into()));
                }
            }
        }
    }
}
