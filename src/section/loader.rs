//! Rule file loading utilities
//!
//! This module provides `PatternLoader` - a utility for loading section
//! rules from JSONL files or strings. This is used by both production code
//! and tests.
//!
//! Rule files hold one JSON object per line. Lines starting with `//` are
//! comments and blank lines are ignored:
//!
//! ```text
//! // Default clinical section rules
//! {"section_title": "past_medical_history", "pattern": "pmh:"}
//! {"section_title": "allergy", "pattern": "allergies:"}
//! ```
//!
//! # Example
//!
//! ```rust
//! use sectionizer::section::loader::PatternLoader;
//!
//! // From file
//! let patterns = PatternLoader::from_path("rules.jsonl").unwrap().load().unwrap();
//!
//! // From string
//! let loader = PatternLoader::from_string(r#"{"section_title": "allergy", "pattern": "allergies:"}"#);
//! let patterns = loader.load().unwrap();
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::section::pattern::SectionPattern;

/// Error that can occur when loading rule files
#[derive(Debug, Clone)]
pub enum LoaderError {
    /// The rule file does not exist at the given path
    FileMissing(PathBuf),
    /// IO error when reading file
    IoError(String),
    /// A rule line is not a valid rule record
    RuleParse { line: usize, message: String },
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderError::FileMissing(path) => {
                write!(f, "Rule file not found: {}", path.display())
            }
            LoaderError::IoError(msg) => write!(f, "IO error: {}", msg),
            LoaderError::RuleParse { line, message } => {
                write!(f, "Invalid rule on line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::IoError(err.to_string())
    }
}

/// Rule file loader
///
/// `PatternLoader` reads JSONL rule content and parses it into
/// [`SectionPattern`] records, reporting the 1-based line number of any
/// malformed rule.
pub struct PatternLoader {
    source: String,
}

impl PatternLoader {
    /// Load rule content from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoaderError::FileMissing(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        Ok(PatternLoader { source })
    }

    /// Load rule content from a string
    pub fn from_string<S: Into<String>>(source: S) -> Self {
        PatternLoader {
            source: source.into(),
        }
    }

    /// Parse the content into rule records.
    ///
    /// Comment lines (starting with `//`) and blank lines are skipped.
    pub fn load(&self) -> Result<Vec<SectionPattern>, LoaderError> {
        let mut patterns = Vec::new();
        for (index, line) in self.source.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || line.starts_with("//") {
                continue;
            }
            let pattern =
                serde_json::from_str(trimmed).map_err(|e| LoaderError::RuleParse {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            patterns.push(pattern);
        }
        Ok(patterns)
    }

    /// Get a reference to the raw source string
    pub fn source(&self) -> &str {
        &self.source
    }
}
