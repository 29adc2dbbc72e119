//! Previewed document state

use std::path::{Path, PathBuf};

use crate::resolve::Resolution;
use crate::uri::normalize_path;

/// Errors reading a document from disk
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },
}

/// A document bound to a preview, with the results of its last resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDocument {
    location: PathBuf,
    raw_text: String,
    resolved_text: Option<String>,
    unresolved_packages: Vec<String>,
}

impl ResourceDocument {
    /// A document whose text has not been read yet
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self::with_text(location, String::new())
    }

    pub fn with_text(location: impl Into<PathBuf>, raw_text: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            raw_text: raw_text.into(),
            resolved_text: None,
            unresolved_packages: Vec::new(),
        }
    }

    /// Read the document at `location`
    pub async fn load(location: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let location = location.into();
        let raw_text = tokio::fs::read_to_string(&location)
            .await
            .map_err(|e| DocumentError::Read {
                path: location.to_string_lossy().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_text(location, raw_text))
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn resolved_text(&self) -> Option<&str> {
        self.resolved_text.as_deref()
    }

    pub fn unresolved_packages(&self) -> &[String] {
        &self.unresolved_packages
    }

    /// Whether `path` names this document
    pub fn is_document(&self, path: &Path) -> bool {
        same_file_path(&self.location, path)
    }

    pub(crate) fn apply_resolution(&mut self, resolution: Resolution) {
        self.resolved_text = Some(resolution.resolved_text);
        self.unresolved_packages = resolution.unresolved_packages;
    }
}

/// Compare two file-system paths after lexical normalization
pub fn same_file_path(a: &Path, b: &Path) -> bool {
    normalize_path(&a.to_string_lossy()) == normalize_path(&b.to_string_lossy())
}
