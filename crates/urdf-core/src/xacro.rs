//! Macro expansion collaborator

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Errors produced while expanding a macro document
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExpandError {
    #[error("Failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("xacro failed on {path}: {stderr}")]
    Failed { path: String, stderr: String },

    #[error("xacro produced non UTF-8 output for {0}")]
    Encoding(String),

    #[error("Macro expansion failed: {0}")]
    Other(String),
}

/// Turns raw document text into loader-ready URDF text
#[async_trait]
pub trait MacroExpander: Send + Sync {
    async fn expand(&self, location: &Path, raw_text: &str) -> Result<String, ExpandError>;
}

/// Returns the document unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl MacroExpander for Passthrough {
    async fn expand(&self, _location: &Path, raw_text: &str) -> Result<String, ExpandError> {
        Ok(raw_text.to_string())
    }
}

/// Expands `.xacro` documents with the external `xacro` executable
///
/// The executable reads the file at `location`, so the on-disk content is
/// what gets expanded. Other documents pass through untouched.
#[derive(Debug, Clone)]
pub struct XacroCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl XacroCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Extra arguments placed before the document path (e.g. `name:=value`)
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn is_macro_document(location: &Path) -> bool {
        location
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xacro"))
    }
}

#[async_trait]
impl MacroExpander for XacroCommand {
    async fn expand(&self, location: &Path, raw_text: &str) -> Result<String, ExpandError> {
        if !Self::is_macro_document(location) {
            return Ok(raw_text.to_string());
        }

        tracing::debug!("Running {:?} on {:?}", self.program, location);

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(location)
            .output()
            .await
            .map_err(|e| ExpandError::Spawn {
                program: self.program.to_string_lossy().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ExpandError::Failed {
                path: location.to_string_lossy().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|_| ExpandError::Encoding(location.to_string_lossy().to_string()))
    }
}
