//! Error types for dependency extraction, command assembly and builds.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or running a build.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("packaging tool '{0}' is not installed")]
    ToolMissing(String),

    #[error("{cmd} failed (exit code: {})", code_label(.code))]
    ToolInvocation { cmd: String, code: Option<i32> },

    #[error("failed to start {cmd}: {reason}")]
    Spawn { cmd: String, reason: String },

    #[error("history error ({}): {reason}", .path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("invalid config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },
}

impl PackError {
    /// Exit code reported by the packaging tool, if the error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PackError::ToolInvocation { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether this error belongs to the `ToolInvocation` kind.
    ///
    /// Spawn failures count as invocation failures; they just carry no code.
    pub fn is_invocation_failure(&self) -> bool {
        matches!(
            self,
            PackError::ToolInvocation { .. } | PackError::Spawn { .. }
        )
    }
}

fn code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PackError>;
