//! Error types for anilib-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while inspecting or converting media.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool failed to execute.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// An external tool ran past its time limit and was killed.
    #[error("{tool} timed out after {seconds}s")]
    TimedOut { tool: String, seconds: u64 },

    /// The caller cancelled the operation and the tool was killed.
    #[error("{tool} cancelled")]
    Cancelled { tool: String },

    /// Failed to parse tool output.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// The specified file was not found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }
}

impl From<Error> for anilib_common::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Cancelled { .. } => anilib_common::Error::Cancelled,
            Error::ParseError { .. } | Error::Json(_) => {
                anilib_common::Error::Probe(err.to_string())
            }
            Error::FileNotFound { path } => anilib_common::Error::not_found("file", path.display()),
            Error::Io(source) => anilib_common::Error::Io { source },
            Error::InvalidInput(msg) => anilib_common::Error::InvalidInput(msg),
            Error::ToolNotFound { .. } => anilib_common::Error::ToolUnavailable(err.to_string()),
            Error::ToolFailed { ref tool, .. }
            | Error::TimedOut { ref tool, .. } => {
                anilib_common::Error::tool(tool.clone(), err.to_string())
            }
        }
    }
}
