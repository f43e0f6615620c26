//! Error taxonomy shared by the catalog, the media toolkit and the ingest
//! pipeline.
//!
//! Every failure is classified as either local to a single filesystem entry
//! (a folder or a file) or as a failure of shared infrastructure. The ingest
//! batch uses [`Error::is_item_local`] to decide whether to record the
//! failure and keep going or to halt.

use std::fmt;
use std::path::Path;

/// Common error type for anilib.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "anime", "episode").
        entity: String,
        /// The identifier or path that was looked up.
        id: String,
    },

    /// An entity with the same unique key is already cataloged.
    #[error("{entity} already exists: {key}")]
    AlreadyExists {
        /// The kind of entity.
        entity: String,
        /// The unique key that collided (usually a path).
        key: String,
    },

    /// The metadata provider failed for one query or found no match.
    #[error("Metadata lookup failed for {query:?}: {message}")]
    Lookup {
        /// The search text that was sent.
        query: String,
        /// Human-readable error description.
        message: String,
    },

    /// The metadata provider cannot be reached at all.
    #[error("Metadata provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A required external tool is not installed.
    #[error("Tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Codec or container inspection failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// Cover extraction or transcoding failed.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Persisting or reading the catalog failed.
    #[error("Store error: {source}")]
    Store {
        /// The underlying store error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A library update is already running.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::AlreadyExists { .. } | Error::Conflict(_) => 409,
            Error::InvalidInput(_) => 400,
            Error::Lookup { .. } | Error::ProviderUnavailable(_) | Error::Tool { .. } => 502,
            Error::Probe(_) => 422,
            Error::Cancelled => 499,
            Error::ToolUnavailable(_)
            | Error::Store { .. }
            | Error::Io { .. }
            | Error::Internal(_) => 500,
        }
    }

    /// Whether this failure only concerns the folder or file being processed.
    ///
    /// Item-local failures are recorded and the surrounding batch continues.
    /// Everything else (store, provider outage, missing tool, cancellation)
    /// halts it.
    pub fn is_item_local(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::AlreadyExists { .. }
                | Error::Lookup { .. }
                | Error::Probe(_)
                | Error::Tool { .. }
                | Error::Io { .. }
                | Error::InvalidInput(_)
        )
    }

    /// Whether this is the benign outcome of a lost dedup race.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// Whether the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new AlreadyExists error keyed by a path.
    pub fn already_exists(entity: impl Into<String>, key: &Path) -> Self {
        Error::AlreadyExists {
            entity: entity.into(),
            key: key.display().to_string(),
        }
    }

    /// Create a new Lookup error.
    pub fn lookup(query: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Lookup {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Create a new Store error.
    pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Store {
            source: source.into(),
        }
    }

    /// Create a new Tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
