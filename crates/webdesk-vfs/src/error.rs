//! VFS error types.
//!
//! Every variant renders to a human-readable message; the gateway hands
//! that message back as the failure payload.

use std::io;
use thiserror::Error;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Resolved path left the sandbox root (through a symlink).
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Request arguments are missing or of the wrong shape.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// External tool exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    Process {
        tool: String,
        status: String,
        stderr: String,
    },

    /// External tool exceeded the configured timeout.
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// A collaborator (package registry, archiver) failed.
    #[error("{0}")]
    Collaborator(String),

    /// Remote fetch failed.
    #[error("fetch failed: {0}")]
    Http(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create a Malformed error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create a Collaborator error.
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    /// Attach the abstract path to a raw I/O error.
    ///
    /// `NotFound` and `AlreadyExists` kinds fold into the matching variants
    /// so callers see the abstract path, never the concrete one.
    pub fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path.to_string()),
            io::ErrorKind::IsADirectory => Self::IsADirectory(path.to_string()),
            _ => Self::Io(io::Error::new(err.kind(), format!("{path}: {err}"))),
        }
    }
}

impl From<anyhow::Error> for VfsError {
    fn from(e: anyhow::Error) -> Self {
        Self::Collaborator(format!("{e:#}"))
    }
}

impl From<reqwest::Error> for VfsError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
