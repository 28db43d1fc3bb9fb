//! Error types for the pull pipeline.
//!
//! `RemoteError` is what a [`RemoteSession`](crate::sftp::session::RemoteSession)
//! reports for a single remote operation. `SyncError` is what the pipeline
//! components report to the controller; every variant is fatal to the run.

use crate::sftp::types::DeleteFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ── Remote operation errors ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteErrorKind {
    /// The path does not exist on the server.
    NotFound,
    /// The server refused the operation.
    PermissionDenied,
    /// The connection dropped or the session was already closed.
    Disconnected,
    /// Catch-all.
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{op} '{path}' failed: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub op: &'static str,
    pub path: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(
        kind: RemoteErrorKind,
        op: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            op,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn not_found(op: &'static str, path: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, op, path, "no such file")
    }

    pub fn disconnected(op: &'static str, path: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Disconnected, op, path, "session is closed")
    }

    pub fn other(op: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Other, op, path, message)
    }

    /// Classify a libssh2 error by its SFTP status / session error code.
    pub fn from_ssh2(op: &'static str, path: impl Into<String>, err: &ssh2::Error) -> Self {
        let kind = match err.code() {
            // SSH_FX_NO_SUCH_FILE, SSH_FX_NO_SUCH_PATH
            ssh2::ErrorCode::SFTP(2) | ssh2::ErrorCode::SFTP(10) => RemoteErrorKind::NotFound,
            // SSH_FX_PERMISSION_DENIED, SSH_FX_WRITE_PROTECT
            ssh2::ErrorCode::SFTP(3) | ssh2::ErrorCode::SFTP(12) => {
                RemoteErrorKind::PermissionDenied
            }
            // SSH_FX_NO_CONNECTION, SSH_FX_CONNECTION_LOST
            ssh2::ErrorCode::SFTP(6) | ssh2::ErrorCode::SFTP(7) => RemoteErrorKind::Disconnected,
            // LIBSSH2_ERROR_SOCKET_SEND, LIBSSH2_ERROR_SOCKET_DISCONNECT, LIBSSH2_ERROR_SOCKET_RECV
            ssh2::ErrorCode::Session(-7)
            | ssh2::ErrorCode::Session(-13)
            | ssh2::ErrorCode::Session(-43) => RemoteErrorKind::Disconnected,
            _ => RemoteErrorKind::Other,
        };
        Self::new(kind, op, path, err.message())
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteErrorKind::NotFound
    }
}

// ── Pipeline errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Connecting to '{addr}' : {cause}")]
    Connection { addr: String, cause: String },

    #[error("Listing remote directory '{dir}' : {source}")]
    List {
        dir: String,
        #[source]
        source: RemoteError,
    },

    #[error(
        "Copying files of remote directory '{remote_dir}' to local path '{}' : {cause}",
        .local_dir.display()
    )]
    Transfer {
        remote_dir: String,
        local_dir: PathBuf,
        /// Name of the file being copied when the failure happened, if any.
        file: Option<String>,
        cause: String,
    },

    #[error("Deleting remote file '{file}' : {source}")]
    Delete {
        file: String,
        #[source]
        source: RemoteError,
    },

    #[error("Deleting remote files : {} of {attempted} deletions failed", .failures.len())]
    PartialDelete {
        attempted: usize,
        failures: Vec<DeleteFailure>,
    },

    #[error("Invalid configuration : {0}")]
    InvalidConfig(String),
}

/// Failure classification reported next to the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncErrorKind {
    ConnectionError,
    ListError,
    TransferError,
    DeleteError,
    ConfigError,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConnectionError => "ConnectionError",
            Self::ListError => "ListError",
            Self::TransferError => "TransferError",
            Self::DeleteError => "DeleteError",
            Self::ConfigError => "ConfigError",
        };
        f.write_str(name)
    }
}

impl SyncError {
    pub fn connection(addr: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::Connection {
            addr: addr.into(),
            cause: cause.to_string(),
        }
    }

    pub fn list(dir: impl Into<String>, source: RemoteError) -> Self {
        Self::List {
            dir: dir.into(),
            source,
        }
    }

    pub fn transfer(
        remote_dir: impl Into<String>,
        local_dir: impl Into<PathBuf>,
        file: Option<&str>,
        cause: impl fmt::Display,
    ) -> Self {
        let cause = match file {
            Some(name) => format!("'{}' : {}", name, cause),
            None => cause.to_string(),
        };
        Self::Transfer {
            remote_dir: remote_dir.into(),
            local_dir: local_dir.into(),
            file: file.map(str::to_string),
            cause,
        }
    }

    pub fn delete(file: impl Into<String>, source: RemoteError) -> Self {
        Self::Delete {
            file: file.into(),
            source,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Connection { .. } => SyncErrorKind::ConnectionError,
            Self::List { .. } => SyncErrorKind::ListError,
            Self::Transfer { .. } => SyncErrorKind::TransferError,
            Self::Delete { .. } | Self::PartialDelete { .. } => SyncErrorKind::DeleteError,
            Self::InvalidConfig(_) => SyncErrorKind::ConfigError,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
