// ── Session seam ─────────────────────────────────────────────────────────────

use crate::sftp::error::{RemoteError, SyncResult};
use crate::sftp::types::{RemoteEntry, SftpConnectionConfig};
use std::io::Read;
use std::ops::{Deref, DerefMut};

/// Every remote operation the pull pipeline performs.
///
/// Relative paths are resolved against the directory set by the last
/// successful [`change_dir`](RemoteSession::change_dir).
#[cfg_attr(test, mockall::automock)]
pub trait RemoteSession {
    /// Make `path` the working directory and return its resolved form.
    fn change_dir(&mut self, path: &str) -> Result<String, RemoteError>;

    fn current_dir(&self) -> String;

    /// Raw entries of a directory, pseudo-entries included if the server sends them.
    fn read_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Attributes of `path` itself (links are not followed).
    fn lstat(&mut self, path: &str) -> Result<RemoteEntry, RemoteError>;

    fn open_read(&mut self, path: &str) -> Result<Box<dyn Read>, RemoteError>;

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Release the transport. Safe to call more than once.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Opens a [`RemoteSession`]; the production connector dials libssh2.
pub trait SessionConnector {
    type Session: RemoteSession;

    fn open(&self, config: &SftpConnectionConfig) -> SyncResult<Self::Session>;
}

/// Closes the wrapped session when dropped, whatever path the caller leaves by.
pub struct SessionGuard<S: RemoteSession> {
    session: S,
}

impl<S: RemoteSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Close the session unless it is already closed.
    pub fn close(&mut self) {
        if self.session.is_open() {
            self.session.close();
        }
    }
}

impl<S: RemoteSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: RemoteSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: RemoteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Join a remote POSIX directory and an entry name.
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir == "." {
        return name.to_string();
    }
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", trimmed, name)
    }
}
