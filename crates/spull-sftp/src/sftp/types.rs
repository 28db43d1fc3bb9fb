// ── Types ─────────────────────────────────────────────────────────────────────

use crate::sftp::error::{RemoteErrorKind, SyncError, SyncErrorKind, SyncResult};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_SFTP_PORT: u16 = 22;

/// Read buffer used when copying a remote file.
pub const DEFAULT_CHUNK_SIZE: usize = 1_048_576; // 1 MiB

// ── Connection & Authentication ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SftpConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Connect / per-operation timeout. `None` leaves the transport defaults.
    pub timeout_secs: Option<u64>,
    pub known_hosts_policy: KnownHostsPolicy,
    /// Defaults to `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
}

impl SftpConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password,
            timeout_secs: None,
            known_hosts_policy: KnownHostsPolicy::default(),
            known_hosts_path: None,
        }
    }

    /// `host:port`, as used in connection errors.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.host.trim().is_empty() {
            return Err(SyncError::invalid_config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(SyncError::invalid_config("port must be a positive integer"));
        }
        if self.username.is_empty() {
            return Err(SyncError::invalid_config("user must not be empty"));
        }
        if self.password.expose_secret().is_empty() {
            return Err(SyncError::invalid_config("password must not be empty"));
        }
        if self.timeout_secs == Some(0) {
            return Err(SyncError::invalid_config("timeout must be at least one second"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum KnownHostsPolicy {
    /// Unknown or changed host keys are rejected.
    #[default]
    Strict,
    /// Unknown host keys are recorded, changed ones rejected.
    AcceptNew,
    /// No host-key check.
    Ignore,
}

// ── Remote entries ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RemoteEntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl RemoteEntryKind {
    /// Classify from the `S_IFMT` bits of an SFTP permission field.
    pub fn from_mode(perm: Option<u32>) -> Self {
        match perm.map(|p| p & 0o170000) {
            Some(0o100000) => Self::File,
            Some(0o040000) => Self::Directory,
            Some(0o120000) => Self::Symlink,
            _ => Self::Other,
        }
    }
}

/// One raw directory entry as reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub name: String,
    pub kind: RemoteEntryKind,
    pub size: u64,
    pub modified: Option<u64>,
    pub accessed: Option<u64>,
}

impl RemoteEntry {
    pub fn is_regular_file(&self) -> bool {
        self.kind == RemoteEntryKind::File
    }

    pub fn is_pseudo(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// A regular file observed by the lister.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    /// Seconds since the Unix epoch; `0` when the server reported none.
    pub modified: u64,
    pub size: u64,
}

impl From<RemoteEntry> for RemoteFile {
    fn from(entry: RemoteEntry) -> Self {
        Self {
            name: entry.name,
            modified: entry.modified.unwrap_or(0),
            size: entry.size,
        }
    }
}

/// The ordered file set captured at listing time. It is never re-derived:
/// cleanup targets exactly these names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SyncPlan {
    files: Vec<RemoteFile>,
}

impl SyncPlan {
    pub fn new(files: Vec<RemoteFile>) -> Self {
        Self { files }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ── Run options ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteMode {
    /// Attempt every planned deletion, then report all failures together.
    #[default]
    BestEffort,
    /// Abort cleanup at the first failed deletion.
    FailFast,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub remote_dir: String,
    pub local_dir: PathBuf,
    pub delete: bool,
    pub delete_mode: DeleteMode,
    pub chunk_size: usize,
}

impl SyncOptions {
    pub fn new(remote_dir: impl Into<String>, local_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote_dir: remote_dir.into(),
            local_dir: local_dir.into(),
            delete: false,
            delete_mode: DeleteMode::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.remote_dir.trim().is_empty() {
            return Err(SyncError::invalid_config("source must not be empty"));
        }
        if self.local_dir.as_os_str().is_empty() {
            return Err(SyncError::invalid_config("destination must not be empty"));
        }
        if self.chunk_size == 0 {
            return Err(SyncError::invalid_config("chunk size must be positive"));
        }
        Ok(())
    }
}

// ── Transfer results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferredFile {
    pub name: String,
    pub bytes: u64,
    pub modified: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub files: Vec<TransferredFile>,
    pub total_bytes: u64,
    pub duration_ms: u64,
}

// ── Cleanup results ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeleteOutcome {
    Deleted,
    /// Gone or no longer a regular file when cleanup reached it.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    pub file: String,
    pub kind: RemoteErrorKind,
    pub message: String,
}

// ── Controller state ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    Idle,
    Connected,
    Listed,
    EmptyExit,
    Transferred,
    Cleaned,
    SkippedDelete,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: SyncErrorKind,
    pub message: String,
}

/// Everything one run observed, in a form the binary can log or print.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: String,
    pub host: String,
    pub port: u16,
    pub remote_dir: String,
    pub local_dir: PathBuf,
    /// Every state the controller entered, in order.
    pub states: Vec<SyncState>,
    pub plan: SyncPlan,
    #[serde(default)]
    pub transfer: Option<TransferSummary>,
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
    pub delete_failures: Vec<DeleteFailure>,
    #[serde(default)]
    pub error: Option<ErrorReport>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// `0` on success (including an empty remote directory), `1` on any fatal error.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    pub fn final_state(&self) -> SyncState {
        self.states.last().copied().unwrap_or(SyncState::Idle)
    }

    pub fn visited(&self, state: SyncState) -> bool {
        self.states.contains(&state)
    }

    pub(crate) fn enter(&mut self, state: SyncState) {
        log::debug!("Run {}: {:?} -> {:?}", self.run_id, self.final_state(), state);
        self.states.push(state);
    }
}
