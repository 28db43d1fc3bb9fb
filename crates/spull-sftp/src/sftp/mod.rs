// ── spull-sftp / sftp module ──────────────────────────────────────────────────
//
// Pull pipeline, leaves first:
//   • session     – the `RemoteSession` / `SessionConnector` seam
//   • service     – libssh2-backed session (connect, auth, host keys, close)
//   • dir_ops     – remote listing (regular files, newest first)
//   • transfer    – bulk download with preserved timestamps
//   • file_ops    – remote cleanup
//   • controller  – connect → list → transfer → (delete) → close

pub mod types;
pub mod error;
pub mod session;
pub mod service;
pub mod dir_ops;
pub mod transfer;
pub mod file_ops;
pub mod controller;

pub use controller::SyncController;
pub use dir_ops::list_remote_files;
pub use error::*;
pub use file_ops::delete_remote_file;
pub use service::{SftpSession, Ssh2Connector};
pub use session::{join_remote, RemoteSession, SessionConnector, SessionGuard};
pub use transfer::copy_remote_directory;
pub use types::*;
