//! # SFTP Pull – core
//!
//! One-way SFTP pull service providing:
//!   • Password / keyboard-interactive session with known-hosts validation
//!   • Flat remote directory listing ordered by modification time (newest first)
//!   • Bulk, non-recursive download preserving access & modification times
//!   • Optional remote cleanup of the files observed at listing time
//!   • A run controller that maps every failure to a classified error and exit status

pub mod sftp;
