// ── Directory operations ─────────────────────────────────────────────────────

use crate::sftp::error::{SyncError, SyncResult};
use crate::sftp::session::RemoteSession;
use crate::sftp::types::*;
use log::debug;
use std::cmp::Ordering;

/// Enter `remote_dir` and list its regular files, newest first.
///
/// The session's working directory is left at `remote_dir`. Directories,
/// symlinks and special files are dropped; an empty result is not an error.
pub fn list_remote_files<S>(session: &mut S, remote_dir: &str) -> SyncResult<Vec<RemoteFile>>
where
    S: RemoteSession + ?Sized,
{
    let resolved = session
        .change_dir(remote_dir)
        .map_err(|e| SyncError::list(remote_dir, e))?;

    let raw_entries = session
        .read_dir(".")
        .map_err(|e| SyncError::list(remote_dir, e))?;

    let mut files: Vec<RemoteFile> = raw_entries
        .into_iter()
        .filter(|entry| !entry.is_pseudo())
        .filter(|entry| {
            let keep = entry.is_regular_file();
            if !keep {
                debug!("Skipping {:?} entry '{}' in {}", entry.kind, entry.name, resolved);
            }
            keep
        })
        .map(RemoteFile::from)
        .collect();

    sort_newest_first(&mut files);
    Ok(files)
}

// ── Sorting helper ───────────────────────────────────────────────────────────

/// Modification time descending; equal times fall back to name order.
pub(crate) fn sort_newest_first(files: &mut [RemoteFile]) {
    files.sort_by(|a, b| match b.modified.cmp(&a.modified) {
        Ordering::Equal => a.name.cmp(&b.name),
        other => other,
    });
}
