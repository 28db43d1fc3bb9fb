// ── File operations ──────────────────────────────────────────────────────────

use crate::sftp::error::{SyncError, SyncResult};
use crate::sftp::session::RemoteSession;
use crate::sftp::types::DeleteOutcome;
use log::{debug, info};

/// Delete `file` (relative to the session's working directory) if it is
/// still a regular file. Missing files and non-files are skipped.
pub fn delete_remote_file<S>(session: &mut S, file: &str) -> SyncResult<DeleteOutcome>
where
    S: RemoteSession + ?Sized,
{
    let entry = match session.lstat(file) {
        Ok(entry) => entry,
        Err(e) if e.is_not_found() => {
            debug!("Remote file '{}' already gone, skipping", file);
            return Ok(DeleteOutcome::Skipped);
        }
        Err(e) => return Err(SyncError::delete(file, e)),
    };

    if !entry.is_regular_file() {
        debug!("Remote '{}' is now {:?}, skipping", file, entry.kind);
        return Ok(DeleteOutcome::Skipped);
    }

    match session.remove_file(file) {
        Ok(()) => {
            info!("SFTP deleted file: {}", file);
            Ok(DeleteOutcome::Deleted)
        }
        // lost a race with another remover
        Err(e) if e.is_not_found() => Ok(DeleteOutcome::Skipped),
        Err(e) => Err(SyncError::delete(file, e)),
    }
}
