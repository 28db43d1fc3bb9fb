// ── Transfer engine – bulk, non-recursive download ───────────────────────────

use crate::sftp::error::{SyncError, SyncResult};
use crate::sftp::session::{join_remote, RemoteSession};
use crate::sftp::types::*;
use filetime::FileTime;
use log::{debug, info};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

/// Copy every regular file directly under `remote_dir` into `local_dir`.
///
/// `local_dir` must already exist. Each local copy gets the remote access and
/// modification times. The first failing file aborts the whole copy; files
/// written before it are left in place.
pub fn copy_remote_directory<S>(
    session: &mut S,
    remote_dir: &str,
    local_dir: &Path,
    chunk_size: usize,
) -> SyncResult<TransferSummary>
where
    S: RemoteSession + ?Sized,
{
    let fail = |file: Option<&str>, cause: &dyn std::fmt::Display| {
        SyncError::transfer(remote_dir, local_dir, file, cause)
    };

    if !local_dir.is_dir() {
        return Err(fail(None, &"local path is not a directory"));
    }

    let entries = session
        .read_dir(remote_dir)
        .map_err(|e| fail(None, &e))?;

    let started = Instant::now();
    let mut summary = TransferSummary::default();
    let mut buf = vec![0u8; chunk_size.max(1)];

    for entry in entries
        .into_iter()
        .filter(|e| !e.is_pseudo() && e.is_regular_file())
    {
        let bytes = copy_one(session, remote_dir, local_dir, &entry, &mut buf)
            .map_err(|cause| fail(Some(entry.name.as_str()), &cause))?;

        debug!("Copied '{}' ({} bytes)", entry.name, bytes);
        summary.total_bytes += bytes;
        summary.files.push(TransferredFile {
            name: entry.name,
            bytes,
            modified: entry.modified,
        });
    }

    summary.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "Copied {} files ({} bytes) in {} ms",
        summary.files.len(),
        summary.total_bytes,
        summary.duration_ms
    );
    Ok(summary)
}

fn copy_one<S>(
    session: &mut S,
    remote_dir: &str,
    local_dir: &Path,
    entry: &RemoteEntry,
    buf: &mut [u8],
) -> Result<u64, String>
where
    S: RemoteSession + ?Sized,
{
    let remote_path = join_remote(remote_dir, &entry.name);
    let local_path = local_dir.join(&entry.name);

    let mut remote_file = session.open_read(&remote_path).map_err(|e| e.to_string())?;
    let mut local_file = std::fs::File::create(&local_path)
        .map_err(|e| format!("Failed to create local '{}': {}", local_path.display(), e))?;

    let mut transferred: u64 = 0;
    loop {
        let n = remote_file
            .read(buf)
            .map_err(|e| format!("Read error: {}", e))?;
        if n == 0 {
            break;
        }
        local_file
            .write_all(&buf[..n])
            .map_err(|e| format!("Write error: {}", e))?;
        transferred += n as u64;
    }
    local_file
        .flush()
        .map_err(|e| format!("Write error: {}", e))?;
    drop(local_file);

    // Preserve timestamps
    if let Some(mtime) = entry.modified {
        let mtime = FileTime::from_unix_time(mtime as i64, 0);
        let atime = entry
            .accessed
            .map(|a| FileTime::from_unix_time(a as i64, 0))
            .unwrap_or(mtime);
        filetime::set_file_times(&local_path, atime, mtime).map_err(|e| {
            format!(
                "Failed to set times on '{}': {}",
                local_path.display(),
                e
            )
        })?;
    }

    Ok(transferred)
}
