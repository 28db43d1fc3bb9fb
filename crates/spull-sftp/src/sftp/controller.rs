// ── SyncController – connect → list → transfer → (delete) → close ────────────

use crate::sftp::dir_ops::list_remote_files;
use crate::sftp::error::{SyncError, SyncResult};
use crate::sftp::file_ops::delete_remote_file;
use crate::sftp::session::{RemoteSession, SessionConnector, SessionGuard};
use crate::sftp::transfer::copy_remote_directory;
use crate::sftp::types::*;
use chrono::Utc;
use log::{error, info, warn};
use std::path::Path;
use uuid::Uuid;

/// Runs one pull. The controller owns the only session of the run and lends
/// it to each stage; the session is closed on every exit path.
pub struct SyncController<C: SessionConnector> {
    connector: C,
    connection: SftpConnectionConfig,
    options: SyncOptions,
}

impl<C: SessionConnector> SyncController<C> {
    pub fn new(connector: C, connection: SftpConnectionConfig, options: SyncOptions) -> Self {
        Self {
            connector,
            connection,
            options,
        }
    }

    /// Execute the run. Never panics on remote failures: every error ends up in
    /// [`SyncReport::error`] and [`SyncReport::exit_code`].
    pub fn run(&self) -> SyncReport {
        let mut report = self.new_report();

        info!("---------------------------------------------------------------------------------");
        info!(
            "Logging to remote server 'sftp://{}:{}{}'",
            self.connection.host,
            self.connection.port,
            prefixed(&self.options.remote_dir)
        );

        let validated = self
            .connection
            .validate()
            .and_then(|_| self.options.validate());

        match validated.and_then(|_| self.connector.open(&self.connection)) {
            Err(err) => fail(&mut report, err),
            Ok(session) => {
                let mut session = SessionGuard::new(session);
                report.enter(SyncState::Connected);
                if let Err(err) = self.sync(&mut *session, &mut report) {
                    fail(&mut report, err);
                }
                session.close();
            }
        }

        report.enter(SyncState::Closed);
        report.finished_at = Some(Utc::now());
        report
    }

    fn new_report(&self) -> SyncReport {
        SyncReport {
            run_id: Uuid::new_v4().to_string(),
            host: self.connection.host.clone(),
            port: self.connection.port,
            remote_dir: self.options.remote_dir.clone(),
            local_dir: self.options.local_dir.clone(),
            states: vec![SyncState::Idle],
            plan: SyncPlan::default(),
            transfer: None,
            deleted: Vec::new(),
            skipped: Vec::new(),
            delete_failures: Vec::new(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn sync<S>(&self, session: &mut S, report: &mut SyncReport) -> SyncResult<()>
    where
        S: RemoteSession + ?Sized,
    {
        let remote_dir = self.options.remote_dir.as_str();
        let local_dir = self.options.local_dir.as_path();

        // ── List ─────────────────────────────────────────────────────────────

        let files = list_remote_files(session, remote_dir)?;
        report.plan = SyncPlan::new(files);
        report.enter(SyncState::Listed);

        if report.plan.is_empty() {
            warn!("No remote files found");
            report.enter(SyncState::EmptyExit);
            return Ok(());
        }

        info!("Found {} remote files", report.plan.len());
        for (ctr, name) in report.plan.names().enumerate() {
            info!("File # {:2} : '{}'", ctr + 1, name);
        }

        // ── Transfer ─────────────────────────────────────────────────────────

        ensure_local_dir(local_dir)
            .map_err(|e| SyncError::transfer(remote_dir, local_dir, None, e))?;

        // The lister left us inside the (resolved) source directory.
        let source = session.current_dir();

        info!("Downloading remote files");
        let summary = copy_remote_directory(session, &source, local_dir, self.options.chunk_size)?;
        info!("Downloading remote files completed");
        report.transfer = Some(summary);
        report.enter(SyncState::Transferred);

        // ── Cleanup ──────────────────────────────────────────────────────────

        if !self.options.delete {
            info!("No remote files deleted");
            report.enter(SyncState::SkippedDelete);
            return Ok(());
        }

        self.clean(session, report)
    }

    fn clean<S>(&self, session: &mut S, report: &mut SyncReport) -> SyncResult<()>
    where
        S: RemoteSession + ?Sized,
    {
        let planned: Vec<String> = report.plan.names().map(str::to_string).collect();

        for name in &planned {
            info!("Deleting remote file '{}'", name);
            match delete_remote_file(session, name) {
                Ok(DeleteOutcome::Deleted) => report.deleted.push(name.clone()),
                Ok(DeleteOutcome::Skipped) => {
                    info!("Remote file '{}' is no longer a regular file, skipped", name);
                    report.skipped.push(name.clone());
                }
                Err(err) => {
                    report.delete_failures.push(delete_failure(name, &err));
                    match self.options.delete_mode {
                        DeleteMode::FailFast => return Err(err),
                        DeleteMode::BestEffort => warn!("{}", err),
                    }
                }
            }
        }

        if !report.delete_failures.is_empty() {
            return Err(SyncError::PartialDelete {
                attempted: planned.len(),
                failures: report.delete_failures.clone(),
            });
        }

        report.enter(SyncState::Cleaned);
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn fail(report: &mut SyncReport, err: SyncError) {
    error!("{}", err);
    error!("Failure classification: {}", err.kind());
    report.error = Some(ErrorReport {
        kind: err.kind(),
        message: err.to_string(),
    });
    report.enter(SyncState::Failed);
}

fn delete_failure(name: &str, err: &SyncError) -> DeleteFailure {
    match err {
        SyncError::Delete { source, .. } => DeleteFailure {
            file: name.to_string(),
            kind: source.kind,
            message: source.to_string(),
        },
        other => DeleteFailure {
            file: name.to_string(),
            kind: crate::sftp::error::RemoteErrorKind::Other,
            message: other.to_string(),
        },
    }
}

/// Remote paths shown in `sftp://host:port/path` form.
fn prefixed(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Create the destination (and parents) when missing.
fn ensure_local_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "exists and is not a directory",
        ));
    }

    warn!("Folder '{}' does not exist, creating", path.display());
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}
