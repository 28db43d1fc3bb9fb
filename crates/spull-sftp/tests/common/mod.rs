//! In-memory SFTP server used by the pipeline tests.

#![allow(dead_code)]

use secrecy::SecretString;
use spull_sftp::sftp::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct FakeNode {
    pub kind: RemoteEntryKind,
    pub data: Vec<u8>,
    pub modified: Option<u64>,
    pub accessed: Option<u64>,
}

#[derive(Debug, Default)]
pub struct FakeRemote {
    pub dirs: BTreeSet<String>,
    pub nodes: BTreeMap<String, FakeNode>,
    pub fail_open: HashSet<String>,
    pub fail_remove: HashSet<String>,
    pub refuse_connections: bool,
    pub connects: usize,
    pub closes: usize,
    pub removed: Vec<String>,
}

impl FakeRemote {
    pub fn new() -> Arc<Mutex<Self>> {
        let mut remote = Self::default();
        remote.dirs.insert("/".to_string());
        Arc::new(Mutex::new(remote))
    }

    pub fn add_dir(&mut self, path: &str) {
        self.dirs.insert(path.to_string());
        self.nodes.insert(
            path.to_string(),
            FakeNode {
                kind: RemoteEntryKind::Directory,
                data: Vec::new(),
                modified: Some(1),
                accessed: None,
            },
        );
    }

    pub fn add_file(&mut self, path: &str, data: &[u8], modified: u64) {
        self.nodes.insert(
            path.to_string(),
            FakeNode {
                kind: RemoteEntryKind::File,
                data: data.to_vec(),
                modified: Some(modified),
                accessed: Some(modified.saturating_sub(60)),
            },
        );
    }

    pub fn add_symlink(&mut self, path: &str) {
        self.nodes.insert(
            path.to_string(),
            FakeNode {
                kind: RemoteEntryKind::Symlink,
                data: Vec::new(),
                modified: Some(u64::MAX / 2),
                accessed: None,
            },
        );
    }

    pub fn has(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub struct FakeSession {
    remote: Arc<Mutex<FakeRemote>>,
    cwd: String,
    open: bool,
}

impl FakeSession {
    fn resolve(&self, path: &str) -> String {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else if path == "." {
            self.cwd.clone()
        } else {
            join_remote(&self.cwd, path)
        };
        let trimmed = joined.trim_end_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }

    fn entry(name: &str, node: &FakeNode) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            kind: node.kind,
            size: node.data.len() as u64,
            modified: node.modified,
            accessed: node.accessed,
        }
    }

    fn ensure_open(&self, op: &'static str, path: &str) -> Result<(), RemoteError> {
        if self.open {
            Ok(())
        } else {
            Err(RemoteError::disconnected(op, path))
        }
    }
}

impl RemoteSession for FakeSession {
    fn change_dir(&mut self, path: &str) -> Result<String, RemoteError> {
        self.ensure_open("chdir", path)?;
        let target = self.resolve(path);
        if !self.remote.lock().unwrap().dirs.contains(&target) {
            return Err(RemoteError::not_found("chdir", path));
        }
        self.cwd = target.clone();
        Ok(target)
    }

    fn current_dir(&self) -> String {
        self.cwd.clone()
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.ensure_open("readdir", path)?;
        let dir = self.resolve(path);
        let remote = self.remote.lock().unwrap();
        if !remote.dirs.contains(&dir) {
            return Err(RemoteError::not_found("readdir", path));
        }
        let pseudo = FakeNode {
            kind: RemoteEntryKind::Directory,
            data: Vec::new(),
            modified: Some(u64::MAX / 2),
            accessed: None,
        };
        let mut entries = vec![Self::entry(".", &pseudo), Self::entry("..", &pseudo)];
        entries.extend(
            remote
                .nodes
                .iter()
                .filter(|(p, _)| parent_of(p) == dir)
                .map(|(p, n)| Self::entry(base_name(p), n)),
        );
        Ok(entries)
    }

    fn lstat(&mut self, path: &str) -> Result<RemoteEntry, RemoteError> {
        self.ensure_open("lstat", path)?;
        let full = self.resolve(path);
        let remote = self.remote.lock().unwrap();
        remote
            .nodes
            .get(&full)
            .map(|n| Self::entry(base_name(&full), n))
            .ok_or_else(|| RemoteError::not_found("lstat", path))
    }

    fn open_read(&mut self, path: &str) -> Result<Box<dyn Read>, RemoteError> {
        self.ensure_open("open", path)?;
        let full = self.resolve(path);
        let remote = self.remote.lock().unwrap();
        if remote.fail_open.contains(base_name(&full)) {
            return Err(RemoteError::other("open", path, "connection reset"));
        }
        match remote.nodes.get(&full) {
            Some(node) if node.kind == RemoteEntryKind::File => {
                Ok(Box::new(Cursor::new(node.data.clone())))
            }
            _ => Err(RemoteError::not_found("open", path)),
        }
    }

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError> {
        self.ensure_open("unlink", path)?;
        let full = self.resolve(path);
        let mut remote = self.remote.lock().unwrap();
        if remote.fail_remove.contains(base_name(&full)) {
            return Err(RemoteError::new(
                RemoteErrorKind::PermissionDenied,
                "unlink",
                path,
                "permission denied",
            ));
        }
        match remote.nodes.remove(&full) {
            Some(_) => {
                remote.removed.push(full);
                Ok(())
            }
            None => Err(RemoteError::not_found("unlink", path)),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.remote.lock().unwrap().closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

pub struct FakeConnector {
    pub remote: Arc<Mutex<FakeRemote>>,
}

impl SessionConnector for FakeConnector {
    type Session = FakeSession;

    fn open(&self, config: &SftpConnectionConfig) -> SyncResult<FakeSession> {
        let mut remote = self.remote.lock().unwrap();
        if remote.refuse_connections {
            return Err(SyncError::connection(config.address(), "Connection refused"));
        }
        remote.connects += 1;
        Ok(FakeSession {
            remote: Arc::clone(&self.remote),
            cwd: "/home/bob".to_string(),
            open: true,
        })
    }
}

pub fn connection() -> SftpConnectionConfig {
    SftpConnectionConfig::new("sftp.test", 2222, "bob", SecretString::new("secret".to_string()))
}

/// `/out` holding three files, a nested directory and a symlink.
pub fn populated_remote() -> Arc<Mutex<FakeRemote>> {
    let remote = FakeRemote::new();
    {
        let mut r = remote.lock().unwrap();
        r.add_dir("/home/bob");
        r.add_dir("/out");
        r.add_file("/out/old.csv", b"oldest", 1_600_000_000);
        r.add_file("/out/new.csv", b"newest file", 1_700_000_000);
        r.add_file("/out/mid.csv", b"middle", 1_650_000_000);
        r.add_dir("/out/archive");
        r.add_file("/out/archive/deep.csv", b"nested", 1_690_000_000);
        r.add_symlink("/out/latest");
    }
    remote
}

pub fn run(
    remote: &Arc<Mutex<FakeRemote>>,
    options: SyncOptions,
) -> SyncReport {
    SyncController::new(
        FakeConnector {
            remote: Arc::clone(remote),
        },
        connection(),
        options,
    )
    .run()
}
