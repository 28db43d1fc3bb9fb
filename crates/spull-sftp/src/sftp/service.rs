// ── SftpSession – libssh2-backed session lifecycle ───────────────────────────

use crate::sftp::error::{RemoteError, SyncError, SyncResult};
use crate::sftp::session::{join_remote, RemoteSession, SessionConnector};
use crate::sftp::types::*;
use log::{debug, info, warn};
use secrecy::ExposeSecret;
use ssh2::{CheckResult, FileStat, HostKeyType, KnownHostFileKind, KnownHosts, Session, Sftp};
use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Session struct ───────────────────────────────────────────────────────────

/// An authenticated SFTP session. Exactly one per run; closed on drop.
pub struct SftpSession {
    address: String,
    session: Option<Session>,
    sftp: Option<Sftp>,
    cwd: String,
}

impl SftpSession {
    // ── Connect ──────────────────────────────────────────────────────────────

    pub fn connect(config: &SftpConnectionConfig) -> SyncResult<Self> {
        let addr = config.address();
        info!("SFTP connecting to {}", addr);

        let tcp = open_tcp(config).map_err(|e| SyncError::connection(&addr, e))?;

        // SSH handshake
        let mut session = Session::new().map_err(|e| {
            SyncError::connection(&addr, format!("Failed to create SSH session: {}", e))
        })?;
        if let Some(secs) = config.timeout_secs {
            session.set_timeout(secs.saturating_mul(1000).min(u64::from(u32::MAX)) as u32);
        }
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| SyncError::connection(&addr, format!("SSH handshake failed: {}", e)))?;

        if let Some(banner) = session.banner() {
            debug!("SFTP server banner: {}", banner);
        }

        verify_host_key(&session, config).map_err(|e| SyncError::connection(&addr, e))?;

        // ── Authentication ───────────────────────────────────────────────────

        let auth_method = authenticate(&session, config)
            .map_err(|e| SyncError::connection(&addr, format!("Authentication failed: {}", e)))?;

        if !session.authenticated() {
            return Err(SyncError::connection(
                &addr,
                "Authentication failed – not authenticated after auth attempt",
            ));
        }

        info!("SFTP authenticated to {} via {}", addr, auth_method);

        let sftp = session
            .sftp()
            .map_err(|e| SyncError::connection(&addr, format!("SFTP channel error: {}", e)))?;

        // Start where the server puts us (normally the login home)
        let cwd = sftp
            .realpath(Path::new("."))
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| "/".to_string());

        Ok(Self {
            address: addr,
            session: Some(session),
            sftp: Some(sftp),
            cwd,
        })
    }

    fn channel(&self, op: &'static str, path: &str) -> Result<&Sftp, RemoteError> {
        self.sftp
            .as_ref()
            .ok_or_else(|| RemoteError::disconnected(op, path))
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else if path == "." || path.is_empty() {
            self.cwd.clone()
        } else {
            join_remote(&self.cwd, path)
        }
    }
}

impl RemoteSession for SftpSession {
    fn change_dir(&mut self, path: &str) -> Result<String, RemoteError> {
        let target = self.resolve(path);
        let sftp = self.channel("chdir", path)?;

        let resolved = sftp
            .realpath(Path::new(&target))
            .map_err(|e| RemoteError::from_ssh2("chdir", path, &e))?;
        let stat = sftp
            .stat(&resolved)
            .map_err(|e| RemoteError::from_ssh2("chdir", path, &e))?;
        if !stat.is_dir() {
            return Err(RemoteError::other("chdir", path, "not a directory"));
        }

        self.cwd = resolved.to_string_lossy().to_string();
        debug!("SFTP working directory: {}", self.cwd);
        Ok(self.cwd.clone())
    }

    fn current_dir(&self) -> String {
        self.cwd.clone()
    }

    fn read_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let target = self.resolve(path);
        let sftp = self.channel("readdir", path)?;

        let raw_entries = sftp
            .readdir(Path::new(&target))
            .map_err(|e| RemoteError::from_ssh2("readdir", path, &e))?;

        Ok(raw_entries
            .iter()
            .map(|(entry_path, stat)| entry_from_stat(&file_name(entry_path), stat))
            .collect())
    }

    fn lstat(&mut self, path: &str) -> Result<RemoteEntry, RemoteError> {
        let target = self.resolve(path);
        let sftp = self.channel("lstat", path)?;
        let stat = sftp
            .lstat(Path::new(&target))
            .map_err(|e| RemoteError::from_ssh2("lstat", path, &e))?;
        Ok(entry_from_stat(&file_name(Path::new(&target)), &stat))
    }

    fn open_read(&mut self, path: &str) -> Result<Box<dyn Read>, RemoteError> {
        let target = self.resolve(path);
        let sftp = self.channel("open", path)?;
        let file = sftp
            .open(Path::new(&target))
            .map_err(|e| RemoteError::from_ssh2("open", path, &e))?;
        Ok(Box::new(file))
    }

    fn remove_file(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        let sftp = self.channel("unlink", path)?;
        sftp.unlink(Path::new(&target))
            .map_err(|e| RemoteError::from_ssh2("unlink", path, &e))
    }

    // ── Disconnect ───────────────────────────────────────────────────────────

    fn close(&mut self) {
        if let Some(mut sftp) = self.sftp.take() {
            if let Err(e) = sftp.shutdown() {
                debug!("SFTP channel shutdown for {}: {}", self.address, e);
            }
        }
        if let Some(session) = self.session.take() {
            // Graceful SSH disconnect
            let _ = session.disconnect(None, "Client disconnecting", None);
            info!("SFTP session to {} closed", self.address);
        }
    }

    fn is_open(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Connector ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct Ssh2Connector;

impl SessionConnector for Ssh2Connector {
    type Session = SftpSession;

    fn open(&self, config: &SftpConnectionConfig) -> SyncResult<SftpSession> {
        SftpSession::connect(config)
    }
}

// ── TCP ──────────────────────────────────────────────────────────────────────

fn open_tcp(config: &SftpConnectionConfig) -> Result<TcpStream, String> {
    let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|e| format!("Cannot resolve '{}': {}", config.host, e))?
        .collect();

    let mut last_error = format!("No address found for '{}'", config.host);
    for addr in addrs {
        let attempt = match config.timeout_secs {
            Some(secs) => TcpStream::connect_timeout(&addr, Duration::from_secs(secs)),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(tcp) => return Ok(tcp),
            Err(e) => {
                debug!("TCP connection to {} failed: {}", addr, e);
                last_error = format!("TCP connection to {} failed: {}", addr, e);
            }
        }
    }
    Err(last_error)
}

// ── Host key validation ──────────────────────────────────────────────────────

fn default_known_hosts_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".ssh").join("known_hosts"))
}

/// Host pattern as OpenSSH writes it: bare for port 22, `[host]:port` otherwise.
fn known_hosts_entry(host: &str, port: u16) -> String {
    if port == DEFAULT_SFTP_PORT {
        host.to_string()
    } else {
        format!("[{}]:{}", host, port)
    }
}

fn verify_host_key(session: &Session, config: &SftpConnectionConfig) -> Result<(), String> {
    if config.known_hosts_policy == KnownHostsPolicy::Ignore {
        warn!("Host key check disabled for {}", config.address());
        return Ok(());
    }

    let (key, key_type) = session
        .host_key()
        .ok_or_else(|| "Server did not present a host key".to_string())?;

    let path = config
        .known_hosts_path
        .clone()
        .or_else(default_known_hosts_path)
        .ok_or_else(|| "Cannot locate a known_hosts file".to_string())?;

    let mut known_hosts = session
        .known_hosts()
        .map_err(|e| format!("Cannot initialise known hosts: {}", e))?;

    check_host_key(&mut known_hosts, key, key_type, &path, config)
}

/// Check `key` against the known_hosts file at `path` under the configured
/// policy. `AcceptNew` appends unknown keys to the file.
fn check_host_key(
    known_hosts: &mut KnownHosts,
    key: &[u8],
    key_type: HostKeyType,
    path: &Path,
    config: &SftpConnectionConfig,
) -> Result<(), String> {
    if path.exists() {
        known_hosts
            .read_file(path, KnownHostFileKind::OpenSSH)
            .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
    }

    match known_hosts.check_port(&config.host, config.port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::Mismatch => Err(format!(
            "Host key for '{}' does not match the one recorded in '{}'",
            config.address(),
            path.display()
        )),
        CheckResult::NotFound if config.known_hosts_policy == KnownHostsPolicy::AcceptNew => {
            record_host_key(known_hosts, key, key_type, path, config)
        }
        CheckResult::NotFound => Err(format!(
            "Host key for '{}' not found in '{}'",
            config.address(),
            path.display()
        )),
        CheckResult::Failure => Err("Host key check failed".to_string()),
    }
}

/// Append one entry for the host; the rest of the file is left untouched.
fn record_host_key(
    known_hosts: &mut KnownHosts,
    key: &[u8],
    key_type: HostKeyType,
    path: &Path,
    config: &SftpConnectionConfig,
) -> Result<(), String> {
    let entry = known_hosts_entry(&config.host, config.port);
    known_hosts
        .add(&entry, key, "added by sftp-pull", key_type.into())
        .map_err(|e| format!("Cannot record host key: {}", e))?;

    let host = known_hosts
        .hosts()
        .map_err(|e| format!("Cannot record host key: {}", e))?
        .into_iter()
        .rev()
        .find(|h| h.name() == Some(entry.as_str()))
        .ok_or_else(|| format!("Cannot record host key: '{}' missing after add", entry))?;
    let line = known_hosts
        .write_string(&host, KnownHostFileKind::OpenSSH)
        .map_err(|e| format!("Cannot record host key: {}", e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Cannot create '{}': {}", parent.display(), e))?;
    }
    append_line(path, line.trim_end())
        .map_err(|e| format!("Cannot write '{}': {}", path.display(), e))?;

    warn!("Permanently added '{}' to '{}'", entry, path.display());
    Ok(())
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let unterminated = std::fs::read(path)
        .map(|bytes| !bytes.is_empty() && !bytes.ends_with(b"\n"))
        .unwrap_or(false);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if unterminated {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{}", line)
}

// ── Authentication ───────────────────────────────────────────────────────────

/// Answers every keyboard-interactive prompt with the login password.
struct PasswordPrompter<'p> {
    password: &'p str,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompter<'_> {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.to_string()).collect()
    }
}

/// Methods tried, in order, for a server offering `methods`.
fn auth_plan(methods: &str) -> Vec<&'static str> {
    let offered: Vec<&str> = methods.split(',').map(str::trim).collect();
    ["password", "keyboard-interactive"]
        .into_iter()
        .filter(|m| offered.contains(m))
        .collect()
}

fn authenticate(session: &Session, config: &SftpConnectionConfig) -> Result<&'static str, String> {
    let password = config.password.expose_secret();

    let methods = session
        .auth_methods(&config.username)
        .map(str::to_string)
        .unwrap_or_else(|_| "password".to_string());
    if session.authenticated() {
        return Ok("none");
    }

    let mut last_error = format!("server offers no usable method ({})", methods);

    for method in auth_plan(&methods) {
        let attempt = if method == "password" {
            session.userauth_password(&config.username, password)
        } else {
            let mut prompter = PasswordPrompter { password };
            session.userauth_keyboard_interactive(&config.username, &mut prompter)
        };
        match attempt {
            Ok(()) if session.authenticated() => return Ok(method),
            Ok(()) => {}
            Err(e) => {
                debug!("SFTP {} authentication failed: {}", method, e);
                last_error = e.to_string();
            }
        }
    }

    Err(last_error)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub(crate) fn entry_from_stat(name: &str, stat: &FileStat) -> RemoteEntry {
    RemoteEntry {
        name: name.to_string(),
        kind: RemoteEntryKind::from_mode(stat.perm),
        size: stat.size.unwrap_or(0),
        modified: stat.mtime,
        accessed: stat.atime,
    }
}
