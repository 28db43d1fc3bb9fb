use crate::cli::Cli;
use crate::logging::LogSettings;
use secrecy::SecretString;
use spull_sftp::sftp::{
    DeleteMode, KnownHostsPolicy, SftpConnectionConfig, SyncOptions, SyncResult,
    DEFAULT_CHUNK_SIZE,
};
use std::path::PathBuf;

/// Everything one pull needs, assembled from the command line.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub host: String,
    pub port: u16,
    pub source: String,
    pub destination: PathBuf,
    pub user: String,
    pub password: SecretString,
    pub delete: bool,
    pub delete_mode: DeleteMode,
    pub timeout_secs: Option<u64>,
    pub known_hosts: KnownHostsPolicy,
    pub known_hosts_file: Option<PathBuf>,
    pub log: LogSettings,
    pub report_json: bool,
}

impl SyncConfig {
    pub fn connection(&self) -> SftpConnectionConfig {
        let mut conn = SftpConnectionConfig::new(
            self.host.clone(),
            self.port,
            self.user.clone(),
            self.password.clone(),
        );
        conn.timeout_secs = self.timeout_secs;
        conn.known_hosts_policy = self.known_hosts;
        conn.known_hosts_path = self.known_hosts_file.clone();
        conn
    }

    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            remote_dir: self.source.clone(),
            local_dir: self.destination.clone(),
            delete: self.delete,
            delete_mode: self.delete_mode,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Reject empty host, user, password, source or destination and port 0.
    pub fn validate(&self) -> SyncResult<()> {
        self.connection().validate()?;
        self.options().validate()
    }
}

impl From<Cli> for SyncConfig {
    fn from(cli: Cli) -> Self {
        Self {
            log: LogSettings {
                dir: cli.log_dir,
                keep: cli.log_keep,
                to_file: !cli.no_log_file,
                verbosity: cli.verbose,
                console_to_stderr: cli.report_json,
            },
            host: cli.host,
            port: cli.port,
            source: cli.source,
            destination: cli.destination,
            user: cli.user,
            password: SecretString::new(cli.password),
            delete: cli.delete,
            delete_mode: cli.delete_mode.into(),
            timeout_secs: cli.timeout,
            known_hosts: cli.known_hosts.into(),
            known_hosts_file: cli.known_hosts_file,
            report_json: cli.report_json,
        }
    }
}
