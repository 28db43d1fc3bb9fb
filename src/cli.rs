use clap::{Parser, ValueEnum};
use spull_sftp::sftp::{DeleteMode, KnownHostsPolicy, DEFAULT_SFTP_PORT};
use std::path::PathBuf;

/// Pull every file of a remote SFTP directory into a local directory.
#[derive(Parser, Debug)]
#[command(name = "sftp-pull", version)]
#[command(
    about = "Download the files of a remote SFTP directory, optionally deleting them afterwards",
    long_about = None
)]
pub struct Cli {
    /// Remote SFTP host name or address
    #[arg(short = 'H', long)]
    pub host: String,

    /// Remote SFTP port
    #[arg(short = 'P', long, default_value_t = DEFAULT_SFTP_PORT,
          value_parser = clap::value_parser!(u16).range(1..=65535))]
    pub port: u16,

    /// Remote source directory
    #[arg(short, long)]
    pub source: String,

    /// Local destination directory
    #[arg(short, long)]
    pub destination: PathBuf,

    /// Remote user name
    #[arg(short, long)]
    pub user: String,

    /// Remote password
    #[arg(short, long, env = "SFTP_PULL_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Delete the downloaded files on the remote server
    #[arg(long)]
    pub delete: bool,

    /// How remote deletion failures are handled
    #[arg(long, value_enum, default_value_t = DeleteModeArg::BestEffort)]
    pub delete_mode: DeleteModeArg,

    /// Connect and per-operation timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Host key verification policy
    #[arg(long, value_enum, default_value_t = KnownHostsArg::Strict)]
    pub known_hosts: KnownHostsArg,

    /// OpenSSH known_hosts file (defaults to ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts_file: Option<PathBuf>,

    /// Directory holding the daily log files
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Number of daily log files to keep
    #[arg(long, default_value_t = 10)]
    pub log_keep: usize,

    /// Log to stdout only
    #[arg(long)]
    pub no_log_file: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the run report as JSON on stdout when done
    #[arg(long)]
    pub report_json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeleteModeArg {
    BestEffort,
    FailFast,
}

impl From<DeleteModeArg> for DeleteMode {
    fn from(arg: DeleteModeArg) -> Self {
        match arg {
            DeleteModeArg::BestEffort => DeleteMode::BestEffort,
            DeleteModeArg::FailFast => DeleteMode::FailFast,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KnownHostsArg {
    Strict,
    AcceptNew,
    Ignore,
}

impl From<KnownHostsArg> for KnownHostsPolicy {
    fn from(arg: KnownHostsArg) -> Self {
        match arg {
            KnownHostsArg::Strict => KnownHostsPolicy::Strict,
            KnownHostsArg::AcceptNew => KnownHostsPolicy::AcceptNew,
            KnownHostsArg::Ignore => KnownHostsPolicy::Ignore,
        }
    }
}
