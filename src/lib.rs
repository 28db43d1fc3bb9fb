pub mod cli;
pub mod config;
pub mod logging;

use config::SyncConfig;
use spull_sftp::sftp::{SessionConnector, Ssh2Connector, SyncController, SyncReport};

/// Run one pull against the real SFTP server named in `config`.
pub fn run(config: &SyncConfig) -> SyncReport {
    run_with(Ssh2Connector, config)
}

/// Run one pull through an arbitrary connector.
pub fn run_with<C: SessionConnector>(connector: C, config: &SyncConfig) -> SyncReport {
    SyncController::new(connector, config.connection(), config.options()).run()
}
