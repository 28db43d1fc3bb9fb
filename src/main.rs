use clap::Parser;
use sftp_pull::cli::Cli;
use sftp_pull::config::SyncConfig;
use sftp_pull::logging;

fn main() {
    let config = SyncConfig::from(Cli::parse());

    match logging::init(&config.log) {
        Ok(Some(path)) => tracing::debug!("Logging to '{}'", path.display()),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Failed to initialise logging in '{}': {}", config.log.dir.display(), e);
            std::process::exit(1);
        }
    }

    let report = sftp_pull::run(&config);

    if config.report_json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialise run report: {}", e),
        }
    }

    std::process::exit(report.exit_code());
}
