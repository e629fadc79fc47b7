use clap::Parser;

use filebridge::cli::{Cli, Commands};
use filebridge::commands::{self, DownloadArgs, UploadArgs};
use filebridge::config::{self, Config};
use filebridge::{SyncError, logging};

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::init()?,
    };
    tracing::debug!("config: {:?}", config);

    match cli.command {
        Commands::Download { conn, directory, prefixes, from_date, destination, output } => {
            commands::handle_download(
                &config,
                DownloadArgs { conn, directory, prefixes, from_date, destination, output },
            )?;
        }
        Commands::Upload { conn, remote_dir, extract_zip, sources } => {
            let args = UploadArgs { conn, remote_dir, extract_zip, sources };
            commands::handle_upload(&config, args)?;
        }
        Commands::SendMail { request } => commands::handle_send_mail(&config, &request)?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let log_dir = config::config_dir().ok().map(|d| d.join("logs"));
    let guard = logging::init(cli.verbose, log_dir.as_deref());

    if let Err(e) = run(cli) {
        // core failures carry their own exit code; everything else is a usage/IO problem
        let code = e.downcast_ref::<SyncError>().map(SyncError::exit_code).unwrap_or(1);
        tracing::error!("{:#}", e);
        drop(guard);
        std::process::exit(code);
    }
}
