use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(short, long, global = true, help = "Debug logging, also written to ~/.filebridge/logs")]
    pub verbose: bool,
    #[clap(long, global = true, help = "Use this config file instead of ~/.filebridge/config.json")]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Commands,
}

/// Remote server and credentials, shared by download and upload.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    #[clap(long, help = "Remote host name or address")]
    pub host: String,
    #[clap(short, long, help = "Remote port (default 22 for sftp, 990 for ftps)")]
    pub port: Option<u16>,
    #[clap(short, long = "user", help = "Login user name")]
    pub username: String,
    #[clap(long, env = "FB_PASSWORD", hide_env_values = true, help = "Login password")]
    pub password: String,
    #[clap(long, default_value = "sftp", help = "Remote protocol: sftp or ftps")]
    pub protocol: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[clap(about = "Fetch matching remote files into a zip archive", display_order = 1)]
    Download {
        #[clap(flatten)]
        conn: ConnectArgs,
        #[clap(short, long, help = "Remote directory to list")]
        directory: String,
        #[clap(long = "prefix", help = "Keep names starting with this prefix (repeatable)")]
        prefixes: Vec<String>,
        #[clap(
            long,
            default_value = "",
            help = "Keep files modified at or after YYYY-MM-DD[THH:MM[:SS]]"
        )]
        from_date: String,
        #[clap(long, help = "Label for the staging folder and archive name")]
        destination: String,
        #[clap(short, long, help = "Write the archive here instead of the staging root")]
        output: Option<PathBuf>,
    },
    #[clap(
        about = "Push local files (or a zip's contents) to a remote directory",
        display_order = 2
    )]
    Upload {
        #[clap(flatten)]
        conn: ConnectArgs,
        #[clap(short = 'r', long = "remote-dir", help = "Remote base directory")]
        remote_dir: String,
        #[clap(long, help = "Upload the members of a single .zip source instead of the file")]
        extract_zip: bool,
        #[clap(num_args = 1.., required = true, help = "Local files or directories")]
        sources: Vec<PathBuf>,
    },
    #[clap(about = "Relay one email over SMTP", name = "send-mail", display_order = 3)]
    SendMail {
        #[clap(long, help = "JSON file with {smtp, mail} sections")]
        request: PathBuf,
    },
}
