//! SFTP Transfer Binary
//!
//! Run with: cargo run --bin ssh-commons-transfer -- -H host -u user get /remote/file

use anyhow::Context;
use clap::{Parser, Subcommand};
use ssh_commons::{ClientConfig, ConnectionParams, LogFormat, TransferClient};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "22")]
    port: u16,

    /// Username
    #[arg(short, long, default_value = "user")]
    username: String,

    /// Path to SSH private key
    #[arg(short = 'i', long, default_value = "~/.ssh/id_ed25519")]
    identity: PathBuf,

    /// Path to known hosts file
    #[arg(short = 'k', long, default_value = "~/.ssh/known_hosts")]
    known_hosts: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (json or text)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a file
    Get {
        /// Remote file path
        remote: String,
        /// Local file path (stdout if omitted)
        local: Option<PathBuf>,
    },
    /// Upload a file
    Put {
        /// Local file path (`-` for stdin)
        local: PathBuf,
        /// Remote file path
        remote: String,
    },
}

/// Expand a leading `~` to `$HOME`
fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };

    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    if args.verbose {
        config.logging.level = "debug,russh=info".to_string();
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: Args, config: ClientConfig) -> anyhow::Result<()> {
    let params = ConnectionParams::new(
        args.username,
        args.host,
        args.port,
        expand_tilde(&args.known_hosts),
        expand_tilde(&args.identity),
    );
    let client = TransferClient::with_config(config);

    match args.command {
        Commands::Get { remote, local } => {
            let data = client.read_file(&params, &remote).await?;
            match local {
                Some(path) => tokio::fs::write(&path, &data)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
            info!(event = "get_complete", remote = %remote, bytes = data.len(), "Download complete");
        }
        Commands::Put { local, remote } => {
            if local.as_os_str() == "-" {
                client.write_file(&params, &remote, tokio::io::stdin()).await?;
            } else {
                let file = tokio::fs::File::open(&local)
                    .await
                    .with_context(|| format!("Failed to open {}", local.display()))?;
                client.write_file(&params, &remote, file).await?;
            }
            info!(event = "put_complete", remote = %remote, "Upload complete");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            std::process::exit(1);
        }
    };

    let log_guard = match ssh_commons::logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args, config).await {
        error!(event = "transfer_failed", error = %format!("{e:#}"), "Operation failed");
        drop(log_guard);
        std::process::exit(1);
    }
}
