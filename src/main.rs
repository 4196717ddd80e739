mod app;
mod batch;
mod error;
mod logging;
mod server;

use crate::app::App;
use crate::error::{ErrorKind, Result};
use crate::logging::LogFormat;
use clap::{ArgAction, Parser, Subcommand};
use exn::ResultExt;
use renamer_config::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// More logging; repeat for even more.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Overrides `server.bind`.
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Rename local files and write the archive.
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// `text` or `image`.
        #[arg(short, long, default_value = "text")]
        mode: String,
        /// Where to write the archive; defaults to `archive.filename` in the
        /// current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);
    run(cli).await.map_err(|err| miette::miette!("{err:?}"))
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let app = App::build(config).await?;
    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            match app.seed_api_key().await {
                Ok(true) => info!("configured API key accepted"),
                Ok(false) => info!("no API key configured; set one through POST /api_key"),
                // The key can still be replaced over HTTP.
                Err(err) => warn!(error = %*err, "configured API key was not accepted"),
            }
            let bind = bind.unwrap_or(app.config.server.bind);
            server::serve(app.state(), bind, app.config.max_upload_bytes()).await
        },
        Command::Batch { files, mode, output } => {
            if !app.seed_api_key().await.or_raise(|| ErrorKind::Naming)? {
                exn::bail!(ErrorKind::Batch("naming.api_key must be configured".to_string()));
            }
            let path = batch::run(&app, batch::BatchArgs { files, mode, output }).await?;
            println!("{}", path.display());
            Ok(())
        },
    }
}
