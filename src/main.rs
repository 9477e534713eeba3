use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ggbpuppy::config::Config;
use ggbpuppy::export;
use ggbpuppy::share::{GetShareOptions, ShareLinks, ShareService};
use ggbpuppy::web::{run_server, WebAppState};
use ggbpuppy::{parse_commands_with_line_index, storage, util, ShareOptions, StorageMode};

#[derive(Parser)]
#[command(name = "ggbpuppy", version, about = "Share backend and replay tools for GGBPuppy")]
struct Cli {
    /// Data directory (defaults to ~/.ggbpuppy)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Share storage backend
    #[arg(long, global = true, value_enum)]
    storage: Option<StorageMode>,

    /// Base URL of the share API for remote storage
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the share backend
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Built browser client to serve next to the API
        #[arg(long)]
        assets_dir: Option<PathBuf>,
    },
    /// Store a source file as a new share
    Share {
        file: PathBuf,
        #[arg(long)]
        enable_3d: bool,
    },
    /// Print a stored share
    Show { id: String },
    /// List the statements a source file runs, with their line numbers
    Parse { file: PathBuf },
    /// Write a standalone HTML page that replays a source file
    ExportHtml {
        file: PathBuf,
        #[arg(long)]
        enable_3d: bool,
        /// Output directory (defaults to the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_logging() -> Result<()> {
    // Log to file (~/.ggbpuppy/logs/ggbpuppy.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())
        .with_context(|| format!("opening {}", util::log_file_path().display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn share_service(config: &Config) -> Result<ShareService> {
    let provider = storage::from_config(&config.storage).context("opening share storage")?;
    Ok(ShareService::new(provider))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    util::init_data_dir(cli.data_dir);
    init_logging()?;

    let mut config = Config::load();
    if let Some(mode) = cli.storage {
        config = config.with_storage_mode(mode);
    }
    if let Some(url) = cli.api_base_url {
        config = config.with_api_base_url(url);
    }

    match cli.command {
        Commands::Serve {
            host,
            port,
            assets_dir,
        } => {
            let mut server = config.server.clone();
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }
            if assets_dir.is_some() {
                server.assets_dir = assets_dir;
            }

            let state = WebAppState::open(util::server_database_path(), server.assets_dir.clone())
                .context("opening share database")?;
            println!("Listening on http://{}:{}", server.host, server.port);
            run_server(state, server).await?;
        }
        Commands::Share { file, enable_3d } => {
            let code = read_source(&file)?;
            let created = share_service(&config)?
                .create_share(&code, ShareOptions::default().with_3d(enable_3d))
                .await
                .context("creating share")?;

            println!("{}", created.id);
            if let Ok(links) = ShareLinks::new(&config.storage.api_base_url) {
                println!("{}", links.canonical(&created.id));
                println!("{}", links.embed(&created.id));
            }
        }
        Commands::Show { id } => {
            let record = share_service(&config)?
                .get_share(&id, GetShareOptions::throwing())
                .await
                .with_context(|| format!("fetching share {id}"))?;
            let Some(record) = record else {
                bail!("Share not found: {id}");
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Parse { file } => {
            for command in parse_commands_with_line_index(&read_source(&file)?) {
                println!("{:>4}  {}", command.source_line + 1, command.statement);
            }
        }
        Commands::ExportHtml {
            file,
            enable_3d,
            out,
        } => {
            let artifact = export::export_html(&read_source(&file)?, enable_3d)?;
            let dir = match out {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            let path = artifact.write_to(&dir)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
