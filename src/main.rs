//! `medialink` CLI - run the proxy or resolve a single page URL

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use medialink::{AppState, Config, EmbedFormat, LogFormat, MediaClient, PlatformRouter};

#[derive(Parser)]
#[command(name = "medialink")]
#[command(about = "Media metadata proxy for NetEase Cloud Music and Youku")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/medialink/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch normalized metadata for a page URL and print it as JSON
    Info {
        /// Source page URL
        url: String,
    },

    /// Print the embed snippet for a page URL
    Embed {
        /// Source page URL
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "html")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Html,
    Json,
}

impl From<OutputFormat> for EmbedFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Html => EmbedFormat::Html,
            OutputFormat::Json => EmbedFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    init_logging(config.log_format);

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve(&config).await?;
        }
        Commands::Info { url } => {
            cmd_info(&config, &url).await?;
        }
        Commands::Embed { url, format } => {
            cmd_embed(&config, &url, format.into()).await?;
        }
    }

    Ok(())
}

/// Load `.env`, falling back to `.env.example` when there is no `.env`.
fn load_dotenv() {
    if Path::new(".env").exists() {
        let _ = dotenvy::from_filename(".env");
    } else {
        let _ = dotenvy::from_filename(".env.example");
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn build_state(config: &Config) -> Result<AppState> {
    let client = MediaClient::new(config.upstream_timeout())?;
    let router = PlatformRouter::new(&config.platforms());
    Ok(AppState::new(router, client, config.environment))
}

async fn cmd_serve(config: &Config) -> Result<()> {
    if config.youku_client_id.is_none() {
        tracing::warn!("YOUKU_CLIENT_ID is not set, Youku lookups will be rejected upstream");
    }
    tracing::info!(
        environment = ?config.environment,
        timeout_ms = config.upstream_timeout_ms,
        "Starting medialink {}",
        medialink::VERSION
    );
    let state = Arc::new(build_state(config)?);
    medialink::server::serve(config.bind_addr(), state).await
}

async fn cmd_info(config: &Config, url: &str) -> Result<()> {
    let state = build_state(config)?;
    let info = state.media_info(url).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

async fn cmd_embed(config: &Config, url: &str, format: EmbedFormat) -> Result<()> {
    let state = build_state(config)?;
    match format {
        EmbedFormat::Html => println!("{}", state.media_embed(url)?),
        EmbedFormat::Json => {
            let info = state.media_info(url).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}
