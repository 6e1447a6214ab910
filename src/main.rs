//! `reelgate` CLI - search catalog and cloud-drive sources, resolve episodes

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use reelgate::Settings;

#[derive(Parser)]
#[command(name = "reelgate")]
#[command(about = "Aggregate video search across catalog APIs and cloud-drive shares")]
#[command(version)]
struct Cli {
    /// Settings file (default: ~/.config/reelgate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// How result data is printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every enabled source
    Search {
        /// Title to look for
        query: String,

        /// Restrict to these source keys (repeatable)
        #[arg(short, long)]
        source: Vec<String>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show full detail and episode list of one title
    Detail {
        /// Source key
        source: String,

        /// Title id as returned by search
        id: String,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Resolve one episode to a playable URL
    Play {
        source: String,
        id: String,

        /// Zero-based episode index
        #[arg(default_value = "0")]
        episode: usize,
    },

    /// Check (and refresh) a source's session
    Auth {
        source: String,
    },

    /// Fetch a subscription and print the derived sources as TOML
    Ingest {
        /// Subscription URL
        url: String,

        /// Subscription display name (default: the URL host)
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let app = cmd::App::new(settings)?;

    match cli.command {
        Commands::Search {
            query,
            source,
            format,
        } => cmd::search::cmd_search(&app, &query, &source, format).await?,
        Commands::Detail { source, id, format } => {
            cmd::detail::cmd_detail(&app, &source, &id, format).await?;
        }
        Commands::Play {
            source,
            id,
            episode,
        } => cmd::play::cmd_play(&app, &source, &id, episode).await?,
        Commands::Auth { source } => cmd::auth::cmd_auth(&app, &source).await?,
        Commands::Ingest { url, name } => {
            cmd::ingest::cmd_ingest(&app, &url, name.as_deref()).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG`
/// overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reelgate={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
