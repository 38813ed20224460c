//! CLI entry and dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fetchmate_core::api::ApiClient;
use fetchmate_core::config::{self, Config};
use fetchmate_core::session::SessionStore;

mod commands;

#[derive(Parser)]
#[command(name = "fetchmate")]
#[command(version)]
#[command(about = "FetchMate media downloader client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Password (or set FETCHMATE_PASSWORD)
        #[arg(long, env = "FETCHMATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in to an existing account
    Login {
        #[arg(long)]
        email: String,
        /// Password (or set FETCHMATE_PASSWORD)
        #[arg(long, env = "FETCHMATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out (clears the local session; no remote call)
    Logout,

    /// Show the current session state
    Whoami,

    /// Fetch a media link: download directly or list available formats
    Fetch {
        /// The link to fetch
        #[arg(value_name = "URL")]
        url: String,

        /// Ask the backend to convert to MP3 before downloading
        #[arg(long)]
        mp3: bool,

        /// Download the selected format after fetching metadata
        #[arg(long)]
        download: bool,

        /// Format to download, by list position (default: first)
        #[arg(long, value_name = "N", requires = "download")]
        format: Option<usize>,

        /// Directory to save downloads to (default: from config, then cwd)
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config subcommands don't need a session or an HTTP client.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = Config::load().context("load config")?;
    let base_url = config.resolve_base_url()?;
    tracing::debug!("using API base URL {base_url}");
    let store = Arc::new(SessionStore::open_at(config::paths::session_path()));
    let api = ApiClient::new(base_url, store);

    match cli.command {
        Commands::Signup {
            username,
            email,
            password,
        } => commands::auth::signup(&api, &username, &email, &password).await,
        Commands::Login { email, password } => {
            commands::auth::login(&api, &email, &password).await
        }
        Commands::Logout => commands::auth::logout(&api),
        Commands::Whoami => {
            commands::auth::whoami(&api);
            Ok(())
        }
        Commands::Fetch {
            url,
            mp3,
            download,
            format,
            output,
        } => {
            commands::fetch::run(commands::fetch::FetchRunOptions {
                api: &api,
                config: &config,
                url: &url,
                convert_mp3: mp3,
                download,
                format_index: format,
                output: output.as_deref(),
            })
            .await
        }
        Commands::Config { .. } => unreachable!("handled above"),
    }
}
