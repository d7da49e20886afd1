//! Upstox connector command-line front end
//!
//! Each subcommand runs one tool and prints its JSON result to stdout.
//! Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use market_connector::{MarketConnectorConfig, Toolbox};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "upstox-connector")]
#[command(about = "Upstox instrument lookup, quotes and token management")]
#[command(version)]
struct Cli {
    /// Env file holding UPSTOX_* settings and the access token
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness check
    Hello,
    /// Save a new access token
    RefreshToken {
        /// Access token; surrounding whitespace is stripped
        token: String,
    },
    /// Resolve trading symbols to instrument keys
    Instrument {
        /// Trading symbols, e.g. HDFCBANK ICICIBANK
        #[arg(required = true)]
        symbols: Vec<String>,
        /// Exchange segment, e.g. NSE_EQ
        #[arg(short, long)]
        exchange: Option<String>,
    },
    /// Resolve instrument keys to trading symbols
    Symbol {
        /// Instrument keys, e.g. NSE_EQ|INE040A01034
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Fetch last traded prices for trading symbols
    Ltp {
        /// Trading symbols
        #[arg(required = true)]
        symbols: Vec<String>,
        /// Exchange segment, e.g. NSE_EQ
        #[arg(short, long)]
        exchange: Option<String>,
    },
    /// Re-download the instrument dataset
    RefreshInstruments,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_connector=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Some(env_file) = &cli.env_file {
        load_env_file(env_file)?;
    }
    let mut config = MarketConnectorConfig::from_env();
    if let Some(env_file) = cli.env_file {
        config = config.with_env_file(env_file);
    }

    let toolbox = Toolbox::from_config(&config).context("Failed to initialize connector")?;

    let output = run(&toolbox, cli.command).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to render result")?
    );
    Ok(())
}

/// Load settings from an explicit env file. A missing file is fine: saving
/// a token creates it.
fn load_env_file(env_file: &Path) -> Result<()> {
    match dotenv::from_path(env_file) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Env file {} does not exist yet", env_file.display());
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load env file {}", env_file.display())),
    }
}

async fn run(toolbox: &Toolbox, command: Commands) -> Result<Value> {
    let output = match command {
        Commands::Hello => toolbox.hello_world(),
        Commands::RefreshToken { token } => toolbox
            .refresh_token(&token)
            .await
            .context("Failed to save access token")?,
        Commands::Instrument { symbols, exchange } => toolbox
            .get_instrument(&symbols, exchange.as_deref())
            .await
            .context("Failed to resolve symbols")?,
        Commands::Symbol { keys } => toolbox
            .get_symbol(&keys)
            .await
            .context("Failed to resolve instrument keys")?,
        Commands::Ltp { symbols, exchange } => toolbox
            .get_last_traded_price(&symbols, exchange.as_deref())
            .await
            .context("Failed to fetch last traded prices")?,
        Commands::RefreshInstruments => {
            info!("Refreshing instrument dataset");
            toolbox
                .refresh_instruments()
                .await
                .context("Failed to refresh instruments")?
        }
    };
    Ok(output)
}
