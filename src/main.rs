//! Hubgate CLI - authentication and authorization core for a content hub
//!
//! Run `hubgate --help` for usage information.

use clap::{Parser, Subcommand};
use hubgate::authenticator::{AuthenticatorRegistry, ByEmailAuthenticator};
use hubgate::config::Config;
use hubgate::session::SessionManager;
use hubgate::store::MemoryStore;
use hubgate::token::{SigningKey, TokenCodec};
use hubgate::web::{serve, AppState};
use hubgate::HubgateError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "hubgate",
    about = "Authentication and authorization core for a content hub",
    version
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the authentication server
    Serve {
        /// Address to bind to, overriding the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), HubgateError> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("hubgate={}", level))),
        )
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Serve { bind } => {
            let key = match &config.token.secret {
                Some(secret) => {
                    use secrecy::ExposeSecret;
                    SigningKey::new(secret.expose_secret())
                }
                None => {
                    warn!("no token secret configured; generating a throwaway key");
                    SigningKey::generate()
                }
            };

            let store = Arc::new(MemoryStore::new());
            let registry = Arc::new(AuthenticatorRegistry::new());
            registry.register(Arc::new(ByEmailAuthenticator::new(store.clone())));

            let manager = SessionManager::new(
                TokenCodec::new(key),
                registry,
                config.sources,
                store,
                config.token.ttl_secs,
            );

            let bind = bind.unwrap_or(config.server.bind);
            serve(&bind, AppState::new(Arc::new(manager), config.grants)).await?;
        }
    }

    Ok(())
}
