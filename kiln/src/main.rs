//! Kiln - static assets in front of an application
//!
//! This is the main entry point for the Kiln CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use include_dir::{include_dir, Dir};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kiln_core::config::{ConfigLoader, KilnConfig, LoggingConfig};
use kiln_filter::AppFilter;
use kiln_static::StaticResourceRegistry;

/// Bundle compiled into the binary, reachable through the embedded source
static ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Kiln - serve embedded and on-disk static assets in front of an application
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run with a configuration file (TOML or JSON)
    Run {
        /// Path to the configuration file
        #[arg(default_value = "kiln.toml")]
        config: String,
    },

    /// Serve a directory with the demo application
    #[command(name = "file-server")]
    FileServer {
        /// Listen address
        #[arg(long, default_value = ":4567")]
        listen: String,

        /// Directory to serve
        #[arg(long, default_value = ".")]
        root: String,

        /// Sub-path the application is mounted at, e.g. /app
        #[arg(long)]
        mount: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Run { config } => ConfigLoader::load(&config)
            .with_context(|| format!("Failed to load config {}", config))?,
        Commands::FileServer { listen, root, mount } => file_server_config(listen, root, mount),
    };

    init_tracing(&config.logging, cli.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config))
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn file_server_config(listen: String, root: String, mount: Option<String>) -> KilnConfig {
    let mut config = KilnConfig::default();

    config.listen = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen
    };
    config.filter.application_class = Some(kiln::welcome::WELCOME.to_string());
    config.filter.filter_mapping_url_pattern =
        mount.map(|m| format!("{}/*", m.trim_end_matches('/')));
    config.filter.static_files.external_location = Some(root);

    config
}

async fn run(config: KilnConfig) -> anyhow::Result<()> {
    tracing::info!("🔥 Kiln v{} starting", kiln_core::VERSION);

    let registry = StaticResourceRegistry::new()
        .with_bundle(&ASSETS)
        .with_welcome_file(config.filter.static_files.welcome_file.clone());

    let filter = Arc::new(AppFilter::init(
        &config.filter,
        &kiln::welcome::applications(),
        Arc::new(registry),
    )?);

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    tokio::select! {
        result = kiln::serve(listener, filter.clone()) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("🛑 Shutting down"),
    }

    filter.destroy();
    Ok(())
}
