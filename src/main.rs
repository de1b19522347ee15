use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schoolmap::config::{Config, LogFormat, LoggingConfig};
use schoolmap::http::{init_store, shutdown_signal, SchoolServer};

#[derive(Parser)]
#[command(
    name = "schoolmap",
    version,
    about = "School directory API with proximity search",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// TOML config file; environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the schools table and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    setup_tracing(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            tracing::info!(
                host = %config.server.host,
                port = config.server.port,
                backend = config.database.backend.as_str(),
                "Starting serve command"
            );
            serve(config).await?;
        }

        Commands::Migrate => {
            tracing::info!(
                backend = config.database.backend.as_str(),
                "Starting migrate command"
            );
            migrate(config).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    Ok(config)
}

fn setup_tracing(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let directives = if verbose {
        String::from("schoolmap=debug,tower_http=debug,info")
    } else {
        format!("schoolmap={0},tower_http={0},warn", logging.level)
    };

    let env_filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log level: {}", logging.level))?;

    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let server = SchoolServer::bootstrap(&config)
        .await
        .context("Failed to start server")?;

    server
        .start_with_shutdown(shutdown_signal())
        .await
        .context("Server terminated with an error")?;

    Ok(())
}

async fn migrate(config: Config) -> Result<()> {
    config.validate()?;
    init_store(&config.database)
        .await
        .context("Database initialization failed")?;

    tracing::info!("Database tables initialized");
    Ok(())
}
