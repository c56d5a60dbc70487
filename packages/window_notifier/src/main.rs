use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use window_notifier::cli::{self, ClientError, Endpoints};
use window_notifier::config::{CliOverrides, ServerConfig};
use window_notifier::server;

#[derive(Parser)]
#[command(name = "window-notifier")]
#[command(about = "Live window open/closed state with WebSocket fan-out")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control and notification servers (default)
    Server(ServerArgs),

    /// Open the window
    Open(ClientArgs),

    /// Close the window
    Close(ClientArgs),

    /// Print the current window state
    Status(ClientArgs),

    /// Print every state the server pushes until it disconnects
    Watch(ClientArgs),
}

#[derive(Parser, Default)]
struct ServerArgs {
    /// Host to bind both listeners to
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the HTTP control endpoint
    #[arg(long)]
    control_port: Option<u16>,

    /// Port for the WebSocket notification endpoint
    #[arg(long)]
    ws_port: Option<u16>,

    /// Path to a config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Parser)]
struct ClientArgs {
    /// Host the server is reachable on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Control endpoint port
    #[arg(long, default_value = "5000")]
    control_port: u16,

    /// Notification endpoint port
    #[arg(long, default_value = "8765")]
    ws_port: u16,
}

impl From<ClientArgs> for Endpoints {
    fn from(args: ClientArgs) -> Self {
        Self {
            host: args.host,
            control_port: args.control_port,
            ws_port: args.ws_port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_server(ServerArgs::default()).await,
        Some(Commands::Server(args)) => run_server(args).await,
        Some(Commands::Open(args)) => client(cli::open_command(&args.into()).await),
        Some(Commands::Close(args)) => client(cli::close_command(&args.into()).await),
        Some(Commands::Status(args)) => client(cli::status_command(&args.into()).await),
        Some(Commands::Watch(args)) => client(cli::watch_command(&args.into()).await),
    }
}

fn client(result: std::result::Result<(), ClientError>) -> Result<()> {
    match result {
        Err(e) if e.is_unreachable() => {
            eprintln!("[window-notifier: {}]", e);
            std::process::exit(1);
        }
        other => Ok(other?),
    }
}

async fn run_server(args: ServerArgs) -> Result<()> {
    // Setup logging
    let default_directive = if args.debug {
        "window_notifier=debug,tower_http=debug,info"
    } else {
        "window_notifier=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting window notifier");

    let overrides = CliOverrides {
        host: args.host,
        control_port: args.control_port,
        ws_port: args.ws_port,
    };
    let config = ServerConfig::load(args.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;
    info!(
        "Server config: sink_buffer={} send_timeout={}ms",
        config.ws.sink_buffer,
        config.ws.send_timeout.as_millis()
    );

    let shutdown = CancellationToken::new();
    let running = server::start(&config, shutdown.clone())
        .await
        .context("Failed to start server")?;

    info!("API endpoints:");
    info!("  POST   /open     - Open the window");
    info!("  POST   /close    - Close the window");
    info!("  GET    /state    - Current window state");
    info!("  WS     ws://{}/  - Live state feed", running.ws_addr);

    // Create shutdown signal handler
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, closing connections...");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
        }
    });

    running.wait().await.context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
