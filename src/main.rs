//! synclient - Synergy secondary-screen client
//!
//! Connects to a Synergy primary and replays its keyboard and mouse events.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use synclient::config::{self, Config};
use synclient::dispatch::{standard_handlers, Dispatcher, SessionState};
use synclient::input::LoggingInputSink;
use synclient::network::{Client, SessionEnd};
use synclient::protocol::{self, Codec, Registry};

/// synclient - Synergy secondary-screen client
#[derive(Parser)]
#[command(name = "synclient")]
#[command(author = "Synclient Contributors")]
#[command(version)]
#[command(about = "Receive mouse and keyboard from a Synergy server", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a server and run until it disconnects
    Connect {
        /// Server address to connect to
        #[arg(short, long)]
        server: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Screen name to announce
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the protocol messages this client understands
    Messages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Connect { server, port, name } => {
            run_client(config, server, port, name).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Messages => {
            print_messages()?;
        }
    }

    Ok(())
}

/// Connect to the server and run one session
async fn run_client(
    mut config: Config,
    server: Option<String>,
    port: Option<u16>,
    name: Option<String>,
) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.network.port = port;
    }
    if let Some(name) = name {
        config.general.name = name;
    }
    let Some(server) = server.or_else(|| config.network.server.clone()) else {
        anyhow::bail!("Please specify --server or set network.server in the configuration");
    };

    let registry = Arc::new(Registry::standard()?);
    let dispatcher = Arc::new(Dispatcher::new(standard_handlers(), &registry));
    let client = Client::new(config.net_config(), Codec::new(registry), dispatcher);

    let state = SessionState::new(config.general.name.clone(), config.protocol_version());
    tracing::info!(
        "Connecting to {}:{} as '{}' (protocol {})",
        server,
        config.network.port,
        state.client_name,
        state.version
    );

    let session = client.run_hostname(
        &server,
        Box::new(LoggingInputSink::new()),
        Box::new(config.display()),
        state,
    );

    tokio::select! {
        result = session => {
            match result? {
                SessionEnd::PeerClosed => println!("Server closed the connection"),
                SessionEnd::Terminated(reason) => println!("Disconnected: {}", reason),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nDisconnecting...");
        }
    }

    Ok(())
}

/// Print the message registry
fn print_messages() -> anyhow::Result<()> {
    let registry = Registry::standard()?;

    println!(
        "Synergy protocol {}.{} ({} messages, default port {})\n",
        protocol::PROTOCOL_MAJOR,
        protocol::PROTOCOL_MINOR,
        registry.len(),
        protocol::DEFAULT_PORT
    );
    println!("{:<26} {:<6} {:<10} {:<8} TEMPLATE", "NAME", "ID", "DIRECTION", "REVISION");
    for def in registry.iter() {
        println!(
            "{:<26} {:<6} {:<10} {:<8} {}",
            def.name,
            String::from_utf8_lossy(&def.identifier()),
            format!("{:?}", def.direction),
            format!("{:?}", def.revision),
            def.template.source()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["synclient", "connect", "-s", "primary", "-n", "tablet"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["synclient", "messages"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["synclient", "server"]).is_err());
    }
}
