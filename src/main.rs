use anyhow::{Context, Result};
use clap::Parser;
use hnefatafl::cli::{play, validate_nickname, validate_room_code, Cli, Commands, Config};
use hnefatafl::network::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr. `RUST_LOG` overrides the per-command default level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(match cli.command {
        Commands::Relay { .. } => "info",
        _ => "warn",
    });

    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to initialize configuration")?;

    match cli.command {
        Commands::Relay { bind } => {
            let bind = bind.unwrap_or_else(|| config.relay_bind.clone());
            info!("Starting relay on {}", bind);

            let server = Server::bind(&bind, config.relay_config()).await?;
            tokio::select! {
                result = server.run() => {
                    if let Err(e) = &result {
                        error!("Relay stopped: {}", e);
                    }
                    result?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl-C, shutting down relay");
                }
            }
        }
        Commands::Play {
            room,
            name,
            host,
            port,
        } => {
            let room = validate_room_code(&room)?;
            let name = validate_nickname(&name)?;
            let request = config.join_request(room, name, host, port);
            info!("Joining room {} at {}", request.room, request.addr());

            play::run_online(request, config.client_config()).await?;
        }
        Commands::Local => {
            play::run_local().await?;
        }
    }

    Ok(())
}
