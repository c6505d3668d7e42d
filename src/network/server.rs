use crate::game::Side;
use crate::messages::{FramedReader, FramedWriter, Message, WireConfig};
use crate::network::rooms::{JoinOutcome, PeerId, RoomRegistry};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_RELAY_ADDR: &str = "0.0.0.0:8765";
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Relay settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a new connection may take to send its `join`
    pub join_timeout: Duration,
    /// Announced as `current_player` when a room pairs up
    pub opening_side: Side,
    pub wire: WireConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            opening_side: Side::Defender,
            wire: WireConfig::default(),
        }
    }
}

/// Matchmaking relay: pairs connections into rooms of two and forwards their traffic
pub struct Server {
    listener: TcpListener,
    config: RelayConfig,
    registry: Arc<RoomRegistry>,
}

/// Controls a relay started with [`Server::spawn`]. Dropping the handle also stops the relay.
pub struct RelayHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl RelayHandle {
    /// Ask the accept loop and every connection to exit, then wait for the accept loop
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task.await.context("Relay task panicked")?
    }
}

impl Server {
    pub async fn bind(addr: &str, config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind relay to address: {}", addr))?;

        info!("Relay successfully bound to address: {}", addr);
        debug!(
            "Relay config - join_timeout: {:?}, opening_side: {}, max_message_size: {}",
            config.join_timeout, config.opening_side, config.wire.max_message_size
        );

        let registry = Arc::new(RoomRegistry::new(config.opening_side));
        Ok(Self {
            listener,
            config,
            registry,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared room table, for observation
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    /// Serve until the process ends
    pub async fn run(self) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.serve(shutdown_rx).await
    }

    /// Serve on a background task
    pub fn spawn(self) -> RelayHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = task::spawn(self.serve(shutdown_rx));
        RelayHandle { shutdown, task }
    }

    async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Starting relay on address: {:?}", self.listener.local_addr()?);

        let mut connection_counter: PeerId = 0;

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown.changed() => {
                    info!("Relay shutting down");
                    return Ok(());
                }
            };

            match accepted {
                Ok((stream, peer_addr)) => {
                    connection_counter += 1;
                    let connection_id = connection_counter;
                    info!("Accepted new connection {} from {}", connection_id, peer_addr);

                    let registry = Arc::clone(&self.registry);
                    let config = self.config.clone();
                    let shutdown = shutdown.clone();

                    task::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, registry, config, shutdown, connection_id)
                                .await
                        {
                            warn!("Connection {} failed: {}", connection_id, e);
                        } else {
                            debug!("Connection {} completed", connection_id);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    // Continue accepting other connections despite this error
                    continue;
                }
            }
        }
    }
}

/// One connection's lifecycle: `join` handshake, forwarding loop, cleanup
#[instrument(skip(stream, registry, config, shutdown))]
async fn handle_connection(
    stream: TcpStream,
    registry: Arc<RoomRegistry>,
    config: RelayConfig,
    mut shutdown: watch::Receiver<bool>,
    connection_id: PeerId,
) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedReader::new(read_half, config.wire.clone());
    let mut writer = FramedWriter::new(write_half, config.wire.clone());

    let (room, name) = match timeout(config.join_timeout, reader.read_message()).await {
        Ok(Ok(Some(Message::Join { room, name }))) => (room, name),
        Ok(Ok(Some(other))) => {
            warn!("Expected join, got {}", other.message_type());
            return reject(&mut writer, "bad join").await;
        }
        Ok(Ok(None)) => {
            debug!("Peer closed before joining");
            return reject(&mut writer, "bad join").await;
        }
        Ok(Err(e)) => {
            warn!("Unreadable join: {}", e);
            return reject(&mut writer, "bad join").await;
        }
        Err(_) => {
            warn!("No join within {:?}", config.join_timeout);
            return reject(&mut writer, "join timeout").await;
        }
    };

    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let membership = match registry.join(&room, connection_id, &name, outbound).await {
        JoinOutcome::Joined(membership) => membership,
        JoinOutcome::Full => {
            writer.write_message(&Message::Full).await?;
            writer.shutdown().await.ok();
            return Ok(());
        }
    };

    // Sole writer for this socket; ends once the room drops our sender
    let writer_task = task::spawn(async move {
        while let Some(line) = outbound_rx.recv().await {
            if let Err(e) = writer.write_line(&line).await {
                debug!("Dropping outbound traffic after write failure: {}", e);
                break;
            }
        }
        writer.shutdown().await.ok();
    });

    loop {
        let next = tokio::select! {
            next = reader.read_line() => next,
            _ = shutdown.changed() => break,
        };

        match next {
            Ok(Some(line)) => {
                if serde_json::from_str::<serde_json::Value>(&line).is_err() {
                    debug!("Dropping non-JSON line from {}", name);
                    continue;
                }
                registry.forward(&membership, line).await;
            }
            Ok(None) => {
                info!("{} disconnected", name);
                break;
            }
            Err(e) if e.is_recoverable() => {
                debug!("Dropping unreadable line from {}: {}", name, e);
            }
            Err(e) => {
                warn!("Read error from {}: {}", name, e);
                break;
            }
        }
    }

    registry.leave(membership).await;
    if timeout(Duration::from_secs(1), writer_task).await.is_err() {
        debug!("Writer task still draining after leave");
    }
    Ok(())
}

/// Protocol violation: explain and close
async fn reject<W>(writer: &mut FramedWriter<W>, reason: &str) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    if let Err(e) = writer.write_message(&Message::new_error(reason)).await {
        debug!("Could not send error: {}", e);
    }
    writer.shutdown().await.ok();
    Ok(())
}
