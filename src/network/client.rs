use crate::messages::{
    encode_line, FramedReader, FramedWriter, Message, WireConfig, WireProtocolError,
};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Failure to establish a session
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("Failed to connect to {addr}: {source}")]
    Refused {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Connection attempt was abandoned")]
    Abandoned,
}

/// Failure to use an established session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,

    #[error("Could not encode message: {0}")]
    Encode(#[from] WireProtocolError),
}

/// Settings for a session with the relay
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub wire: WireConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            wire: WireConfig::default(),
        }
    }
}

/// Where and as whom to join
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub host: String,
    pub port: u16,
    pub room: String,
    pub name: String,
}

impl JoinRequest {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
struct SessionShared {
    alive: AtomicBool,
    dropped_messages: AtomicU64,
    stop: watch::Sender<bool>,
}

impl SessionShared {
    fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Closing session");
        }
        let _ = self.stop.send(true);
    }
}

/// Closes a session from any thread or task
#[derive(Debug, Clone)]
pub struct SessionCloser {
    shared: Arc<SessionShared>,
}

impl SessionCloser {
    pub fn close(&self) {
        self.shared.close();
    }
}

/// One persistent connection to the relay.
///
/// A writer task and a receive task run in the background. Outgoing messages are queued
/// without blocking; decoded inbound messages wait in a queue drained by [`try_recv`].
///
/// [`try_recv`]: SessionClient::try_recv
pub struct SessionClient {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<Message>,
    shared: Arc<SessionShared>,
}

impl SessionClient {
    /// Connect within `config.connect_timeout` and send `join` immediately
    #[instrument(skip(config), fields(addr = %request.addr()))]
    pub async fn connect(
        request: JoinRequest,
        config: ClientConfig,
    ) -> Result<Self, ConnectionError> {
        let addr = request.addr();
        let stream = match timeout(config.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ConnectionError::Refused { addr, source }),
            Err(_) => {
                return Err(ConnectionError::Timeout {
                    addr,
                    timeout: config.connect_timeout,
                })
            }
        };
        info!("Connected to relay");

        let client = Self::start(stream, config.wire);
        if let Err(e) = client.send(&Message::new_join(request.room, request.name)) {
            warn!("Could not queue join: {}", e);
        }
        Ok(client)
    }

    /// Connect on a background task so the caller's loop keeps running
    pub fn spawn_connect(request: JoinRequest, config: ClientConfig) -> PendingConnection {
        let (tx, rx) = oneshot::channel();
        task::spawn(async move {
            let result = Self::connect(request, config).await;
            if let Err(Ok(client)) = tx.send(result) {
                // Nobody is waiting any more
                client.close();
            }
        });
        PendingConnection { result: rx }
    }

    fn start(stream: TcpStream, wire: WireConfig) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (stop, stop_rx) = watch::channel(false);
        let shared = Arc::new(SessionShared {
            alive: AtomicBool::new(true),
            dropped_messages: AtomicU64::new(0),
            stop,
        });

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        task::spawn(write_loop(
            FramedWriter::new(write_half, wire.clone()),
            outbound_rx,
            stop_rx.clone(),
            Arc::clone(&shared),
        ));
        task::spawn(receive_loop(
            FramedReader::new(read_half, wire),
            inbound_tx,
            stop_rx,
            Arc::clone(&shared),
        ));

        Self {
            outbound,
            inbound,
            shared,
        }
    }

    /// Queue a message for the relay. Delivery is best effort: a broken connection shows
    /// up as the session going dead, not as an error here.
    pub fn send(&self, message: &Message) -> Result<(), SessionError> {
        if !self.is_alive() {
            return Err(SessionError::Closed);
        }
        let line = encode_line(message)?;
        self.outbound.send(line).map_err(|_| SessionError::Closed)
    }

    /// Next decoded inbound message, or `None` right away when nothing is pending
    pub fn try_recv(&mut self) -> Option<Message> {
        self.inbound.try_recv().ok()
    }

    /// Every message pending right now
    pub fn drain(&mut self) -> Vec<Message> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Inbound lines discarded because they could not be decoded
    pub fn dropped_messages(&self) -> u64 {
        self.shared.dropped_messages.load(Ordering::Relaxed)
    }

    /// Idempotent; stops both background tasks
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn closer(&self) -> SessionCloser {
        SessionCloser {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// A connection attempt running in the background
pub struct PendingConnection {
    result: oneshot::Receiver<Result<SessionClient, ConnectionError>>,
}

impl PendingConnection {
    /// The outcome once the attempt has finished, `None` while it is still running
    pub fn poll(&mut self) -> Option<Result<SessionClient, ConnectionError>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ConnectionError::Abandoned)),
        }
    }

    /// Wait for the outcome
    pub async fn wait(self) -> Result<SessionClient, ConnectionError> {
        self.result.await.unwrap_or(Err(ConnectionError::Abandoned))
    }
}

async fn write_loop(
    mut writer: FramedWriter<OwnedWriteHalf>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut stop: watch::Receiver<bool>,
    shared: Arc<SessionShared>,
) {
    loop {
        let line = tokio::select! {
            biased;
            line = outbound.recv() => line,
            _ = stop.changed() => None,
        };
        let Some(line) = line else {
            break;
        };
        if let Err(e) = writer.write_line(&line).await {
            warn!("Write to relay failed: {}", e);
            shared.close();
            return;
        }
    }

    // Flush whatever was queued before the close
    while let Ok(line) = outbound.try_recv() {
        if writer.write_line(&line).await.is_err() {
            break;
        }
    }
    writer.shutdown().await.ok();
}

async fn receive_loop(
    mut reader: FramedReader<OwnedReadHalf>,
    inbound: mpsc::UnboundedSender<Message>,
    mut stop: watch::Receiver<bool>,
    shared: Arc<SessionShared>,
) {
    loop {
        let next = tokio::select! {
            next = reader.read_message() => next,
            _ = stop.changed() => break,
        };

        match next {
            Ok(Some(message)) => {
                debug!(message_type = message.message_type(), "Received message");
                if inbound.send(message).is_err() {
                    break;
                }
            }
            Ok(None) => {
                info!("Relay closed the connection");
                break;
            }
            Err(e) if e.is_recoverable() => {
                shared.dropped_messages.fetch_add(1, Ordering::Relaxed);
                debug!("Dropping malformed message: {}", e);
            }
            Err(e) => {
                warn!("Receive loop ending: {}", e);
                break;
            }
        }
    }
    shared.close();
}
