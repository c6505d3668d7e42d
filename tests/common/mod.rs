//! Shared helpers for relay and session tests
//!
//! `start_relay` runs a relay on an ephemeral port; `TestPeer` is a bare socket speaking the
//! line protocol so tests can see exactly what the relay sends.

#![allow(dead_code)]

use hnefatafl::game::Side;
use hnefatafl::messages::{FramedReader, FramedWriter, Message, WireConfig};
use hnefatafl::network::{RelayConfig, RelayHandle, RoomRegistry, Server, SessionClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);
pub const QUIET_PERIOD: Duration = Duration::from_millis(150);

pub struct TestRelay {
    pub addr: SocketAddr,
    pub registry: Arc<RoomRegistry>,
    pub handle: RelayHandle,
}

impl TestRelay {
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait until the registry holds `expected` rooms
    pub async fn wait_for_room_count(&self, expected: usize) {
        let deadline = Instant::now() + RECV_TIMEOUT;
        while self.registry.room_count().await != expected {
            assert!(
                Instant::now() < deadline,
                "room count never reached {}",
                expected
            );
            sleep(Duration::from_millis(10)).await;
        }
    }
}

pub async fn start_relay() -> TestRelay {
    start_relay_with(RelayConfig::default()).await
}

pub async fn start_relay_with(config: RelayConfig) -> TestRelay {
    let server = Server::bind("127.0.0.1:0", config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let registry = server.registry();
    let handle = server.spawn();
    TestRelay {
        addr,
        registry,
        handle,
    }
}

/// Raw protocol speaker
pub struct TestPeer {
    reader: FramedReader<OwnedReadHalf>,
    writer: FramedWriter<OwnedWriteHalf>,
}

impl TestPeer {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: FramedReader::new(read_half, WireConfig::default()),
            writer: FramedWriter::new(write_half, WireConfig::default()),
        }
    }

    /// Connect and send `join`
    pub async fn join(addr: SocketAddr, room: &str, name: &str) -> Self {
        let mut peer = Self::connect(addr).await;
        peer.send(&Message::new_join(room, name)).await;
        peer
    }

    pub async fn send(&mut self, message: &Message) {
        self.writer.write_message(message).await.unwrap();
    }

    pub async fn send_raw(&mut self, line: &str) {
        self.writer.write_line(line).await.unwrap();
    }

    pub async fn recv_line(&mut self) -> String {
        timeout(RECV_TIMEOUT, self.reader.read_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed while waiting for a line")
    }

    pub async fn recv(&mut self) -> Message {
        let line = self.recv_line().await;
        hnefatafl::messages::decode_message(&line).unwrap()
    }

    /// Read until a `start` arrives, returning it with everything before it
    pub async fn recv_until_start(&mut self) -> (Vec<Message>, Message) {
        let mut before = Vec::new();
        loop {
            match self.recv().await {
                start @ Message::Start { .. } => return (before, start),
                other => before.push(other),
            }
        }
    }

    /// The relay closes the connection next, without sending anything else
    pub async fn expect_closed(&mut self) {
        let next = timeout(RECV_TIMEOUT, self.reader.read_line())
            .await
            .expect("connection was not closed");
        assert!(
            matches!(next, Ok(None) | Err(_)),
            "expected close, got {:?}",
            next
        );
    }

    /// Nothing arrives for a short while
    pub async fn expect_silence(&mut self) {
        if let Ok(next) = timeout(QUIET_PERIOD, self.reader.read_line()).await {
            panic!("expected silence, got {:?}", next);
        }
    }
}

pub fn side_of(start: &Message) -> Side {
    match start {
        Message::Start { your_side, .. } => *your_side,
        other => panic!("not a start message: {:?}", other),
    }
}

/// Two raw peers paired in `room`, with their starts already consumed
pub async fn paired_peers(addr: SocketAddr, room: &str) -> (TestPeer, Message, TestPeer, Message) {
    let mut first = TestPeer::join(addr, room, "Astrid").await;
    first.recv().await; // waiting
    first.recv().await; // joined
    let mut second = TestPeer::join(addr, room, "Bjorn").await;
    let (_, first_start) = first.recv_until_start().await;
    let (_, second_start) = second.recv_until_start().await;
    (first, first_start, second, second_start)
}

/// Poll a session client's inbound queue until a message arrives
pub async fn next_message(client: &mut SessionClient) -> Message {
    let deadline = Instant::now() + RECV_TIMEOUT;
    loop {
        if let Some(message) = client.try_recv() {
            return message;
        }
        assert!(Instant::now() < deadline, "no message arrived");
        sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until a `start` arrives, discarding earlier messages
pub async fn next_start(client: &mut SessionClient) -> Message {
    loop {
        let message = next_message(client).await;
        if matches!(message, Message::Start { .. }) {
            return message;
        }
    }
}
