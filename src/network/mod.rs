pub mod client;
pub mod rooms;
pub mod server;

pub use client::{
    ClientConfig, ConnectionError, JoinRequest, PendingConnection, SessionClient, SessionCloser,
    SessionError,
};
pub use rooms::{JoinOutcome, Membership, RoomRegistry};
pub use server::{RelayConfig, RelayHandle, Server};
