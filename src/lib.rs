pub mod cli;
pub mod game;
pub mod messages;
pub mod network;

// Re-export key types for easy testing
pub use game::{Board, Coord, GameError, GameState, Move, MoveEvent, Piece, Side};
pub use messages::Message;
pub use network::{RelayHandle, Server, SessionClient};
