// Re-export all public items
pub use self::board::{Board, Captures};
pub use self::coord::{Coord, BOARD_SIZE, DIRECTIONS};
pub use self::error::GameError;
pub use self::moves::Move;
pub use self::piece::{Piece, Side};
pub use self::state::{GameState, MoveEvent};

// Define submodules
mod board;
mod coord;
mod error;
mod moves;
mod piece;
mod state;
