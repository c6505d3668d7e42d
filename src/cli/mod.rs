pub mod app;
pub mod commands;
pub mod controller;
pub mod display;
pub mod play;
pub mod validation;

pub use app::Config;
pub use commands::{Cli, Commands};
pub use controller::{ClickOutcome, MatchController};
pub use display::{display_match, render_board};
pub use validation::{parse_cell, validate_nickname, validate_room_code, ValidationError};
