pub mod types;
pub mod wire;

pub use types::{Message, DEFAULT_PLAYER_NAME};
pub use wire::{
    decode_message, encode_line, encode_message, FramedReader, FramedWriter, WireConfig, WireProtocolError,
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_WRITE_TIMEOUT, MESSAGE_DELIMITER,
};
