use crate::messages::Message;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

// Wire protocol constants
pub const MESSAGE_DELIMITER: u8 = b'\n';
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024; // a move is ~40 bytes
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the line-delimited JSON wire protocol
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Longest accepted line, delimiter excluded
    pub max_message_size: usize,
    pub write_timeout: Duration,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl WireConfig {
    /// Create a WireConfig with custom message size and default timeouts
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            ..Self::default()
        }
    }
}

/// Custom error types for wire protocol operations
#[derive(Error, Debug)]
pub enum WireProtocolError {
    #[error("Message too large: more than {max_size} bytes without a line break")]
    MessageTooLarge { max_size: usize },

    #[error("Message is not valid UTF-8")]
    InvalidUtf8,

    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Write operation timed out after {timeout:?}")]
    WriteTimeout { timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireProtocolError {
    /// Whether the stream is still usable after this error. A bad line is consumed in
    /// full, so the next read starts on a fresh message.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WireProtocolError::InvalidUtf8 | WireProtocolError::Malformed(_)
        )
    }
}

/// Serialize a message as a single line without its delimiter, ready for
/// [`FramedWriter::write_line`]
pub fn encode_line(message: &Message) -> Result<String, WireProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Serialize a message as a single line, delimiter included
pub fn encode_message(message: &Message) -> Result<String, WireProtocolError> {
    let mut line = encode_line(message)?;
    line.push(MESSAGE_DELIMITER as char);
    Ok(line)
}

/// Parse one line (without its delimiter) into a message
pub fn decode_message(line: &str) -> Result<Message, WireProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Reads newline-delimited messages from a byte stream, buffering partial lines
pub struct FramedReader<R> {
    inner: BufReader<R>,
    config: WireConfig,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    pub fn new(reader: R, config: WireConfig) -> Self {
        Self {
            inner: BufReader::new(reader),
            config,
            pending: Vec::new(),
        }
    }

    /// Next complete line without its delimiter, or `Ok(None)` once the peer has closed
    /// its write side. A final unterminated line before EOF is still returned.
    pub async fn read_line(&mut self) -> Result<Option<String>, WireProtocolError> {
        loop {
            let available = self.inner.fill_buf().await?;

            if available.is_empty() {
                if self.pending.is_empty() {
                    trace!("End of stream");
                    return Ok(None);
                }
                let bytes = std::mem::take(&mut self.pending);
                return Self::finish_line(bytes).map(Some);
            }

            match available.iter().position(|&b| b == MESSAGE_DELIMITER) {
                Some(pos) => {
                    self.pending.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    let bytes = std::mem::take(&mut self.pending);
                    if bytes.len() > self.config.max_message_size {
                        return Err(self.too_large());
                    }
                    return Self::finish_line(bytes).map(Some);
                }
                None => {
                    let len = available.len();
                    self.pending.extend_from_slice(available);
                    self.inner.consume(len);
                    if self.pending.len() > self.config.max_message_size {
                        return Err(self.too_large());
                    }
                }
            }
        }
    }

    /// Next line decoded as a [`Message`]
    pub async fn read_message(&mut self) -> Result<Option<Message>, WireProtocolError> {
        match self.read_line().await? {
            Some(line) => decode_message(&line).map(Some),
            None => Ok(None),
        }
    }

    fn finish_line(mut bytes: Vec<u8>) -> Result<String, WireProtocolError> {
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        String::from_utf8(bytes).map_err(|_| WireProtocolError::InvalidUtf8)
    }

    fn too_large(&self) -> WireProtocolError {
        warn!(
            max_size = self.config.max_message_size,
            "Message exceeds maximum size"
        );
        WireProtocolError::MessageTooLarge {
            max_size: self.config.max_message_size,
        }
    }
}

/// Writes newline-delimited messages with a bounded write time
pub struct FramedWriter<W> {
    inner: W,
    config: WireConfig,
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    pub fn new(writer: W, config: WireConfig) -> Self {
        Self {
            inner: writer,
            config,
        }
    }

    pub async fn write_message(&mut self, message: &Message) -> Result<(), WireProtocolError> {
        let line = encode_message(message)?;
        debug!(message_type = message.message_type(), "Writing message");
        self.write_raw(line.as_bytes()).await
    }

    /// Write an already-encoded line verbatim, appending the delimiter
    pub async fn write_line(&mut self, line: &str) -> Result<(), WireProtocolError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(MESSAGE_DELIMITER);
        self.write_raw(&bytes).await
    }

    /// Flush and close the write side
    pub async fn shutdown(&mut self) -> Result<(), WireProtocolError> {
        self.inner.shutdown().await?;
        Ok(())
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), WireProtocolError> {
        let write_timeout = self.config.write_timeout;
        let op = async {
            self.inner.write_all(bytes).await?;
            self.inner.flush().await
        };
        timeout(write_timeout, op)
            .await
            .map_err(|_| WireProtocolError::WriteTimeout {
                timeout: write_timeout,
            })??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Coord, Move};
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_lines_split_across_reads() {
        let mock = Builder::new()
            .read(b"{\"type\":\"jo")
            .read(b"ined\",\"name\":\"Ivar\"}\n{\"type\":\"full\"}\n")
            .build();
        let mut reader = FramedReader::new(mock, WireConfig::default());

        let first = reader.read_message().await.unwrap().unwrap();
        assert_eq!(
            first,
            Message::Joined {
                name: "Ivar".to_string()
            }
        );
        assert_eq!(reader.read_message().await.unwrap(), Some(Message::Full));
        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_is_recoverable() {
        let mock = Builder::new()
            .read(b"not json\r\n{\"type\":\"full\"}\n")
            .build();
        let mut reader = FramedReader::new(mock, WireConfig::default());

        let err = reader.read_message().await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(reader.read_message().await.unwrap(), Some(Message::Full));
    }

    #[tokio::test]
    async fn test_oversized_line_is_fatal() {
        let mock = Builder::new().read(&[b'x'; 64]).build();
        let mut reader = FramedReader::new(mock, WireConfig::with_max_message_size(16));

        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, WireProtocolError::MessageTooLarge { max_size: 16 }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_writer_appends_delimiter() {
        let mv = Move::new_unchecked(Coord::new_unchecked(4, 2), Coord::new_unchecked(4, 0));
        let mock = Builder::new()
            .write(b"{\"type\":\"move\",\"from\":[4,2],\"to\":[4,0]}\n")
            .write(b"{\"type\":\"full\"}\n")
            .build();
        let mut writer = FramedWriter::new(mock, WireConfig::default());

        writer.write_message(&Message::new_move(mv)).await.unwrap();
        writer.write_line("{\"type\":\"full\"}").await.unwrap();
    }

    #[tokio::test]
    async fn test_encoded_line_is_framed_once() {
        let line = encode_line(&Message::Full).unwrap();
        assert_eq!(line, "{\"type\":\"full\"}");
        assert_eq!(encode_message(&Message::Full).unwrap(), format!("{}\n", line));

        let mock = Builder::new().write(b"{\"type\":\"full\"}\n").build();
        let mut writer = FramedWriter::new(mock, WireConfig::default());
        writer.write_line(&line).await.unwrap();
    }
}
