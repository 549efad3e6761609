// Duplex message channel between the game and the bridge.

mod framing;
#[cfg(windows)]
pub mod pipe;

pub use framing::{ChunkRead, MessageReader};
#[cfg(windows)]
pub use pipe::PipeServer;

use thiserror::Error;

/// Largest message accepted, after reassembly.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Sent by the game-side pipe client when its end of the pipe is collected.
pub const CLIENT_COLLECTED_MESSAGE: &str = "garbage_collected";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to create pipe {pipe}: {source}")]
    Create {
        pipe: String,
        source: std::io::Error,
    },
    #[error("Connection failed: {0}")]
    Connect(std::io::Error),
    #[error("Transport is not connected")]
    NotConnected,
    #[error("Message larger than {limit} bytes")]
    MessageTooLarge { limit: usize },
    #[error("Pipe I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking message transport driven by the session loop.
pub trait Transport {
    /// Wait for the peer to connect.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Next message, or `None` once the peer has closed the channel.
    fn read(&mut self) -> Result<Option<String>, TransportError>;

    fn write(&mut self, message: &str) -> Result<(), TransportError>;

    /// Release the channel. Safe to call more than once.
    fn close(&mut self);
}

/// Decode one raw message. Returns `None` when the payload announces
/// that the client side has gone away.
pub fn decode_message(payload: &[u8]) -> Option<String> {
    let message = String::from_utf8_lossy(payload).into_owned();
    if message == CLIENT_COLLECTED_MESSAGE {
        None
    } else {
        Some(message)
    }
}
