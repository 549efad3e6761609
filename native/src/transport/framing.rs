// Reassembly of message-mode pipe reads into whole messages.

use super::TransportError;
use std::io;

/// Outcome of one read against a message-mode pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRead {
    /// Bytes read; they finish the current message.
    Complete(usize),
    /// Bytes read; the rest of the message is still pending.
    Partial(usize),
    /// The peer closed its end.
    Closed,
}

/// Collects chunks until the pipe reports the end of a message.
pub struct MessageReader {
    chunk: Vec<u8>,
    limit: usize,
}

impl MessageReader {
    pub fn new(chunk_size: usize, limit: usize) -> Self {
        Self {
            chunk: vec![0u8; chunk_size.max(1)],
            limit,
        }
    }

    /// Read one whole message, or `None` if the peer closed the pipe.
    /// A message longer than the limit is an error.
    pub fn read_message<F>(&mut self, mut read_chunk: F) -> Result<Option<Vec<u8>>, TransportError>
    where
        F: FnMut(&mut [u8]) -> io::Result<ChunkRead>,
    {
        let mut message = Vec::new();

        loop {
            let (len, complete) = match read_chunk(&mut self.chunk)? {
                ChunkRead::Closed => return Ok(None),
                ChunkRead::Complete(len) => (len, true),
                ChunkRead::Partial(len) => (len, false),
            };

            if message.len() + len > self.limit {
                return Err(TransportError::MessageTooLarge { limit: self.limit });
            }
            message.extend_from_slice(&self.chunk[..len]);

            if complete {
                return Ok(Some(message));
            }
        }
    }
}
