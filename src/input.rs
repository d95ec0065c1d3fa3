//! Reading raw chunks from network streams and turning them into RESP values.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::resp::{RespError, RespValue};

/// Size of the buffer a single socket read fills.
pub const READ_BUFFER_SIZE: usize = 10240;

/// Why a chunk could not be turned into RESP values.
#[derive(Error, Debug, PartialEq)]
pub enum CommandReadError {
    #[error("read failed: {0}")]
    Io(String),
    #[error("peer closed the connection")]
    ConnectionClosed,
    #[error("input is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("message exceeds {} bytes", MAX_PENDING_BYTES)]
    MessageTooLarge,
    #[error(transparent)]
    Protocol(#[from] RespError),
}

impl CommandReadError {
    /// Reply sent to a client whose input could not be decoded.
    pub fn as_string(&self) -> String {
        match self {
            CommandReadError::Protocol(e) => e.as_string(),
            other => format!("-ERR {}\r\n", other),
        }
    }
}

/// Bytes a connection may hold without completing a message before its input is
/// rejected.
pub const MAX_PENDING_BYTES: usize = 64 * READ_BUFFER_SIZE;

/// Outcome of one received message: the value, or why it could not be decoded.
pub type ReadOutcome = Result<RespValue, RespError>;

/// Per-connection reader that frames RESP messages across socket reads.
///
/// Each read appends to a pending buffer. Every complete message is handed out in
/// arrival order; a message cut off by the read stays pending until the rest arrives.
#[derive(Debug)]
pub struct RespReader {
    pending: BytesMut,
    chunk: Box<[u8]>,
}

impl Default for RespReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RespReader {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(READ_BUFFER_SIZE),
            chunk: vec![0; READ_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Number of received bytes not yet framed into a message.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Reads one chunk from `stream` and returns the messages it completed.
    ///
    /// The result is empty when the chunk only extended a pending message.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ReadOutcome>)` - Complete messages in arrival order, possibly ending with
    ///   a protocol error after which the pending input was dropped
    /// * `Err(CommandReadError::Io)` - If reading from the stream fails
    /// * `Err(CommandReadError::ConnectionClosed)` - If the peer closed the connection
    /// * `Err(CommandReadError::InvalidUtf8)` - If the input is not valid UTF-8
    /// * `Err(CommandReadError::MessageTooLarge)` - If too many bytes are pending
    pub async fn read_values<R>(
        &mut self,
        stream: &mut R,
    ) -> Result<Vec<ReadOutcome>, CommandReadError>
    where
        R: AsyncReadExt + Unpin,
    {
        let number_of_bytes = match stream.read(&mut self.chunk).await {
            Ok(n) => n,
            Err(e) => return Err(CommandReadError::Io(e.to_string())),
        };

        if number_of_bytes == 0 {
            return Err(CommandReadError::ConnectionClosed);
        }

        self.pending.extend_from_slice(&self.chunk[..number_of_bytes]);

        self.decode_pending()
    }

    fn decode_pending(&mut self) -> Result<Vec<ReadOutcome>, CommandReadError> {
        let text = match std::str::from_utf8(&self.pending) {
            Ok(text) => text,
            // A multi-byte character split by the read completes with the next chunk.
            Err(e) if e.error_len().is_none() => {
                std::str::from_utf8(&self.pending[..e.valid_up_to()])?
            }
            Err(e) => {
                self.pending.clear();
                return Err(CommandReadError::InvalidUtf8(e));
            }
        };

        let (outcomes, consumed_bytes) = RespValue::decode_all(text);
        self.pending.advance(consumed_bytes);

        if self.pending.len() > MAX_PENDING_BYTES {
            self.pending.clear();
            return Err(CommandReadError::MessageTooLarge);
        }

        Ok(outcomes)
    }
}
