//! Slave side of the replication handshake.
//!
//! The slave sends `PING`, `REPLCONF listening-port <port>`, `REPLCONF capa psync2` and
//! `PSYNC ? -1`, checking the master's reply before each next step. The RDB dump that
//! follows `+FULLRESYNC` is consumed byte-exactly so that the commands the master
//! propagates afterwards start at the next unread byte of the stream.

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{debug, info};

use crate::{
    input::READ_BUFFER_SIZE,
    resp::{RespError, RespValue},
};

/// Longest reply line accepted from the master, terminator included.
pub const MAX_REPLY_LINE_LENGTH: usize = READ_BUFFER_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Uninitialized,
    Connecting,
    PingSent,
    ReplConfPortSent,
    ReplConfCapaSent,
    PsyncSent,
    Ready,
    Aborted,
}

#[derive(Error, Debug, PartialEq)]
pub enum HandshakeError {
    #[error("failed to connect to master at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },
    #[error("unexpected reply from master in state {state:?}: {reply}")]
    UnexpectedReply {
        state: HandshakeState,
        reply: String,
    },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("master closed the connection")]
    ConnectionClosed,
    #[error("invalid reply from master: {0}")]
    Resp(#[from] RespError),
}

impl From<tokio::io::Error> for HandshakeError {
    fn from(e: tokio::io::Error) -> Self {
        match e.kind() {
            tokio::io::ErrorKind::UnexpectedEof => HandshakeError::ConnectionClosed,
            _ => HandshakeError::Io(e.to_string()),
        }
    }
}

pub struct Handshake<S> {
    stream: S,
    own_port: u16,
    state: HandshakeState,
    master_replication_id: Option<String>,
}

impl Handshake<TcpStream> {
    pub async fn connect(host: &str, port: u16, own_port: u16) -> Result<Self, HandshakeError> {
        let address = format!("{}:{}", host, port);

        let stream = TcpStream::connect(&address).await.map_err(|e| {
            HandshakeError::ConnectionFailed {
                address: address.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(master = %address, "connected to master");

        Ok(Self::new(stream, own_port))
    }
}

impl<S> Handshake<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already connected stream to the master.
    pub fn new(stream: S, own_port: u16) -> Self {
        Self {
            stream,
            own_port,
            state: HandshakeState::Connecting,
            master_replication_id: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Replication id announced by the master in `+FULLRESYNC`.
    pub fn master_replication_id(&self) -> Option<&str> {
        self.master_replication_id.as_deref()
    }

    pub fn into_stream(self) -> S {
        self.stream
    }

    /// Runs every step of the handshake. Any failure leaves the handshake `Aborted`.
    pub async fn perform(&mut self) -> Result<(), HandshakeError> {
        match self.run_steps().await {
            Ok(()) => {
                self.state = HandshakeState::Ready;
                info!(
                    replication_id = self.master_replication_id().unwrap_or_default(),
                    "replication handshake completed"
                );

                Ok(())
            }
            Err(e) => {
                self.state = HandshakeState::Aborted;
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self) -> Result<(), HandshakeError> {
        self.send(&["PING"], HandshakeState::PingSent).await?;
        self.expect_simple_string("PONG").await?;

        let own_port = self.own_port.to_string();
        self.send(
            &["REPLCONF", "listening-port", &own_port],
            HandshakeState::ReplConfPortSent,
        )
        .await?;
        self.expect_simple_string("OK").await?;

        self.send(
            &["REPLCONF", "capa", "psync2"],
            HandshakeState::ReplConfCapaSent,
        )
        .await?;
        self.expect_simple_string("OK").await?;

        self.send(&["PSYNC", "?", "-1"], HandshakeState::PsyncSent)
            .await?;
        self.expect_full_resync().await?;
        self.receive_rdb_file().await?;

        Ok(())
    }

    async fn send(
        &mut self,
        command: &[&str],
        next_state: HandshakeState,
    ) -> Result<(), HandshakeError> {
        let encoded = RespValue::command(command).encode()?;

        self.stream.write_all(encoded.as_bytes()).await?;
        self.stream.flush().await?;
        self.state = next_state;

        debug!(state = ?self.state, command = %command.join(" "), "handshake step sent");

        Ok(())
    }

    /// Reads one `\r\n` terminated line, one byte at a time so nothing past it is consumed.
    async fn read_line(&mut self) -> Result<Vec<u8>, HandshakeError> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            self.stream.read_exact(&mut byte).await?;
            line.push(byte[0]);

            if line.ends_with(b"\r\n") {
                return Ok(line);
            }

            if line.len() >= MAX_REPLY_LINE_LENGTH {
                return Err(self.unexpected_reply(&line[..64]));
            }
        }
    }

    fn unexpected_reply(&self, reply: &[u8]) -> HandshakeError {
        HandshakeError::UnexpectedReply {
            state: self.state,
            reply: String::from_utf8_lossy(reply).trim_end().to_string(),
        }
    }

    async fn expect_simple_string(&mut self, expected: &str) -> Result<(), HandshakeError> {
        let line = self.read_line().await?;

        match RespValue::decode(&line)? {
            RespValue::SimpleString(reply) if reply == expected => Ok(()),
            _ => Err(self.unexpected_reply(&line)),
        }
    }

    async fn expect_full_resync(&mut self) -> Result<(), HandshakeError> {
        let line = self.read_line().await?;

        let RespValue::SimpleString(reply) = RespValue::decode(&line)? else {
            return Err(self.unexpected_reply(&line));
        };

        let parts: Vec<&str> = reply.split_whitespace().collect();

        if parts.len() != 3 || parts[0] != "FULLRESYNC" || parts[2].parse::<i64>().is_err() {
            return Err(self.unexpected_reply(&line));
        }

        self.master_replication_id = Some(parts[1].to_string());

        Ok(())
    }

    /// Consumes the `$<len>\r\n<bytes>` dump that follows `+FULLRESYNC`. The dump is
    /// not applied.
    async fn receive_rdb_file(&mut self) -> Result<(), HandshakeError> {
        let header = self.read_line().await?;

        let rdb_size = header
            .strip_prefix(b"$")
            .and_then(|size| std::str::from_utf8(&size[..size.len() - 2]).ok())
            .and_then(|size| size.parse::<usize>().ok());

        let Some(rdb_size) = rdb_size else {
            return Err(self.unexpected_reply(&header));
        };

        let mut total_received: usize = 0;
        let mut buffer: [u8; 4096] = [0; 4096];

        while total_received < rdb_size {
            let chunk_size = std::cmp::min(buffer.len(), rdb_size - total_received);
            self.stream.read_exact(&mut buffer[..chunk_size]).await?;
            total_received += chunk_size;
        }

        debug!(bytes = rdb_size, "received RDB file from master");

        Ok(())
    }
}
