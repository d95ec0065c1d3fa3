//! Replication role and the master side of replication.
//!
//! A master keeps one [`ReplicaHandle`] per replica that completed `PSYNC`. Each handle
//! feeds an unbounded channel drained by a dedicated forwarding task, so propagated
//! commands reach every replica in order while clients never wait on a replica socket.

use std::sync::Arc;

use bytes::Bytes;
use rand::{distributions::Alphanumeric, Rng};
use tokio::{
    io::AsyncWrite,
    net::TcpStream,
    sync::{mpsc, Mutex},
};
use tracing::{debug, warn};

use crate::{
    connection::thread_safe_write_to_stream,
    handshake::{Handshake, HandshakeError, HandshakeState},
    rdb,
};

/// Length of worker and replication ids.
pub const ID_LENGTH: usize = 40;

/// Write half of a connection that several tasks may write to.
pub type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

pub fn shared_writer<W>(writer: W) -> SharedWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(Box::new(writer)))
}

pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationRole {
    Master,
    Slave {
        master_host: String,
        master_port: u16,
    },
}

impl ReplicationRole {
    pub fn as_string(&self) -> &'static str {
        match self {
            ReplicationRole::Master => "master",
            ReplicationRole::Slave { .. } => "slave",
        }
    }
}

#[derive(Debug)]
pub struct ReplicaHandle {
    pub declared_port: String,
    sender: mpsc::UnboundedSender<Bytes>,
}

#[derive(Debug)]
pub struct ReplicationWorker {
    pub id: String,
    pub role: ReplicationRole,
    pub replication_id: String,
    pub replication_offset: u64,
    state: Mutex<HandshakeState>,
    replicas: Mutex<Vec<ReplicaHandle>>,
}

impl ReplicationWorker {
    /// A master is ready as soon as it exists; a slave stays `Uninitialized` until the
    /// handshake with its master has run.
    pub fn new(role: ReplicationRole) -> Self {
        let state = match role {
            ReplicationRole::Master => HandshakeState::Ready,
            ReplicationRole::Slave { .. } => HandshakeState::Uninitialized,
        };

        Self {
            id: generate_id(),
            role,
            replication_id: generate_id(),
            replication_offset: 0,
            state: Mutex::new(state),
            replicas: Mutex::new(Vec::new()),
        }
    }

    pub fn is_master(&self) -> bool {
        self.role == ReplicationRole::Master
    }

    pub async fn state(&self) -> HandshakeState {
        *self.state.lock().await
    }

    pub async fn set_state(&self, state: HandshakeState) {
        let mut state_guard = self.state.lock().await;
        *state_guard = state;
    }

    /// Connects to the master and runs the handshake, mirroring its state in this worker.
    ///
    /// On success the returned stream is positioned at the first propagated command.
    /// Any failure, including an unreachable master, leaves the worker `Aborted`.
    pub async fn handshake_with_master(
        &self,
        master_host: &str,
        master_port: u16,
        own_port: u16,
    ) -> Result<TcpStream, HandshakeError> {
        self.set_state(HandshakeState::Connecting).await;

        let mut handshake = match Handshake::connect(master_host, master_port, own_port).await {
            Ok(handshake) => handshake,
            Err(e) => {
                self.set_state(HandshakeState::Aborted).await;
                return Err(e);
            }
        };

        let result = handshake.perform().await;
        self.set_state(handshake.state()).await;
        result?;

        Ok(handshake.into_stream())
    }

    /// Sends `+FULLRESYNC <replid> 0` followed by the empty RDB dump.
    pub async fn serve_full_resync(&self, writer: &SharedWriter) -> tokio::io::Result<()> {
        let mut response = format!(
            "+FULLRESYNC {} {}\r\n",
            self.replication_id, self.replication_offset
        )
        .into_bytes();
        response.extend_from_slice(&rdb::full_resync_payload());

        thread_safe_write_to_stream(writer, &response).await
    }

    /// Adds a replica and spawns the task that owns all writes to it.
    ///
    /// Replicas are never deduplicated nor removed.
    pub async fn register_replica(&self, declared_port: String, writer: SharedWriter) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Bytes>();

        let replica_port = declared_port.clone();
        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                if let Err(e) = thread_safe_write_to_stream(&writer, &command).await {
                    warn!(
                        replica_port = %replica_port,
                        error = %e,
                        "failed to propagate command to replica"
                    );
                }
            }
        });

        let mut replicas_guard = self.replicas.lock().await;
        replicas_guard.push(ReplicaHandle {
            declared_port,
            sender,
        });
    }

    /// Queues `command` for every registered replica without waiting for delivery.
    pub async fn propagate(&self, command: Bytes) {
        let replicas_guard = self.replicas.lock().await;

        for replica in replicas_guard.iter() {
            if let Err(e) = replica.sender.send(command.clone()) {
                warn!(
                    replica_port = %replica.declared_port,
                    error = %e,
                    "replica forwarding task is gone"
                );
            }
        }

        debug!(
            replicas = replicas_guard.len(),
            bytes = command.len(),
            "propagated write command"
        );
    }

    pub async fn connected_replicas(&self) -> usize {
        self.replicas.lock().await.len()
    }

    pub async fn replica_ports(&self) -> Vec<String> {
        self.replicas
            .lock()
            .await
            .iter()
            .map(|replica| replica.declared_port.clone())
            .collect()
    }
}
