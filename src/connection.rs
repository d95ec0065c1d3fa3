use std::sync::Arc;

use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::{Mutex, OwnedSemaphorePermit},
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    commands::{CommandError, CommandHandler, CommandResult},
    input::{CommandReadError, RespReader},
    key_value_store::KeyValueStore,
    replication::{shared_writer, ReplicationWorker, SharedWriter},
    server::RedisServer,
};

/// Serves one accepted client connection until it closes, errors or idles out.
///
/// `permit` is the client's admission slot. It is released when the handler ends, or
/// earlier when the connection completes `PSYNC` and turns into a replica stream; replica
/// streams are never idle-evicted and their input is ignored.
pub async fn handle_client_connection(
    stream: TcpStream,
    client_address: String,
    server: Arc<RedisServer>,
    store: Arc<Mutex<KeyValueStore>>,
    worker: Arc<ReplicationWorker>,
    permit: OwnedSemaphorePermit,
) {
    let mut resp_reader = RespReader::new();

    let (mut reader, writer) = stream.into_split();
    let writer = shared_writer(writer);

    let mut permit = Some(permit);
    let mut declared_port: Option<String> = None;

    debug!(client = %client_address, "client connected");

    'connection: loop {
        let is_replica_stream = permit.is_none();

        let read_result = match server.idle_timeout {
            Some(idle_timeout) if !is_replica_stream => {
                match timeout(idle_timeout, resp_reader.read_values(&mut reader)).await {
                    Ok(read_result) => read_result,
                    Err(_) => {
                        info!(client = %client_address, "closing idle connection");
                        break;
                    }
                }
            }
            _ => resp_reader.read_values(&mut reader).await,
        };

        let parsed_input = match read_result {
            Ok(values) => values,
            Err(CommandReadError::ConnectionClosed) => {
                debug!(client = %client_address, "client disconnected");
                break;
            }
            Err(CommandReadError::Io(e)) => {
                warn!(client = %client_address, error = %e, "failed to read from client");
                break;
            }
            Err(e) => {
                if is_replica_stream {
                    continue;
                }

                if let Err(e) = thread_safe_write_to_stream(&writer, e.as_string().as_bytes()).await
                {
                    warn!(client = %client_address, error = %e, "failed to write to client");
                    break;
                }
                continue;
            }
        };

        if is_replica_stream {
            debug!(
                client = %client_address,
                messages = parsed_input.len(),
                "ignoring input from replica"
            );
            continue;
        }

        for input in parsed_input {
            let input = match input {
                Ok(input) => input,
                Err(e) => {
                    let reply = CommandReadError::from(e).as_string();
                    if let Err(e) = thread_safe_write_to_stream(&writer, reply.as_bytes()).await {
                        warn!(client = %client_address, error = %e, "failed to write to client");
                        break 'connection;
                    }
                    continue;
                }
            };

            let command_result = match CommandHandler::new(input) {
                Ok(command_handler) => {
                    if worker.is_master() {
                        command_handler
                            .handle_command_for_master_server(
                                Arc::clone(&server),
                                Arc::clone(&store),
                                Arc::clone(&worker),
                            )
                            .await
                    } else {
                        command_handler
                            .handle_command_for_replica_server(
                                Arc::clone(&server),
                                Arc::clone(&store),
                                Arc::clone(&worker),
                            )
                            .await
                    }
                }
                Err(e) => Err(e),
            };

            let response = match command_result {
                Ok(CommandResult::Response(response)) => response,
                Ok(CommandResult::DeclareReplicaPort { port, response }) => {
                    declared_port = Some(port);
                    response
                }
                Ok(CommandResult::FullResync) => match declared_port.clone() {
                    None => CommandError::PsyncWithoutListeningPort.as_string(),
                    Some(replica_port) => {
                        if let Err(e) = worker.serve_full_resync(&writer).await {
                            warn!(
                                client = %client_address,
                                error = %e,
                                "failed to serve full resync"
                            );
                            break 'connection;
                        }

                        worker
                            .register_replica(replica_port.clone(), Arc::clone(&writer))
                            .await;
                        permit.take();

                        info!(
                            client = %client_address,
                            replica_port = %replica_port,
                            "registered replica"
                        );

                        // The rest of the chunk belongs to the replica stream.
                        break;
                    }
                },
                Err(e) => e.as_string(),
            };

            if let Err(e) = thread_safe_write_to_stream(&writer, response.as_bytes()).await {
                warn!(client = %client_address, error = %e, "failed to write to client");
                break 'connection;
            }
        }
    }

    debug!(client = %client_address, "connection handler finished");
}

/// Applies the commands a master propagates over the replication link.
///
/// Nothing is ever written back to the master. The link lives until the master closes it.
pub async fn handle_master_connection(
    stream: TcpStream,
    master_address: String,
    server: Arc<RedisServer>,
    store: Arc<Mutex<KeyValueStore>>,
    worker: Arc<ReplicationWorker>,
) {
    let mut resp_reader = RespReader::new();
    let (mut reader, _writer) = stream.into_split();

    loop {
        let parsed_input = match resp_reader.read_values(&mut reader).await {
            Ok(values) => values,
            Err(CommandReadError::ConnectionClosed) => {
                warn!(master = %master_address, "master closed the replication link");
                break;
            }
            Err(CommandReadError::Io(e)) => {
                warn!(master = %master_address, error = %e, "failed to read from master");
                break;
            }
            Err(e) => {
                warn!(master = %master_address, error = %e, "invalid input from master");
                continue;
            }
        };

        for input in parsed_input {
            let input = match input {
                Ok(input) => input,
                Err(e) => {
                    warn!(master = %master_address, error = %e, "invalid input from master");
                    continue;
                }
            };

            let command_handler = match CommandHandler::new(input) {
                Ok(command_handler) => command_handler,
                Err(e) => {
                    debug!(master = %master_address, error = %e, "skipping invalid command");
                    continue;
                }
            };

            if let Err(e) = command_handler
                .handle_command_for_replica_master_connection(
                    Arc::clone(&server),
                    Arc::clone(&store),
                    Arc::clone(&worker),
                )
                .await
            {
                debug!(
                    master = %master_address,
                    command = %command_handler.name,
                    error = %e,
                    "propagated command failed"
                );
            }
        }
    }
}

pub async fn thread_safe_write_to_stream(
    writer: &SharedWriter,
    response: &[u8],
) -> tokio::io::Result<()> {
    let mut writer_guard = writer.lock().await;
    writer_guard.write_all(response).await?;
    writer_guard.flush().await?;

    Ok(())
}
