use std::{sync::Arc, time::Duration};

use anyhow::Context;
use thiserror::Error;
use tokio::{
    net::TcpListener,
    sync::{Mutex, Semaphore},
};
use tracing::{error, info, warn};

use crate::{
    connection::{handle_client_connection, handle_master_connection},
    key_value_store::KeyValueStore,
    rdb::parse_rdb_file,
    replication::{ReplicationRole, ReplicationWorker},
};

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_MAX_CLIENTS: usize = 10;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("Invalid command line flag")]
    InvalidCommandLineFlag,
    #[error("Invalid command line flag value")]
    InvalidCommandLineFlagValue,
}

/// Startup configuration, read-only once the server runs.
#[derive(Debug, Clone)]
pub struct RedisServer {
    pub port: u16,
    pub rdb_directory: String,
    pub rdb_filename: String,
    /// Master host and port when started with `--replicaof`.
    pub replica_of: Option<(String, u16)>,
    /// Capacity of the admission gate for client connections.
    pub max_clients: usize,
    /// Idle threshold after which a silent client is closed. `None` never closes.
    pub idle_timeout: Option<Duration>,
}

impl Default for RedisServer {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            rdb_directory: String::new(),
            rdb_filename: String::new(),
            replica_of: None,
            max_clients: DEFAULT_MAX_CLIENTS,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

impl RedisServer {
    /// Parses the process arguments; the first item is the program name.
    ///
    /// Supported flags: `--port`, `--dir`, `--dbfilename`, `--replicaof "<host> <port>"`,
    /// `--maxclients` and `--timeout <seconds>` (0 disables idle eviction).
    pub fn new<I: IntoIterator<Item = String>>(command_line_args: I) -> Result<Self, CliError> {
        let mut iter = command_line_args.into_iter().skip(1);
        let mut server = RedisServer::default();

        while let Some(flag) = iter.next() {
            match flag.as_str() {
                "--port" => server.port = parse_port(&next_value(&mut iter)?)?,
                "--dir" => server.rdb_directory = next_value(&mut iter)?,
                "--dbfilename" => server.rdb_filename = next_value(&mut iter)?,
                "--replicaof" => {
                    let value = next_value(&mut iter)?;
                    let mut parts = value.split_whitespace();

                    let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next())
                    else {
                        return Err(CliError::InvalidCommandLineFlagValue);
                    };

                    server.replica_of = Some((host.to_string(), parse_port(port)?));
                }
                "--maxclients" => {
                    server.max_clients = match next_value(&mut iter)?.parse::<usize>() {
                        Ok(max_clients) if max_clients > 0 => max_clients,
                        _ => return Err(CliError::InvalidCommandLineFlagValue),
                    };
                }
                "--timeout" => {
                    let seconds = next_value(&mut iter)?
                        .parse::<u64>()
                        .map_err(|_| CliError::InvalidCommandLineFlagValue)?;

                    server.idle_timeout = match seconds {
                        0 => None,
                        seconds => Some(Duration::from_secs(seconds)),
                    };
                }
                _ => return Err(CliError::InvalidCommandLineFlag),
            }
        }

        Ok(server)
    }

    pub fn role(&self) -> ReplicationRole {
        match &self.replica_of {
            Some((master_host, master_port)) => ReplicationRole::Slave {
                master_host: master_host.clone(),
                master_port: *master_port,
            },
            None => ReplicationRole::Master,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .with_context(|| format!("failed to bind port {}", self.port))?;

        self.serve(listener).await
    }

    /// Loads the RDB file, runs the replication handshake when this is a slave, then
    /// accepts clients on `listener` until the process stops.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let server = Arc::new(self);
        let store = Arc::new(Mutex::new(KeyValueStore::new()));

        if !server.rdb_filename.is_empty() {
            if let Err(e) = parse_rdb_file(
                &server.rdb_directory,
                &server.rdb_filename,
                Arc::clone(&store),
            )
            .await
            {
                error!(error = %e, "failed to load RDB file");
            }
        }

        let worker = Arc::new(ReplicationWorker::new(server.role()));

        if let ReplicationRole::Slave {
            master_host,
            master_port,
        } = &worker.role
        {
            let master_link = worker
                .handshake_with_master(master_host, *master_port, server.port)
                .await
                .context("replication handshake with master failed")?;

            tokio::spawn(handle_master_connection(
                master_link,
                format!("{}:{}", master_host, master_port),
                Arc::clone(&server),
                Arc::clone(&store),
                Arc::clone(&worker),
            ));
        }

        let gate = Arc::new(Semaphore::new(server.max_clients));

        info!(
            port = server.port,
            role = worker.role.as_string(),
            max_clients = server.max_clients,
            "server ready to accept connections"
        );

        loop {
            let (stream, address) = match listener.accept().await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let Ok(permit) = Arc::clone(&gate).try_acquire_owned() else {
                warn!(client = %address, "too many clients, dropping connection");
                drop(stream);
                continue;
            };

            tokio::spawn(handle_client_connection(
                stream,
                address.to_string(),
                Arc::clone(&server),
                Arc::clone(&store),
                Arc::clone(&worker),
                permit,
            ));
        }
    }
}

fn parse_port(value: &str) -> Result<u16, CliError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(CliError::InvalidCommandLineFlagValue),
    }
}

fn next_value<I: Iterator<Item = String>>(iter: &mut I) -> Result<String, CliError> {
    iter.next().ok_or(CliError::InvalidCommandLineFlagValue)
}
