use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::{
    commands::{
        command_error::CommandError,
        config_get::config_get,
        echo::echo,
        get::get,
        info::info,
        keys::keys,
        ping::ping,
        replication::{psync, replconf},
        set::set,
    },
    key_value_store::KeyValueStore,
    replication::ReplicationWorker,
    resp::RespValue,
    server::RedisServer,
};

/// Commands that modify the store and are propagated to replicas.
pub const WRITE_COMMANDS: [&str; 1] = ["SET"];

/// Commands only a master serves.
pub const REPLICATION_COMMANDS: [&str; 2] = ["REPLCONF", "PSYNC"];

#[derive(Debug, PartialEq)]
pub enum CommandResult {
    Response(String),
    /// `REPLCONF listening-port` was accepted; the connection remembers the port.
    DeclareReplicaPort { port: String, response: String },
    /// `PSYNC` was accepted; the connection must be served a full resync.
    FullResync,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommandHandler {
    pub name: String,
    pub arguments: Vec<String>,
    pub input: RespValue,
}

impl CommandHandler {
    pub fn new(input: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = &input else {
            return Err(CommandError::InvalidCommand);
        };

        let name = match elements.first() {
            Some(RespValue::BulkString(s)) => s.to_uppercase(),
            _ => return Err(CommandError::InvalidCommand),
        };

        let (name, rest_of_data) = match name.as_str() {
            "CONFIG" => {
                let sub_command = match elements.get(1) {
                    Some(RespValue::BulkString(s)) => s.to_uppercase(),
                    _ => return Err(CommandError::InvalidCommandArgument),
                };

                if sub_command != "GET" {
                    return Err(CommandError::UnknownCommand(format!(
                        "CONFIG {}",
                        sub_command
                    )));
                }

                ("CONFIG GET".to_string(), &elements[2..])
            }
            _ => (name, &elements[1..]),
        };

        let mut arguments: Vec<String> = Vec::new();

        for element in rest_of_data {
            let arg = match element {
                RespValue::BulkString(s) => Ok(s.to_string()),
                _ => Err(CommandError::InvalidCommandArgument),
            }?;

            arguments.push(arg);
        }

        Ok(Self {
            name,
            arguments,
            input,
        })
    }

    pub fn is_write_command(&self) -> bool {
        WRITE_COMMANDS.contains(&self.name.as_str())
    }

    async fn handle_command(
        &self,
        server: Arc<RedisServer>,
        store: Arc<Mutex<KeyValueStore>>,
        worker: Arc<ReplicationWorker>,
    ) -> Result<CommandResult, CommandError> {
        match self.name.as_str() {
            "PING" => ping(self.arguments.clone()),
            "ECHO" => echo(self.arguments.clone()),
            "GET" => get(store, self.arguments.clone()).await,
            "SET" => set(store, self.arguments.clone()).await,
            "KEYS" => keys(store, self.arguments.clone()).await,
            "CONFIG GET" => config_get(server, self.arguments.clone()),
            "INFO" => info(worker, self.arguments.clone()).await,
            "REPLCONF" => replconf(self.arguments.clone()),
            "PSYNC" => psync(&worker, self.arguments.clone()),
            _ => Err(CommandError::UnknownCommand(self.name.clone())),
        }
    }

    /// Runs a command sent by a client of a master. Successful writes are propagated
    /// verbatim to every registered replica.
    pub async fn handle_command_for_master_server(
        &self,
        server: Arc<RedisServer>,
        store: Arc<Mutex<KeyValueStore>>,
        worker: Arc<ReplicationWorker>,
    ) -> Result<CommandResult, CommandError> {
        let command_result = self
            .handle_command(server, store, Arc::clone(&worker))
            .await?;

        if self.is_write_command() {
            worker.propagate(Bytes::from(self.input.encode()?)).await;
        }

        Ok(command_result)
    }

    /// Runs a command the master propagated to this slave. The caller writes no reply.
    pub async fn handle_command_for_replica_master_connection(
        &self,
        server: Arc<RedisServer>,
        store: Arc<Mutex<KeyValueStore>>,
        worker: Arc<ReplicationWorker>,
    ) -> Result<CommandResult, CommandError> {
        self.handle_command(server, store, worker).await
    }

    /// Runs a command sent by a client of a slave. Writes apply to the local store only
    /// and are never propagated.
    pub async fn handle_command_for_replica_server(
        &self,
        server: Arc<RedisServer>,
        store: Arc<Mutex<KeyValueStore>>,
        worker: Arc<ReplicationWorker>,
    ) -> Result<CommandResult, CommandError> {
        if REPLICATION_COMMANDS.contains(&self.name.as_str()) {
            return Err(CommandError::ReplicationCommandOnReplica);
        }

        self.handle_command(server, store, worker).await
    }
}
