use std::sync::Arc;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    handshake::HandshakeState,
    replication::{ReplicationRole, ReplicationWorker},
    resp::RespValue,
};

pub struct InfoArguments;

impl InfoArguments {
    /// Accepts no section or the `replication` section, which is the only one reported.
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::InvalidInfoCommand);
        }

        match arguments.first() {
            None => Ok(InfoArguments),
            Some(section) if section.eq_ignore_ascii_case("replication") => Ok(InfoArguments),
            Some(_) => Err(CommandError::InvalidInfoSection),
        }
    }
}

pub async fn info(
    worker: Arc<ReplicationWorker>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    InfoArguments::parse(arguments)?;

    let mut replication = vec![format!("role:{}", worker.role.as_string())];

    match &worker.role {
        ReplicationRole::Master => {
            replication.push(format!(
                "connected_slaves:{}",
                worker.connected_replicas().await
            ));
        }
        ReplicationRole::Slave {
            master_host,
            master_port,
        } => {
            let link_status = match worker.state().await {
                HandshakeState::Ready => "up",
                _ => "down",
            };

            replication.push(format!("master_host:{}", master_host));
            replication.push(format!("master_port:{}", master_port));
            replication.push(format!("master_link_status:{}", link_status));
        }
    }

    replication.push(format!("master_replid:{}", worker.replication_id));
    replication.push(format!("master_repl_offset:{}", worker.replication_offset));

    Ok(CommandResult::Response(
        RespValue::BulkString(replication.join("\r\n")).encode()?,
    ))
}
