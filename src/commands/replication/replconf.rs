//! REPLCONF command used by replicas during the replication handshake.

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
};

enum ReplconfConfiguration {
    ListeningPort(String),
    Capabilities,
}

pub struct ReplconfArguments {
    configuration: ReplconfConfiguration,
}

impl ReplconfArguments {
    /// Accepts `listening-port <port>` and `capa <capability>`.
    ///
    /// # Returns
    ///
    /// * `Err(CommandError::InvalidReplconfCommand)` - If there are not exactly 2
    ///   arguments, the option is unknown or the port is not a valid TCP port
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::InvalidReplconfCommand);
        }

        let configuration = match arguments[0].to_lowercase().as_str() {
            "listening-port" => {
                let port = arguments[1]
                    .parse::<u16>()
                    .map_err(|_| CommandError::InvalidReplconfCommand)?;

                ReplconfConfiguration::ListeningPort(port.to_string())
            }
            "capa" => ReplconfConfiguration::Capabilities,
            _ => return Err(CommandError::InvalidReplconfCommand),
        };

        Ok(Self { configuration })
    }
}

/// Replies `+OK`. A declared listening port is handed back to the connection, which
/// keeps it until the replica sends PSYNC.
pub fn replconf(arguments: Vec<String>) -> Result<CommandResult, CommandError> {
    let replconf_arguments = ReplconfArguments::parse(arguments)?;
    let response = RespValue::SimpleString("OK".to_string()).encode()?;

    match replconf_arguments.configuration {
        ReplconfConfiguration::ListeningPort(port) => {
            Ok(CommandResult::DeclareReplicaPort { port, response })
        }
        ReplconfConfiguration::Capabilities => Ok(CommandResult::Response(response)),
    }
}
