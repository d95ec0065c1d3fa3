use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
};

pub struct PingArguments {
    message: Option<String>,
}

impl PingArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() > 1 {
            return Err(CommandError::InvalidPingCommand);
        }

        Ok(Self {
            message: arguments.into_iter().next(),
        })
    }
}

/// Replies `+PONG`, or the message as a bulk string when one is given.
pub fn ping(arguments: Vec<String>) -> Result<CommandResult, CommandError> {
    let ping_arguments = PingArguments::parse(arguments)?;

    let response = match ping_arguments.message {
        Some(message) => RespValue::BulkString(message),
        None => RespValue::SimpleString("PONG".to_string()),
    };

    Ok(CommandResult::Response(response.encode()?))
}
