use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::RespValue,
};

pub struct EchoArguments {
    message: String,
}

impl EchoArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::InvalidEchoCommand);
        }

        Ok(Self {
            message: arguments.join(" "),
        })
    }
}

/// Handles the ECHO command.
///
/// Every argument is echoed back, joined by single spaces, as one bulk string.
///
/// # Examples
///
/// ```ignore
/// // ECHO hello world
/// let result = echo(vec!["hello".to_string(), "world".to_string()]);
/// // Returns: "$11\r\nhello world\r\n"
/// ```
pub fn echo(arguments: Vec<String>) -> Result<CommandResult, CommandError> {
    let echo_arguments = EchoArguments::parse(arguments)?;

    Ok(CommandResult::Response(
        RespValue::BulkString(echo_arguments.message).encode()?,
    ))
}
