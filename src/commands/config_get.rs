use std::sync::Arc;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    resp::{RespValue, NULL_BULK_STRING},
    server::RedisServer,
};

pub struct ConfigGetArguments {
    pub parameters: Vec<String>,
}

impl ConfigGetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.is_empty() {
            return Err(CommandError::InvalidConfigGetCommand);
        }

        Ok(ConfigGetArguments {
            parameters: arguments,
        })
    }
}

/// Replies with a flat `[name, value, ...]` array for every known parameter asked for.
///
/// Only `dir` and `dbfilename` are known. When none of the parameters is known the
/// reply is a null bulk string.
pub fn config_get(
    server: Arc<RedisServer>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let config_get_arguments = ConfigGetArguments::parse(arguments)?;
    let mut response = Vec::new();

    for parameter in config_get_arguments.parameters {
        let value = match parameter.to_lowercase().as_str() {
            "dir" => server.rdb_directory.clone(),
            "dbfilename" => server.rdb_filename.clone(),
            _ => continue,
        };

        response.push(RespValue::BulkString(parameter.to_lowercase()));
        response.push(RespValue::BulkString(value));
    }

    if response.is_empty() {
        return Ok(CommandResult::Response(NULL_BULK_STRING.to_string()));
    }

    Ok(CommandResult::Response(RespValue::Array(response).encode()?))
}
