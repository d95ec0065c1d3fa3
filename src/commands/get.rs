use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::{RespValue, NULL_BULK_STRING},
};

pub struct GetArguments {
    key: String,
}

impl GetArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::InvalidGetCommand);
        }

        Ok(Self {
            key: arguments[0].clone(),
        })
    }
}

/// Handles the GET command.
///
/// # Returns
///
/// * A bulk string with the value if the key exists and hasn't expired
/// * A null bulk string otherwise
/// * `Err(CommandError::InvalidGetCommand)` - If the number of arguments is not exactly 1
pub async fn get(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let get_arguments = GetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;

    match store_guard.get(&get_arguments.key) {
        Some(value) => Ok(CommandResult::Response(
            RespValue::BulkString(value).encode()?,
        )),
        None => Ok(CommandResult::Response(NULL_BULK_STRING.to_string())),
    }
}
