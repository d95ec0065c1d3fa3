use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct SetArguments {
    key: String,
    value: String,
    /// Time to live of the key value pair
    ttl: Option<Duration>,
}

impl SetArguments {
    /// Parses `[key, value]` or `[key, value, "PX", milliseconds]`.
    ///
    /// # Returns
    ///
    /// * `Err(CommandError::InvalidSetCommand)` - If the number of arguments is not 2 or 4
    /// * `Err(CommandError::InvalidSetCommandArgument)` - If the option is not "PX"
    /// * `Err(CommandError::InvalidSetCommandExpiration)` - If the milliseconds are not a
    ///   positive integer
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 && arguments.len() != 4 {
            return Err(CommandError::InvalidSetCommand);
        }

        let mut ttl: Option<Duration> = None;

        if arguments.len() == 4 {
            if arguments[2].to_lowercase() != "px" {
                return Err(CommandError::InvalidSetCommandArgument);
            }

            match arguments[3].parse::<u64>() {
                Ok(milliseconds) if milliseconds > 0 => {
                    ttl = Some(Duration::from_millis(milliseconds))
                }
                _ => return Err(CommandError::InvalidSetCommandExpiration),
            }
        }

        Ok(Self {
            key: arguments[0].clone(),
            value: arguments[1].clone(),
            ttl,
        })
    }
}

/// Handles the SET command, replying `+OK`.
pub async fn set(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let set_arguments = SetArguments::parse(arguments)?;

    let mut store_guard = store.lock().await;
    store_guard
        .set(set_arguments.key, set_arguments.value, set_arguments.ttl)
        .map_err(|_| CommandError::InvalidSetCommandExpiration)?;

    Ok(CommandResult::Response(
        RespValue::SimpleString("OK".to_string()).encode()?,
    ))
}
