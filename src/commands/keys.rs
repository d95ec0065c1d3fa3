use std::sync::Arc;

use globset::Glob;
use tokio::sync::Mutex;

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    key_value_store::KeyValueStore,
    resp::RespValue,
};

pub struct KeysArguments {
    pattern: String,
}

impl KeysArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 1 {
            return Err(CommandError::InvalidKeysCommand);
        }

        Ok(KeysArguments {
            pattern: arguments[0].clone(),
        })
    }
}

/// Replies with every live key matching the glob pattern, in lexicographic order.
pub async fn keys(
    store: Arc<Mutex<KeyValueStore>>,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let keys_arguments = KeysArguments::parse(arguments)?;

    let glob = Glob::new(&keys_arguments.pattern)
        .map_err(|e| CommandError::InvalidGlobPattern(e.to_string()))?
        .compile_matcher();

    let mut matching_keys: Vec<String> = {
        let mut store_guard = store.lock().await;
        store_guard
            .keys()
            .into_iter()
            .filter(|key| glob.is_match(key))
            .collect()
    };
    matching_keys.sort();

    let response = matching_keys
        .into_iter()
        .map(RespValue::BulkString)
        .collect();

    Ok(CommandResult::Response(RespValue::Array(response).encode()?))
}
