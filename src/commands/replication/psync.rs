//! PSYNC command implementation.
//!
//! Only full resynchronization exists: whatever replication id and offset the replica
//! asks for, it receives `+FULLRESYNC` and an empty RDB dump.

use crate::{
    commands::{command_error::CommandError, command_handler::CommandResult},
    replication::ReplicationWorker,
};

pub struct PsyncArguments {
    /// The replication ID of the master (or "?" when unknown)
    master_repl_id: String,
    /// The replica's offset (-1 when unknown)
    _offset: i64,
}

impl PsyncArguments {
    pub fn parse(arguments: Vec<String>) -> Result<Self, CommandError> {
        if arguments.len() != 2 {
            return Err(CommandError::InvalidPsyncCommand);
        }

        let master_repl_id = arguments[0].clone();
        let offset = arguments[1]
            .parse::<i64>()
            .map_err(|_| CommandError::InvalidPsyncOffset)?;

        Ok(Self {
            master_repl_id,
            _offset: offset,
        })
    }
}

/// Validates the request; the connection then serves the full resync through the worker.
///
/// # Returns
///
/// * `Ok(CommandResult::FullResync)` - For `?` or this master's replication id
/// * `Err(CommandError::InvalidPsyncReplicationId)` - For any other replication id
pub fn psync(
    worker: &ReplicationWorker,
    arguments: Vec<String>,
) -> Result<CommandResult, CommandError> {
    let psync_arguments = PsyncArguments::parse(arguments)?;

    if psync_arguments.master_repl_id != "?"
        && psync_arguments.master_repl_id != worker.replication_id
    {
        return Err(CommandError::InvalidPsyncReplicationId);
    }

    Ok(CommandResult::FullResync)
}
