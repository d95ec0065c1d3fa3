mod command_error;
mod command_handler;
mod config_get;
mod echo;
mod get;
mod info;
mod keys;
mod ping;
mod replication;
mod set;

pub use command_error::CommandError;
pub use command_handler::{CommandHandler, CommandResult, REPLICATION_COMMANDS, WRITE_COMMANDS};
