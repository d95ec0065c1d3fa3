use thiserror::Error;

use crate::resp::RespError;

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("invalid command")]
    InvalidCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid command argument")]
    InvalidCommandArgument,
    #[error("invalid PING command")]
    InvalidPingCommand,
    #[error("invalid ECHO command")]
    InvalidEchoCommand,
    #[error("invalid GET command")]
    InvalidGetCommand,
    #[error("invalid SET command")]
    InvalidSetCommand,
    #[error("invalid SET command argument")]
    InvalidSetCommandArgument,
    #[error("invalid SET command expiration")]
    InvalidSetCommandExpiration,
    #[error("invalid KEYS command")]
    InvalidKeysCommand,
    #[error("invalid glob pattern: {0}")]
    InvalidGlobPattern(String),
    #[error("invalid CONFIG GET command")]
    InvalidConfigGetCommand,
    #[error("invalid INFO command")]
    InvalidInfoCommand,
    #[error("invalid INFO section")]
    InvalidInfoSection,
    #[error("invalid REPLCONF command")]
    InvalidReplconfCommand,
    #[error("invalid PSYNC command")]
    InvalidPsyncCommand,
    #[error("invalid PSYNC replication ID")]
    InvalidPsyncReplicationId,
    #[error("invalid PSYNC offset")]
    InvalidPsyncOffset,
    #[error("PSYNC without REPLCONF listening-port")]
    PsyncWithoutListeningPort,
    #[error("replication commands are only served by a master")]
    ReplicationCommandOnReplica,
    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),
}

impl CommandError {
    pub fn as_string(&self) -> String {
        match self {
            CommandError::InvalidCommand => "-ERR Invalid command\r\n".to_string(),
            CommandError::UnknownCommand(name) => {
                format!("-ERR unknown command '{}'\r\n", name)
            }
            CommandError::InvalidCommandArgument => {
                "-ERR Invalid command argument\r\n".to_string()
            }
            CommandError::InvalidPingCommand => {
                "-ERR wrong number of arguments for 'ping' command\r\n".to_string()
            }
            CommandError::InvalidEchoCommand => {
                "-ERR wrong number of arguments for 'echo' command\r\n".to_string()
            }
            CommandError::InvalidGetCommand => {
                "-ERR wrong number of arguments for 'get' command\r\n".to_string()
            }
            CommandError::InvalidSetCommand => {
                "-ERR wrong number of arguments for 'set' command\r\n".to_string()
            }
            CommandError::InvalidSetCommandArgument => "-ERR syntax error\r\n".to_string(),
            CommandError::InvalidSetCommandExpiration => {
                "-ERR invalid expire time in 'set' command\r\n".to_string()
            }
            CommandError::InvalidKeysCommand => {
                "-ERR wrong number of arguments for 'keys' command\r\n".to_string()
            }
            CommandError::InvalidGlobPattern(e) => format!("-ERR Invalid pattern: {}\r\n", e),
            CommandError::InvalidConfigGetCommand => {
                "-ERR wrong number of arguments for 'config|get' command\r\n".to_string()
            }
            CommandError::InvalidInfoCommand => "-ERR syntax error\r\n".to_string(),
            CommandError::InvalidInfoSection => "-ERR Invalid INFO section\r\n".to_string(),
            CommandError::InvalidReplconfCommand => {
                "-ERR Invalid REPLCONF command\r\n".to_string()
            }
            CommandError::InvalidPsyncCommand => "-ERR Invalid PSYNC command\r\n".to_string(),
            CommandError::InvalidPsyncReplicationId => {
                "-ERR Invalid PSYNC replication ID\r\n".to_string()
            }
            CommandError::InvalidPsyncOffset => "-ERR Invalid PSYNC offset\r\n".to_string(),
            CommandError::PsyncWithoutListeningPort => {
                "-ERR PSYNC requires REPLCONF listening-port first\r\n".to_string()
            }
            CommandError::ReplicationCommandOnReplica => {
                "-ERR replication commands are only served by a master\r\n".to_string()
            }
            CommandError::Protocol(e) => e.as_string(),
        }
    }
}
