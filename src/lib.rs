//! memodb: an in-memory key-value server speaking the Redis protocol.
//!
//! It supports a small command set (PING, ECHO, GET, SET, KEYS, CONFIG GET, INFO),
//! loading keys from an RDB snapshot at startup and master/slave replication where a
//! master propagates every write to the replicas that completed a full resync.

pub mod commands;
pub mod connection;
pub mod handshake;
pub mod input;
pub mod key_value_store;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod server;
