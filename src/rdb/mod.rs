mod encoding;
mod get_slice;
mod opcode;
mod rdb_error;
mod rdb_file_operations;
mod rdb_parser;

pub use encoding::{decode_length, decode_string, parse_length_encoding, LengthEncoding};
pub use rdb_error::RdbError;
pub use rdb_file_operations::{full_resync_payload, parse_rdb_file, EMPTY_RDB};
pub use rdb_parser::{parse_snapshot, Database, Entry, RdbParser, Snapshot};
