use std::{path::Path, sync::Arc};

use tokio::{fs, sync::Mutex};
use tracing::{info, warn};

use crate::{
    key_value_store::KeyValueStore,
    rdb::{rdb_error::RdbError, rdb_parser::RdbParser},
};

/// Minimal RDB dump without any database, sent to replicas during a full resync.
pub const EMPTY_RDB: [u8; 88] = [
    0x52, 0x45, 0x44, 0x49, 0x53, 0x30, 0x30, 0x31, 0x31, 0xfa, 0x09, 0x72, 0x65, 0x64, 0x69,
    0x73, 0x2d, 0x76, 0x65, 0x72, 0x05, 0x37, 0x2e, 0x32, 0x2e, 0x30, 0xfa, 0x0a, 0x72, 0x65,
    0x64, 0x69, 0x73, 0x2d, 0x62, 0x69, 0x74, 0x73, 0xc0, 0x40, 0xfa, 0x05, 0x63, 0x74, 0x69,
    0x6d, 0x65, 0xc2, 0x6d, 0x08, 0xbc, 0x65, 0xfa, 0x08, 0x75, 0x73, 0x65, 0x64, 0x2d, 0x6d,
    0x65, 0x6d, 0xc2, 0xb0, 0xc4, 0x10, 0x00, 0xfa, 0x08, 0x61, 0x6f, 0x66, 0x2d, 0x62, 0x61,
    0x73, 0x65, 0xc0, 0x00, 0xff, 0xf0, 0x6e, 0x3b, 0xfe, 0xc0, 0xff, 0x5a, 0xa2,
];

/// `EMPTY_RDB` framed the way it travels after `+FULLRESYNC`: `$<len>\r\n<bytes>`,
/// without a trailing line terminator.
pub fn full_resync_payload() -> Vec<u8> {
    let mut payload = format!("${}\r\n", EMPTY_RDB.len()).into_bytes();
    payload.extend_from_slice(&EMPTY_RDB);

    payload
}

/// Loads `directory/filename` into `store`.
///
/// Whatever was decoded before a parse failure is merged before the error is returned.
pub async fn parse_rdb_file(
    directory: &str,
    filename: &str,
    store: Arc<Mutex<KeyValueStore>>,
) -> Result<usize, RdbError> {
    let file_path = Path::new(directory).join(filename);

    let bytes = fs::read(&file_path)
        .await
        .map_err(|e| RdbError::Io(format!("{}: {}", file_path.display(), e)))?;

    let mut rdb_parser = RdbParser::new(&bytes);
    let result = rdb_parser.parse();
    let snapshot = rdb_parser.into_snapshot();

    let merged = {
        let mut store_guard = store.lock().await;
        store_guard.merge_snapshot(snapshot)
    };

    match result {
        Ok(()) => {
            info!(path = %file_path.display(), keys = merged, "loaded RDB file");
            Ok(merged)
        }
        Err(e) => {
            warn!(
                path = %file_path.display(),
                keys = merged,
                "RDB file only partially loaded"
            );
            Err(e)
        }
    }
}
