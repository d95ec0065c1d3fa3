use std::collections::HashMap;

use crate::rdb::{
    encoding::decode_string,
    get_slice::{get_array, get_buffer_slice, get_byte},
    rdb_error::RdbError,
};

pub const MAGIC_STRING: &[u8] = b"REDIS";
pub const HEADER_LENGTH: usize = 9;

pub const METADATA_OPCODE: u8 = 0xFA;
pub const RESIZE_DB_OPCODE: u8 = 0xFB;
pub const DATABASE_OPCODE: u8 = 0xFE;
pub const EXPIRATION_SECONDS_OPCODE: u8 = 0xFD;
pub const EXPIRATION_MILLISECONDS_OPCODE: u8 = 0xFC;
pub const END_OF_FILE_OPCODE: u8 = 0xFF;
pub const STRING_VALUE_TYPE: u8 = 0x00;

/// Checks the magic string, the version and the presence of an end-of-file marker.
///
/// Returns the 4-digit version string on success.
pub fn validate(bytes: &[u8]) -> Result<String, RdbError> {
    let magic_string = get_buffer_slice(bytes, 0, MAGIC_STRING.len())
        .map_err(|_| RdbError::MalformedFile("missing magic string".to_string()))?;

    if magic_string != MAGIC_STRING {
        return Err(RdbError::MalformedFile("invalid magic string".to_string()));
    }

    let version = get_buffer_slice(bytes, MAGIC_STRING.len(), 4)
        .map_err(|_| RdbError::MalformedFile("missing version".to_string()))?;

    if !bytes[HEADER_LENGTH..].contains(&END_OF_FILE_OPCODE) {
        return Err(RdbError::MalformedFile(
            "missing end of file marker".to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(version).into_owned())
}

/// Walks the `0xFA key value` records starting at `cursor`, collecting them into
/// `metadata`. Returns the cursor of the first byte after the metadata section.
pub fn parse_metadata(
    bytes: &[u8],
    cursor: usize,
    metadata: &mut HashMap<String, String>,
) -> Result<usize, RdbError> {
    let mut temp_cursor = cursor;

    while get_byte(bytes, temp_cursor)? == METADATA_OPCODE {
        temp_cursor += 1;

        let (key, key_length) = decode_string(bytes, temp_cursor)?;
        temp_cursor += key_length;
        let (value, value_length) = decode_string(bytes, temp_cursor)?;
        temp_cursor += value_length;

        metadata.insert(key, value);
    }

    Ok(temp_cursor)
}

/// Reads the expiry following an `0xFC`/`0xFD` opcode at `cursor`.
///
/// Returns the expiry in epoch milliseconds and the bytes consumed (opcode included).
pub fn parse_expiration(bytes: &[u8], cursor: usize) -> Result<Option<(u64, usize)>, RdbError> {
    match get_byte(bytes, cursor)? {
        EXPIRATION_MILLISECONDS_OPCODE => {
            let milliseconds: [u8; 8] = get_array(bytes, cursor + 1)?;

            Ok(Some((u64::from_le_bytes(milliseconds), 9)))
        }
        EXPIRATION_SECONDS_OPCODE => {
            let seconds: [u8; 4] = get_array(bytes, cursor + 1)?;

            Ok(Some((u32::from_le_bytes(seconds) as u64 * 1000, 5)))
        }
        _ => Ok(None),
    }
}
