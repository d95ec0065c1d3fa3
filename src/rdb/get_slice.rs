use crate::rdb::rdb_error::RdbError;

pub fn get_buffer_slice(buffer: &[u8], cursor: usize, len: usize) -> Result<&[u8], RdbError> {
    match cursor.checked_add(len) {
        Some(end) if end <= buffer.len() => Ok(&buffer[cursor..end]),
        _ => Err(RdbError::TruncatedData {
            offset: cursor,
            needed: len,
            available: buffer.len(),
        }),
    }
}

pub fn get_byte(buffer: &[u8], cursor: usize) -> Result<u8, RdbError> {
    Ok(get_buffer_slice(buffer, cursor, 1)?[0])
}

pub fn get_array<const N: usize>(buffer: &[u8], cursor: usize) -> Result<[u8; N], RdbError> {
    let mut array = [0u8; N];
    array.copy_from_slice(get_buffer_slice(buffer, cursor, N)?);

    Ok(array)
}
