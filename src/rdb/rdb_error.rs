use thiserror::Error;

/// Errors raised while reading or decoding an RDB snapshot.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum RdbError {
    #[error("malformed RDB file: {0}")]
    MalformedFile(String),
    #[error("unsupported value type 0x{0:02X}, only strings are supported")]
    UnsupportedValueType(u8),
    #[error("unsupported encoding 0x{0:02X}")]
    UnsupportedEncoding(u8),
    #[error("truncated data: {needed} bytes needed at offset {offset}, buffer holds {available}")]
    TruncatedData {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("failed to read RDB file: {0}")]
    Io(String),
}
