use crate::rdb::{
    get_slice::{get_array, get_buffer_slice, get_byte},
    rdb_error::RdbError,
};

/// What the leading byte(s) of a length-encoded field describe.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum LengthEncoding {
    /// A plain length (or size) value.
    Length(u64),
    /// The field is an integer stored in 1, 2 or 4 little-endian bytes.
    Int8(u8),
    Int16(u16),
    Int32(u32),
}

impl LengthEncoding {
    /// The numeric value carried by the prefix, integers read as unsigned.
    pub fn value(self) -> u64 {
        match self {
            LengthEncoding::Length(value) => value,
            LengthEncoding::Int8(value) => value as u64,
            LengthEncoding::Int16(value) => value as u64,
            LengthEncoding::Int32(value) => value as u64,
        }
    }
}

pub fn parse_length_encoding(
    bytes: &[u8],
    cursor: usize,
) -> Result<(LengthEncoding, usize), RdbError> {
    let mut temp_cursor = cursor;
    let byte = get_byte(bytes, temp_cursor)?;
    temp_cursor += 1;

    // Byte is 8 bits long so to extract the first two bits we shift right by 6
    let first_two_bits = byte >> 6;

    // Use bitmask 0011_1111 to extract the last 6 bits
    let last_six_bits = byte & 0b0011_1111;

    let length_encoding = match first_two_bits {
        0b00 => LengthEncoding::Length(last_six_bits as u64),
        0b01 => {
            let second_byte = get_byte(bytes, temp_cursor)?;
            temp_cursor += 1;

            // The last 6 bits of the first byte are the high bits of a 14-bit length:
            // 0b01_001010, 0b11001100 -> 0b001010_11001100 (2764)
            let length_14_bits = ((last_six_bits as u64) << 8) | second_byte as u64;

            LengthEncoding::Length(length_14_bits)
        }
        0b10 => {
            // from_be_bytes: most significant byte first.
            // [0x01, 0x02, 0x03, 0x04] -> 0x01020304
            if byte == 0x80 {
                let four_bytes: [u8; 4] = get_array(bytes, temp_cursor)?;
                temp_cursor += 4;

                LengthEncoding::Length(u32::from_be_bytes(four_bytes) as u64)
            } else {
                let eight_bytes: [u8; 8] = get_array(bytes, temp_cursor)?;
                temp_cursor += 8;

                LengthEncoding::Length(u64::from_be_bytes(eight_bytes))
            }
        }
        _ => match last_six_bits {
            0 => {
                let value = get_byte(bytes, temp_cursor)?;
                temp_cursor += 1;

                LengthEncoding::Int8(value)
            }
            // from_le_bytes: least significant byte first.
            // [0x01, 0x02, 0x03, 0x04] -> 0x04030201
            1 => {
                let two_bytes: [u8; 2] = get_array(bytes, temp_cursor)?;
                temp_cursor += 2;

                LengthEncoding::Int16(u16::from_le_bytes(two_bytes))
            }
            2 => {
                let four_bytes: [u8; 4] = get_array(bytes, temp_cursor)?;
                temp_cursor += 4;

                LengthEncoding::Int32(u32::from_le_bytes(four_bytes))
            }
            // 3 is an LZF compressed string
            _ => return Err(RdbError::UnsupportedEncoding(byte)),
        },
    };

    let bytes_read = temp_cursor - cursor;

    Ok((length_encoding, bytes_read))
}

/// Decodes a length prefix at `cursor` and returns its value with the bytes consumed.
pub fn decode_length(bytes: &[u8], cursor: usize) -> Result<(u64, usize), RdbError> {
    let (length_encoding, bytes_read) = parse_length_encoding(bytes, cursor)?;

    Ok((length_encoding.value(), bytes_read))
}

/// Decodes a length-prefixed string at `cursor`.
///
/// Strings stored with one of the integer encodings have no payload; their value is the
/// decimal rendering of the (signed) integer.
pub fn decode_string(bytes: &[u8], cursor: usize) -> Result<(String, usize), RdbError> {
    let (length_encoding, prefix_length) = parse_length_encoding(bytes, cursor)?;

    let length = match length_encoding {
        LengthEncoding::Length(length) => length,
        LengthEncoding::Int8(value) => return Ok(((value as i8).to_string(), prefix_length)),
        LengthEncoding::Int16(value) => return Ok(((value as i16).to_string(), prefix_length)),
        LengthEncoding::Int32(value) => return Ok(((value as i32).to_string(), prefix_length)),
    };

    let payload_start = cursor + prefix_length;
    let payload_length = usize::try_from(length).map_err(|_| RdbError::TruncatedData {
        offset: payload_start,
        needed: usize::MAX,
        available: bytes.len(),
    })?;

    let payload = get_buffer_slice(bytes, payload_start, payload_length)?;
    let string = String::from_utf8_lossy(payload).into_owned();

    Ok((string, prefix_length + payload_length))
}
