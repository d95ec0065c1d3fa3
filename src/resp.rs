//! Redis Serialization Protocol (RESP) codec.
//!
//! Decoding is line oriented: the input is split on `\r\n` and the first character of a
//! line selects the value type. Encoding only covers the value types the server builds
//! replies and replication traffic from (simple strings, bulk strings and arrays);
//! errors, integers and null values are written by callers as literal sentinels.

use thiserror::Error;

/// Reply sent for a missing key or an unknown configuration parameter.
pub const NULL_BULK_STRING: &str = "$-1\r\n";

const LINE_TERMINATOR: &str = "\r\n";

#[derive(Error, Debug, PartialEq, Clone)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("missing RESP data type")]
    MissingDataType,
    #[error("unknown RESP data type '{0}'")]
    UnknownDataType(char),
    #[error("found RESP data type '{0}' but no data")]
    MissingPayload(char),
    #[error("invalid integer")]
    InvalidInteger,
    #[error("invalid array length")]
    InvalidArrayLength,
    #[error("nested arrays are not supported")]
    NestedArrayUnsupported,
    #[error("incomplete message")]
    Incomplete,
    #[error("{0} values cannot be encoded")]
    UnsupportedEncoding(&'static str),
}

impl RespError {
    pub fn as_string(&self) -> String {
        format!("-ERR Protocol error: {}\r\n", self)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    NullBulkString,
    Array(Vec<RespValue>),
    NullArray,
}

/// Splits raw protocol text into lines. A trailing terminator does not produce an
/// empty line, but an empty bulk string payload in the middle of the input does.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_terminator(LINE_TERMINATOR).collect()
}

impl RespValue {
    /// Decodes exactly one message from the start of `input`.
    ///
    /// Anything after the first complete message is ignored.
    pub fn decode(input: &[u8]) -> Result<RespValue, RespError> {
        let text = std::str::from_utf8(input).map_err(|_| RespError::InvalidUtf8)?;
        let lines = split_lines(text);

        let (value, _) = Self::decode_lines(&lines, 0)?;

        Ok(value)
    }

    /// Decodes the complete messages at the start of `text`, in arrival order.
    ///
    /// Returns the outcomes together with the number of bytes consumed. A message cut
    /// short at the end of `text` is left unconsumed for a later call. A malformed message
    /// ends the outcomes with its error and consumes everything, since nothing after it
    /// can be framed.
    pub fn decode_all(text: &str) -> (Vec<Result<RespValue, RespError>>, usize) {
        let complete_text = match text.rfind(LINE_TERMINATOR) {
            Some(position) => &text[..position + LINE_TERMINATOR.len()],
            None => return (Vec::new(), 0),
        };

        let lines = split_lines(complete_text);
        let mut outcomes = Vec::new();
        let mut index = 0;
        let mut consumed_bytes = 0;

        while index < lines.len() {
            match Self::decode_lines(&lines, index) {
                Ok((value, consumed_lines)) => {
                    consumed_bytes += lines[index..index + consumed_lines]
                        .iter()
                        .map(|line| line.len() + LINE_TERMINATOR.len())
                        .sum::<usize>();
                    index += consumed_lines;
                    outcomes.push(Ok(value));
                }
                Err(RespError::Incomplete) => break,
                Err(e) => {
                    outcomes.push(Err(e));
                    consumed_bytes = text.len();
                    break;
                }
            }
        }

        (outcomes, consumed_bytes)
    }

    /// Decodes the message starting at `lines[index]` and returns it together with the
    /// number of lines it occupied.
    fn decode_lines(lines: &[&str], index: usize) -> Result<(RespValue, usize), RespError> {
        let line = lines.get(index).ok_or(RespError::Incomplete)?;
        let tag = line.chars().next().ok_or(RespError::MissingDataType)?;
        let payload = &line[tag.len_utf8()..];

        match tag {
            '+' | '-' => {
                if payload.is_empty() {
                    return Err(RespError::MissingPayload(tag));
                }

                let value = if tag == '+' {
                    RespValue::SimpleString(payload.to_string())
                } else {
                    RespValue::Error(payload.to_string())
                };

                Ok((value, 1))
            }
            ':' => {
                let value = payload
                    .parse::<i64>()
                    .map_err(|_| RespError::InvalidInteger)?;

                Ok((RespValue::Integer(value), 1))
            }
            '$' => {
                if payload == "-1" {
                    return Ok((RespValue::NullBulkString, 1));
                }

                // The declared length is not compared with the payload.
                let content = lines.get(index + 1).ok_or(RespError::Incomplete)?;

                Ok((RespValue::BulkString(content.to_string()), 2))
            }
            '*' => {
                if payload == "-1" {
                    return Ok((RespValue::NullArray, 1));
                }

                let declared_count = payload
                    .parse::<usize>()
                    .map_err(|_| RespError::InvalidArrayLength)?;

                let mut elements = Vec::with_capacity(declared_count);
                let mut cursor = index + 1;

                while elements.len() < declared_count {
                    let next_line = lines.get(cursor).ok_or(RespError::Incomplete)?;

                    if next_line.starts_with('*') {
                        return Err(RespError::NestedArrayUnsupported);
                    }

                    let (element, consumed_lines) = Self::decode_lines(lines, cursor)?;
                    elements.push(element);
                    cursor += consumed_lines;
                }

                Ok((RespValue::Array(elements), cursor - index))
            }
            other => Err(RespError::UnknownDataType(other)),
        }
    }

    /// Encodes simple strings, bulk strings and arrays of those.
    pub fn encode(&self) -> Result<String, RespError> {
        match self {
            RespValue::SimpleString(s) => Ok(format!("+{}\r\n", s)),
            RespValue::BulkString(s) => Ok(format!("${}\r\n{}\r\n", s.len(), s)),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());

                for element in elements {
                    encoded.push_str(&element.encode()?);
                }

                Ok(encoded)
            }
            RespValue::Error(_) => Err(RespError::UnsupportedEncoding("error")),
            RespValue::Integer(_) => Err(RespError::UnsupportedEncoding("integer")),
            RespValue::NullBulkString => Err(RespError::UnsupportedEncoding("null bulk string")),
            RespValue::NullArray => Err(RespError::UnsupportedEncoding("null array")),
        }
    }

    /// Builds a command array out of bulk strings, e.g. `["REPLCONF", "capa", "psync2"]`.
    pub fn command(parts: &[&str]) -> RespValue {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(part.to_string()))
                .collect(),
        )
    }
}
