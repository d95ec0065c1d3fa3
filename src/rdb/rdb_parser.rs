use std::collections::HashMap;

use jiff::Timestamp;
use tracing::warn;

use crate::rdb::{
    encoding::{decode_length, decode_string},
    get_slice::get_byte,
    opcode::{
        parse_expiration, parse_metadata, validate, DATABASE_OPCODE, END_OF_FILE_OPCODE,
        HEADER_LENGTH, STRING_VALUE_TYPE,
    },
    rdb_error::RdbError,
};

#[derive(Debug, PartialEq, Clone)]
pub struct Entry {
    pub value: String,
    /// Epoch milliseconds.
    pub expire_at_millis: Option<u64>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Database {
    pub index: u64,
    pub declared_key_count: u64,
    pub declared_expiring_key_count: u64,
    pub entries: HashMap<String, Entry>,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Snapshot {
    pub version: String,
    pub metadata: HashMap<String, String>,
    pub databases: Vec<Database>,
}

/// Decodes an in-memory RDB dump.
///
/// Databases and entries are appended to `snapshot` as they are decoded, so when
/// [`RdbParser::parse`] fails the records read before the failure are still there.
#[derive(Debug)]
pub struct RdbParser<'a> {
    bytes: &'a [u8],
    cursor: usize,
    now_millis: u64,
    pub snapshot: Snapshot,
}

impl<'a> RdbParser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        let now_millis = Timestamp::now().as_millisecond().max(0) as u64;

        Self::with_current_time(bytes, now_millis)
    }

    /// Creates a parser that treats `now_millis` as the current wall-clock time when
    /// dropping expired records.
    pub fn with_current_time(bytes: &'a [u8], now_millis: u64) -> Self {
        Self {
            bytes,
            cursor: 0,
            now_millis,
            snapshot: Snapshot::default(),
        }
    }

    pub fn parse(&mut self) -> Result<(), RdbError> {
        self.snapshot.version = validate(self.bytes)?;
        self.cursor = self.skip_metadata();

        while self.current_byte() == Some(DATABASE_OPCODE) {
            self.parse_database()?;
        }

        Ok(())
    }

    /// Collects the metadata records and returns the cursor of the database section.
    ///
    /// Metadata that cannot be decoded is skipped up to the first database opcode.
    fn skip_metadata(&mut self) -> usize {
        let metadata = &mut self.snapshot.metadata;

        let search_from = match parse_metadata(self.bytes, HEADER_LENGTH, metadata) {
            Ok(cursor)
                if matches!(
                    self.bytes.get(cursor),
                    Some(&DATABASE_OPCODE) | Some(&END_OF_FILE_OPCODE)
                ) =>
            {
                return cursor;
            }
            Ok(cursor) => {
                warn!(offset = cursor, "unknown opcode before the database section");
                cursor
            }
            Err(e) => {
                warn!(error = %e, "skipping undecodable metadata");
                HEADER_LENGTH
            }
        };

        self.bytes[search_from..]
            .iter()
            .position(|&byte| byte == DATABASE_OPCODE)
            .map_or(self.bytes.len(), |position| search_from + position)
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    fn current_byte(&self) -> Option<u8> {
        self.bytes.get(self.cursor).copied()
    }

    fn parse_database(&mut self) -> Result<(), RdbError> {
        // Database opcode
        self.cursor += 1;

        let (index, bytes_read) = decode_length(self.bytes, self.cursor)?;
        self.cursor += bytes_read;

        // Resize db opcode
        get_byte(self.bytes, self.cursor)?;
        self.cursor += 1;

        let (declared_key_count, bytes_read) = decode_length(self.bytes, self.cursor)?;
        self.cursor += bytes_read;
        let (declared_expiring_key_count, bytes_read) = decode_length(self.bytes, self.cursor)?;
        self.cursor += bytes_read;

        self.snapshot.databases.push(Database {
            index,
            declared_key_count,
            declared_expiring_key_count,
            entries: HashMap::new(),
        });

        while let Some(byte) = self.current_byte() {
            if byte == DATABASE_OPCODE || byte == END_OF_FILE_OPCODE {
                break;
            }

            self.parse_record()?;
        }

        Ok(())
    }

    fn parse_record(&mut self) -> Result<(), RdbError> {
        let mut expire_at_millis = None;

        if let Some((expiration, bytes_read)) = parse_expiration(self.bytes, self.cursor)? {
            expire_at_millis = Some(expiration);
            self.cursor += bytes_read;
        }

        let value_type = get_byte(self.bytes, self.cursor)?;

        if value_type != STRING_VALUE_TYPE {
            return Err(RdbError::UnsupportedValueType(value_type));
        }

        self.cursor += 1;

        let (key, bytes_read) = decode_string(self.bytes, self.cursor)?;
        self.cursor += bytes_read;
        let (value, bytes_read) = decode_string(self.bytes, self.cursor)?;
        self.cursor += bytes_read;

        if let Some(expiration) = expire_at_millis {
            if expiration <= self.now_millis {
                return Ok(());
            }
        }

        if let Some(database) = self.snapshot.databases.last_mut() {
            database.entries.insert(
                key,
                Entry {
                    value,
                    expire_at_millis,
                },
            );
        }

        Ok(())
    }
}

/// Decodes a whole dump, discarding partial results on failure.
pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot, RdbError> {
    let mut rdb_parser = RdbParser::new(bytes);
    rdb_parser.parse()?;

    Ok(rdb_parser.into_snapshot())
}
