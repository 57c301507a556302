//! Log file format, parsed with nom
//!
//! File layout:
//! ```text
//! VLOG001\n
//! [4 bytes: format version u32 little-endian]
//! ...records...
//! ```
//!
//! Record layout (little-endian):
//! ```text
//! [op: u8][key_len: u32][value_len: u32][key bytes][value bytes]
//! ```
//!
//! A delete record carries an empty value and shadows every earlier put of
//! the same key.

use nom::{
    bytes::complete::{tag, take},
    error::ErrorKind,
    number::complete::{le_u32, le_u8},
    IResult,
};

use crate::error::{Error, Result};

/// Magic header for log files
pub const LOG_MAGIC: &[u8] = b"VLOG001\n";

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Length of the file header in bytes
pub const HEADER_LEN: usize = LOG_MAGIC.len() + 4;

/// Length of the fixed part of a record (op + two lengths)
pub const RECORD_PREFIX_LEN: usize = 1 + 4 + 4;

/// Operation stored in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Key now maps to the record's value
    Put,
    /// Key is removed
    Delete,
}

impl RecordKind {
    fn op(self) -> u8 {
        match self {
            RecordKind::Put => 1,
            RecordKind::Delete => 2,
        }
    }

    fn from_op(op: u8) -> Option<Self> {
        match op {
            1 => Some(RecordKind::Put),
            2 => Some(RecordKind::Delete),
            _ => None,
        }
    }
}

/// A record borrowed from the log bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    /// Put or delete
    pub kind: RecordKind,
    /// Raw key bytes (UTF-8 for records written by this crate)
    pub key: &'a [u8],
    /// Raw value bytes, empty for deletes
    pub value: &'a [u8],
}

impl Record<'_> {
    /// Encoded size of this record in bytes
    pub fn encoded_len(&self) -> usize {
        RECORD_PREFIX_LEN + self.key.len() + self.value.len()
    }
}

fn header(input: &[u8]) -> IResult<&[u8], u32> {
    let (input, _) = tag(LOG_MAGIC)(input)?;
    le_u32(input)
}

/// Parse and validate the log file header, returning the format version
pub fn parse_header(input: &[u8]) -> Result<u32> {
    if input.len() < HEADER_LEN {
        return Err(Error::Parse("Input too short for header".to_string()));
    }

    let (_, version) = header(input)?;
    if version != FORMAT_VERSION {
        return Err(Error::Parse(format!(
            "Unsupported log format version {}",
            version
        )));
    }

    Ok(version)
}

/// Create a log file header
pub fn create_header() -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(LOG_MAGIC);
    header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    header
}

/// Parse a single record
///
/// A truncated record yields `nom::Err::Error`; an unknown op byte yields
/// `nom::Err::Failure`.
pub fn parse_record(input: &[u8]) -> IResult<&[u8], Record<'_>> {
    let (rest, op) = le_u8(input)?;
    let kind = RecordKind::from_op(op)
        .ok_or_else(|| nom::Err::Failure(nom::error::Error::new(input, ErrorKind::Tag)))?;
    let (rest, key_len) = le_u32(rest)?;
    let (rest, value_len) = le_u32(rest)?;
    let (rest, key) = take(key_len)(rest)?;
    let (rest, value) = take(value_len)(rest)?;

    Ok((rest, Record { kind, key, value }))
}

/// Encode a record into bytes ready to append
pub fn encode_record(kind: RecordKind, key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_PREFIX_LEN + key.len() + value.len());
    buf.push(kind.op());
    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    buf
}
