// cantap/src/dump.rs
//
// Implements raw capture log parsing.
//
// This file is part of the Rust 'cantap' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Raw capture log parsing.
//!
//! Parses the CSV logs written by a capture session: a `timestamp,bus,data`
//! header row followed by one line per received frame.
//!
//! Example:
//!
//! ```text
//! timestamp,bus,data
//! 1751721260813,MS,0x50C,3,0x00,0x00,0x00,0x00,0x00,0x00,0x01,0x0C
//! 1751721260815,HS,0x1A0,2,0x00,0x00,0x00,0x00,0x00,0x00,0xFF,0x01
//! ```
//!
//! Each data row is `timestamp,bus,id,length` followed by the eight byte
//! slots `b7` down to `b0`. Lines are parsed by a [`Reader`] object. The
//! API is inspired by the [csv](https://crates.io/crates/csv) crate.

use crate::frame::{RawRecord, CAN_DATA_LEN_MAX};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};
use thiserror::Error;

/// Number of comma-separated fields in a raw capture row.
const RAW_FIELD_COUNT: usize = 4 + CAN_DATA_LEN_MAX;

/// Capture log line parse error
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O Error
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Wrong number of comma-separated fields
    #[error("Expected 12 comma-separated fields, got {0}")]
    FieldCount(usize),
    /// Invalid time stamp
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
    /// Invalid CAN identifier
    #[error("Invalid CAN ID: {0:?}")]
    InvalidCanId(String),
    /// Byte count missing or outside 0 to 8
    #[error("Invalid byte count: {0:?}")]
    InvalidLength(String),
    /// Invalid data byte field
    #[error("Invalid data byte: {0:?}")]
    InvalidDataByte(String),
}

/////////////////////////////////////////////////////////////////////////////
// Reader

#[derive(Debug)]
/// A raw capture log reader.
pub struct Reader<R> {
    // The underlying reader
    rdr: R,
    // The line buffer
    buf: String,
}

impl<R: io::Read> Reader<R> {
    /// Creates an I/O buffered reader from a capture log reader.
    pub fn from_reader(rdr: R) -> Reader<BufReader<R>> {
        Reader {
            rdr: BufReader::new(rdr),
            buf: String::with_capacity(256),
        }
    }
}

impl Reader<File> {
    /// Creates an I/O buffered reader from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Reader<BufReader<File>>> {
        Ok(Reader::from_reader(File::open(path)?))
    }
}

impl<R: BufRead> Reader<R> {
    /// Reads and discards one line, returning the number of bytes consumed.
    ///
    /// Capture logs open with a `timestamp,bus,data` header row that is not
    /// a record; call this once before pulling records.
    pub fn skip_header(&mut self) -> io::Result<usize> {
        self.buf.clear();
        self.rdr.read_line(&mut self.buf)
    }

    /// Advance state, returning next record.
    pub fn next_record(&mut self) -> Result<Option<RawRecord>, ParseError> {
        self.buf.clear();
        let nread = self.rdr.read_line(&mut self.buf)?;

        // reached EOF
        if nread == 0 {
            return Ok(None);
        }

        let line = self.buf[..nread].trim();

        // The final newline of the log is not a record; an empty line
        // followed by more data is malformed like any other short row.
        if line.is_empty() && self.rdr.fill_buf()?.is_empty() {
            return Ok(None);
        }

        parse_record(line).map(Some)
    }
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<RawRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        // lift Option:
        match self.next_record() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////

/// Parses one data row of a capture log.
fn parse_record(line: &str) -> Result<RawRecord, ParseError> {
    let fields: Vec<&str> = line.split(',').collect();

    if fields.len() != RAW_FIELD_COUNT {
        return Err(ParseError::FieldCount(fields.len()));
    }

    let timestamp = fields[0]
        .trim()
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidTimestamp(fields[0].to_string()))?;

    let bus = fields[1].trim().to_string();

    // The identifier keeps its original spelling so case and digits render
    // back exactly; from_str_radix only validates it.
    let id = hex_digits(fields[2])
        .filter(|digits| digits.len() <= 8 && u32::from_str_radix(digits, 16).is_ok())
        .ok_or_else(|| ParseError::InvalidCanId(fields[2].to_string()))?
        .to_string();

    let length = fields[3]
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|n| usize::from(*n) <= CAN_DATA_LEN_MAX)
        .ok_or_else(|| ParseError::InvalidLength(fields[3].to_string()))?;

    let mut bytes: [String; CAN_DATA_LEN_MAX] = Default::default();
    for (slot, field) in bytes.iter_mut().zip(&fields[4..]) {
        *slot = parse_data_byte(field)
            .ok_or_else(|| ParseError::InvalidDataByte(field.to_string()))?;
    }

    Ok(RawRecord {
        timestamp,
        bus,
        id,
        length,
        bytes,
    })
}

/// Strips whitespace and the "0x" prefix from a hex field.
fn hex_digits(field: &str) -> Option<&str> {
    let digits = field.trim().strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    Some(digits)
}

/// Validates a byte-slot field, returning its stripped text.
fn parse_data_byte(field: &str) -> Option<String> {
    let digits = hex_digits(field)?;
    if digits.len() > 2 {
        return None;
    }
    // The stored value is the original text; decoding the zero-padded
    // pair just checks the digits.
    hex::decode(format!("{:0>2}", digits)).ok()?;
    Some(digits.to_string())
}

/////////////////////////////////////////////////////////////////////////////
