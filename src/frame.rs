// cantap/src/frame.rs
//
// Frame record types for the raw capture and converted CSV schemas.
//
// This file is part of the Rust 'cantap' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN frame records.
//!
//! Two record types mirror the two CSV schemas the tools handle:
//!
//! - [`RawRecord`] is one line of a raw capture: the frame exactly as the
//!   acquisition device reported it, plus the capture timestamp.
//! - [`GvretRecord`] is one line of the converted schema that SavvyCAN
//!   imports.
//!
//! Field values stay text end to end. The conversion reorders and pads
//! what the device sent but never re-encodes it, so hex digit case and
//! exact byte spellings survive into the converted file.

use itertools::Itertools;
use std::fmt;

/// Maximum number of data bytes in a classic CAN frame.
pub const CAN_DATA_LEN_MAX: usize = 8;

/// A raw capture row: `timestamp,bus,id,length,b7,...,b0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Bus token as reported by the device, e.g. "MS" or "HS".
    pub bus: String,
    /// Hex digits of the CAN identifier, "0x" prefix stripped, case
    /// preserved, no padding.
    pub id: String,
    /// Declared data byte count, 0 to 8.
    pub length: u8,
    /// The eight byte-slot fields in wire order: `bytes[0]` is `b7` and
    /// `bytes[7]` is `b0`, each stripped of "0x" and whitespace. Slots
    /// past `length` are present on the wire but carry no frame data.
    pub bytes: [String; CAN_DATA_LEN_MAX],
}

impl RawRecord {
    /// The declared data bytes in ascending order `b0, b1, ...`.
    pub fn data(&self) -> impl Iterator<Item = &str> + '_ {
        self.bytes
            .iter()
            .rev()
            .take(usize::from(self.length))
            .map(String::as_str)
    }
}

impl fmt::Display for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},0x{},{},{}",
            self.timestamp,
            self.bus,
            self.id,
            self.length,
            self.bytes.iter().map(|b| format!("0x{}", b)).join(",")
        )
    }
}

/// A converted row: `timestamp,id,extended,bus,length,data...`.
///
/// `Display` renders the exact CSV row, with columns past `length`
/// omitted rather than left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GvretRecord {
    /// Capture time, passed through from the raw row.
    pub timestamp: u64,
    /// CAN identifier, exactly 8 hex characters, left-padded with '0'.
    pub id: String,
    /// Whether the identifier is 29-bit extended. The device only
    /// reports standard identifiers, so this is always `false`.
    pub extended: bool,
    /// 1 for the "MS" bus, 0 for anything else.
    pub bus: u8,
    /// Declared data byte count, passed through.
    pub length: u8,
    /// The data bytes low-order first: `data[0]` is the raw row's `b0`.
    pub data: Vec<String>,
}

impl From<&RawRecord> for GvretRecord {
    /// Converts a raw capture row into the SavvyCAN import schema.
    fn from(raw: &RawRecord) -> Self {
        Self {
            timestamp: raw.timestamp,
            id: format!("{:0>8}", raw.id),
            extended: false,
            bus: u8::from(raw.bus == "MS"),
            length: raw.length,
            data: raw.data().map(String::from).collect(),
        }
    }
}

impl fmt::Display for GvretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.timestamp, self.id, self.extended, self.bus, self.length
        )?;
        if self.data.is_empty() {
            Ok(())
        } else {
            write!(f, ",{}", self.data.iter().join(","))
        }
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    fn raw(bus: &str, id: &str, length: u8, bytes: [&str; 8]) -> RawRecord {
        RawRecord {
            timestamp: 1751721260813,
            bus: bus.to_string(),
            id: id.to_string(),
            length,
            bytes: bytes.map(String::from),
        }
    }

    #[test]
    fn test_convert_example() {
        let rec = raw("MS", "50C", 3, ["00", "00", "00", "00", "00", "00", "01", "0C"]);
        let conv = GvretRecord::from(&rec);

        assert_eq!(conv.timestamp, 1751721260813);
        assert_eq!(conv.id, "0000050C");
        assert!(!conv.extended);
        assert_eq!(conv.bus, 1);
        assert_eq!(conv.length, 3);
        assert_eq!(conv.data, vec!["0C", "01", "00"]);
        assert_eq!(conv.to_string(), "1751721260813,0000050C,false,1,3,0C,01,00");
    }

    #[test]
    fn test_bus_token() {
        for (token, code) in [("MS", 1), ("HS", 0), ("ms", 0), ("", 0), ("MSX", 0)] {
            let rec = raw(token, "1", 0, [""; 8]);
            assert_eq!(GvretRecord::from(&rec).bus, code, "token {:?}", token);
        }
    }

    #[test]
    fn test_id_padding() {
        let cases = [
            ("50C", "0000050C"),
            ("0", "00000000"),
            ("abcDEF", "00abcDEF"),
            ("12345678", "12345678"),
        ];
        for (id, padded) in cases {
            let rec = raw("HS", id, 0, [""; 8]);
            assert_eq!(GvretRecord::from(&rec).id, padded);
        }
    }

    #[test]
    fn test_data_truncation() {
        let bytes = ["B7", "B6", "B5", "B4", "B3", "B2", "B1", "B0"];
        for length in 0..=8u8 {
            let rec = raw("HS", "1A0", length, bytes);
            let conv = GvretRecord::from(&rec);
            assert_eq!(conv.data.len(), usize::from(length));
            for (i, byte) in conv.data.iter().enumerate() {
                assert_eq!(byte, &format!("B{}", i));
            }
        }
    }

    #[test]
    fn test_zero_length_row() {
        let rec = raw("HS", "1A0", 0, ["00"; 8]);
        let conv = GvretRecord::from(&rec);
        assert!(conv.data.is_empty());
        assert_eq!(conv.to_string(), "1751721260813,000001A0,false,0,0");
    }

    #[test]
    fn test_byte_case_preserved() {
        let rec = raw("MS", "50C", 2, ["00", "00", "00", "00", "00", "00", "fF", "0c"]);
        let conv = GvretRecord::from(&rec);
        assert_eq!(conv.data, vec!["0c", "fF"]);
    }

    #[test]
    fn test_raw_display_round_trip() {
        let rec = raw("MS", "50C", 3, ["00", "00", "00", "00", "00", "00", "01", "0C"]);
        assert_eq!(
            rec.to_string(),
            "1751721260813,MS,0x50C,3,0x00,0x00,0x00,0x00,0x00,0x00,0x01,0x0C"
        );
    }
}
