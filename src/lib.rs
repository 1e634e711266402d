// cantap/src/lib.rs
//
// Core library for the cantap capture and conversion tools.
//
// This file is part of the Rust 'cantap' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Serial CAN bus capture and SavvyCAN CSV conversion.
//!
//! `cantap` talks to a microcontroller that sits on one or two CAN buses
//! and relays every frame it sees over its USB serial link, one
//! comma-separated line per frame. The crate records those lines into
//! timestamped session logs and batch-converts the logs into the CSV
//! layout SavvyCAN imports (the GVRET format).
//!
//! # The wire format
//!
//! The device emits one line per frame:
//!
//! ```text
//! MS,0x50C,3,0x00,0x00,0x00,0x00,0x00,0x00,0x01,0x0C
//! ```
//!
//! that is `bus,id,length` followed by the eight data byte slots from
//! `b7` down to `b0`, always all eight regardless of `length`. The
//! capture loop prefixes each line with a millisecond timestamp, giving
//! the raw capture schema
//!
//! ```text
//! timestamp,bus,id,length,b7,b6,b5,b4,b3,b2,b1,b0
//! ```
//!
//! which [`dump::Reader`] parses back into [`RawRecord`]s and
//! [`convert::convert_file`] rewrites as
//!
//! ```text
//! Time Stamp,ID,Extended,Bus,LEN,D1,D2,D3,D4,D5,D6,D7,D8
//! 1751721260813,0000050C,false,1,3,0C,01,00
//! ```
//!
//! with the identifier zero-padded to 8 characters, the bus mapped to 1
//! for "MS" and 0 otherwise, and the `length` low-order bytes emitted
//! ascending from `b0`.
//!
//! # Capturing
//!
//! [`discover::open_port`] finds the device by the "Serial" marker in
//! its USB description and opens it at 115200 baud with a one second
//! read timeout. [`capture::CaptureSession`] then runs the read loop,
//! logging and echoing rows until its [`StopSignal`] is raised, which
//! the `cantap` binary wires to Ctrl-C.

pub mod capture;
pub mod convert;
#[cfg(feature = "serial")]
pub mod discover;
pub mod dump;
pub mod frame;

pub use crate::{
    capture::{
        session_log_name, CaptureError, CaptureRecord, CaptureSession, ShouldRetry, StopSignal,
        CAPTURE_HEADER,
    },
    convert::{convert_file, converted_path, ConvertError, GVRET_HEADER},
    frame::{GvretRecord, RawRecord, CAN_DATA_LEN_MAX},
};
#[cfg(feature = "serial")]
pub use crate::discover::{
    list_ports, open_named, open_port, DiscoverError, PortSummary, DEFAULT_BAUD_RATE,
    DEFAULT_PORT_MARKER, DEFAULT_READ_TIMEOUT,
};
