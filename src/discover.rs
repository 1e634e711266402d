// cantap/src/discover.rs
//
// Serial port discovery for the acquisition device.
//
// This file is part of the Rust 'cantap' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Serial port discovery.
//!
//! The acquisition device shows up as a USB serial port whose product
//! string contains "Serial" on every platform we have seen it on, so
//! discovery is a substring match over the enumerated port descriptions.
//! The first match wins and is opened at 115200 baud with a one second
//! read timeout, the rate and pacing the device firmware expects.

use itertools::Itertools;
use log::{debug, info};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::{fmt, time::Duration};
use thiserror::Error;

/// Marker looked for in port descriptions when locating the device.
pub const DEFAULT_PORT_MARKER: &str = "Serial";

/// Baud rate the acquisition device runs its link at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Bounded wait for a single read from the port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Port discovery error.
#[derive(Error, Debug)]
pub enum DiscoverError {
    /// Enumerating the system's serial ports failed.
    #[error("Cannot enumerate serial ports: {0}")]
    Enumerate(#[from] serialport::Error),
    /// No port description contained the marker.
    #[error("No serial device matching \"{marker}\" found. All ports:{}", port_list(.available))]
    NoMatch {
        /// The marker that was looked for.
        marker: String,
        /// Everything that was enumerated instead.
        available: Vec<PortSummary>,
    },
    /// The port could not be opened.
    #[error("Cannot open {port}: {source}")]
    Open {
        /// Name of the port.
        port: String,
        /// The underlying serial error.
        source: serialport::Error,
    },
}

/// A serial port as enumerated by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    /// System name of the port, e.g. "/dev/ttyUSB0" or "COM3".
    pub name: String,
    /// Human-readable description, the USB product string when there is one.
    pub description: String,
}

impl fmt::Display for PortSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Enumerates every serial port on the system.
pub fn list_ports() -> Result<Vec<PortSummary>, DiscoverError> {
    let ports = serialport::available_ports()?;
    Ok(ports.iter().map(describe).collect())
}

/// Finds the first port whose description contains `marker`.
///
/// The match is a case-sensitive substring test.
pub fn find_port(marker: &str) -> Result<PortSummary, DiscoverError> {
    let mut available = list_ports()?;
    match match_port(&available, marker) {
        Some(i) => Ok(available.swap_remove(i)),
        None => Err(DiscoverError::NoMatch {
            marker: marker.to_string(),
            available,
        }),
    }
}

/// Finds the acquisition device by `marker` and opens it at `baud` with
/// the default read timeout.
pub fn open_port(marker: &str, baud: u32) -> Result<Box<dyn SerialPort>, DiscoverError> {
    let summary = find_port(marker)?;
    debug!("matched {}", summary);
    let port = open_named(&summary.name, baud)?;
    info!("connected to {}", summary);
    Ok(port)
}

/// Opens an explicitly named port, bypassing discovery.
pub fn open_named(port: &str, baud: u32) -> Result<Box<dyn SerialPort>, DiscoverError> {
    serialport::new(port, baud)
        .timeout(DEFAULT_READ_TIMEOUT)
        .open()
        .map_err(|source| DiscoverError::Open {
            port: port.to_string(),
            source,
        })
}

fn describe(port: &SerialPortInfo) -> PortSummary {
    let description = match &port.port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| String::from("USB device")),
        SerialPortType::PciPort => String::from("PCI device"),
        SerialPortType::BluetoothPort => String::from("Bluetooth device"),
        SerialPortType::Unknown => String::from("Unknown device"),
    };
    PortSummary {
        name: port.port_name.clone(),
        description,
    }
}

fn match_port(ports: &[PortSummary], marker: &str) -> Option<usize> {
    ports.iter().position(|p| p.description.contains(marker))
}

fn port_list(ports: &[PortSummary]) -> String {
    if ports.is_empty() {
        return String::from(" (none)");
    }
    format!("\n  {}", ports.iter().join("\n  "))
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    fn summary(name: &str, description: &str) -> PortSummary {
        PortSummary {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_match_first_port() {
        let ports = [
            summary("/dev/ttyS0", "ttyS0"),
            summary("/dev/ttyUSB0", "USB-SERIAL CH340"),
            summary("/dev/ttyACM0", "Arduino Uno Serial"),
            summary("/dev/ttyACM1", "Arduino Mega Serial"),
        ];

        assert_eq!(match_port(&ports, "Serial"), Some(2));
        assert_eq!(match_port(&ports, "SERIAL"), Some(1));
        assert_eq!(match_port(&ports, "Mega"), Some(3));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let ports = [summary("/dev/ttyUSB0", "USB-SERIAL CH340")];
        assert_eq!(match_port(&ports, "Serial"), None);
    }

    #[test]
    fn test_no_match_lists_all_ports() {
        let err = DiscoverError::NoMatch {
            marker: String::from("Serial"),
            available: vec![
                summary("/dev/ttyS0", "ttyS0"),
                summary("/dev/ttyS1", "ttyS1"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"Serial\""));
        assert!(msg.contains("/dev/ttyS0: ttyS0"));
        assert!(msg.contains("/dev/ttyS1: ttyS1"));
    }

    #[test]
    fn test_no_match_with_empty_list() {
        let err = DiscoverError::NoMatch {
            marker: String::from("Serial"),
            available: Vec::new(),
        };
        assert!(err.to_string().ends_with("(none)"));
    }
}
