// cantap/src/capture.rs
//
// Implements the live capture session and its read loop.
//
// This file is part of the Rust 'cantap' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Live capture sessions.
//!
//! A [`CaptureSession`] owns an open port and the session's log file and
//! pumps lines from one to the other: each line the device sends is
//! stamped with the wall clock in milliseconds and appended as a
//! `timestamp,payload` CSV row.
//!
//! The port is expected to be configured with a read timeout (discovery
//! opens it that way), which makes the loop's single blocking point
//! bounded: every iteration performs one read that returns within the
//! timeout, handles whatever arrived, then polls the [`StopSignal`]. The
//! operator never waits longer than one timeout plus one poll for a
//! cancellation to take effect.

use chrono::{DateTime, Local};
use log::{info, warn};
use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

/// Header row of a capture log.
pub const CAPTURE_HEADER: &str = "timestamp,bus,data";

/// Errors terminating a capture session.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Reading the port or writing the log failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The port reported end of stream; the device went away.
    #[error("Serial port closed by the device")]
    Disconnected,
}

/// Check an error return value for timeouts.
///
/// The port is opened with a read timeout, so a read that sees no traffic
/// in time reports an error rather than blocking forever. This trait adds
/// a `should_retry` method to `Error` and `Result` to check for this
/// condition.
pub trait ShouldRetry {
    /// Check for timeout
    ///
    /// If `true`, the error is probably due to a timeout.
    fn should_retry(&self) -> bool;
}

impl ShouldRetry for io::Error {
    fn should_retry(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
        )
    }
}

impl<E: fmt::Debug> ShouldRetry for io::Result<E> {
    fn should_retry(&self) -> bool {
        match *self {
            Err(ref e) => e.should_retry(),
            _ => false,
        }
    }
}

/// Cooperative cancellation polled by the capture loop.
pub trait StopSignal {
    /// Whether the operator has requested a stop.
    fn is_raised(&self) -> bool;
}

impl StopSignal for AtomicBool {
    fn is_raised(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl StopSignal for Arc<AtomicBool> {
    fn is_raised(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// One row of a capture log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// Milliseconds since the Unix epoch, sampled as the line arrived.
    pub timestamp: u64,
    /// The device's line with surrounding whitespace stripped.
    pub payload: String,
}

impl fmt::Display for CaptureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.timestamp, self.payload)
    }
}

/////////////////////////////////////////////////////////////////////////////
// CaptureSession

/// A live capture: an open port and the session's log file.
///
/// The session owns both handles for its lifetime and flushes the log on
/// every way out of [`run`](Self::run). Generic over the reader and
/// writer so tests can drive the loop from scripted sources.
#[derive(Debug)]
pub struct CaptureSession<R, W> {
    port: R,
    out: W,
    // Bytes received but not yet newline-terminated.
    pending: Vec<u8>,
    rows: u64,
}

impl<R: Read, W: Write> CaptureSession<R, W> {
    /// Starts a session over an open port, writing the log header.
    pub fn new(port: R, mut out: W) -> io::Result<Self> {
        writeln!(out, "{}", CAPTURE_HEADER)?;
        Ok(Self {
            port,
            out,
            pending: Vec::with_capacity(256),
            rows: 0,
        })
    }

    /// Runs the capture loop until `stop` is raised or the port fails.
    ///
    /// Each iteration performs one bounded read, appends a row for every
    /// complete non-empty line the read delivered, echoes those rows to
    /// the operator, then polls `stop`. Returns the number of rows
    /// written. A partial line still pending when the loop stops is
    /// discarded, never written.
    pub fn run<S: StopSignal>(&mut self, stop: &S) -> Result<u64, CaptureError> {
        let mut chunk = [0u8; 256];
        info!("capture started");

        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => {
                    self.out.flush().ok(); // keep the disconnect error
                    return Err(CaptureError::Disconnected);
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    self.drain_lines()?;
                }
                // A timeout just means the bus was quiet this interval.
                Err(ref e) if e.should_retry() => {}
                Err(e) => {
                    self.out.flush().ok(); // keep the read error
                    return Err(e.into());
                }
            }

            if stop.is_raised() {
                break;
            }
        }

        if !self.pending.is_empty() {
            warn!("discarding {} bytes of partial line", self.pending.len());
        }
        self.out.flush()?;
        info!("capture stopped after {} rows", self.rows);
        Ok(self.rows)
    }

    // Writes and echoes every complete line sitting in the pending buffer.
    fn drain_lines(&mut self) -> io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let payload = String::from_utf8_lossy(&line);
            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }

            let record = CaptureRecord {
                timestamp: epoch_millis(),
                payload: payload.to_string(),
            };
            writeln!(self.out, "{}", record)?;
            println!("{}", record);
            self.rows += 1;
        }
        Ok(())
    }
}

impl<R: Read> CaptureSession<R, BufWriter<File>> {
    /// Starts a session logging to a new file at `path`.
    ///
    /// The file must not already exist; a session never appends to or
    /// resumes an earlier log.
    pub fn create<P: AsRef<Path>>(port: R, path: P) -> io::Result<Self> {
        let file = File::options().write(true).create_new(true).open(path)?;
        Self::new(port, BufWriter::new(file))
    }
}

/////////////////////////////////////////////////////////////////////////////

/// File name for a capture session started at `time`, e.g.
/// `log_2025_07_05-14_34_20.csv`.
pub fn session_log_name(time: DateTime<Local>) -> String {
    time.format("log_%Y_%m_%d-%H_%M_%S.csv").to_string()
}

/// Current wall clock time in integer milliseconds since the Unix epoch.
fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/////////////////////////////////////////////////////////////////////////////
