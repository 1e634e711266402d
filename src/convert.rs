// cantap/src/convert.rs
//
// Batch conversion of raw capture logs to the SavvyCAN CSV format.
//
// This file is part of the Rust 'cantap' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Batch conversion of raw capture logs.
//!
//! [`convert_file`] rewrites a raw capture file into the CSV layout that
//! SavvyCAN imports, writing the result next to the input with a `conv_`
//! name prefix. The first input line is always treated as a header and
//! discarded; the first malformed data row aborts the run.

use crate::{
    dump::{ParseError, Reader},
    frame::GvretRecord,
};
use log::{debug, info};
use std::{
    ffi::OsString,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Header row of the converted (SavvyCAN import) schema.
pub const GVRET_HEADER: &str = "Time Stamp,ID,Extended,Bus,LEN,D1,D2,D3,D4,D5,D6,D7,D8";

/// Conversion pipeline error.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The input file could not be opened.
    #[error("Cannot open {}: {source}", .path.display())]
    Open {
        /// The input path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// The output file could not be created.
    #[error("Cannot create {}: {source}", .path.display())]
    Create {
        /// The output path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// Reading or writing failed mid-run.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A data row failed to parse, aborting the run.
    #[error("Line {line}: {source}")]
    Record {
        /// 1-based data row number, not counting the header.
        line: u64,
        /// What was wrong with the row.
        source: ParseError,
    },
}

/// Output path for a converted capture: the input's file name prefixed
/// with `conv_`, in the same directory.
pub fn converted_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let mut name = OsString::from("conv_");
    if let Some(base) = input.file_name() {
        name.push(base);
    }
    input.with_file_name(name)
}

/// Converts a raw capture file into a SavvyCAN CSV file alongside it.
///
/// Returns the path of the file written. Rows convert in input order; on
/// a malformed row the run aborts with that row's number and whatever was
/// already converted remains in the output file.
pub fn convert_file<P: AsRef<Path>>(input: P) -> Result<PathBuf, ConvertError> {
    let input = input.as_ref();
    let output = converted_path(input);

    let mut reader = Reader::from_file(input).map_err(|source| ConvertError::Open {
        path: input.to_path_buf(),
        source,
    })?;
    reader.skip_header()?;

    let file = File::create(&output).map_err(|source| ConvertError::Create {
        path: output.clone(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", GVRET_HEADER)?;

    debug!("converting {} to {}", input.display(), output.display());

    let mut rows = 0u64;
    loop {
        match reader.next_record() {
            Ok(Some(rec)) => {
                writeln!(out, "{}", GvretRecord::from(&rec))?;
                rows += 1;
            }
            Ok(None) => break,
            Err(source) => {
                out.flush().ok(); // keep the parse error
                return Err(ConvertError::Record {
                    line: rows + 1,
                    source,
                });
            }
        }
    }
    out.flush()?;

    info!("converted {} rows to {}", rows, output.display());
    Ok(output)
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_converted_path() {
        assert_eq!(
            converted_path("session1.csv"),
            PathBuf::from("conv_session1.csv")
        );
        assert_eq!(
            converted_path("/tmp/captures/log_2025.csv"),
            PathBuf::from("/tmp/captures/conv_log_2025.csv")
        );
    }
}
