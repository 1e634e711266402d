//! End-to-end tests of the capture-to-CSV pipeline, using real files.

use cantap::{
    capture::{CaptureError, CaptureSession},
    convert::{convert_file, ConvertError},
    dump::ParseError,
    GVRET_HEADER,
};
use std::{fs, io::Cursor, sync::atomic::AtomicBool};

const RAW_CAPTURE: &str = "\
timestamp,bus,data
1751721260813,MS,0x50C,3,0x00,0x00,0x00,0x00,0x00,0x00,0x01,0x0C
1751721260815,HS,0x1A0,0,0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00
1751721260817,MS,0x2F4,8,0x11,0x22,0x33,0x44,0x55,0x66,0x77,0x88
";

#[test]
fn test_full_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("session1.csv");
    fs::write(&input, RAW_CAPTURE).unwrap();

    let output = convert_file(&input).unwrap();
    assert_eq!(output, dir.path().join("conv_session1.csv"));

    let expected = "\
Time Stamp,ID,Extended,Bus,LEN,D1,D2,D3,D4,D5,D6,D7,D8
1751721260813,0000050C,false,1,3,0C,01,00
1751721260815,000001A0,false,0,0
1751721260817,000002F4,false,1,8,88,77,66,55,44,33,22,11
";
    assert_eq!(fs::read_to_string(output).unwrap(), expected);
}

#[test]
fn test_malformed_row_aborts() {
    let raw = "\
timestamp,bus,data
1751721260813,MS,0x50C,0,0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00
1751721260815,HS,0x1A0,0,0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00
1751721260817,MS,50C,0,0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00
1751721260819,MS,0x50C,0,0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00
";
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.csv");
    fs::write(&input, raw).unwrap();

    let err = convert_file(&input).unwrap_err();
    match err {
        ConvertError::Record { line, source } => {
            assert_eq!(line, 3);
            assert!(matches!(source, ParseError::InvalidCanId(_)));
        }
        other => panic!("expected Record error, got {}", other),
    }

    // rows converted before the bad one stay in the output
    let written = fs::read_to_string(dir.path().join("conv_bad.csv")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], GVRET_HEADER);
    assert!(lines[1].starts_with("1751721260813,"));
    assert!(lines[2].starts_with("1751721260815,"));
}

#[test]
fn test_header_only_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.csv");
    fs::write(&input, "timestamp,bus,data\n").unwrap();

    let output = convert_file(&input).unwrap();
    assert_eq!(
        fs::read_to_string(output).unwrap(),
        format!("{}\n", GVRET_HEADER)
    );
}

#[test]
fn test_zero_byte_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("nothing.csv");
    fs::write(&input, "").unwrap();

    let output = convert_file(&input).unwrap();
    assert_eq!(
        fs::read_to_string(output).unwrap(),
        format!("{}\n", GVRET_HEADER)
    );
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert_file(dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, ConvertError::Open { .. }));
}

/// A session log written by the capture loop is itself valid converter
/// input: the chain device -> log -> SavvyCAN CSV holds together.
#[test]
fn test_capture_log_feeds_converter() {
    let device: &[u8] = b"MS,0x50C,3,0x00,0x00,0x00,0x00,0x00,0x00,0x01,0x0C\n\
                          HS,0x1A0,0,0x00,0x00,0x00,0x00,0x00,0x00,0x00,0x00\n";

    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log_2025_07_05-14_34_20.csv");

    let mut session = CaptureSession::create(Cursor::new(device), &log).unwrap();
    let stop = AtomicBool::new(false);

    // the cursor runs dry, which reads as a device disconnect
    let err = session.run(&stop).unwrap_err();
    assert!(matches!(err, CaptureError::Disconnected));
    drop(session);

    let output = convert_file(&log).unwrap();
    let written = fs::read_to_string(output).unwrap();
    let lines: Vec<&str> = written.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], GVRET_HEADER);
    assert!(lines[1].ends_with(",0000050C,false,1,3,0C,01,00"));
    assert!(lines[2].ends_with(",000001A0,false,0,0"));
}
