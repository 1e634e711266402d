// cantap/src/bin/cantap.rs

//! Command line tool to capture CAN traffic from a serial acquisition
//! device and convert the capture logs to the SavvyCAN CSV format.

use anyhow::{anyhow, Context, Result};
use cantap::{
    capture::{session_log_name, CaptureSession},
    convert::convert_file,
    discover,
};
use chrono::Local;
use clap::{arg, value_parser, ArgMatches, Command};
use env_logger::Env;
use std::{
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

// Make the app version the same as the package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// --------------------------------------------------------------------------

/// Process the 'capture' subcommand.
///
/// Open the device, then log frames until Ctrl-C.
fn capture_cmd(opts: &ArgMatches) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler = Arc::clone(&stop);
    ctrlc::set_handler(move || handler.store(true, Ordering::Relaxed))?;

    let baud = opts
        .get_one::<u32>("baud")
        .copied()
        .unwrap_or(discover::DEFAULT_BAUD_RATE);

    let port = match opts.get_one::<String>("port") {
        Some(name) => discover::open_named(name, baud)?,
        None => {
            let marker = opts.get_one::<String>("marker").unwrap();
            discover::open_port(marker, baud)?
        }
    };

    let path = match opts.get_one::<String>("out") {
        Some(path) => path.clone(),
        None => session_log_name(Local::now()),
    };

    let mut session = CaptureSession::create(port, &path)
        .with_context(|| format!("cannot create log file {}", path))?;

    println!("Logging to {} (Ctrl-C to stop)", path);
    let rows = session.run(&stop)?;
    println!("Captured {} frames to {}", rows, path);
    Ok(())
}

/// Process the 'convert' subcommand.
fn convert_cmd(opts: &ArgMatches) -> Result<()> {
    let input = opts.get_one::<String>("file").unwrap();
    let output = convert_file(input)?;
    println!("Wrote {}", output.display());
    Ok(())
}

/// Process the 'ports' subcommand.
fn ports_cmd() -> Result<()> {
    let ports = discover::list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

// --------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let opts = Command::new("cantap")
        .version(VERSION)
        .about("Capture CAN bus traffic from a serial acquisition device")
        .subcommand_required(true)
        .subcommand(
            Command::new("capture")
                .about("Log frames from the device to a session file")
                .arg(arg!(-p --port [PORT] "Serial port to open, bypassing discovery"))
                .arg(
                    arg!(-m --marker [MARKER] "Substring that identifies the device's port")
                        .default_value(discover::DEFAULT_PORT_MARKER),
                )
                .arg(
                    arg!(-b --baud [RATE] "Baud rate (default 115200)")
                        .value_parser(value_parser!(u32)),
                )
                .arg(arg!(-o --out [FILE] "Log file path (default: timestamped name)")),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert a raw capture file to SavvyCAN CSV")
                .arg(arg!(<file> "The raw capture file")),
        )
        .subcommand(Command::new("ports").about("List the system's serial ports"))
        .get_matches();

    let res = match opts.subcommand() {
        Some(("capture", sub_opts)) => capture_cmd(sub_opts),
        Some(("convert", sub_opts)) => convert_cmd(sub_opts),
        Some(("ports", _)) => ports_cmd(),
        _ => Err(anyhow!("Need to specify a subcommand (--help for help).")),
    };

    if let Err(err) = res {
        eprintln!("{}", err);
        process::exit(1);
    }
}
