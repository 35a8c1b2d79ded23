//! This crate measures how fast a chipKIT board can stream data to the host, either over a USB
//! bulk endpoint or over its FTDI serial link.
//!
//! A benchmark sweeps a range of message sizes. For every size it reads a fixed byte budget from
//! the device, checks each chunk for corruption and reports the effective throughput.
//!
//! # Example: USB sweep
//! ```rust, no_run
//! use chipkit_bench::{BenchmarkRunner, Context, Summary, TransportSettings, DEFAULT_VENDOR_ID};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Find the board and claim its data endpoint
//! let context = Context::new()?;
//! let transport = context.open_usb(DEFAULT_VENDOR_ID, TransportSettings::USB)?;
//!
//! // Run one trial per message size
//! let mut runner = BenchmarkRunner::new(transport);
//! let results = runner.sweep()?;
//!
//! print!("{}", Summary(&results));
//! # Ok(())
//! # }
//! ```
//!
//! The serial benchmark works the same way, starting from [`SerialTransport::open`]. Single
//! trials can be driven chunk by chunk for progress feedback, see the [`Operation`] trait.
//!
//! [`SerialTransport::open`]: struct.SerialTransport.html#method.open
//! [`Operation`]: trait.Operation.html

extern crate rusb;
extern crate serde_json;
extern crate serialport;

mod context;
mod error;
mod operation;
mod report;
mod runner;
mod transport;

pub use context::{Context, DeviceInfo, UsbContext, DEFAULT_VENDOR_ID};
pub use error::{Error, Result, ValidationError};
pub use operation::{Operation, Trial};
pub use report::{render, ResultSet, Summary, TrialReport};
pub use runner::{elapsed_seconds, throughput, BenchmarkRunner, MIN_ELAPSED_SECONDS};
pub use transport::{
    BulkRead, SerialTransport, Transport, TransportSettings, TrialCounter, UsbTransport,
    ALPHABET, DATA_ENDPOINT, SERIAL_BAUD_RATE,
};
