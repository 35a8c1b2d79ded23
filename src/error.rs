use std::io;
use std::result::Result as StdResult;
use thiserror::Error;

/// Errors which abort a benchmark run. None of them are retried: a failing read ends the whole
/// sweep.
#[derive(Debug, Error)]
pub enum Error {
    /// No USB device with the requested vendor ID is connected.
    #[error("couldn't find a USB device from vendor {vendor_id:#06x}")]
    DeviceNotFound { vendor_id: u16 },

    /// No data arrived within the transport's read timeout.
    #[error("timed out waiting for data from the device")]
    Timeout,

    /// The device went away in the middle of a transfer.
    #[error("device disconnected")]
    Disconnected,

    /// The message size cannot be used with this transport (zero, or not representable in the
    /// transport's size signal).
    #[error("invalid message size: {0} bytes")]
    InvalidMessageSize(usize),

    /// The message size sweep is empty or has a zero step.
    #[error("invalid message size sweep {start}..={end} step {step}")]
    InvalidSweep {
        start: usize,
        end: usize,
        step: usize,
    },

    /// An error occurred during the raw USB communication.
    #[error("USB error: {0}")]
    Usb(rusb::Error),

    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An error occurred while reading from or writing to the serial port.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<rusb::Error> for Error {
    fn from(error: rusb::Error) -> Self {
        match error {
            rusb::Error::Timeout => Error::Timeout,
            rusb::Error::NoDevice => Error::Disconnected,
            error => Error::Usb(error),
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut => Error::Timeout,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof => Error::Disconnected,
            _ => Error::Io(error),
        }
    }
}

/// Corruption found in a received chunk. These are reported and counted, but never stop a
/// trial.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ValidationError {
    /// Letters of the expected alphabet pattern are absent from a serial chunk.
    #[error("corruption detected, missing {missing:?} in line: {line}")]
    MissingCharacters { missing: Vec<char>, line: String },

    /// A USB chunk did not decode as a JSON object.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// A USB record lacks one of its required fields.
    #[error("record is missing the `{0}` field")]
    MissingField(&'static str),
}

/// Shorthand for a Result with the crate's own Error type.
pub type Result<T> = StdResult<T, Error>;
