use super::{Transport, TransportSettings, TrialCounter};
use crate::error::{Error, Result, ValidationError};
use serialport::{ClearBuffer, SerialPort};
use std::convert::TryFrom;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

/// Baud rate the chipKIT firmware runs its FTDI UART at.
pub const SERIAL_BAUD_RATE: u32 = 1_152_000;

/// The pattern the device repeats on the serial link. A chunk of `n` bytes must contain the first
/// `n` letters.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Benchmarks an FTDI-style serial link. Generic over the port so anything readable and writable
/// can stand in for the device.
pub struct SerialTransport<P> {
    port: P,
    settings: TransportSettings,
    counter: TrialCounter,
}

impl SerialTransport<Box<dyn SerialPort>> {
    /// Opens the serial device at `path` and discards anything already waiting in its input
    /// buffer.
    pub fn open<A: AsRef<Path>>(path: A, settings: TransportSettings) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let port = serialport::new(path.as_str(), SERIAL_BAUD_RATE)
            .timeout(settings.timeout)
            .open()?;
        port.clear(ClearBuffer::Input)?;
        debug!("Opened {} at {} baud", path, SERIAL_BAUD_RATE);

        Ok(Self::new(port, settings))
    }
}

impl<P: Read + Write> SerialTransport<P> {
    pub fn new(port: P, settings: TransportSettings) -> Self {
        Self {
            port,
            settings,
            counter: TrialCounter::default(),
        }
    }

    /// The byte sent to the device to select `message_size`: its index on the sweep step, not
    /// the size itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chipkit_bench::{SerialTransport, TransportSettings};
    ///
    /// let transport = SerialTransport::new(std::io::Cursor::new(Vec::new()), TransportSettings::SERIAL);
    /// assert_eq!(transport.size_signal(60).unwrap(), 3);
    /// ```
    pub fn size_signal(&self, message_size: usize) -> Result<u8> {
        let step = self.settings.message_size_step;
        let index = message_size
            .checked_div(step)
            .ok_or(Error::InvalidSweep {
                start: self.settings.starting_message_size,
                end: self.settings.ending_message_size,
                step,
            })?;
        u8::try_from(index).map_err(|_| Error::InvalidMessageSize(message_size))
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }
}

impl<P: Read + Write> Transport for SerialTransport<P> {
    fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    fn counter(&self) -> &TrialCounter {
        &self.counter
    }

    fn counter_mut(&mut self) -> &mut TrialCounter {
        &mut self.counter
    }

    fn signal_message_size(&mut self, message_size: usize) -> Result<()> {
        let signal = self.size_signal(message_size)?;
        self.port.write_all(&[signal])?;
        self.port.flush()?;
        Ok(())
    }

    fn read_chunk(&mut self, message_size: usize) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; message_size];
        let mut filled = 0;

        // A timeout after some data has arrived yields a short chunk
        while filled < message_size {
            match self.port.read(&mut chunk[filled..]) {
                Ok(0) if filled == 0 => return Err(Error::Disconnected),
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut && filled > 0 => break,
                Err(e) => return Err(e.into()),
            }
        }

        chunk.truncate(filled);
        Ok(chunk)
    }

    fn validate(&self, chunk: &[u8]) -> std::result::Result<(), ValidationError> {
        let missing: Vec<char> = ALPHABET
            .iter()
            .take(self.counter.message_size())
            .filter(|&&letter| !chunk.contains(&letter))
            .map(|&letter| char::from(letter))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingCharacters {
                missing,
                line: String::from_utf8_lossy(chunk).into_owned(),
            })
        }
    }
}
