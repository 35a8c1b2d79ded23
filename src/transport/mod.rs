//! The transport abstraction shared by the serial and USB benchmarks.
//!
//! A [`Transport`] only knows how to tell the device about a new message size, how to read one
//! chunk and how to check a chunk for corruption. Everything else about a trial (priming, timing,
//! byte budget) lives in the [`BenchmarkRunner`], so both transports are measured by exactly the
//! same loop.
//!
//! [`Transport`]: trait.Transport.html
//! [`BenchmarkRunner`]: ../struct.BenchmarkRunner.html

mod serial;
mod usb;

pub use serial::{SerialTransport, ALPHABET, SERIAL_BAUD_RATE};
pub use usb::{BulkRead, UsbTransport, DATA_ENDPOINT};

use crate::error::{Error, Result, ValidationError};
use std::time::Duration;

/// Per-transport benchmark constants, fixed when the transport is constructed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransportSettings {
    /// Number of bytes to read for every message size.
    pub max_bytes: usize,

    /// First message size of the sweep.
    pub starting_message_size: usize,

    /// Last message size of the sweep (inclusive, only reached if it is on a step).
    pub ending_message_size: usize,

    /// Distance between two message sizes of the sweep.
    pub message_size_step: usize,

    /// How long a single read may block before the run is aborted.
    pub timeout: Duration,
}

impl TransportSettings {
    /// Settings for the FTDI serial link.
    pub const SERIAL: TransportSettings = TransportSettings {
        max_bytes: 10 * 1000 * 10 * 5,
        starting_message_size: 20,
        ending_message_size: 100,
        message_size_step: 20,
        timeout: Duration::from_secs(10),
    };

    /// Settings for the USB bulk endpoint.
    pub const USB: TransportSettings = TransportSettings {
        max_bytes: 10 * 1000 * 100,
        starting_message_size: 64,
        ending_message_size: 1024,
        message_size_step: 128,
        timeout: Duration::from_secs(1),
    };

    /// Replaces the byte budget per message size.
    pub fn with_max_bytes(self, max_bytes: usize) -> Self {
        Self { max_bytes, ..self }
    }

    /// Replaces the message size sweep. Fails if the range is empty or the step is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chipkit_bench::TransportSettings;
    ///
    /// let settings = TransportSettings::USB.with_sweep(64, 192, 64).unwrap();
    /// assert_eq!(settings.message_sizes().collect::<Vec<_>>(), vec![64, 128, 192]);
    /// assert!(TransportSettings::USB.with_sweep(64, 192, 0).is_err());
    /// ```
    pub fn with_sweep(self, start: usize, end: usize, step: usize) -> Result<Self> {
        if step == 0 || start == 0 || start > end {
            return Err(Error::InvalidSweep { start, end, step });
        }

        Ok(Self {
            starting_message_size: start,
            ending_message_size: end,
            message_size_step: step,
            ..self
        })
    }

    /// Replaces the read timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// All message sizes of the sweep, in ascending order.
    pub fn message_sizes(&self) -> impl Iterator<Item = usize> {
        (self.starting_message_size..=self.ending_message_size)
            .step_by(self.message_size_step.max(1))
    }

    /// Number of trials a full sweep consists of.
    pub fn trial_count(&self) -> usize {
        if self.message_size_step == 0 || self.starting_message_size > self.ending_message_size {
            return 0;
        }
        (self.ending_message_size - self.starting_message_size) / self.message_size_step + 1
    }
}

/// Bookkeeping for the trial in progress: the active message size and the bytes received since
/// it was selected.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct TrialCounter {
    message_size: usize,
    bytes_received: usize,
}

impl TrialCounter {
    /// Starts counting for a new message size.
    pub fn reset(&mut self, message_size: usize) {
        self.message_size = message_size;
        self.bytes_received = 0;
    }

    /// Adds a received chunk and returns the new total.
    pub fn record(&mut self, length: usize) -> usize {
        self.bytes_received += length;
        self.bytes_received
    }

    pub fn message_size(&self) -> usize {
        self.message_size
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }
}

/// One physical channel to the benchmark device.
pub trait Transport {
    /// The constants this transport was constructed with.
    fn settings(&self) -> &TransportSettings;

    fn counter(&self) -> &TrialCounter;

    fn counter_mut(&mut self) -> &mut TrialCounter;

    /// Tells the device which message size to send from now on. Transports whose framing is
    /// driven by the read size alone do nothing here.
    fn signal_message_size(&mut self, message_size: usize) -> Result<()>;

    /// Blocks until up to `message_size` bytes have been read. Fails with [`Error::Timeout`] if
    /// nothing arrives within the configured timeout.
    ///
    /// [`Error::Timeout`]: ../enum.Error.html#variant.Timeout
    fn read_chunk(&mut self, message_size: usize) -> Result<Vec<u8>>;

    /// Checks a received chunk for corruption.
    fn validate(&self, chunk: &[u8]) -> std::result::Result<(), ValidationError>;

    /// Switches to a new message size and resets the byte counter.
    fn configure(&mut self, message_size: usize) -> Result<()> {
        if message_size == 0 {
            return Err(Error::InvalidMessageSize(message_size));
        }
        self.signal_message_size(message_size)?;
        self.counter_mut().reset(message_size);
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn settings(&self) -> &TransportSettings {
        (**self).settings()
    }

    fn counter(&self) -> &TrialCounter {
        (**self).counter()
    }

    fn counter_mut(&mut self) -> &mut TrialCounter {
        (**self).counter_mut()
    }

    fn signal_message_size(&mut self, message_size: usize) -> Result<()> {
        (**self).signal_message_size(message_size)
    }

    fn read_chunk(&mut self, message_size: usize) -> Result<Vec<u8>> {
        (**self).read_chunk(message_size)
    }

    fn validate(&self, chunk: &[u8]) -> std::result::Result<(), ValidationError> {
        (**self).validate(chunk)
    }

    fn configure(&mut self, message_size: usize) -> Result<()> {
        (**self).configure(message_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(TransportSettings::SERIAL, &[20, 40, 60, 80, 100]; "serial")]
    #[test_case(TransportSettings::USB, &[64, 192, 320, 448, 576, 704, 832, 960]; "usb")]
    fn sweep_covers_configured_range(settings: TransportSettings, expected: &[usize]) {
        let sizes: Vec<usize> = settings.message_sizes().collect();
        assert_eq!(sizes, expected);
        assert_eq!(settings.trial_count(), expected.len());
    }

    #[test]
    fn custom_sweep_has_no_gaps() {
        let settings = TransportSettings::USB.with_sweep(64, 192, 64).unwrap();
        assert_eq!(settings.trial_count(), 3);
        assert_eq!(
            settings.message_sizes().collect::<Vec<_>>(),
            vec![64, 128, 192]
        );
    }

    #[test_case(64, 192, 0; "zero step")]
    #[test_case(192, 64, 64; "reversed range")]
    #[test_case(0, 64, 64; "zero start")]
    fn invalid_sweeps_are_rejected(start: usize, end: usize, step: usize) {
        assert!(matches!(
            TransportSettings::SERIAL.with_sweep(start, end, step),
            Err(Error::InvalidSweep { .. })
        ));
    }

    #[test]
    fn builders_only_touch_their_field() {
        let settings = TransportSettings::SERIAL
            .with_timeout(Duration::from_millis(500))
            .with_max_bytes(2000);
        assert_eq!(settings.timeout, Duration::from_millis(500));
        assert_eq!(settings.max_bytes, 2000);
        assert_eq!(
            settings.message_sizes().collect::<Vec<_>>(),
            TransportSettings::SERIAL.message_sizes().collect::<Vec<_>>()
        );
    }

    #[test]
    fn counter_resets_per_message_size() {
        let mut counter = TrialCounter::default();
        counter.reset(64);
        assert_eq!(counter.record(30), 30);
        assert_eq!(counter.record(34), 64);
        counter.reset(128);
        assert_eq!(counter.message_size(), 128);
        assert_eq!(counter.bytes_received(), 0);
    }
}
