use crate::error::Result;
use crate::transport::Transport;
use tracing::{info, warn};

/// A long-running transfer which can be driven chunk by chunk for progress feedback. Every item
/// is the number of bytes processed so far.
pub trait Operation: Iterator<Item = Result<usize>> {
    fn total(&self) -> usize;

    fn execute(&mut self) -> Result<()> {
        if let Some(Err(error)) = self.last() {
            Err(error)
        } else {
            Ok(())
        }
    }
}

/// Whether a running total moving from `before` to `after` bytes reaches or passes a multiple of
/// `interval`.
pub fn crossed_progress(before: usize, after: usize, interval: usize) -> bool {
    interval > 0 && after / interval > before / interval
}

/// Reads chunks of one message size from a transport until its byte budget is used up. The
/// budget is checked before each read, so the last chunk may overshoot it.
pub struct Trial<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    message_size: usize,
    max_bytes: usize,
    corrupt_chunks: usize,
    progress_reports: usize,
    done: bool,
}

impl<'a, T: Transport + ?Sized> Trial<'a, T> {
    /// Starts a trial on a transport which was already configured for `message_size`.
    pub fn new(transport: &'a mut T, message_size: usize) -> Self {
        let max_bytes = transport.settings().max_bytes;
        Self {
            transport,
            message_size,
            max_bytes,
            corrupt_chunks: 0,
            progress_reports: 0,
            done: false,
        }
    }

    /// Performs the warm-up read. Its bytes count towards the budget like every other chunk, but
    /// it happens before the caller starts timing.
    pub fn prime(&mut self) -> Result<usize> {
        self.read_next()
    }

    pub fn bytes_received(&self) -> usize {
        self.transport.counter().bytes_received()
    }

    /// Number of chunks which failed validation so far.
    pub fn corrupt_chunks(&self) -> usize {
        self.corrupt_chunks
    }

    /// Number of progress messages logged so far.
    pub fn progress_reports(&self) -> usize {
        self.progress_reports
    }

    /// Bytes between two progress messages.
    pub fn progress_interval(&self) -> usize {
        1000 * self.message_size
    }

    fn read_next(&mut self) -> Result<usize> {
        let chunk = match self.transport.read_chunk(self.message_size) {
            Ok(chunk) => chunk,
            Err(error) => {
                // Ensure that the iterator is fused after an error occurs
                self.done = true;
                return Err(error);
            }
        };

        let before = self.bytes_received();
        let after = self.transport.counter_mut().record(chunk.len());

        if crossed_progress(before, after, self.progress_interval()) {
            self.progress_reports += 1;
            info!("Received {} kilobytes so far...", after / 1000);
        }

        if let Err(error) = self.transport.validate(&chunk) {
            self.corrupt_chunks += 1;
            warn!("{}", error);
        }

        Ok(after)
    }
}

impl<T: Transport + ?Sized> Operation for Trial<'_, T> {
    fn total(&self) -> usize {
        self.max_bytes
    }
}

impl<T: Transport + ?Sized> Iterator for Trial<'_, T> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.bytes_received() >= self.max_bytes {
            self.done = true;
            return None;
        }

        Some(self.read_next())
    }
}
