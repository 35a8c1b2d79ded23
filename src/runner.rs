use crate::error::Result;
use crate::operation::{Operation, Trial};
use crate::report::{ResultSet, TrialReport};
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::info;

/// Shortest duration a trial is assumed to take when computing its throughput.
pub const MIN_ELAPSED_SECONDS: f64 = 1.0;

/// The elapsed time of a trial in seconds, floored at [`MIN_ELAPSED_SECONDS`].
///
/// [`MIN_ELAPSED_SECONDS`]: constant.MIN_ELAPSED_SECONDS.html
pub fn elapsed_seconds(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64().max(MIN_ELAPSED_SECONDS)
}

/// Throughput in KB/s: whole kilobytes received divided by the (floored) elapsed seconds.
///
/// # Examples
///
/// ```rust
/// use chipkit_bench::throughput;
/// use std::time::Duration;
///
/// assert_eq!(throughput(500_000, Duration::from_secs(2)), 250.0);
/// // Sub-second trials are treated as if they took one second
/// assert_eq!(throughput(500_000, Duration::from_millis(10)), 500.0);
/// ```
pub fn throughput(bytes_received: usize, elapsed: Duration) -> f64 {
    (bytes_received / 1000) as f64 / elapsed_seconds(elapsed)
}

/// Runs trials against a single transport, which it owns for the whole benchmark.
pub struct BenchmarkRunner<T: Transport> {
    transport: T,
}

impl<T: Transport> BenchmarkRunner<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Measures the throughput for one message size.
    pub fn run_benchmark(&mut self, message_size: usize) -> Result<TrialReport> {
        self.transport.configure(message_size)?;
        info!("Message size switched to {} bytes", message_size);

        let mut trial = Trial::new(&mut self.transport, message_size);
        trial.prime()?;

        let started = Instant::now();
        trial.execute()?;
        let elapsed = started.elapsed();
        info!("Finished receiving.");

        let bytes_received = trial.bytes_received();
        let report = TrialReport {
            message_size,
            bytes_received,
            corrupt_chunks: trial.corrupt_chunks(),
            elapsed,
            throughput: throughput(bytes_received, elapsed),
        };
        info!("{}", report);
        Ok(report)
    }

    /// Runs one trial per message size of the transport's sweep. The first failing trial aborts
    /// the sweep.
    pub fn sweep(&mut self) -> Result<ResultSet> {
        let settings = *self.transport.settings();
        info!(
            "Sweeping {} message sizes from {} to {} bytes",
            settings.trial_count(),
            settings.starting_message_size,
            settings.ending_message_size
        );

        let mut results = ResultSet::with_capacity(settings.trial_count());
        for message_size in settings.message_sizes() {
            let report = self.run_benchmark(message_size)?;
            results.insert(message_size, report.throughput);
        }
        Ok(results)
    }
}
