//! Contains data structures for the results a benchmark reports back.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Throughput in KB/s per message size, collected over a sweep.
pub type ResultSet = HashMap<usize, f64>;

/// Outcome of a single trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    /// Message size the trial ran with.
    pub message_size: usize,

    /// Bytes received, including the priming read.
    pub bytes_received: usize,

    /// Number of chunks which failed validation.
    pub corrupt_chunks: usize,

    /// Time taken by the timed part of the trial.
    pub elapsed: Duration,

    /// Effective throughput in KB/s.
    pub throughput: f64,
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Reading {} KB in {} byte chunks took {:?}",
            self.bytes_received / 1000,
            self.message_size,
            self.elapsed
        )?;
        if self.corrupt_chunks > 0 {
            writeln!(f, "{} chunks were corrupted", self.corrupt_chunks)?;
        }
        write!(
            f,
            "The effective throughput for {} byte messages is {} KB/s",
            self.message_size, self.throughput as u64
        )
    }
}

/// Renders one line per message size, in ascending order of message size.
///
/// # Examples
///
/// ```rust
/// use chipkit_bench::{render, ResultSet};
///
/// let mut results = ResultSet::new();
/// results.insert(128, 870.5);
/// results.insert(64, 512.0);
/// assert_eq!(
///     render(&results),
///     vec!["64 byte messages -> 512 KB/s", "128 byte messages -> 870 KB/s"]
/// );
/// ```
pub fn render(results: &ResultSet) -> Vec<String> {
    let mut rows: Vec<(usize, f64)> = results.iter().map(|(&size, &kbps)| (size, kbps)).collect();
    rows.sort_by_key(|&(size, _)| size);
    rows.into_iter()
        .map(|(size, kbps)| format!("{} byte messages -> {} KB/s", size, kbps as u64))
        .collect()
}

/// Displays a [`ResultSet`] as the final summary table.
///
/// [`ResultSet`]: type.ResultSet.html
pub struct Summary<'a>(pub &'a ResultSet);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in render(self.0) {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
