use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Snapshot of a transfer after a chunk was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    pub chunk_index: u64,
    pub final_index: u64,
    pub bytes_received: u64,
    pub bytes_per_second: f64,
}

impl TransferProgress {
    /// Chunks still expected after the current one.
    pub fn remaining(&self) -> u64 {
        self.final_index.saturating_sub(self.chunk_index)
    }

    /// Share of chunks received, 0-100.
    pub fn percent(&self) -> f64 {
        (self.chunk_index + 1) as f64 / (self.final_index + 1) as f64 * 100.0
    }
}

/// Callback invoked with transfer progress.
pub type ProgressCallback = Box<dyn Fn(&TransferProgress) + Send + Sync>;

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
const MAX_SAMPLES: usize = 100;

/// Transfer rate over a sliding window of recent samples.
///
/// Owned by a single transfer loop.
#[derive(Debug)]
pub struct SpeedCalculator {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SpeedCalculator {
    pub fn new(window: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window,
        }
    }

    /// Records `bytes` received now.
    pub fn add_sample(&mut self, bytes: u64) {
        self.record(Instant::now(), bytes);
    }

    fn record(&mut self, at: Instant, bytes: u64) {
        self.samples.push_back((at, bytes));
        if let Some(cutoff) = at.checked_sub(self.window) {
            while self.samples.front().is_some_and(|(t, _)| *t < cutoff) {
                self.samples.pop_front();
            }
        }
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
    }

    /// Average bytes per second across the window; 0.0 with fewer than two
    /// samples.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some((first, _)), Some((last, _))) = (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        let elapsed = last.duration_since(*first);
        if elapsed.is_zero() {
            return 0.0;
        }
        let total: u64 = self.samples.iter().map(|(_, bytes)| bytes).sum();
        total as f64 / elapsed.as_secs_f64()
    }
}
