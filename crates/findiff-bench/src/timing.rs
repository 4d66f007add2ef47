//! Wall-clock timing of kernel repetitions.

use std::time::{Duration, Instant};

/// Accumulating stopwatch.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or resume) timing. Has no effect while running.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Stop timing and add the interval to the total.
    pub fn stop(&mut self) -> Duration {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
        self.elapsed
    }

    /// Total time measured so far, including a running interval.
    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.elapsed + started.elapsed(),
            None => self.elapsed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.elapsed = Duration::ZERO;
    }
}

/// Effective bandwidth in GB/s of `repetitions` kernels that each read and
/// write `bytes`.
pub fn bandwidth_gbps(bytes: usize, repetitions: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    2.0 * bytes as f64 * repetitions as f64 / secs / 1e9
}
