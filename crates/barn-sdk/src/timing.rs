//! Stopwatch for phase timing in progress output.
//!
//! ```
//! use barn_sdk::timing::{Stopwatch, human_readable_duration};
//! use std::time::Duration;
//!
//! let mut stopwatch = Stopwatch::start();
//! let _pre_build = stopwatch.split();
//! let _schemes = stopwatch.split();
//! assert!(stopwatch.total() >= Duration::ZERO);
//!
//! assert_eq!(human_readable_duration(Duration::from_secs(95)), "1m 35s");
//! ```

use std::time::{Duration, Instant};

/// Measures the time between consecutive phases and since the start.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    started: Instant,
    last_split: Instant,
}

impl Stopwatch {
    /// Starts a new stopwatch.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_split: now,
        }
    }

    /// Returns the time since the previous split (or the start) and records a new split.
    pub fn split(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_split);
        self.last_split = now;
        elapsed
    }

    /// Returns the time since the stopwatch was started.
    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

/// Formats a duration as `"42s"` or `"3m 7s"`.
///
/// Partial seconds round up, so a phase that ran at all never reports `0s`
/// unless it took no measurable time.
pub fn human_readable_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let secs = millis.div_ceil(1000);
    if secs < 60 {
        return format!("{secs}s");
    }
    format!("{}m {}s", secs / 60, secs % 60)
}
