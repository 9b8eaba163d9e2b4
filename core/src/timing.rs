//! Rolling loop timing statistics
//!
//! Diagnostics only. Nothing recorded here feeds back into scheduling or
//! rendering decisions.

use std::collections::VecDeque;

/// Number of samples kept per rolling window
pub const TIMING_WINDOW_SIZE: usize = 64;

/// Timestamp and delta for one loop iteration (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub timestamp: f64,
    pub delta_millis: f64,
}

/// Fixed-capacity FIFO window of millisecond samples.
///
/// Once full, each push evicts the oldest sample. Samples are never
/// reordered on access.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample_ms);
    }

    /// Arithmetic mean of the current contents, `None` while empty
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::max)
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(TIMING_WINDOW_SIZE)
    }
}

/// Snapshot of both windows, for logs and the window title
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingSummary {
    pub tick_avg_ms: Option<f64>,
    pub draw_avg_ms: Option<f64>,
    pub last_frame: Option<FrameTiming>,
}

impl std::fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn ms(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| format!("{:.2}ms", v))
        }
        write!(
            f,
            "tick {} | draw {}",
            ms(self.tick_avg_ms),
            ms(self.draw_avg_ms)
        )
    }
}

/// Rolling tick and draw durations
#[derive(Debug, Clone, Default)]
pub struct TimingTracker {
    tick: RollingWindow,
    draw: RollingWindow,
    last_frame: Option<FrameTiming>,
}

impl TimingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how long one tick body took
    pub fn record_tick(&mut self, duration_ms: f64) {
        self.tick.push(duration_ms);
    }

    /// Record how long one draw body took, and the frame it drew
    pub fn record_draw(&mut self, frame: FrameTiming, duration_ms: f64) {
        self.draw.push(duration_ms);
        self.last_frame = Some(frame);
    }

    pub fn tick_window(&self) -> &RollingWindow {
        &self.tick
    }

    pub fn draw_window(&self) -> &RollingWindow {
        &self.draw
    }

    pub fn average_tick_ms(&self) -> Option<f64> {
        self.tick.average()
    }

    pub fn average_draw_ms(&self) -> Option<f64> {
        self.draw.average()
    }

    pub fn last_frame(&self) -> Option<FrameTiming> {
        self.last_frame
    }

    pub fn summary(&self) -> TimingSummary {
        TimingSummary {
            tick_avg_ms: self.average_tick_ms(),
            draw_avg_ms: self.average_draw_ms(),
            last_frame: self.last_frame,
        }
    }
}
