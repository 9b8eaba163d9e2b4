//! Self-rearming tick and draw schedulers
//!
//! Both schedulers cycle `Idle -> Armed -> Running -> Armed`. Starting a
//! body hands out a permit that can't be cloned; the body has to give the
//! permit back through `complete` before the next one is issued, so a
//! second step can never start while one is outstanding.

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not scheduled; a stop has taken effect or nothing was armed yet
    Idle,
    /// Waiting for the next deadline or frame
    Armed,
    /// A body holds the permit
    Running,
}

/// Proof that a tick body may run
#[must_use = "return the permit with TickScheduler::complete"]
#[derive(Debug)]
pub struct TickPermit {
    due_ms: f64,
    started_ms: f64,
}

impl TickPermit {
    /// When this tick was scheduled for
    pub fn due_ms(&self) -> f64 {
        self.due_ms
    }

    /// When the body was let in
    pub fn started_ms(&self) -> f64 {
        self.started_ms
    }

    /// How far behind schedule the body started
    pub fn lateness_ms(&self) -> f64 {
        (self.started_ms - self.due_ms).max(0.0)
    }
}

/// Answer to [`TickScheduler::begin`]
#[derive(Debug)]
pub enum TickBegin {
    Ready(TickPermit),
    NotDue,
    Busy,
    Stopped,
}

/// Fixed-period tick timer
#[derive(Debug, Clone)]
pub struct TickScheduler {
    period_ms: f64,
    state: SchedulerState,
    next_due_ms: Option<f64>,
    stop_requested: bool,
    skipped: u64,
}

impl TickScheduler {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms,
            state: SchedulerState::Idle,
            next_due_ms: None,
            stop_requested: false,
            skipped: 0,
        }
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Schedule the first tick one period after `now_ms`. No-op unless idle.
    pub fn arm(&mut self, now_ms: f64) {
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Armed;
            self.next_due_ms = Some(now_ms + self.period_ms);
            self.stop_requested = false;
        }
    }

    /// Deadline of the next tick, `None` unless armed
    pub fn next_deadline(&self) -> Option<f64> {
        match self.state {
            SchedulerState::Armed => self.next_due_ms,
            _ => None,
        }
    }

    pub fn begin(&mut self, now_ms: f64) -> TickBegin {
        match self.state {
            SchedulerState::Idle => TickBegin::Stopped,
            SchedulerState::Running => TickBegin::Busy,
            SchedulerState::Armed => match self.next_due_ms {
                Some(due_ms) if now_ms >= due_ms => {
                    self.state = SchedulerState::Running;
                    TickBegin::Ready(TickPermit {
                        due_ms,
                        started_ms: now_ms,
                    })
                }
                _ => TickBegin::NotDue,
            },
        }
    }

    /// Finish a tick and re-arm.
    ///
    /// The next deadline is one period after the slot that just ran. If
    /// that's already in the past the missed slots are dropped, not run
    /// back-to-back, and the timer restarts one period from the body's start.
    /// Returns the number of slots dropped.
    pub fn complete(&mut self, permit: TickPermit) -> u64 {
        if self.stop_requested {
            self.halt();
            return 0;
        }

        let now_ms = permit.started_ms;
        let mut next = permit.due_ms + self.period_ms;
        let mut dropped = 0;
        if next < now_ms {
            dropped = ((now_ms - permit.due_ms) / self.period_ms).floor() as u64;
            next = now_ms + self.period_ms;
        }

        self.skipped += dropped;
        self.next_due_ms = Some(next);
        self.state = SchedulerState::Armed;
        dropped
    }

    /// Withhold the next re-arm. Takes effect at once unless a body is running.
    pub fn stop(&mut self) {
        match self.state {
            SchedulerState::Running => self.stop_requested = true,
            _ => self.halt(),
        }
    }

    /// Total slots dropped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn halt(&mut self) {
        self.state = SchedulerState::Idle;
        self.next_due_ms = None;
        self.stop_requested = false;
    }
}

/// Proof that a draw body may run
#[must_use = "return the permit with DrawScheduler::complete"]
#[derive(Debug)]
pub struct FramePermit {
    _private: (),
}

/// Display-rate draw scheduler
#[derive(Debug, Clone)]
pub struct DrawScheduler {
    state: SchedulerState,
    stop_requested: bool,
}

impl Default for DrawScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            stop_requested: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn arm(&mut self) {
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Armed;
            self.stop_requested = false;
        }
    }

    /// Whether a frame callback is pending
    pub fn is_armed(&self) -> bool {
        self.state == SchedulerState::Armed
    }

    pub fn begin(&mut self) -> Option<FramePermit> {
        if self.state != SchedulerState::Armed {
            return None;
        }
        self.state = SchedulerState::Running;
        Some(FramePermit { _private: () })
    }

    pub fn complete(&mut self, permit: FramePermit) {
        let FramePermit { _private: () } = permit;
        self.state = if self.stop_requested {
            SchedulerState::Idle
        } else {
            SchedulerState::Armed
        };
        self.stop_requested = false;
    }

    pub fn stop(&mut self) {
        match self.state {
            SchedulerState::Running => self.stop_requested = true,
            _ => {
                self.state = SchedulerState::Idle;
                self.stop_requested = false;
            }
        }
    }
}
