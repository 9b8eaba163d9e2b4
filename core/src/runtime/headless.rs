//! Windowless loop driver
//!
//! Plays the role of the host event loop without a display: tick deadlines
//! come from the coordinator, animation frames arrive on a fixed refresh
//! interval, and scripted inputs fire at their given offsets. Time is
//! virtual unless `realtime` is set, in which case the driver sleeps until
//! each event is due.

use crate::camera::InputEvent;
use crate::simulation::Simulation;

use super::{Coordinator, SystemClock, TickOutcome};

#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// How long to run, measured from the start time
    pub duration_ms: f64,
    /// Animation frames per second
    pub refresh_hz: u32,
    /// Sleep between events instead of jumping straight to them
    pub realtime: bool,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            duration_ms: 1000.0,
            refresh_hz: 60,
            realtime: false,
        }
    }
}

/// What happened during a headless run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub draws: u64,
    pub inputs: u64,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Tick,
    Input,
    Frame,
}

pub struct HeadlessDriver {
    options: HeadlessOptions,
    inputs: Vec<(f64, InputEvent)>,
}

impl HeadlessDriver {
    pub fn new(options: HeadlessOptions) -> Self {
        Self {
            options,
            inputs: Vec::new(),
        }
    }

    /// Queue inputs at millisecond offsets from the start time
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = (f64, InputEvent)>) -> Self {
        self.inputs.extend(inputs);
        self.inputs.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }

    pub fn options(&self) -> &HeadlessOptions {
        &self.options
    }

    /// Run until the duration is spent or both loops have stopped.
    ///
    /// `idle` runs after every dispatched event; the player polls the
    /// network there. Events due at the same instant dispatch ticks first,
    /// then inputs, then frames. An event due exactly at the end still runs.
    pub fn run<S, F>(
        &self,
        coordinator: &mut Coordinator<S>,
        start_ms: f64,
        mut idle: F,
    ) -> RunSummary
    where
        S: Simulation,
        F: FnMut(&mut Coordinator<S>),
    {
        let mut summary = RunSummary::default();
        if !self.options.duration_ms.is_finite() || self.options.duration_ms < 0.0 {
            tracing::warn!(
                "headless duration {} ms is not a usable length, nothing to run",
                self.options.duration_ms
            );
            return summary;
        }

        let end_ms = start_ms + self.options.duration_ms;
        let interval_ms = 1000.0 / self.options.refresh_hz.max(1) as f64;
        let mut frame_index: u64 = 1;
        let mut next_input = 0usize;
        let mut now_ms = start_ms;
        let clock = SystemClock::new();

        loop {
            let tick_at = coordinator.next_tick_deadline();
            let input_at = self.inputs.get(next_input).map(|(at, _)| start_ms + at);
            let frame_at = coordinator
                .wants_frame()
                .then(|| start_ms + frame_index as f64 * interval_ms);

            let next = [
                tick_at.map(|at| (at, Event::Tick)),
                input_at.map(|at| (at, Event::Input)),
                frame_at.map(|at| (at, Event::Frame)),
            ]
            .into_iter()
            .flatten()
            // min_by keeps the first of equal elements, so array order breaks ties
            .min_by(|a, b| a.0.total_cmp(&b.0));

            let Some((at, event)) = next else {
                tracing::debug!("headless run ended early: both loops stopped");
                break;
            };
            if at > end_ms {
                break;
            }

            now_ms = now_ms.max(at);
            if self.options.realtime {
                clock.sleep_until(now_ms - start_ms);
            }

            match event {
                Event::Tick => match coordinator.on_tick_timer(now_ms) {
                    TickOutcome::Ran | TickOutcome::Faulted => summary.ticks += 1,
                    _ => {}
                },
                Event::Input => {
                    let (_, input) = self.inputs[next_input];
                    coordinator.handle_input(input);
                    next_input += 1;
                    summary.inputs += 1;
                }
                Event::Frame => {
                    coordinator.on_animation_frame(now_ms);
                    frame_index += 1;
                    summary.draws += 1;
                }
            }

            idle(coordinator);
        }

        summary.elapsed_ms = now_ms - start_ms;
        summary
    }
}
