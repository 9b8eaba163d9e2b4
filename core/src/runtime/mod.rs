//! Dual-rate loop coordination
//!
//! The [`Coordinator`] owns the simulation, the visible canvas and both
//! schedulers. The host event loop feeds it three kinds of callback:
//!
//! - [`Coordinator::on_tick_timer`] when the tick deadline passes
//! - [`Coordinator::on_animation_frame`] once per display refresh
//! - [`Coordinator::handle_input`] for wheel and key events
//!
//! None of these re-enter each other. The draw path never steps the
//! simulation, and a faulting callback is logged and re-armed.

use std::time::Instant;

use crate::camera::{CameraController, InputEvent};
use crate::canvas::Canvas2d;
use crate::compositor::Compositor;
use crate::config::ShellConfig;
use crate::error::{LoopPhase, ShellError};
use crate::simulation::{GameParams, Simulation};
use crate::timing::{FrameTiming, TimingTracker};

mod clock;
mod config;
pub mod headless;
mod scheduler;


pub use clock::SystemClock;
pub use config::RuntimeConfig;
pub use headless::{HeadlessDriver, HeadlessOptions, RunSummary};
pub use scheduler::{
    DrawScheduler, FramePermit, SchedulerState, TickBegin, TickPermit, TickScheduler,
};

/// Timestamps of the last tick and draw (milliseconds, never decreasing)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopState {
    pub last_draw_timestamp: Option<f64>,
    pub last_tick_timestamp: Option<f64>,
    pub tick_step_millis: u32,
}

/// Loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Step invocations, faulted ones included
    pub ticks: u64,
    /// Draw invocations, faulted ones included
    pub draws: u64,
    pub tick_faults: u64,
    pub draw_faults: u64,
    /// Tick slots dropped because the host fired too late
    pub skipped_ticks: u64,
}

/// Result of a tick timer callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ran,
    Faulted,
    NotDue,
    Busy,
    Stopped,
}

/// Result of an animation frame callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOutcome {
    Drawn { delta_ms: f64 },
    Faulted { delta_ms: f64 },
    NotArmed,
}

/// Drives a simulation on a fixed tick cadence and a display-rate draw cadence
pub struct Coordinator<S: Simulation> {
    sim: S,
    config: RuntimeConfig,
    visible: Canvas2d,
    compositor: Compositor,
    camera: CameraController,
    ticks: TickScheduler,
    draws: DrawScheduler,
    state: LoopState,
    timing: TimingTracker,
    stats: LoopStats,
}

impl<S: Simulation> Coordinator<S> {
    /// Initialise the game and arm both loops.
    ///
    /// A rejected `init_game` is fatal. A missing map buffer is reported and
    /// the session continues with overlay draws only.
    pub fn start(config: &ShellConfig, mut sim: S, now_ms: f64) -> Result<Self, ShellError> {
        config.validate()?;

        let params = GameParams::from_config(config);
        sim.init_game(&params)
            .map_err(|e| ShellError::module_unavailable(format!("init_game failed: {:#}", e)))?;

        let width = config.canvas.width;
        let height = config.canvas.height;
        let mut visible = Canvas2d::new(width, height);
        let mut compositor = Compositor::new(width, height);
        if let Err(e) = compositor.bind_map(&mut sim) {
            tracing::error!("map compositing disabled: {}", ShellError::from(e));
        }

        let camera = CameraController::new(&config.camera);
        camera.transform().apply_to(&mut visible);

        let runtime = RuntimeConfig::from_shell(config);
        let mut ticks = TickScheduler::new(runtime.tick_step_ms as f64);
        ticks.arm(now_ms);
        let mut draws = DrawScheduler::new();
        draws.arm();

        tracing::info!(
            "loop started: canvas '{}' {}x{}, tick every {}ms",
            params.canvas_id,
            width,
            height,
            runtime.tick_step_ms
        );

        Ok(Self {
            sim,
            state: LoopState {
                last_draw_timestamp: None,
                last_tick_timestamp: None,
                tick_step_millis: runtime.tick_step_ms,
            },
            config: runtime,
            visible,
            compositor,
            camera,
            ticks,
            draws,
            timing: TimingTracker::new(),
            stats: LoopStats::default(),
        })
    }

    /// Tick timer callback. Steps the simulation at most once.
    pub fn on_tick_timer(&mut self, now_ms: f64) -> TickOutcome {
        let permit = match self.ticks.begin(now_ms) {
            TickBegin::Ready(permit) => permit,
            TickBegin::NotDue => return TickOutcome::NotDue,
            TickBegin::Busy => return TickOutcome::Busy,
            TickBegin::Stopped => return TickOutcome::Stopped,
        };

        let tick_start = Instant::now();
        let result = self.sim.tick();
        let tick_time = tick_start.elapsed();

        self.timing.record_tick(tick_time.as_secs_f64() * 1000.0);
        self.stats.ticks += 1;
        self.state.last_tick_timestamp = Some(
            self.state
                .last_tick_timestamp
                .map_or(now_ms, |last| last.max(now_ms)),
        );

        // Check CPU budget
        if tick_time > self.config.cpu_budget {
            tracing::warn!(
                "Tick took {:?}, exceeds budget of {:?}",
                tick_time,
                self.config.cpu_budget
            );
        }

        let lateness = permit.lateness_ms();
        let dropped = self.ticks.complete(permit);
        if dropped > 0 {
            self.stats.skipped_ticks += dropped;
            tracing::debug!(
                "tick fired {:.1}ms late, dropped {} slot(s)",
                lateness,
                dropped
            );
        }

        match result {
            Ok(()) => TickOutcome::Ran,
            Err(e) => {
                self.stats.tick_faults += 1;
                tracing::warn!("{}", ShellError::fault(LoopPhase::Tick, &e));
                TickOutcome::Faulted
            }
        }
    }

    /// Display refresh callback. Composites one frame, never ticks.
    pub fn on_animation_frame(&mut self, timestamp_ms: f64) -> DrawOutcome {
        let Some(permit) = self.draws.begin() else {
            return DrawOutcome::NotArmed;
        };

        let delta_ms = match self.state.last_draw_timestamp {
            Some(last) => (timestamp_ms - last).max(0.0),
            None => 0.0,
        };
        if timestamp_ms.is_finite() {
            self.state.last_draw_timestamp = Some(
                self.state
                    .last_draw_timestamp
                    .map_or(timestamp_ms, |last| last.max(timestamp_ms)),
            );
        }

        let draw_start = Instant::now();
        let result = self
            .compositor
            .compose(&mut self.sim, &mut self.visible, delta_ms);
        let draw_ms = draw_start.elapsed().as_secs_f64() * 1000.0;

        self.timing.record_draw(
            FrameTiming {
                timestamp: timestamp_ms,
                delta_millis: delta_ms,
            },
            draw_ms,
        );
        self.draws.complete(permit);
        self.stats.draws += 1;

        if self.config.summary_interval > 0 && self.stats.draws % self.config.summary_interval == 0
        {
            tracing::debug!(
                "{} ({} ticks, {} draws)",
                self.timing.summary(),
                self.stats.ticks,
                self.stats.draws
            );
        }

        match result {
            Ok(()) => DrawOutcome::Drawn { delta_ms },
            Err(e) => {
                self.stats.draw_faults += 1;
                tracing::warn!("{}", e);
                DrawOutcome::Faulted { delta_ms }
            }
        }
    }

    /// Apply a camera input. The new transform is on the canvas on return.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        self.camera.handle(event, &mut self.visible)
    }

    /// When the tick timer should fire next, `None` once stopped
    pub fn next_tick_deadline(&self) -> Option<f64> {
        self.ticks.next_deadline()
    }

    /// Whether an animation frame should be requested
    pub fn wants_frame(&self) -> bool {
        self.draws.is_armed()
    }

    pub fn stop_ticks(&mut self) {
        self.ticks.stop();
    }

    pub fn stop_draws(&mut self) {
        self.draws.stop();
    }

    /// Stop both loops
    pub fn stop(&mut self) {
        self.stop_ticks();
        self.stop_draws();
        tracing::info!(
            "loop stopped after {} ticks and {} draws",
            self.stats.ticks,
            self.stats.draws
        );
    }

    pub fn is_running(&self) -> bool {
        self.ticks.state() != SchedulerState::Idle || self.draws.state() != SchedulerState::Idle
    }

    pub fn visible(&self) -> &Canvas2d {
        &self.visible
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn loop_state(&self) -> &LoopState {
        &self.state
    }

    pub fn timing(&self) -> &TimingTracker {
        &self.timing
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn map_enabled(&self) -> bool {
        self.compositor.map_enabled()
    }

    pub fn simulation(&self) -> &S {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Tear down the coordinator and hand the simulation back
    pub fn into_simulation(self) -> S {
        self.sim
    }
}
