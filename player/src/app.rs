//! Windowed player on the winit event loop
//!
//! One loop carries both cadences. `about_to_wait` fires due ticks and sleeps
//! until the next deadline; `RedrawRequested` is the animation frame and is
//! paced by the presenter's vsync.

use std::sync::Arc;

use anyhow::Result;
use paintwar_core::{
    Coordinator, DrawOutcome, InputEvent, Key, NetLink, ShellConfig, SimulationHandle,
    SystemClock,
};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::graphics::CanvasPresenter;

/// Pixels per wheel line, matching what browsers report for one notch
const LINE_DELTA_PX: f32 = 100.0;

/// Draws between title refreshes
const TITLE_INTERVAL: u64 = 30;

pub(crate) fn run(config: ShellConfig, sim: SimulationHandle, net: Option<NetLink>) -> Result<()> {
    let clock = SystemClock::new();
    let coordinator = Coordinator::start(&config, sim, clock.now_ms())?;

    let mut app = PlayerApp {
        coordinator,
        clock,
        net,
        window: None,
        presenter: None,
        canvas_size: (config.canvas.width, config.canvas.height),
        window_scale: config.video.window_scale,
        vsync: config.video.vsync,
    };

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    let stats = app.coordinator.stats();
    tracing::info!(
        "Player exited: {} ticks, {} draws, {} skipped ticks",
        stats.ticks,
        stats.draws,
        stats.skipped_ticks
    );
    Ok(())
}

struct PlayerApp {
    coordinator: Coordinator<SimulationHandle>,
    clock: SystemClock,
    net: Option<NetLink>,
    window: Option<Arc<Window>>,
    presenter: Option<CanvasPresenter>,
    canvas_size: (u32, u32),
    window_scale: u32,
    vsync: bool,
}

impl PlayerApp {
    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.coordinator.stop();
        event_loop.exit();
    }

    fn redraw(&mut self) {
        let outcome = self.coordinator.on_animation_frame(self.clock.now_ms());
        if outcome == DrawOutcome::NotArmed {
            return;
        }

        if let Some(presenter) = &mut self.presenter
            && let Err(e) = presenter.present(self.coordinator.visible())
        {
            tracing::error!("Present failed: {:#}", e);
        }

        let draws = self.coordinator.stats().draws;
        if draws % TITLE_INTERVAL == 0
            && let Some(window) = &self.window
        {
            let timing = self.coordinator.timing().summary();
            window.set_title(&format!(
                "Paintwar - tick {:.2} ms, draw {:.2} ms",
                timing.tick_avg_ms.unwrap_or(0.0),
                timing.draw_avg_ms.unwrap_or(0.0)
            ));
        }
    }
}

impl ApplicationHandler for PlayerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.canvas_size;
        let window_attributes = Window::default_attributes()
            .with_title("Paintwar")
            .with_inner_size(winit::dpi::LogicalSize::new(
                width * self.window_scale,
                height * self.window_scale,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                self.exit(event_loop);
                return;
            }
        };

        match CanvasPresenter::new(window.clone(), width, height, self.vsync) {
            Ok(presenter) => self.presenter = Some(presenter),
            Err(e) => {
                tracing::error!("Failed to initialize graphics: {:#}", e);
                self.exit(event_loop);
                return;
            }
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Window close requested");
                self.exit(event_loop);
            }
            WindowEvent::Resized(size) => {
                if let Some(presenter) = &mut self.presenter {
                    presenter.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                if code == KeyCode::Escape {
                    self.exit(event_loop);
                    return;
                }
                self.coordinator.handle_input(InputEvent::Key(map_key(code)));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.coordinator.handle_input(InputEvent::Wheel {
                    delta_y: wheel_delta_y(delta),
                });
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if self.coordinator.wants_frame()
                    && let Some(window) = &self.window
                {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now_ms = self.clock.now_ms();
        if self
            .coordinator
            .next_tick_deadline()
            .is_some_and(|deadline| deadline <= now_ms)
        {
            self.coordinator.on_tick_timer(now_ms);
        }

        crate::poll_network(&mut self.net);

        match self.coordinator.next_tick_deadline() {
            Some(deadline) => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(self.clock.instant_at(deadline)));
            }
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

/// Keys the camera understands
fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        _ => Key::Other,
    }
}

/// Wheel movement in pixels, positive when scrolling down.
///
/// winit reports scrolling up as positive, so the sign is flipped.
fn wheel_delta_y(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_DELTA_PX,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}
