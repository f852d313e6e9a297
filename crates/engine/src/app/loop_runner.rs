use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::assets::AssetSet;
use crate::level::Level;
use crate::physics::PhysicsConfigError;
use crate::session::Session;

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{FrameScene, InputAction, InputSnapshot, Renderer, ViewTransform, Viewport};

pub const SLOW_FRAME_ENV_VAR: &str = "TILEWALK_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    /// Frame-buffer size in pixels; the window opens at this logical size.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Canvas pixels per world pixel.
    pub scale: f32,
    pub max_frame_dt: Duration,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub show_collision_overlay: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "tilewalk".to_string(),
            canvas_width: 1024,
            canvas_height: 576,
            scale: 4.0,
            max_frame_dt: Duration::from_secs_f64(1.0 / 30.0),
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            show_collision_overlay: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("scale must be finite and > 0, got {0}")]
    InvalidScale(f32),
    #[error("canvas must be at least 1x1, got {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },
    #[error("physics config rejected: {0}")]
    Physics(#[from] PhysicsConfigError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and runs frames until it closes or Escape is pressed.
pub fn run_app(config: LoopConfig, level: &Level, assets: AssetSet) -> Result<(), AppError> {
    if !config.scale.is_finite() || config.scale <= 0.0 {
        return Err(AppError::InvalidScale(config.scale));
    }
    if config.canvas_width == 0 || config.canvas_height == 0 {
        return Err(AppError::InvalidCanvas {
            width: config.canvas_width,
            height: config.canvas_height,
        });
    }

    let viewport = Viewport {
        width: config.canvas_width,
        height: config.canvas_height,
    };
    let max_frame_dt = normalize_non_zero_duration(
        config.max_frame_dt,
        Duration::from_secs_f64(1.0 / 30.0),
    );
    let mut session = Session::new(
        level,
        viewport.world_size(config.scale),
        max_frame_dt.as_secs_f32(),
    )?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.canvas_width as f64,
                config.canvas_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let window_id = window.id();
    let mut renderer =
        Renderer::new(Arc::clone(&window), viewport).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let scale = config.scale;

    info!(
        canvas_width = viewport.width,
        canvas_height = viewport.height,
        scale,
        max_frame_dt_ms = max_frame_dt.as_millis() as u64,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        collision_blocks = session.blocks().len(),
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut collision_overlay_visible = config.show_collision_overlay;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent {
                window_id: event_window_id,
                event,
            } if event_window_id == window_id => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    // Key releases are not delivered while unfocused.
                    input_collector.release_all();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if input_collector.take_overlay_toggle_pressed() {
                        collision_overlay_visible = !collision_overlay_visible;
                        info!(collision_overlay_visible, "overlay_toggled");
                    }

                    if slow_frame_delay > Duration::ZERO {
                        // Explicit debug perturbation only.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let input_snapshot = input_collector.snapshot();
                    let camera_offset =
                        session.step(raw_frame_dt.as_secs_f32(), &input_snapshot);

                    let scene = FrameScene {
                        background: &assets.background,
                        actor: session.actor().bounds(),
                        foreground: assets.foreground.as_ref(),
                        debug_blocks: collision_overlay_visible.then(|| session.blocks()),
                        transform: ViewTransform::for_camera(camera_offset, scale),
                    };
                    if let Err(error) = renderer.render_frame(&scene) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        let actor = session.actor();
                        info!(
                            fps = snapshot.fps,
                            frame_time_ms = snapshot.frame_time_ms,
                            actor_x = actor.position().x,
                            actor_y = actor.position().y,
                            grounded = actor.is_grounded(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                renderer.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    overlay_toggle_is_down: bool,
    overlay_toggle_pressed_edge: bool,
    jump_keys_down: u8,
    action_states: ActionStates,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        if key_event.repeat {
            return;
        }
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
        self.handle_overlay_toggle_key_state(is_overlay_toggle_key(key_event), key_event.state);
    }

    fn snapshot(&self) -> InputSnapshot {
        InputSnapshot::new(self.action_states)
    }

    fn take_overlay_toggle_pressed(&mut self) -> bool {
        let was_pressed = self.overlay_toggle_pressed_edge;
        self.overlay_toggle_pressed_edge = false;
        was_pressed
    }

    fn release_all(&mut self) {
        self.action_states = ActionStates::default();
        self.jump_keys_down = 0;
        self.overlay_toggle_is_down = false;
    }

    fn handle_overlay_toggle_key_state(&mut self, is_toggle_key: bool, state: ElementState) {
        if !is_toggle_key {
            return;
        }

        match state {
            ElementState::Pressed => {
                if !self.overlay_toggle_is_down {
                    self.overlay_toggle_pressed_edge = true;
                }
                self.overlay_toggle_is_down = true;
            }
            ElementState::Released => self.overlay_toggle_is_down = false,
        }
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyW)
            | PhysicalKey::Code(KeyCode::ArrowUp)
            | PhysicalKey::Code(KeyCode::Space) => {
                // Three keys share the jump action; it stays down while any of them is held.
                self.jump_keys_down = if is_pressed {
                    self.jump_keys_down.saturating_add(1)
                } else {
                    self.jump_keys_down.saturating_sub(1)
                };
                self.action_states
                    .set(InputAction::MoveUp, self.jump_keys_down > 0);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::MoveDown, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                if is_pressed {
                    self.quit_requested = true;
                }
            }
            _ => {}
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

fn is_overlay_toggle_key(key_event: &KeyEvent) -> bool {
    matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::F3))
}
