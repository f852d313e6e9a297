mod input;
mod loop_runner;
mod metrics;
mod rendering;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use rendering::{world_to_screen_px, FrameScene, Renderer, ViewTransform, Viewport};
