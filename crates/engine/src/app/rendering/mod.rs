mod renderer;
mod transform;

pub use renderer::{FrameScene, Renderer};
pub use transform::{world_to_screen_px, ViewTransform, Viewport};
