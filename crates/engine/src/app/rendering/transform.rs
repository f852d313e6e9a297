use crate::geom::Vec2;

/// Canvas size in frame-buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// How much of the map is visible at `scale` canvas pixels per world pixel.
    pub fn world_size(self, scale: f32) -> Vec2 {
        Vec2::new(self.width as f32 / scale, self.height as f32 / scale)
    }
}

/// Uniform scale applied after translating the world by `-camera_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub camera_offset: Vec2,
}

impl ViewTransform {
    pub fn for_camera(camera_offset: Vec2, scale: f32) -> Self {
        Self {
            scale,
            camera_offset,
        }
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.camera_offset) * self.scale
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen * self.scale.recip() + self.camera_offset
    }
}

pub fn world_to_screen_px(world: Vec2, transform: &ViewTransform) -> (i32, i32) {
    let screen = transform.world_to_screen(world);
    (screen.x.round() as i32, screen.y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_offset_maps_to_screen_origin() {
        let transform = ViewTransform::for_camera(Vec2::new(72.0, 128.0), 4.0);
        assert_eq!(world_to_screen_px(Vec2::new(72.0, 128.0), &transform), (0, 0));
        assert_eq!(
            world_to_screen_px(Vec2::new(100.0, 130.5), &transform),
            (112, 10)
        );
    }

    #[test]
    fn screen_to_world_inverts_world_to_screen() {
        let transform = ViewTransform::for_camera(Vec2::new(10.0, 20.0), 4.0);
        let world = Vec2::new(37.25, 51.5);
        assert_eq!(transform.screen_to_world(transform.world_to_screen(world)), world);
    }

    #[test]
    fn default_canvas_shows_quarter_of_its_pixels_in_world_units() {
        let viewport = Viewport {
            width: 1024,
            height: 576,
        };
        assert_eq!(viewport.world_size(4.0), Vec2::new(256.0, 144.0));
    }
}
