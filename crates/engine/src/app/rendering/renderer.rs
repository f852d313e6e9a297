use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::geom::{Rect, Vec2};
use crate::map::{blend_source_over, StaticSurface};
use crate::physics::CollisionBlocks;

use super::transform::{world_to_screen_px, ViewTransform};
use super::Viewport;

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const ACTOR_COLOR: [u8; 4] = [230, 72, 60, 255];
const DEBUG_BLOCK_COLOR: [u8; 4] = [80, 220, 255, 160];

/// Everything one frame draws, in draw order.
#[derive(Debug, Clone, Copy)]
pub struct FrameScene<'a> {
    pub background: &'a StaticSurface,
    pub actor: Rect,
    pub foreground: Option<&'a StaticSurface>,
    pub debug_blocks: Option<&'a CollisionBlocks>,
    pub transform: ViewTransform,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    src_columns: Vec<Option<u32>>,
}

impl Renderer {
    /// The frame buffer stays `viewport`-sized; window resizes only rescale the surface.
    pub fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), viewport, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport,
            src_columns: Vec::with_capacity(viewport.width as usize),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.viewport, width, height)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        viewport: Viewport,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(viewport.width, viewport.height, surface)
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn render_frame(&mut self, scene: &FrameScene<'_>) -> Result<(), Error> {
        draw_frame(
            self.pixels.frame_mut(),
            self.viewport,
            scene,
            &mut self.src_columns,
        );
        self.pixels.render()
    }
}

/// Software pass over `frame`: clear, background, actor, foreground, debug outlines.
pub(crate) fn draw_frame(
    frame: &mut [u8],
    viewport: Viewport,
    scene: &FrameScene<'_>,
    src_columns: &mut Vec<Option<u32>>,
) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&CLEAR_COLOR);
    }

    draw_surface(frame, viewport, scene.background, &scene.transform, src_columns);
    fill_world_rect(frame, viewport, scene.actor, &scene.transform, ACTOR_COLOR);
    if let Some(foreground) = scene.foreground {
        draw_surface(frame, viewport, foreground, &scene.transform, src_columns);
    }
    if let Some(blocks) = scene.debug_blocks {
        for block in blocks.iter() {
            outline_world_rect(frame, viewport, block.rect(), &scene.transform, DEBUG_BLOCK_COLOR);
        }
    }
}

/// Nearest-neighbour blit: every canvas pixel samples the surface pixel under its center.
fn draw_surface(
    frame: &mut [u8],
    viewport: Viewport,
    surface: &StaticSurface,
    transform: &ViewTransform,
    src_columns: &mut Vec<Option<u32>>,
) {
    if surface.width() == 0 || surface.height() == 0 {
        return;
    }

    src_columns.clear();
    src_columns.extend((0..viewport.width).map(|out_x| {
        let world_x = transform.screen_to_world(Vec2::new(out_x as f32 + 0.5, 0.0)).x;
        surface_coordinate(world_x, surface.width())
    }));

    let frame_width = viewport.width as usize;
    let surface_width = surface.width() as usize;
    let rgba = surface.rgba();

    for out_y in 0..viewport.height {
        let world_y = transform
            .screen_to_world(Vec2::new(0.0, out_y as f32 + 0.5))
            .y;
        let Some(src_y) = surface_coordinate(world_y, surface.height()) else {
            continue;
        };
        let src_row_offset = src_y as usize * surface_width * 4;
        let dst_row_offset = out_y as usize * frame_width * 4;

        for (out_x, src_x) in src_columns.iter().enumerate() {
            let Some(src_x) = src_x else {
                continue;
            };
            let src_offset = src_row_offset + *src_x as usize * 4;
            let Some(src) = rgba.get(src_offset..src_offset + 4) else {
                continue;
            };
            let dst_offset = dst_row_offset + out_x * 4;
            let Some(dst) = frame.get_mut(dst_offset..dst_offset + 4) else {
                continue;
            };
            blend_source_over(dst, [src[0], src[1], src[2], src[3]]);
        }
    }
}

fn surface_coordinate(world: f32, extent: u32) -> Option<u32> {
    let floored = world.floor();
    if !floored.is_finite() || floored < 0.0 || floored >= extent as f32 {
        return None;
    }
    Some(floored as u32)
}

fn screen_rect_px(rect: Rect, transform: &ViewTransform) -> (i32, i32, i32, i32) {
    let (left, top) = world_to_screen_px(Vec2::new(rect.left(), rect.top()), transform);
    let (right, bottom) = world_to_screen_px(Vec2::new(rect.right(), rect.bottom()), transform);
    (left, top, right, bottom)
}

fn fill_world_rect(
    frame: &mut [u8],
    viewport: Viewport,
    rect: Rect,
    transform: &ViewTransform,
    color: [u8; 4],
) {
    let (left, top, right, bottom) = screen_rect_px(rect, transform);
    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = right.min(viewport.width as i32);
    let draw_bottom = bottom.min(viewport.height as i32);
    for y in draw_top..draw_bottom {
        for x in draw_left..draw_right {
            write_pixel_rgba_clipped(frame, viewport, x, y, color);
        }
    }
}

fn outline_world_rect(
    frame: &mut [u8],
    viewport: Viewport,
    rect: Rect,
    transform: &ViewTransform,
    color: [u8; 4],
) {
    let (left, top, right, bottom) = screen_rect_px(rect, transform);
    if right <= left || bottom <= top {
        return;
    }
    let (right, bottom) = (right - 1, bottom - 1);
    if right < 0 || bottom < 0 || left >= viewport.width as i32 || top >= viewport.height as i32 {
        return;
    }
    for x in left.max(0)..=right.min(viewport.width as i32 - 1) {
        write_pixel_rgba_clipped(frame, viewport, x, top, color);
        write_pixel_rgba_clipped(frame, viewport, x, bottom, color);
    }
    for y in top.max(0)..=bottom.min(viewport.height as i32 - 1) {
        write_pixel_rgba_clipped(frame, viewport, left, y, color);
        write_pixel_rgba_clipped(frame, viewport, right, y, color);
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], viewport: Viewport, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= viewport.width as i32 || y >= viewport.height as i32 {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(viewport.width as usize)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(dst) = frame.get_mut(byte_offset..byte_offset + 4) else {
        return;
    };
    blend_source_over(dst, color);
}
