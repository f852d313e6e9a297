use thiserror::Error;
use tracing::{debug, warn};

use super::grid::Grid;
use super::layers::LayerSet;
use super::tileset::{Tileset, TilesetLoadError, TilesetProvider};

/// Off-screen RGBA8 pixel buffer covering the whole map. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSurface {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error(transparent)]
    Tileset(#[from] TilesetLoadError),
    #[error("symbol {symbol} at ({col}, {row}) has no cell in a tileset of {tile_count} tiles")]
    SymbolOutOfRange {
        symbol: u32,
        col: u32,
        row: u32,
        tile_count: u32,
    },
    #[error("tileset has {found}px tiles but the map grid uses {expected}px cells")]
    TileSizeMismatch { expected: u32, found: u32 },
}

#[derive(Debug)]
pub struct SkippedLayer {
    pub layer: String,
    pub reason: CompositeError,
}

#[derive(Debug)]
pub struct CompositeOutcome {
    pub surface: StaticSurface,
    pub drawn_layers: Vec<String>,
    pub skipped_layers: Vec<SkippedLayer>,
}

impl StaticSurface {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    #[cfg(test)]
    pub(crate) fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        (rgba.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// True when no pixel has been drawn.
    pub fn is_blank(&self) -> bool {
        self.rgba.chunks_exact(4).all(|pixel| pixel[3] == 0)
    }

    fn draw_tile(&mut self, tileset: &Tileset, src: (u32, u32), dst: (u32, u32)) {
        let size = tileset.tile_size();
        let sheet = tileset.image();
        for dy in 0..size {
            let out_y = dst.1 + dy;
            if out_y >= self.height {
                break;
            }
            for dx in 0..size {
                let out_x = dst.0 + dx;
                if out_x >= self.width {
                    break;
                }
                let Some(color) = sheet.pixel(src.0 + dx, src.1 + dy) else {
                    continue;
                };
                let offset = (out_y as usize * self.width as usize + out_x as usize) * 4;
                blend_source_over(&mut self.rgba[offset..offset + 4], color);
            }
        }
    }
}

/// Composites `layers` in iteration order onto one surface of `width` x `height` pixels,
/// one `tile_size` cell per grid entry.
///
/// A layer whose tileset fails to load, whose tiles are not `tile_size` wide, or that
/// references a cell the tileset does not have, is skipped with a warning and left blank.
/// The remaining layers still draw.
pub fn compose_static_layers(
    layers: &LayerSet,
    tilesets: &mut dyn TilesetProvider,
    tile_size: u32,
    width: u32,
    height: u32,
) -> CompositeOutcome {
    let mut surface = StaticSurface::blank(width, height);
    let mut drawn_layers = Vec::new();
    let mut skipped_layers = Vec::new();

    for layer in layers.iter() {
        let Some(tileset) = tilesets.tileset_for_layer(&layer.name) else {
            debug!(layer = %layer.name, "layer_without_tileset_ignored");
            continue;
        };
        let result = tileset
            .map_err(CompositeError::from)
            .and_then(|tileset| render_layer(&mut surface, &layer.grid, &tileset, tile_size));
        match result {
            Ok(tiles_drawn) => {
                debug!(layer = %layer.name, tiles_drawn, "layer_composited");
                drawn_layers.push(layer.name.clone());
            }
            Err(reason) => {
                warn!(layer = %layer.name, error = %reason, "layer_skipped");
                skipped_layers.push(SkippedLayer {
                    layer: layer.name.clone(),
                    reason,
                });
            }
        }
    }

    CompositeOutcome {
        surface,
        drawn_layers,
        skipped_layers,
    }
}

fn render_layer(
    surface: &mut StaticSurface,
    grid: &Grid,
    tileset: &Tileset,
    tile_size: u32,
) -> Result<usize, CompositeError> {
    // Validate before touching the surface so a rejected layer leaves no partial tiles.
    if tileset.tile_size() != tile_size {
        return Err(CompositeError::TileSizeMismatch {
            expected: tile_size,
            found: tileset.tile_size(),
        });
    }
    let tile_count = tileset.tile_count();
    if let Some((col, row, symbol)) = grid.cells().find(|(_, _, symbol)| *symbol > tile_count) {
        return Err(CompositeError::SymbolOutOfRange {
            symbol,
            col,
            row,
            tile_count,
        });
    }

    let mut tiles_drawn = 0usize;
    for (col, row, symbol) in grid.cells() {
        let Some(src) = tileset.source_origin(symbol) else {
            continue;
        };
        surface.draw_tile(tileset, src, (col * tile_size, row * tile_size));
        tiles_drawn += 1;
    }
    Ok(tiles_drawn)
}

/// Straight-alpha "source over" blend of `src` onto `dst`.
pub(crate) fn blend_source_over(dst: &mut [u8], src: [u8; 4]) {
    let src_a = src[3] as u32;
    if src_a == 0 {
        return;
    }
    if src_a == 255 {
        dst.copy_from_slice(&src);
        return;
    }

    let dst_a = dst[3] as u32;
    let inv_a = 255 - src_a;
    let out_a = src_a + (dst_a * inv_a + 127) / 255;
    if out_a == 0 {
        return;
    }
    for channel in 0..3 {
        let src_c = src[channel] as u32 * src_a;
        let dst_c = dst[channel] as u32 * dst_a * inv_a / 255;
        dst[channel] = ((src_c + dst_c + out_a / 2) / out_a).min(255) as u8;
    }
    dst[3] = out_a.min(255) as u8;
}
