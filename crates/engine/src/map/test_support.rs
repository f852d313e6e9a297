use std::collections::HashMap;
use std::rc::Rc;

use super::{SheetImage, Tileset, TilesetLoadError, TilesetProvider};

pub(crate) const RED: [u8; 4] = [255, 0, 0, 255];
pub(crate) const GREEN: [u8; 4] = [0, 255, 0, 255];
pub(crate) const BLUE: [u8; 4] = [0, 0, 255, 255];
pub(crate) const CLEAR: [u8; 4] = [0, 0, 0, 0];

/// Two 2x2 tiles side by side: tile 1 red, tile 2 with a transparent left column.
pub(crate) fn two_tile_sheet() -> Rc<SheetImage> {
    let mut rgba = Vec::new();
    for _y in 0..2 {
        rgba.extend_from_slice(&RED);
        rgba.extend_from_slice(&RED);
        rgba.extend_from_slice(&CLEAR);
        rgba.extend_from_slice(&GREEN);
    }
    Rc::new(SheetImage::from_rgba(4, 2, rgba).expect("sheet"))
}

pub(crate) fn blue_sheet() -> Rc<SheetImage> {
    Rc::new(SheetImage::from_rgba(2, 2, BLUE.repeat(4)).expect("sheet"))
}

/// In-memory tilesets with 2px tiles, keyed by layer name.
#[derive(Default)]
pub(crate) struct MemoryTilesets {
    by_layer: HashMap<String, Rc<SheetImage>>,
    broken_layers: Vec<String>,
}

impl MemoryTilesets {
    pub(crate) fn with(mut self, layer: &str, sheet: Rc<SheetImage>) -> Self {
        self.by_layer.insert(layer.to_string(), sheet);
        self
    }

    pub(crate) fn broken(mut self, layer: &str) -> Self {
        self.broken_layers.push(layer.to_string());
        self
    }
}

impl TilesetProvider for MemoryTilesets {
    fn tileset_for_layer(&mut self, layer: &str) -> Option<Result<Tileset, TilesetLoadError>> {
        if self.broken_layers.iter().any(|name| name == layer) {
            return Some(Err(TilesetLoadError::Open {
                path: format!("{layer}.png").into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            }));
        }
        let sheet = self.by_layer.get(layer)?;
        Some(Tileset::new(Rc::clone(sheet), 2))
    }
}
