use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{ImageError, ImageReader};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Per-layer tileset metadata as written in level files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TilesetSpec {
    /// Image path relative to the asset root.
    pub image: PathBuf,
    pub tile_size: u32,
}

/// Decoded sprite sheet pixels, RGBA8 row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum TilesetLoadError {
    #[error("failed to open tileset image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode tileset image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("pixel buffer of {actual} bytes does not match a {width}x{height} RGBA image")]
    BufferSize {
        width: u32,
        height: u32,
        actual: usize,
    },
    #[error("tile size {tile_size} does not fit a {width}x{height} sheet")]
    InvalidTileSize {
        tile_size: u32,
        width: u32,
        height: u32,
    },
}

impl SheetImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, TilesetLoadError> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(TilesetLoadError::BufferSize {
                width,
                height,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn load(path: &Path) -> Result<Self, TilesetLoadError> {
        let reader = ImageReader::open(path).map_err(|source| TilesetLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| TilesetLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let image = decoded.to_rgba8();
        Ok(Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// A sheet sliced into square cells addressed by a 1-based linear index.
#[derive(Debug, Clone)]
pub struct Tileset {
    image: Rc<SheetImage>,
    tile_size: u32,
}

impl Tileset {
    pub fn new(image: Rc<SheetImage>, tile_size: u32) -> Result<Self, TilesetLoadError> {
        if tile_size == 0 || tile_size > image.width || tile_size > image.height {
            return Err(TilesetLoadError::InvalidTileSize {
                tile_size,
                width: image.width,
                height: image.height,
            });
        }
        Ok(Self { image, tile_size })
    }

    pub fn image(&self) -> &SheetImage {
        &self.image
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tiles_per_row(&self) -> u32 {
        self.image.width / self.tile_size
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles_per_row() * (self.image.height / self.tile_size)
    }

    /// Top-left pixel of the cell for `symbol`, or `None` when the sheet has no such cell.
    pub fn source_origin(&self, symbol: u32) -> Option<(u32, u32)> {
        if symbol == 0 || symbol > self.tile_count() {
            return None;
        }
        tile_source_origin(symbol, self.tiles_per_row(), self.tile_size)
    }
}

pub fn tile_source_origin(symbol: u32, tiles_per_row: u32, tile_size: u32) -> Option<(u32, u32)> {
    if symbol == 0 || tiles_per_row == 0 {
        return None;
    }
    let index = symbol - 1;
    Some((
        (index % tiles_per_row) * tile_size,
        (index / tiles_per_row) * tile_size,
    ))
}

/// Resolves the tileset a layer is drawn with.
pub trait TilesetProvider {
    /// `None` when the layer has no tileset metadata at all.
    fn tileset_for_layer(&mut self, layer: &str) -> Option<Result<Tileset, TilesetLoadError>>;
}

/// Loads tilesets from disk, decoding each distinct image once.
#[derive(Debug)]
pub struct FileTilesets {
    asset_root: PathBuf,
    specs: BTreeMap<String, TilesetSpec>,
    image_cache: HashMap<PathBuf, Rc<SheetImage>>,
}

impl FileTilesets {
    pub fn new(asset_root: impl Into<PathBuf>, specs: BTreeMap<String, TilesetSpec>) -> Self {
        Self {
            asset_root: asset_root.into(),
            specs,
            image_cache: HashMap::new(),
        }
    }

    pub fn cached_image_count(&self) -> usize {
        self.image_cache.len()
    }

    fn load_image(&mut self, path: PathBuf) -> Result<Rc<SheetImage>, TilesetLoadError> {
        if let Some(image) = self.image_cache.get(&path) {
            return Ok(Rc::clone(image));
        }
        let image = Rc::new(SheetImage::load(&path)?);
        debug!(
            path = %path.display(),
            width = image.width,
            height = image.height,
            "tileset_image_decoded"
        );
        self.image_cache.insert(path, Rc::clone(&image));
        Ok(image)
    }
}

impl TilesetProvider for FileTilesets {
    fn tileset_for_layer(&mut self, layer: &str) -> Option<Result<Tileset, TilesetLoadError>> {
        let spec = self.specs.get(layer)?.clone();
        let path = self.asset_root.join(&spec.image);
        Some(
            self.load_image(path)
                .and_then(|image| Tileset::new(image, spec.tile_size)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn solid_sheet(width: u32, height: u32) -> Rc<SheetImage> {
        Rc::new(
            SheetImage::from_rgba(width, height, vec![255; (width * height * 4) as usize])
                .expect("sheet"),
        )
    }

    #[test]
    fn symbol_five_with_ten_tiles_per_row_is_fifth_cell() {
        let tileset = Tileset::new(solid_sheet(160, 32), 16).expect("tileset");

        assert_eq!(tileset.tiles_per_row(), 10);
        assert_eq!(tileset.source_origin(5), Some((4 * 16, 0)));
    }

    #[test]
    fn source_origin_wraps_to_next_row() {
        assert_eq!(tile_source_origin(10, 10, 16), Some((144, 0)));
        assert_eq!(tile_source_origin(11, 10, 16), Some((0, 16)));
        assert_eq!(tile_source_origin(0, 10, 16), None);
    }

    #[test]
    fn symbols_past_the_sheet_have_no_cell() {
        let tileset = Tileset::new(solid_sheet(32, 32), 16).expect("tileset");

        assert_eq!(tileset.tile_count(), 4);
        assert_eq!(tileset.source_origin(4), Some((16, 16)));
        assert_eq!(tileset.source_origin(5), None);
    }

    #[test]
    fn tile_size_must_fit_the_sheet() {
        assert!(matches!(
            Tileset::new(solid_sheet(8, 8), 16),
            Err(TilesetLoadError::InvalidTileSize { .. })
        ));
        assert!(matches!(
            Tileset::new(solid_sheet(8, 8), 0),
            Err(TilesetLoadError::InvalidTileSize { .. })
        ));
    }

    #[test]
    fn rgba_buffer_size_is_checked() {
        assert!(matches!(
            SheetImage::from_rgba(2, 2, vec![0; 15]),
            Err(TilesetLoadError::BufferSize { actual: 15, .. })
        ));
    }

    #[test]
    fn file_tilesets_decode_shared_image_once() {
        let temp = TempDir::new().expect("temp");
        let images_dir = temp.path().join("images");
        std::fs::create_dir_all(&images_dir).expect("images dir");
        RgbaImage::from_pixel(32, 16, Rgba([10, 20, 30, 255]))
            .save(images_dir.join("decorations.png"))
            .expect("save png");

        let spec = TilesetSpec {
            image: PathBuf::from("images/decorations.png"),
            tile_size: 16,
        };
        let specs = BTreeMap::from([
            ("houses".to_string(), spec.clone()),
            ("decor".to_string(), spec),
        ]);
        let mut tilesets = FileTilesets::new(temp.path(), specs);

        let houses = tilesets
            .tileset_for_layer("houses")
            .expect("metadata")
            .expect("loaded");
        let decor = tilesets
            .tileset_for_layer("decor")
            .expect("metadata")
            .expect("loaded");

        assert_eq!(houses.tiles_per_row(), 2);
        assert_eq!(decor.image().pixel(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(tilesets.cached_image_count(), 1);
        assert!(tilesets.tileset_for_layer("unknown").is_none());
    }

    #[test]
    fn missing_image_reports_open_error() {
        let temp = TempDir::new().expect("temp");
        let specs = BTreeMap::from([(
            "terrain".to_string(),
            TilesetSpec {
                image: PathBuf::from("images/missing.png"),
                tile_size: 16,
            },
        )]);
        let mut tilesets = FileTilesets::new(temp.path(), specs);

        let result = tilesets.tileset_for_layer("terrain").expect("metadata");
        assert!(matches!(result, Err(TilesetLoadError::Open { .. })));
    }
}
