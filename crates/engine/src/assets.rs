use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::level::Level;
use crate::map::{
    compose_static_layers, CompositeError, FileTilesets, SkippedLayer, StaticSurface,
    TilesetProvider,
};

/// Everything the frame loop draws that does not change after startup.
#[derive(Debug)]
pub struct AssetSet {
    pub background: StaticSurface,
    /// `None` when no foreground layer produced any pixels.
    pub foreground: Option<StaticSurface>,
    /// Non-fatal failures, one per layer left blank. Always `LayerSkipped`.
    pub layer_failures: Vec<AssetLoadFailure>,
}

#[derive(Debug, Error)]
pub enum AssetLoadFailure {
    /// The layer's image could not be fetched, decoded or sliced. Rendering continues with
    /// the layer blank.
    #[error("layer '{layer}' left blank: {source}")]
    LayerSkipped {
        layer: String,
        #[source]
        source: CompositeError,
    },
    /// No background layer was composited. Startup cannot continue.
    #[error(
        "no background layer could be composited ({skipped} of {total} skipped: {})",
        .skipped_names.join(", ")
    )]
    MissingBackgroundSurface {
        total: usize,
        skipped: usize,
        skipped_names: Vec<String>,
    },
}

impl From<SkippedLayer> for AssetLoadFailure {
    fn from(skipped: SkippedLayer) -> Self {
        Self::LayerSkipped {
            layer: skipped.layer,
            source: skipped.reason,
        }
    }
}

/// Decodes the level's tilesets from `asset_root` and composites both layer groups.
pub fn load_assets(level: &Level, asset_root: &Path) -> Result<AssetSet, AssetLoadFailure> {
    let mut tilesets = FileTilesets::new(asset_root, level.tilesets().clone());
    let assets = load_assets_with(level, &mut tilesets)?;
    info!(
        images_decoded = tilesets.cached_image_count(),
        "tileset_images_ready"
    );
    Ok(assets)
}

/// Same as [`load_assets`] with a caller-supplied tileset source.
pub fn load_assets_with(
    level: &Level,
    tilesets: &mut dyn TilesetProvider,
) -> Result<AssetSet, AssetLoadFailure> {
    let (width, height) = level.map_size_px();

    let background = compose_static_layers(level.background(), tilesets, level.tile_size(), width, height);
    if background.drawn_layers.is_empty() {
        return Err(AssetLoadFailure::MissingBackgroundSurface {
            total: level.background().len(),
            skipped: background.skipped_layers.len(),
            skipped_names: background
                .skipped_layers
                .iter()
                .map(|skipped| skipped.layer.clone())
                .collect(),
        });
    }

    let foreground = compose_static_layers(level.foreground(), tilesets, level.tile_size(), width, height);

    let layer_failures: Vec<AssetLoadFailure> = background
        .skipped_layers
        .into_iter()
        .chain(foreground.skipped_layers)
        .map(AssetLoadFailure::from)
        .collect();

    let foreground_surface = if foreground.surface.is_blank() {
        None
    } else {
        Some(foreground.surface)
    };

    info!(
        width,
        height,
        background_layers = background.drawn_layers.len(),
        foreground_layers = foreground.drawn_layers.len(),
        skipped_layers = layer_failures.len(),
        "assets_loaded"
    );

    Ok(AssetSet {
        background: background.surface,
        foreground: foreground_surface,
        layer_failures,
    })
}
