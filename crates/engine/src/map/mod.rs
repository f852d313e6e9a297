mod compositor;
mod grid;
mod layers;
mod tileset;
mod tmx;

#[cfg(test)]
pub(crate) mod test_support;

pub(crate) use compositor::blend_source_over;
pub use compositor::{
    compose_static_layers, CompositeError, CompositeOutcome, SkippedLayer, StaticSurface,
};
pub use grid::{Grid, GridError};
pub use layers::{Layer, LayerSet, LayerSetError};
pub use tileset::{
    tile_source_origin, FileTilesets, SheetImage, Tileset, TilesetLoadError, TilesetProvider,
    TilesetSpec,
};
pub use tmx::{load_tmx, parse_tmx, TmxError, TmxMap};
