use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::geom::Vec2;
use crate::map::{load_tmx, Grid, GridError, LayerSet, LayerSetError, TilesetSpec, TmxError, TmxMap};
use crate::physics::PhysicsConfig;

/// Level file as written on disk (JSON).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelDef {
    pub tile_size: u32,
    /// Optional Tiled map, relative to the level file, that layers may pull data from.
    #[serde(default)]
    pub tmx: Option<PathBuf>,
    pub background: Vec<LayerDef>,
    #[serde(default)]
    pub foreground: Vec<LayerDef>,
    pub collisions: LayerDef,
    pub tilesets: BTreeMap<String, TilesetSpec>,
    pub spawn: SpawnDef,
    #[serde(default)]
    pub physics: PhysicsConfig,
}

/// A layer's grid comes either inline (`data`) or from a layer of the level's TMX map.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerDef {
    pub name: String,
    #[serde(default)]
    pub data: Option<Vec<Vec<u32>>>,
    #[serde(default)]
    pub tmx_layer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnDef {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("tile_size must be > 0")]
    ZeroTileSize,
    #[error("spawn size must be finite and > 0, got {0}")]
    InvalidSpawnSize(f32),
    #[error("spawn position ({x}, {y}) is not finite")]
    InvalidSpawnPosition { x: f32, y: f32 },
    #[error("layer '{0}' must set exactly one of `data` or `tmx_layer`")]
    AmbiguousLayerSource(String),
    #[error("layer '{layer}' reads from TMX but the level has no `tmx` file")]
    MissingTmx { layer: String },
    #[error("layer '{layer}' references TMX layer '{tmx_layer}', which does not exist (found: {available})")]
    UnknownTmxLayer {
        layer: String,
        tmx_layer: String,
        available: String,
    },
    #[error("tileset '{tileset}' has {found}px tiles but the level uses {expected}px tiles")]
    TilesetTileSize {
        tileset: String,
        expected: u32,
        found: u32,
    },
    #[error("TMX map has {found}px tiles but the level uses {expected}px tiles")]
    TmxTileSize { expected: u32, found: u32 },
    #[error(transparent)]
    Tmx(#[from] TmxError),
    #[error("layer '{layer}': {source}")]
    Grid {
        layer: String,
        #[source]
        source: GridError,
    },
    #[error(transparent)]
    Layers(#[from] LayerSetError),
    #[error("level has no background layers")]
    NoBackground,
}

/// Validated level: every grid is rectangular and all grids share one size.
#[derive(Debug, Clone)]
pub struct Level {
    tile_size: u32,
    width_tiles: u32,
    height_tiles: u32,
    background: LayerSet,
    foreground: LayerSet,
    collisions: Grid,
    tilesets: BTreeMap<String, TilesetSpec>,
    spawn: SpawnDef,
    physics: PhysicsConfig,
}

impl Level {
    /// `base_dir` is the directory of the level file; TMX paths resolve against it.
    pub fn from_def(def: LevelDef, base_dir: &Path) -> Result<Self, LevelError> {
        if def.tile_size == 0 {
            return Err(LevelError::ZeroTileSize);
        }
        if !def.spawn.size.is_finite() || def.spawn.size <= 0.0 {
            return Err(LevelError::InvalidSpawnSize(def.spawn.size));
        }
        if !def.spawn.x.is_finite() || !def.spawn.y.is_finite() {
            return Err(LevelError::InvalidSpawnPosition {
                x: def.spawn.x,
                y: def.spawn.y,
            });
        }
        if def.background.is_empty() {
            return Err(LevelError::NoBackground);
        }
        // Tiles are placed on the map grid at `tile_size` steps, so every sheet must match it.
        if let Some((name, spec)) = def
            .tilesets
            .iter()
            .find(|(_, spec)| spec.tile_size != def.tile_size)
        {
            return Err(LevelError::TilesetTileSize {
                tileset: name.clone(),
                expected: def.tile_size,
                found: spec.tile_size,
            });
        }

        let tmx = def
            .tmx
            .as_ref()
            .map(|path| load_tmx(&base_dir.join(path)))
            .transpose()?;
        if let Some(map) = &tmx {
            if map.tile_width() != def.tile_size {
                return Err(LevelError::TmxTileSize {
                    expected: def.tile_size,
                    found: map.tile_width(),
                });
            }
        }

        let background = build_layer_set(&def.background, tmx.as_ref())?;
        let (width_tiles, height_tiles) = background.dimensions().ok_or(LevelError::NoBackground)?;

        let foreground = build_layer_set(&def.foreground, tmx.as_ref())?;
        if let Some((width, height)) = foreground.dimensions() {
            check_dimensions(&def.foreground[0].name, width, height, width_tiles, height_tiles)?;
        }

        let collisions = resolve_layer_grid(&def.collisions, tmx.as_ref())?;
        collisions
            .ensure_dimensions(width_tiles, height_tiles)
            .map_err(|source| LevelError::Grid {
                layer: def.collisions.name.clone(),
                source,
            })?;

        Ok(Self {
            tile_size: def.tile_size,
            width_tiles,
            height_tiles,
            background,
            foreground,
            collisions,
            tilesets: def.tilesets,
            spawn: def.spawn,
            physics: def.physics,
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// `(width, height)` in tiles.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width_tiles, self.height_tiles)
    }

    pub fn map_size_px(&self) -> (u32, u32) {
        (
            self.width_tiles * self.tile_size,
            self.height_tiles * self.tile_size,
        )
    }

    pub fn map_size(&self) -> Vec2 {
        let (width, height) = self.map_size_px();
        Vec2::new(width as f32, height as f32)
    }

    pub fn background(&self) -> &LayerSet {
        &self.background
    }

    pub fn foreground(&self) -> &LayerSet {
        &self.foreground
    }

    pub fn collisions(&self) -> &Grid {
        &self.collisions
    }

    pub fn tilesets(&self) -> &BTreeMap<String, TilesetSpec> {
        &self.tilesets
    }

    pub fn spawn_position(&self) -> Vec2 {
        Vec2::new(self.spawn.x, self.spawn.y)
    }

    pub fn spawn_size(&self) -> f32 {
        self.spawn.size
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }
}

fn build_layer_set(defs: &[LayerDef], tmx: Option<&TmxMap>) -> Result<LayerSet, LevelError> {
    let mut set = LayerSet::new();
    for def in defs {
        let grid = resolve_layer_grid(def, tmx)?;
        set.push(def.name.clone(), grid)?;
    }
    Ok(set)
}

fn resolve_layer_grid(def: &LayerDef, tmx: Option<&TmxMap>) -> Result<Grid, LevelError> {
    match (&def.data, &def.tmx_layer) {
        (Some(rows), None) => Grid::from_rows(rows.as_slice()).map_err(|source| LevelError::Grid {
            layer: def.name.clone(),
            source,
        }),
        (None, Some(tmx_layer)) => {
            let tmx = tmx.ok_or_else(|| LevelError::MissingTmx {
                layer: def.name.clone(),
            })?;
            tmx.layer(tmx_layer)
                .cloned()
                .ok_or_else(|| LevelError::UnknownTmxLayer {
                    layer: def.name.clone(),
                    tmx_layer: tmx_layer.clone(),
                    available: tmx.layer_names().collect::<Vec<_>>().join(", "),
                })
        }
        _ => Err(LevelError::AmbiguousLayerSource(def.name.clone())),
    }
}

fn check_dimensions(
    layer: &str,
    width: u32,
    height: u32,
    expected_width: u32,
    expected_height: u32,
) -> Result<(), LevelError> {
    if width == expected_width && height == expected_height {
        return Ok(());
    }
    Err(LevelError::Grid {
        layer: layer.to_string(),
        source: GridError::DimensionMismatch {
            expected_width,
            expected_height,
            actual_width: width,
            actual_height: height,
        },
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn base_def() -> serde_json::Value {
        json!({
            "tile_size": 16,
            "background": [
                { "name": "terrain", "data": [[1, 2, 3], [4, 5, 6]] },
                { "name": "houses", "data": [[0, 0, 0], [0, 7, 0]] }
            ],
            "foreground": [
                { "name": "front", "data": [[0, 9, 0], [0, 0, 0]] }
            ],
            "collisions": { "name": "collisions", "data": [[0, 0, 0], [1, 1, 1]] },
            "tilesets": {
                "terrain": { "image": "images/terrain.png", "tile_size": 16 },
                "houses": { "image": "images/decorations.png", "tile_size": 16 }
            },
            "spawn": { "x": 100.0, "y": 100.0, "size": 15.0 }
        })
    }

    fn parse(value: serde_json::Value) -> LevelDef {
        serde_json::from_value(value).expect("level def")
    }

    #[test]
    fn inline_level_builds_with_default_physics() {
        let level = Level::from_def(parse(base_def()), Path::new(".")).expect("level");

        assert_eq!(level.dimensions(), (3, 2));
        assert_eq!(level.map_size_px(), (48, 32));
        assert_eq!(level.background().len(), 2);
        assert_eq!(level.foreground().len(), 1);
        assert_eq!(level.collisions().get(1, 1), Some(1));
        assert_eq!(level.spawn_position(), Vec2::new(100.0, 100.0));
        assert_eq!(*level.physics(), PhysicsConfig::default());
    }

    #[test]
    fn physics_overrides_are_partial() {
        let mut value = base_def();
        value["physics"] = json!({ "jump_speed": 300.0 });
        let level = Level::from_def(parse(value), Path::new(".")).expect("level");

        assert_eq!(level.physics().jump_speed, 300.0);
        assert_eq!(level.physics().gravity, PhysicsConfig::default().gravity);
    }

    #[test]
    fn ragged_layer_is_rejected_with_its_name() {
        let mut value = base_def();
        value["background"][1]["data"] = json!([[0, 0, 0], [0, 7]]);
        let error = Level::from_def(parse(value), Path::new(".")).expect_err("ragged");

        assert!(matches!(
            error,
            LevelError::Grid { ref layer, source: GridError::Ragged { .. } } if layer == "houses"
        ));
    }

    #[test]
    fn collision_grid_must_match_map_size() {
        let mut value = base_def();
        value["collisions"]["data"] = json!([[0, 0], [1, 1]]);
        let error = Level::from_def(parse(value), Path::new(".")).expect_err("size");

        assert!(matches!(
            error,
            LevelError::Grid { source: GridError::DimensionMismatch { .. }, .. }
        ));
    }

    #[test]
    fn foreground_must_match_map_size() {
        let mut value = base_def();
        value["foreground"][0]["data"] = json!([[0]]);
        let error = Level::from_def(parse(value), Path::new(".")).expect_err("size");

        assert!(matches!(error, LevelError::Grid { ref layer, .. } if layer == "front"));
    }

    #[test]
    fn layer_needs_exactly_one_source() {
        let mut value = base_def();
        value["background"][0] = json!({ "name": "terrain" });
        assert!(matches!(
            Level::from_def(parse(value), Path::new(".")),
            Err(LevelError::AmbiguousLayerSource(ref name)) if name == "terrain"
        ));
    }

    #[test]
    fn tmx_layer_without_tmx_file_is_rejected() {
        let mut value = base_def();
        value["background"][0] = json!({ "name": "terrain", "tmx_layer": "Terrain" });
        assert!(matches!(
            Level::from_def(parse(value), Path::new(".")),
            Err(LevelError::MissingTmx { .. })
        ));
    }

    #[test]
    fn invalid_spawn_and_tile_size_are_rejected() {
        let mut value = base_def();
        value["spawn"]["size"] = json!(0.0);
        assert!(matches!(
            Level::from_def(parse(value), Path::new(".")),
            Err(LevelError::InvalidSpawnSize(_))
        ));

        let mut value = base_def();
        value["tile_size"] = json!(0);
        assert!(matches!(
            Level::from_def(parse(value), Path::new(".")),
            Err(LevelError::ZeroTileSize)
        ));
    }

    #[test]
    fn unknown_fields_are_rejected_at_parse_time() {
        let mut value = base_def();
        value["spawn"]["z"] = json!(1.0);
        assert!(serde_json::from_value::<LevelDef>(value).is_err());
    }

    #[test]
    fn layers_can_come_from_a_tmx_map() {
        let temp = TempDir::new().expect("temp");
        std::fs::write(
            temp.path().join("village.tmx"),
            r#"<map width="3" height="2" tilewidth="16" tileheight="16">
 <layer name="Terrain" width="3" height="2"><data encoding="csv">1,1,1,2,2,2</data></layer>
 <layer name="Collisions" width="3" height="2"><data encoding="csv">0,0,0,1,1,1</data></layer>
</map>"#,
        )
        .expect("write tmx");

        let mut value = base_def();
        value["tmx"] = json!("village.tmx");
        value["background"][0] = json!({ "name": "terrain", "tmx_layer": "Terrain" });
        value["collisions"] = json!({ "name": "collisions", "tmx_layer": "Collisions" });
        let level = Level::from_def(parse(value), temp.path()).expect("level");

        assert_eq!(level.background().get("terrain").and_then(|g| g.get(0, 1)), Some(2));
        assert_eq!(level.collisions().get(2, 1), Some(1));

        let mut value = base_def();
        value["tmx"] = json!("village.tmx");
        value["background"][0] = json!({ "name": "terrain", "tmx_layer": "Houses" });
        assert!(matches!(
            Level::from_def(parse(value), temp.path()),
            Err(LevelError::UnknownTmxLayer { ref available, .. }) if available == "Terrain, Collisions"
        ));
    }

    #[test]
    fn tileset_tile_size_must_match_level() {
        let mut value = base_def();
        value["tile_size"] = json!(2);
        value["background"] = json!([{ "name": "terrain", "data": [[0, 0, 0, 1]] }]);
        value["foreground"] = json!([]);
        value["collisions"]["data"] = json!([[0, 0, 0, 0]]);
        value["tilesets"] = json!({
            "terrain": { "image": "images/terrain.png", "tile_size": 4 }
        });

        let error = Level::from_def(parse(value), Path::new(".")).expect_err("mismatch");

        assert!(matches!(
            error,
            LevelError::TilesetTileSize { ref tileset, expected: 2, found: 4 } if tileset == "terrain"
        ));
    }

    #[test]
    fn tmx_tile_width_must_match_level() {
        let temp = TempDir::new().expect("temp");
        std::fs::write(
            temp.path().join("small.tmx"),
            r#"<map width="3" height="2" tilewidth="8" tileheight="8">
 <layer name="Terrain" width="3" height="2"><data encoding="csv">1,1,1,2,2,2</data></layer>
</map>"#,
        )
        .expect("write tmx");

        let mut value = base_def();
        value["tmx"] = json!("small.tmx");
        assert!(matches!(
            Level::from_def(parse(value), temp.path()),
            Err(LevelError::TmxTileSize { expected: 16, found: 8 })
        ));
    }
}
