use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;
pub mod camera;
pub mod geom;
pub mod level;
pub mod map;
pub mod physics;
pub mod session;

pub use app::{
    run_app, world_to_screen_px, AppError, FrameScene, InputAction, InputSnapshot, LoopConfig,
    Renderer, ViewTransform, Viewport, SLOW_FRAME_ENV_VAR,
};
pub use assets::{load_assets, load_assets_with, AssetLoadFailure, AssetSet};
pub use camera::camera_offset;
pub use geom::{Rect, Vec2};
pub use level::{LayerDef, Level, LevelDef, LevelError, SpawnDef};
pub use map::{
    compose_static_layers, load_tmx, parse_tmx, tile_source_origin, CompositeError,
    CompositeOutcome, FileTilesets, Grid, GridError, Layer, LayerSet, LayerSetError, SheetImage,
    SkippedLayer, StaticSurface, Tileset, TilesetLoadError, TilesetProvider, TilesetSpec, TmxError,
    TmxMap,
};
pub use physics::{
    derive_collision_blocks, Actor, CollisionBlock, CollisionBlocks, PhysicsConfig,
    PhysicsConfigError, SOLID_SYMBOL,
};
pub use session::{clamp_frame_dt, Session};

pub const ROOT_ENV_VAR: &str = "TILEWALK_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub levels_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "TILEWALK_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/tilewalk\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_for_root(root))
}

fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let assets_dir = root.join("assets");
    let levels_dir = assets_dir.join("levels");
    AppPaths {
        root,
        assets_dir,
        levels_dir,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
