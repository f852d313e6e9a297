use std::env;
use std::path::PathBuf;

use engine::{resolve_app_paths, Level, LoopConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::level_file::load_level_file;

const LEVEL_ENV_VAR: &str = "TILEWALK_LEVEL";
const SCALE_ENV_VAR: &str = "TILEWALK_SCALE";
const DEFAULT_LEVEL_FILE: &str = "village.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) level: Level,
    pub(crate) asset_root: PathBuf,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== tilewalk startup ===");

    let app_paths = resolve_app_paths().map_err(|error| error.to_string())?;
    let level_path = app_paths.levels_dir.join(level_file_from_env());
    info!(
        root = %app_paths.root.display(),
        level = %level_path.display(),
        "startup"
    );

    let level = load_level_file(&level_path)?;
    let (width_tiles, height_tiles) = level.dimensions();
    info!(
        width_tiles,
        height_tiles,
        tile_size = level.tile_size(),
        background_layers = level.background().len(),
        foreground_layers = level.foreground().len(),
        "level_loaded"
    );

    let config = LoopConfig {
        scale: parse_scale(env::var(SCALE_ENV_VAR).ok().as_deref())
            .unwrap_or(LoopConfig::default().scale),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        level,
        asset_root: app_paths.assets_dir,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn level_file_from_env() -> String {
    env::var(LEVEL_ENV_VAR)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL_FILE.to_string())
}

fn parse_scale(raw: Option<&str>) -> Option<f32> {
    let raw = raw?.trim();
    match raw.parse::<f32>() {
        Ok(scale) if scale.is_finite() && scale > 0.0 => Some(scale),
        _ => {
            warn!(
                env_var = SCALE_ENV_VAR,
                value = raw,
                "invalid scale env var value; using default"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_accepts_positive_numbers_only() {
        assert_eq!(parse_scale(Some("3")), Some(3.0));
        assert_eq!(parse_scale(Some(" 2.5 ")), Some(2.5));
        assert_eq!(parse_scale(Some("0")), None);
        assert_eq!(parse_scale(Some("-1")), None);
        assert_eq!(parse_scale(Some("huge")), None);
        assert_eq!(parse_scale(None), None);
    }
}
