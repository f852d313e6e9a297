use std::fs;
use std::path::Path;

use engine::{Level, LevelDef};

pub(crate) type LevelFileResult<T> = Result<T, String>;

pub(crate) fn load_level_file(path: &Path) -> LevelFileResult<Level> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read level '{}': {error}", path.display()))?;
    let def = parse_level_json(&raw)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Level::from_def(def, base_dir)
        .map_err(|error| format!("invalid level '{}': {error}", path.display()))
}

fn parse_level_json(raw: &str) -> LevelFileResult<LevelDef> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, LevelDef>(&mut deserializer) {
        Ok(def) => Ok(def),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse level json: {source}"))
            } else {
                Err(format!("parse level json at {path}: {source}"))
            }
        }
    }
}
