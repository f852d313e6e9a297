//! Import of tile layers from Tiled `.tmx` maps (orthogonal, CSV or XML tile data).

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

use super::grid::{Grid, GridError};

/// Tiled stores flip/rotation flags in the high bits of each GID.
const GID_FLAG_MASK: u32 = 0x0FFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmxMap {
    tile_width: u32,
    layers: Vec<(String, Grid)>,
}

#[derive(Debug, Error)]
pub enum TmxError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML at line {line}, column {column}: {message}")]
    Xml {
        message: String,
        line: u32,
        column: u32,
    },
    #[error("root element must be <map>, found <{0}>")]
    InvalidRoot(String),
    #[error("<{element}> at line {line} is missing attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        line: u32,
    },
    #[error("'{value}' at line {line} is not a valid number")]
    InvalidNumber { value: String, line: u32 },
    #[error("layer '{layer}' uses unsupported data encoding '{encoding}'; save the map as CSV")]
    UnsupportedEncoding { layer: String, encoding: String },
    #[error("layer '{layer}': {source}")]
    Grid {
        layer: String,
        #[source]
        source: GridError,
    },
}

impl TmxMap {
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn layer(&self, name: &str) -> Option<&Grid> {
        self.layers
            .iter()
            .find(|(layer_name, _)| layer_name == name)
            .map(|(_, grid)| grid)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|(name, _)| name.as_str())
    }
}

pub fn load_tmx(path: &Path) -> Result<TmxMap, TmxError> {
    let raw = fs::read_to_string(path).map_err(|source| TmxError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tmx(&raw)
}

pub fn parse_tmx(raw: &str) -> Result<TmxMap, TmxError> {
    let doc = Document::parse(raw).map_err(|error| TmxError::Xml {
        message: error.to_string(),
        line: error.pos().row,
        column: error.pos().col,
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(TmxError::InvalidRoot(root.tag_name().name().to_string()));
    }

    let width = numeric_attribute(&doc, root, "map", "width")?;
    let height = numeric_attribute(&doc, root, "map", "height")?;
    let tile_width = numeric_attribute(&doc, root, "map", "tilewidth")?;

    let mut layers = Vec::new();
    for layer in root
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "layer")
    {
        let name = layer
            .attribute("name")
            .ok_or_else(|| TmxError::MissingAttribute {
                element: "layer",
                attribute: "name",
                line: line_of(&doc, layer),
            })?
            .to_string();
        let layer_width = numeric_attribute(&doc, layer, "layer", "width")?;
        let layer_height = numeric_attribute(&doc, layer, "layer", "height")?;
        let cells = read_layer_cells(&doc, layer, &name)?;
        let grid = Grid::from_flat(layer_width, layer_height, cells)
            .and_then(|grid| grid.ensure_dimensions(width, height).map(|()| grid))
            .map_err(|source| TmxError::Grid {
                layer: name.clone(),
                source,
            })?;
        layers.push((name, grid));
    }

    Ok(TmxMap {
        tile_width,
        layers,
    })
}

fn read_layer_cells(doc: &Document<'_>, layer: Node<'_, '_>, name: &str) -> Result<Vec<u32>, TmxError> {
    let Some(data) = layer
        .children()
        .find(|node| node.is_element() && node.tag_name().name() == "data")
    else {
        return Ok(Vec::new());
    };

    match data.attribute("encoding") {
        Some("csv") => data
            .text()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| parse_gid(doc, data, value))
            .collect(),
        None => data
            .children()
            .filter(|node| node.is_element() && node.tag_name().name() == "tile")
            .map(|tile| parse_gid(doc, tile, tile.attribute("gid").unwrap_or("0")))
            .collect(),
        Some(other) => Err(TmxError::UnsupportedEncoding {
            layer: name.to_string(),
            encoding: other.to_string(),
        }),
    }
}

fn parse_gid(doc: &Document<'_>, node: Node<'_, '_>, value: &str) -> Result<u32, TmxError> {
    value
        .parse::<u32>()
        .map(|gid| gid & GID_FLAG_MASK)
        .map_err(|_| TmxError::InvalidNumber {
            value: value.to_string(),
            line: line_of(doc, node),
        })
}

fn numeric_attribute(
    doc: &Document<'_>,
    node: Node<'_, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<u32, TmxError> {
    let value = node
        .attribute(attribute)
        .ok_or_else(|| TmxError::MissingAttribute {
            element,
            attribute,
            line: line_of(doc, node),
        })?;
    value.parse::<u32>().map_err(|_| TmxError::InvalidNumber {
        value: value.to_string(),
        line: line_of(doc, node),
    })
}

fn line_of(doc: &Document<'_>, node: Node<'_, '_>) -> u32 {
    doc.text_pos_at(node.range().start).row
}
