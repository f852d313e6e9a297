use thiserror::Error;

use super::grid::{Grid, GridError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub grid: Grid,
}

/// Named tile layers in draw order. Every layer shares the dimensions of the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerSetError {
    #[error("duplicate layer name '{0}'")]
    DuplicateName(String),
    #[error("layer '{name}': {source}")]
    Dimensions {
        name: String,
        #[source]
        source: GridError,
    },
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, grid: Grid) -> Result<(), LayerSetError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(LayerSetError::DuplicateName(name));
        }
        if let Some((width, height)) = self.dimensions() {
            grid.ensure_dimensions(width, height)
                .map_err(|source| LayerSetError::Dimensions {
                    name: name.clone(),
                    source,
                })?;
        }
        self.layers.push(Layer { name, grid });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Grid> {
        self.layers
            .iter()
            .find(|layer| layer.name == name)
            .map(|layer| &layer.grid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `(width, height)` in tiles, or `None` for an empty set.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.layers
            .first()
            .map(|layer| (layer.grid.width(), layer.grid.height()))
    }
}
