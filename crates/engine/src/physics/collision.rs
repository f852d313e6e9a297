use crate::geom::Rect;
use crate::map::Grid;

/// Collision-grid symbol that marks a solid cell.
pub const SOLID_SYMBOL: u32 = 1;

/// Immutable solid rectangle in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBlock {
    rect: Rect,
}

impl CollisionBlock {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            rect: Rect::new(x, y, size, size),
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionBlocks {
    block_size: f32,
    blocks: Vec<CollisionBlock>,
}

impl CollisionBlocks {
    pub fn new(block_size: f32, blocks: Vec<CollisionBlock>) -> Self {
        Self { block_size, blocks }
    }

    pub fn block_size(&self) -> f32 {
        self.block_size
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionBlock> {
        self.blocks.iter()
    }
}

/// One block per solid cell, at `(col * block_size, row * block_size)`.
pub fn derive_collision_blocks(grid: &Grid, block_size: u32) -> CollisionBlocks {
    let size = block_size as f32;
    let blocks = grid
        .cells()
        .filter(|(_, _, symbol)| *symbol == SOLID_SYMBOL)
        .map(|(col, row, _)| CollisionBlock::new(col as f32 * size, row as f32 * size, size))
        .collect();
    CollisionBlocks::new(size, blocks)
}
