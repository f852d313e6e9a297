mod actor;
mod collision;

pub use actor::{Actor, PhysicsConfig, PhysicsConfigError};
pub use collision::{derive_collision_blocks, CollisionBlock, CollisionBlocks, SOLID_SYMBOL};
