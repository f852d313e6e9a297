use tracing::debug;

use crate::app::InputSnapshot;
use crate::camera::camera_offset;
use crate::geom::Vec2;
use crate::level::Level;
use crate::physics::{derive_collision_blocks, Actor, CollisionBlocks, PhysicsConfig, PhysicsConfigError};

/// Per-run simulation state: the actor, the blocks it collides with, and the constants the
/// camera clamps against. Sessions share nothing, so several can run side by side.
#[derive(Debug, Clone)]
pub struct Session {
    actor: Actor,
    blocks: CollisionBlocks,
    physics: PhysicsConfig,
    map_size: Vec2,
    viewport_size: Vec2,
    max_frame_dt: f32,
}

impl Session {
    /// `viewport_size` is in world pixels. Fails when the level's physics could move the
    /// actor a whole block within one `max_frame_dt` frame.
    pub fn new(level: &Level, viewport_size: Vec2, max_frame_dt: f32) -> Result<Self, PhysicsConfigError> {
        let blocks = derive_collision_blocks(level.collisions(), level.tile_size());
        let physics = *level.physics();
        physics.validate(blocks.block_size(), max_frame_dt)?;

        let actor = Actor::new(level.spawn_position(), level.spawn_size());
        debug!(
            blocks = blocks.len(),
            spawn_x = actor.position().x,
            spawn_y = actor.position().y,
            "session_created"
        );

        Ok(Self {
            actor,
            blocks,
            physics,
            map_size: level.map_size(),
            viewport_size,
            max_frame_dt,
        })
    }

    /// Advances the actor by `dt` seconds (clamped to `[0, max_frame_dt]`) and returns the
    /// camera offset to draw this frame with.
    pub fn step(&mut self, dt: f32, input: &InputSnapshot) -> Vec2 {
        let dt = clamp_frame_dt(dt, self.max_frame_dt);
        self.actor.update(dt, input, &self.blocks, &self.physics);
        self.camera_offset()
    }

    pub fn camera_offset(&self) -> Vec2 {
        camera_offset(self.actor.center(), self.viewport_size, self.map_size)
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn blocks(&self) -> &CollisionBlocks {
        &self.blocks
    }
}

/// Long stalls (a dragged window, a debugger pause) must not turn into one giant physics
/// step. Negative and non-finite deltas count as no time passing.
pub fn clamp_frame_dt(dt: f32, max_frame_dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    dt.min(max_frame_dt)
}
