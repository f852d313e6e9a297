use serde::Deserialize;
use thiserror::Error;

use crate::app::{InputAction, InputSnapshot};
use crate::geom::{Rect, Vec2};

use super::collision::CollisionBlocks;

/// Movement constants in world pixels and seconds. Level files may override any field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    pub move_speed: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            move_speed: 100.0,
            gravity: 580.0,
            max_fall_speed: 400.0,
            jump_speed: 260.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PhysicsConfigError {
    #[error("{field} must be finite and >= 0, got {value}")]
    InvalidValue { field: &'static str, value: f32 },
    #[error(
        "actor can move {max_displacement}px in one frame, which reaches the {block_size}px \
block size; lower the speeds or the maximum frame delta"
    )]
    TunnelingRisk {
        max_displacement: f32,
        block_size: f32,
    },
}

impl PhysicsConfig {
    /// Largest distance the actor can cover on either axis in a frame of `max_dt` seconds.
    pub fn max_step_displacement(&self, max_dt: f32) -> f32 {
        self.move_speed
            .max(self.max_fall_speed)
            .max(self.jump_speed)
            * max_dt
    }

    /// Collision is resolved per frame without sweeping, so a frame must never move the
    /// actor a full block.
    pub fn validate(&self, block_size: f32, max_dt: f32) -> Result<(), PhysicsConfigError> {
        for (field, value) in [
            ("move_speed", self.move_speed),
            ("gravity", self.gravity),
            ("max_fall_speed", self.max_fall_speed),
            ("jump_speed", self.jump_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsConfigError::InvalidValue { field, value });
            }
        }

        let max_displacement = self.max_step_displacement(max_dt);
        if max_displacement >= block_size {
            return Err(PhysicsConfigError::TunnelingRisk {
                max_displacement,
                block_size,
            });
        }
        Ok(())
    }
}

/// The single controllable square. `position` is the top-left corner, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Actor {
    position: Vec2,
    velocity: Vec2,
    size: f32,
    grounded: bool,
}

impl Actor {
    pub fn new(position: Vec2, size: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size,
            grounded: false,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }

    /// Advances one frame: input, horizontal move and resolve, gravity, vertical move and
    /// resolve. A non-positive `dt` leaves the actor untouched.
    pub fn update(
        &mut self,
        dt: f32,
        input: &InputSnapshot,
        blocks: &CollisionBlocks,
        physics: &PhysicsConfig,
    ) {
        if !(dt > 0.0) {
            return;
        }

        self.apply_input(input, physics);

        self.position.x += self.velocity.x * dt;
        self.resolve_horizontal(blocks);

        self.velocity.y = (self.velocity.y + physics.gravity * dt).min(physics.max_fall_speed);
        self.position.y += self.velocity.y * dt;
        self.resolve_vertical(blocks);
    }

    fn apply_input(&mut self, input: &InputSnapshot, physics: &PhysicsConfig) {
        self.velocity.x = input.horizontal_axis() * physics.move_speed;

        if input.is_down(InputAction::MoveUp) && self.grounded {
            self.velocity.y = -physics.jump_speed;
            self.grounded = false;
        }
    }

    fn resolve_horizontal(&mut self, blocks: &CollisionBlocks) {
        let direction = self.velocity.x;
        if direction == 0.0 {
            return;
        }
        for block in blocks.iter().map(|block| block.rect()) {
            if !self.bounds().overlaps(&block) {
                continue;
            }
            if direction > 0.0 {
                self.position.x = block.left() - self.size;
            } else {
                self.position.x = block.right();
            }
        }
    }

    fn resolve_vertical(&mut self, blocks: &CollisionBlocks) {
        self.grounded = false;
        let direction = self.velocity.y;
        if direction == 0.0 {
            return;
        }
        for block in blocks.iter().map(|block| block.rect()) {
            if !self.bounds().overlaps(&block) {
                continue;
            }
            if direction > 0.0 {
                self.position.y = block.top() - self.size;
                self.grounded = true;
            } else {
                self.position.y = block.bottom();
            }
            self.velocity.y = 0.0;
        }
    }
}
