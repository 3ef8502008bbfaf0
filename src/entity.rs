//! Entity handles, transforms and item placements.

use glam::Vec2;
use serde::{Deserialize, Serialize};

slotmap::new_key_type! {
    /// An opaque, generational handle to an entity in a [`World`](crate::World).
    ///
    /// Handles to despawned entities never resolve again, even if the
    /// underlying slot is reused.
    pub struct EntityId;
}

/// World-space pose of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world units (one tile is `WorldConfig::tile_size` wide).
    pub position: Vec2,

    /// Facing angle in radians, counter-clockwise from `+X`.
    pub rotation: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
        }
    }
}

impl Transform {
    /// A pose at `position` facing `rotation` radians.
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    /// Unit vector the entity is facing.
    pub fn facing(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }

    /// Returns `true` if `other` lies within `range` of this position.
    pub fn in_range(&self, other: Vec2, range: f32) -> bool {
        self.position.distance_squared(other) <= range * range
    }
}

/// Where an item currently lives. Every item has exactly one placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    /// Loose on the floor at its transform's position.
    Ground,
    /// Inside the container of a storage bin.
    Container(EntityId),
    /// Held in a named single-item slot of the owner.
    Slot { owner: EntityId, slot: String },
}
