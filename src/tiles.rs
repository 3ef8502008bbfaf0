//! Tile grid queries and collision groups.

use crate::entity::EntityId;
use crate::world::World;
use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::BitOr;

/// Bitmask of collision layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionGroup(pub u32);

impl CollisionGroup {
    pub const NONE: Self = Self(0);
    pub const OPAQUE: Self = Self(1 << 0);
    pub const IMPASSABLE: Self = Self(1 << 1);
    pub const MID_IMPASSABLE: Self = Self(1 << 2);
    pub const HIGH_IMPASSABLE: Self = Self(1 << 3);
    pub const LOW_IMPASSABLE: Self = Self(1 << 4);
    pub const ITEM: Self = Self(1 << 5);

    /// Layers occupied by a full wall.
    pub const WALL_LAYER: Self = Self(
        Self::OPAQUE.0
            | Self::IMPASSABLE.0
            | Self::MID_IMPASSABLE.0
            | Self::HIGH_IMPASSABLE.0
            | Self::LOW_IMPASSABLE.0,
    );
    /// Layers occupied by an anchored machine.
    pub const MACHINE_LAYER: Self = Self(Self::MID_IMPASSABLE.0 | Self::LOW_IMPASSABLE.0);
    /// Anything in these layers stops a machine-sized object.
    pub const MACHINE_MASK: Self =
        Self(Self::IMPASSABLE.0 | Self::MID_IMPASSABLE.0 | Self::LOW_IMPASSABLE.0);

    /// Returns `true` if the groups share any layer.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for CollisionGroup {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The grid: walled tiles plus an index of anchored bodies by tile.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TileMap {
    walls: HashSet<IVec2>,
    #[serde(skip)]
    bodies: HashMap<IVec2, Vec<EntityId>>,
}

impl TileMap {
    /// An empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Walls off `tile`, or clears it.
    pub fn set_wall(&mut self, tile: IVec2, wall: bool) {
        if wall {
            self.walls.insert(tile);
        } else {
            self.walls.remove(&tile);
        }
    }

    /// Returns `true` if `tile` is walled off.
    pub fn is_wall(&self, tile: IVec2) -> bool {
        self.walls.contains(&tile)
    }

    /// Anchored bodies indexed on `tile`.
    pub fn bodies_on(&self, tile: IVec2) -> &[EntityId] {
        self.bodies.get(&tile).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn insert_body(&mut self, tile: IVec2, uid: EntityId) {
        let bodies = self.bodies.entry(tile).or_default();
        if !bodies.contains(&uid) {
            bodies.push(uid);
        }
    }

    pub(crate) fn remove_body(&mut self, tile: IVec2, uid: EntityId) {
        if let Some(bodies) = self.bodies.get_mut(&tile) {
            bodies.retain(|&body| body != uid);
            if bodies.is_empty() {
                self.bodies.remove(&tile);
            }
        }
    }
}

impl World {
    /// Grid tile containing `position`.
    pub fn tile_at(&self, position: Vec2) -> IVec2 {
        (position / self.config.tile_size).floor().as_ivec2()
    }

    /// Centre of `tile` in world units.
    pub fn tile_center(&self, tile: IVec2) -> Vec2 {
        (tile.as_vec2() + Vec2::splat(0.5)) * self.config.tile_size
    }

    /// Returns `true` if a wall or an anchored body in `mask` occupies `tile`.
    pub fn is_tile_blocked(&self, tile: IVec2, mask: CollisionGroup) -> bool {
        if self.tiles.is_wall(tile) && CollisionGroup::WALL_LAYER.intersects(mask) {
            return true;
        }

        self.tiles.bodies_on(tile).iter().any(|&uid| {
            self.anchored
                .get(uid)
                .is_some_and(|layer| layer.intersects(mask))
        })
    }

    /// Walls off `tile`, or clears it.
    pub fn set_wall(&mut self, tile: IVec2, wall: bool) {
        self.tiles.set_wall(tile, wall);
    }

    /// Anchors `uid` to its tile so it blocks `layer`.
    pub fn anchor(&mut self, uid: EntityId, layer: CollisionGroup) {
        let Some(position) = self.transforms.get(uid).map(|xform| xform.position) else {
            return;
        };
        self.anchored.insert(uid, layer);
        let tile = self.tile_at(position);
        self.tiles.insert_body(tile, uid);
    }

    /// Drops `uid` from the tile index; it no longer blocks anything.
    pub fn unanchor(&mut self, uid: EntityId) {
        if self.anchored.remove(uid).is_none() {
            return;
        }
        if let Some(position) = self.transforms.get(uid).map(|xform| xform.position) {
            let tile = self.tile_at(position);
            self.tiles.remove_body(tile, uid);
        }
    }

    /// Moves `uid`, keeping the tile index current for anchored bodies.
    pub(crate) fn move_entity(&mut self, uid: EntityId, position: Vec2) {
        let Some(xform) = self.transforms.get_mut(uid) else {
            return;
        };
        let from = xform.position;
        xform.position = position;

        if self.anchored.contains_key(uid) {
            let (old, new) = (self.tile_at(from), self.tile_at(position));
            if old != new {
                self.tiles.remove_body(old, uid);
                self.tiles.insert_body(new, uid);
            }
        }
    }
}
