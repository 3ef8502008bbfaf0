//! Zone overlap tracking.
//!
//! Each robotic arm watches a square zone in front of it. Every tick the
//! tracker compares the loose items overlapping each zone with the previous
//! tick and reports who entered and who left.

use crate::entity::{EntityId, Placement};
use crate::world::World;
use bevy_math::bounding::{Aabb2d, BoundingCircle, IntersectsVolume};
use glam::Vec2;
use slotmap::SecondaryMap;

/// A change in zone occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneEvent {
    Enter { zone: EntityId, other: EntityId },
    Leave { zone: EntityId, other: EntityId },
}

/// Remembers which bodies overlapped each zone on the previous sweep.
#[derive(Debug, Default)]
pub struct ZoneTracker {
    contacts: SecondaryMap<EntityId, Vec<EntityId>>,
}

impl ZoneTracker {
    /// A tracker with no contacts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs current overlaps against the last sweep.
    ///
    /// Leaves are reported before enters, each in body order.
    pub fn sweep(
        &mut self,
        zones: &[(EntityId, Aabb2d)],
        bodies: &[(EntityId, BoundingCircle)],
    ) -> Vec<ZoneEvent> {
        let mut events = Vec::new();

        for (zone, aabb) in zones {
            let current: Vec<EntityId> = bodies
                .iter()
                .filter(|(other, circle)| other != zone && aabb.intersects(circle))
                .map(|(other, _)| *other)
                .collect();
            let previous = self.contacts.remove(*zone).unwrap_or_default();

            events.extend(
                previous
                    .iter()
                    .filter(|other| !current.contains(*other))
                    .map(|&other| ZoneEvent::Leave { zone: *zone, other }),
            );
            events.extend(
                current
                    .iter()
                    .filter(|other| !previous.contains(*other))
                    .map(|&other| ZoneEvent::Enter { zone: *zone, other }),
            );

            self.contacts.insert(*zone, current);
        }

        events
    }

    /// Drops all contacts of a zone, e.g. when its owner despawns.
    pub fn forget_zone(&mut self, zone: EntityId) {
        self.contacts.remove(zone);
    }

    /// Bodies overlapping `zone` at the last sweep.
    pub fn contacts(&self, zone: EntityId) -> &[EntityId] {
        self.contacts.get(zone).map(Vec::as_slice).unwrap_or_default()
    }
}

impl World {
    /// Returns `true` while the item is in flight.
    pub fn is_thrown(&self, uid: EntityId) -> bool {
        self.thrown.contains_key(uid)
    }

    /// Marks an item as flying through the air (too fast to be caught).
    pub fn set_thrown(&mut self, uid: EntityId, thrown: bool) {
        if thrown {
            if self.entities.contains_key(uid) {
                self.thrown.insert(uid, ());
            }
        } else {
            self.thrown.remove(uid);
        }
    }

    /// Whether the item may fall asleep. `None` if it has no wake behaviour.
    pub fn collision_wake(&self, uid: EntityId) -> Option<bool> {
        self.collision_wake.get(uid).copied()
    }

    /// Sets the wake flag of an item that has wake behaviour; others are left alone.
    pub fn set_collision_wake(&mut self, uid: EntityId, enabled: bool) {
        if let Some(wake) = self.collision_wake.get_mut(uid) {
            *wake = enabled;
        }
    }

    /// Runs one overlap sweep over every arm's pickup zone and delivers the events.
    pub(crate) fn step_physics(&mut self) {
        let half = Vec2::splat(self.config.zone_half_extent);
        let zones: Vec<(EntityId, Aabb2d)> = self
            .arms
            .keys()
            .filter_map(|uid| Some((uid, Aabb2d::new(self.input_position(uid)?, half))))
            .collect();

        let radius = self.config.item_radius;
        let bodies: Vec<(EntityId, BoundingCircle)> = self
            .items
            .keys()
            .filter(|uid| matches!(self.placements.get(*uid), Some(Placement::Ground)))
            .filter_map(|uid| {
                let xform = self.transforms.get(uid)?;
                Some((uid, BoundingCircle::new(xform.position, radius)))
            })
            .collect();

        for event in self.zones.sweep(&zones, &bodies) {
            match event {
                ZoneEvent::Enter { zone, other } => {
                    self.with_arm(zone, |world, arm| arm.on_start_collide(world, zone, other));
                }
                ZoneEvent::Leave { zone, other } => {
                    self.with_arm(zone, |world, arm| arm.on_end_collide(world, other));
                }
            }
        }
    }
}
