//! The robotic arm: moves one item at a time from an input to an output.
//!
//! An arm is either *idle* (empty hand, no deadline) or *carrying* (holding an
//! item until `next_move`). Each tick, while powered:
//!
//! - idle arms try to pick something up, first from a linked input machine and
//!   otherwise from the items queued in their pickup zone;
//! - carrying arms whose deadline passed try to drop, first into a linked
//!   output machine and otherwise onto the free tile behind them.
//!
//! A failed drop keeps the item and retries on the next tick, so a blocked
//! output parks the arm instead of destroying anything.

use crate::config::ArmConfig;
use crate::entity::{EntityId, Transform};
use crate::error::{AutomationError, AutomationResult};
use crate::filter::is_blocked;
use crate::item::ItemSlots;
use crate::link::{Link, LinkAttempt, PortDisconnected};
use crate::power::PowerReceiver;
use crate::slot::{AutomationSlot, SlotHandle};
use crate::tiles::CollisionGroup;
use crate::world::World;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// An item waiting in the pickup zone, with the wake flag it had on entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedItem {
    pub item: EntityId,
    pub wake_enabled: bool,
}

/// Robotic arm component. Everything except the resolved slot handles is
/// plain data and survives serialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoboticArm {
    pub config: ArmConfig,

    input_machine: Option<EntityId>,
    input_machine_port: Option<String>,
    #[serde(skip)]
    input_slot: Option<SlotHandle>,

    output_machine: Option<EntityId>,
    output_machine_port: Option<String>,
    #[serde(skip)]
    output_slot: Option<SlotHandle>,

    /// Items in the pickup zone, oldest first. Drained from the back.
    input_items: Vec<QueuedItem>,

    /// When the carried item may be dropped. `None` while idle.
    next_move: Option<Duration>,
}

/// A robotic arm together with the item it carries, as produced by
/// [`World::save_arm`]. Plain data; entity handles must be remapped by the
/// caller if the world is rebuilt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedArm {
    pub arm: RoboticArm,
    pub carried: Option<EntityId>,
}

impl RoboticArm {
    /// An idle, unlinked arm.
    pub fn new(config: ArmConfig) -> Self {
        Self {
            config,
            input_machine: None,
            input_machine_port: None,
            input_slot: None,
            output_machine: None,
            output_machine_port: None,
            output_slot: None,
            input_items: Vec::new(),
            next_move: None,
        }
    }

    /// Linked input machine and the source port chosen on it.
    pub fn input_link(&self) -> Option<(EntityId, &str)> {
        Some((self.input_machine?, self.input_machine_port.as_deref()?))
    }

    /// Linked output machine and the sink port chosen on it.
    pub fn output_link(&self) -> Option<(EntityId, &str)> {
        Some((self.output_machine?, self.output_machine_port.as_deref()?))
    }

    /// Items waiting in the pickup zone, oldest first.
    pub fn queued_items(&self) -> &[QueuedItem] {
        &self.input_items
    }

    /// Deadline of the current carry, `None` while idle.
    pub fn next_move(&self) -> Option<Duration> {
        self.next_move
    }

    fn input_machine(&self, world: &World) -> Option<EntityId> {
        self.input_machine.filter(|&machine| world.contains(machine))
    }

    fn output_machine(&self, world: &World) -> Option<EntityId> {
        self.output_machine.filter(|&machine| world.contains(machine))
    }

    fn input_target(&self, world: &World) -> Option<(EntityId, Arc<dyn AutomationSlot>)> {
        let machine = self.input_machine(world)?;
        Some((machine, world.resolve_slot(self.input_slot?)?))
    }

    fn output_target(&self, world: &World) -> Option<(EntityId, Arc<dyn AutomationSlot>)> {
        let machine = self.output_machine(world)?;
        Some((machine, world.resolve_slot(self.output_slot?)?))
    }

    /// Re-resolves cached slot handles from the linked machines and ports.
    pub(crate) fn refresh_slots(&mut self, world: &World) {
        self.input_slot = match (self.input_machine, self.input_machine_port.as_deref()) {
            (Some(machine), Some(port)) => world.get_slot(machine, port, false),
            _ => None,
        };
        self.output_slot = match (self.output_machine, self.output_machine_port.as_deref()) {
            (Some(machine), Some(port)) => world.get_slot(machine, port, true),
            _ => None,
        };
    }

    fn update(&mut self, world: &mut World, uid: EntityId) {
        if !world.is_powered(uid) {
            return;
        }

        let now = world.now();
        if let Some(next_move) = self.next_move
            && now < next_move
        {
            return;
        }

        if let Some(item) = world.item_in_slot(uid, &self.config.item_slot_id) {
            if !self.try_drop(world, uid, item) {
                // keep the load, try again next tick
                self.next_move = None;
                trace!(?uid, ?item, "drop blocked, retrying");
                return;
            }

            self.stop_moving(world, uid);
            world.links.invoke_port(uid, &self.config.moved_port);
            debug!(?uid, ?item, "robotic arm moved item");
        } else if self.try_pickup_any(world, uid) {
            self.start_moving(world, uid, now);
        } else {
            self.stop_moving(world, uid);
        }
    }

    fn start_moving(&mut self, world: &mut World, uid: EntityId, now: Duration) {
        world.set_load(uid, self.config.moving_power_draw);
        self.next_move = Some(now + self.config.move_delay);
    }

    fn stop_moving(&mut self, world: &mut World, uid: EntityId) {
        world.set_load(uid, self.config.idle_power_draw);
        self.next_move = None;
    }

    /// Inserts into the linked output machine, or drops onto the output tile
    /// when nothing is linked.
    fn try_drop(&self, world: &mut World, uid: EntityId, item: EntityId) -> bool {
        if let Some((machine, slot)) = self.output_target(world) {
            return Self::try_insert(world, uid, item, machine, slot.as_ref());
        }

        // no dropping items into walls
        if world.is_output_blocked(uid) {
            return false;
        }

        let Some(position) = world.output_position(uid) else {
            return false;
        };
        world.place_on_ground(item, position)
    }

    fn try_insert(
        world: &mut World,
        uid: EntityId,
        item: EntityId,
        machine: EntityId,
        slot: &dyn AutomationSlot,
    ) -> bool {
        // the machine has to still be at the output point it was linked at
        let Some(position) = world.output_position(uid) else {
            return false;
        };
        if !world.is_within_snap(machine, position) {
            return false;
        }

        slot.insert(world, item)
    }

    fn try_pickup_any(&mut self, world: &mut World, uid: EntityId) -> bool {
        if let Some((machine, slot)) = self.input_target(world) {
            return self.try_pickup_from(world, uid, machine, slot.as_ref());
        }

        if self.input_items.is_empty() {
            return false;
        }

        let output = self.output_target(world).map(|(_, slot)| slot);
        if output.is_none() && world.is_output_blocked(uid) {
            return false;
        }
        if !world.item_slot_accepts(uid, &self.config.item_slot_id) {
            return false;
        }

        // newest first; removing near the end is cheap
        let filter = world.filter_for(uid).cloned();
        let mut found = None;
        for i in (0..self.input_items.len()).rev() {
            let candidate = self.input_items[i].item;
            if !world.is_on_ground(candidate) {
                continue;
            }
            if world.is_item_blocked(filter.as_ref(), candidate) {
                continue;
            }
            // make sure the destination will take it or it gets stuck
            if let Some(output) = &output
                && !output.can_insert(world, candidate)
            {
                continue;
            }

            self.input_items.remove(i);
            found = Some(candidate);
            break;
        }

        let Some(item) = found else {
            return false;
        };

        world.set_collision_wake(item, false);
        let picked = world.insert_into_item_slot(uid, &self.config.item_slot_id, item);
        if picked {
            debug!(?uid, ?item, "picked up item from zone");
        }
        picked
    }

    fn try_pickup_from(
        &self,
        world: &mut World,
        uid: EntityId,
        machine: EntityId,
        slot: &dyn AutomationSlot,
    ) -> bool {
        // the machine has to still be at the input point it was linked at
        let Some(position) = world.input_position(uid) else {
            return false;
        };
        if !world.is_within_snap(machine, position) {
            return false;
        }
        if !world.item_slot_accepts(uid, &self.config.item_slot_id) {
            return false;
        }

        let filter = world.filter_for(uid).cloned();
        let Some(item) = slot.get_item(world, filter.as_ref()) else {
            return false;
        };
        if world.is_item_blocked(filter.as_ref(), item) {
            return false;
        }
        let Some(stack) = world.try_split(filter.as_ref(), item) else {
            return false;
        };

        let picked = world.insert_into_item_slot(uid, &self.config.item_slot_id, stack);
        if picked {
            debug!(?uid, ?machine, item = ?stack, "picked up item from machine");
        }
        picked
    }

    pub(crate) fn on_start_collide(&mut self, world: &mut World, uid: EntityId, item: EntityId) {
        // never pick up non-items
        let Some(stack) = world.item(item) else {
            return;
        };
        // thrown items move too fast to be caught
        if world.is_thrown(item) {
            return;
        }
        if is_blocked(world.filter_for(uid), stack) {
            return;
        }
        if self.input_items.iter().any(|queued| queued.item == item) {
            return;
        }

        // only a real leave should end the contact, not the item falling asleep
        let wake_enabled = world.collision_wake(item).unwrap_or(false);
        world.set_collision_wake(item, false);
        self.input_items.push(QueuedItem { item, wake_enabled });
        trace!(?uid, ?item, queued = self.input_items.len(), "item entered pickup zone");
    }

    pub(crate) fn on_end_collide(&mut self, world: &mut World, item: EntityId) {
        let Some(index) = self.input_items.iter().position(|queued| queued.item == item) else {
            return;
        };
        let queued = self.input_items.remove(index);
        // don't break conveyors for skipped items
        world.set_collision_wake(item, queued.wake_enabled);
    }

    pub(crate) fn on_link_attempt(&self, world: &World, uid: EntityId, attempt: &mut LinkAttempt) {
        // control ports like "moved" can link to anything
        let linking_output = attempt.source_port == self.config.output_port;
        let linking_input = attempt.sink_port == self.config.input_port;
        if !linking_output && !linking_input {
            return;
        }

        if attempt.source == uid && linking_output {
            if self.output_machine(world).is_some()
                || !world.has_slot(attempt.sink, &attempt.sink_port, true)
            {
                attempt.cancel();
            }
        } else if attempt.sink == uid && linking_input {
            if self.input_machine(world).is_some()
                || !world.has_slot(attempt.source, &attempt.source_port, false)
            {
                attempt.cancel();
            }
        }
    }

    pub(crate) fn on_new_link(&mut self, world: &World, uid: EntityId, link: &Link) {
        if link.sink == uid && link.sink_port == self.config.input_port {
            self.input_machine = Some(link.source);
            self.input_machine_port = Some(link.source_port.clone());
            self.input_slot = world.get_slot(link.source, &link.source_port, false);
        } else if link.source == uid && link.source_port == self.config.output_port {
            self.output_machine = Some(link.sink);
            self.output_machine_port = Some(link.sink_port.clone());
            self.output_slot = world.get_slot(link.sink, &link.sink_port, true);
        }
    }

    /// Disconnects only carry the port name, so the input and output ports
    /// must be named differently.
    pub(crate) fn on_port_disconnected(&mut self, event: &PortDisconnected) {
        if event.port == self.config.input_port {
            self.input_machine = None;
            self.input_machine_port = None;
            self.input_slot = None;
        } else if event.port == self.config.output_port {
            self.output_machine = None;
            self.output_machine_port = None;
            self.output_slot = None;
        }
    }

    /// Releases everything the arm holds before it is removed.
    pub(crate) fn teardown(self, world: &mut World, uid: EntityId) {
        if let Some(item) = world.item_in_slot(uid, &self.config.item_slot_id)
            && let Some(position) = world.output_position(uid)
        {
            world.place_on_ground(item, position);
        }

        for queued in self.input_items {
            world.set_collision_wake(queued.item, queued.wake_enabled);
        }
    }
}

impl World {
    /// Spawns an anchored, powered robotic arm with its item slot.
    pub fn spawn_robotic_arm(
        &mut self,
        position: Vec2,
        rotation: f32,
        config: ArmConfig,
    ) -> AutomationResult<EntityId> {
        let uid = self.spawn("robotic_arm", Transform::new(position, rotation));
        self.anchor(uid, CollisionGroup::MACHINE_LAYER);
        self.power.insert(uid, PowerReceiver::default());
        self.set_item_slots(uid, ItemSlots::new().with_slot(config.item_slot_id.clone()));
        self.add_robotic_arm(uid, config)?;
        Ok(uid)
    }

    /// Turns an existing entity into a robotic arm.
    ///
    /// The entity must already own the item slot named by
    /// `config.item_slot_id`; otherwise the arm is not added.
    pub fn add_robotic_arm(&mut self, uid: EntityId, config: ArmConfig) -> AutomationResult<()> {
        if !self.contains(uid) {
            return Err(AutomationError::UnknownEntity(uid));
        }
        let arm = RoboticArm::new(config);
        self.insert_arm(uid, arm)
    }

    /// Snapshot of an arm and its carried item.
    pub fn save_arm(&self, uid: EntityId) -> Option<SavedArm> {
        Some(SavedArm {
            arm: self.arms.get(uid)?.clone(),
            carried: self.held_item(uid),
        })
    }

    /// Reinstates a saved arm on `uid`, re-resolving its linked slots and
    /// putting the carried item back into its item slot.
    pub fn restore_arm(&mut self, uid: EntityId, saved: SavedArm) -> AutomationResult<()> {
        if !self.contains(uid) {
            return Err(AutomationError::UnknownEntity(uid));
        }
        let SavedArm { mut arm, carried } = saved;
        arm.refresh_slots(self);
        let slot = arm.config.item_slot_id.clone();
        self.insert_arm(uid, arm)?;

        if let Some(item) = carried
            && self.item_in_slot(uid, &slot) != Some(item)
            && !self.insert_into_item_slot(uid, &slot, item)
        {
            warn!(?uid, ?item, "could not restore carried item");
        }
        Ok(())
    }

    fn insert_arm(&mut self, uid: EntityId, arm: RoboticArm) -> AutomationResult<()> {
        let slot = arm.config.item_slot_id.clone();
        if !self
            .item_slots
            .get(uid)
            .is_some_and(|slots| slots.contains(&slot))
        {
            warn!(?uid, slot = %slot, "missing item slot on robotic arm, disabling it");
            self.arms.remove(uid);
            return Err(AutomationError::MissingItemSlot { entity: uid, slot });
        }

        self.links
            .ensure_sink_ports(uid, &[arm.config.input_port.as_str()]);
        self.links.ensure_source_ports(
            uid,
            &[arm.config.output_port.as_str(), arm.config.moved_port.as_str()],
        );
        self.set_load(uid, arm.config.idle_power_draw);
        self.arms.insert(uid, arm);
        Ok(())
    }

    /// The arm component of `uid`.
    pub fn arm(&self, uid: EntityId) -> Option<&RoboticArm> {
        self.arms.get(uid)
    }

    /// The item an arm is carrying, if any.
    pub fn held_item(&self, uid: EntityId) -> Option<EntityId> {
        let arm = self.arms.get(uid)?;
        self.item_in_slot(uid, &arm.config.item_slot_id)
    }

    /// Drives the "has item" visual of an arm.
    pub fn arm_has_item(&self, uid: EntityId) -> bool {
        self.held_item(uid).is_some()
    }

    /// Examine text for an arm: its filter and what it is holding.
    pub fn examine_arm(&self, uid: EntityId) -> Vec<String> {
        if !self.arms.contains_key(uid) {
            return Vec::new();
        }

        let filter = match self.filter_for(uid) {
            Some(filter) => format!("It has a filter set to {filter}."),
            None => "It has no filter set.".to_owned(),
        };
        let item = match self.held_item(uid).and_then(|item| self.item(item)) {
            Some(stack) => format!("It is holding {} x{}.", stack.kind, stack.count),
            None => "It is not holding anything.".to_owned(),
        };
        vec![filter, item]
    }

    /// Point in front of the arm where items are picked up.
    pub fn input_position(&self, uid: EntityId) -> Option<Vec2> {
        let xform = self.transforms.get(uid)?;
        Some(xform.position + xform.facing() * self.config.tile_size)
    }

    /// Point behind the arm, mirrored from the input, where items are dropped.
    pub fn output_position(&self, uid: EntityId) -> Option<Vec2> {
        let xform = self.transforms.get(uid)?;
        Some(xform.position - xform.facing() * self.config.tile_size)
    }

    fn is_output_blocked(&self, uid: EntityId) -> bool {
        self.output_position(uid).is_some_and(|position| {
            self.is_tile_blocked(self.tile_at(position), CollisionGroup::MACHINE_MASK)
        })
    }

    fn is_within_snap(&self, machine: EntityId, point: Vec2) -> bool {
        self.transforms
            .get(machine)
            .is_some_and(|xform| xform.in_range(point, self.config.snap_tolerance))
    }

    pub(crate) fn update_arms(&mut self) {
        let arms: Vec<EntityId> = self.arms.keys().collect();
        for uid in arms {
            self.with_arm(uid, |world, arm| arm.update(world, uid));
        }
    }
}
