//! Storage bins: filtered containers that pulse a port whenever they change.

use crate::entity::{EntityId, Placement, Transform};
use crate::filter::{AutomationFilter, is_blocked};
use crate::slot::{AutomationSlot, AutomationSlots};
use crate::tiles::CollisionGroup;
use crate::world::World;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Sink port items are inserted through.
pub const STORAGE_INPUT_PORT: &str = "StorageInput";
/// Source port items are pulled from.
pub const STORAGE_OUTPUT_PORT: &str = "StorageOutput";
/// Pulsed once per inserted item.
pub const STORAGE_INSERTED_PORT: &str = "StorageInserted";
/// Pulsed once per removal.
pub const STORAGE_REMOVED_PORT: &str = "StorageRemoved";

/// A bounded container of items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageBin {
    pub capacity: usize,
    pub inserted_port: String,
    pub removed_port: String,
    items: Vec<EntityId>,
}

impl StorageBin {
    /// An empty bin holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inserted_port: STORAGE_INSERTED_PORT.to_owned(),
            removed_port: STORAGE_REMOVED_PORT.to_owned(),
            items: Vec::new(),
        }
    }

    /// Contents, oldest first.
    pub fn items(&self) -> &[EntityId] {
        &self.items
    }

    /// Returns `true` if `item` is inside.
    pub fn contains(&self, item: EntityId) -> bool {
        self.items.contains(&item)
    }

    /// Returns `true` when no more items fit.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }
}

/// The automation face of a storage bin: insert through its input port,
/// pull through its output port.
#[derive(Clone, Debug)]
pub struct StorageBinSlot {
    owner: EntityId,
    input_port: Option<String>,
    output_port: Option<String>,
}

impl StorageBinSlot {
    /// The slot of the bin `owner`.
    pub fn new(owner: EntityId) -> Self {
        Self {
            owner,
            input_port: Some(STORAGE_INPUT_PORT.to_owned()),
            output_port: Some(STORAGE_OUTPUT_PORT.to_owned()),
        }
    }
}

impl AutomationSlot for StorageBinSlot {
    fn owner(&self) -> EntityId {
        self.owner
    }

    fn input_port(&self) -> Option<&str> {
        self.input_port.as_deref()
    }

    fn output_port(&self) -> Option<&str> {
        self.output_port.as_deref()
    }

    fn can_insert(&self, world: &World, item: EntityId) -> bool {
        world.storage_can_insert(self.owner, item)
    }

    fn insert(&self, world: &mut World, item: EntityId) -> bool {
        world.storage_insert(self.owner, item)
    }

    fn get_item(&self, world: &World, filter: Option<&AutomationFilter>) -> Option<EntityId> {
        world
            .storage(self.owner)?
            .items
            .iter()
            .copied()
            .find(|&item| !world.is_item_blocked(filter, item))
    }
}

impl World {
    /// Spawns an anchored storage bin with an automation slot. Automation
    /// starts disabled.
    pub fn spawn_storage_bin(&mut self, position: Vec2, capacity: usize) -> EntityId {
        let uid = self.spawn("storage_bin", Transform::new(position, 0.0));
        self.anchor(uid, CollisionGroup::MACHINE_LAYER);

        let bin = StorageBin::new(capacity);
        self.links.ensure_source_ports(
            uid,
            &[bin.inserted_port.as_str(), bin.removed_port.as_str()],
        );
        self.bins.insert(uid, bin);
        self.set_automation_slots(uid, AutomationSlots::new(vec![Arc::new(StorageBinSlot::new(uid))]));
        uid
    }

    /// The storage component of `bin`.
    pub fn storage(&self, bin: EntityId) -> Option<&StorageBin> {
        self.bins.get(bin)
    }

    /// Whether `item` could be committed to `bin`: not already inside, room
    /// left, and not blocked by the bin's filter.
    pub fn storage_can_insert(&self, bin: EntityId, item: EntityId) -> bool {
        let (Some(storage), Some(stack)) = (self.bins.get(bin), self.items.get(item)) else {
            return false;
        };
        !storage.contains(item) && !storage.is_full() && !is_blocked(self.filter_for(bin), stack)
    }

    /// Moves `item` into `bin` and pulses its "inserted" port.
    pub fn storage_insert(&mut self, bin: EntityId, item: EntityId) -> bool {
        if !self.storage_can_insert(bin, item) {
            trace!(?bin, ?item, "storage rejected item");
            return false;
        }

        self.detach(item);
        let Some(storage) = self.bins.get_mut(bin) else {
            return false;
        };
        storage.items.push(item);
        let port = storage.inserted_port.clone();
        self.placements.insert(item, Placement::Container(bin));
        self.links.invoke_port(bin, &port);
        debug!(?bin, ?item, "item stored");
        true
    }

    /// Takes `item` out of `bin` and drops it on the bin's tile.
    pub fn storage_eject(&mut self, bin: EntityId, item: EntityId) -> bool {
        if !self.bins.get(bin).is_some_and(|storage| storage.contains(item)) {
            return false;
        }
        let Some(position) = self.transforms.get(bin).map(|xform| xform.position) else {
            return false;
        };
        self.place_on_ground(item, position)
    }

    /// Pulses "removed" for units split off a stack that stays in the bin.
    pub(crate) fn storage_units_removed(&mut self, bin: EntityId) {
        let Some(port) = self.bins.get(bin).map(|storage| storage.removed_port.clone()) else {
            return;
        };
        self.links.invoke_port(bin, &port);
        debug!(?bin, "units split off stored stack");
    }

    /// Removes `item` from the bin's contents and pulses "removed".
    pub(crate) fn storage_detach(&mut self, bin: EntityId, item: EntityId) {
        let Some(storage) = self.bins.get_mut(bin) else {
            return;
        };
        let Some(index) = storage.items.iter().position(|&stored| stored == item) else {
            return;
        };
        storage.items.remove(index);
        let port = storage.removed_port.clone();
        self.links.invoke_port(bin, &port);
        debug!(?bin, ?item, "item removed from storage");
    }
}
