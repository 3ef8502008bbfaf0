//! Items, the single-item slot primitive, and item movement between placements.

use crate::entity::{EntityId, Placement, Transform};
use crate::world::World;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// A discrete, stackable item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Prototype name, e.g. `"steel"`.
    pub kind: String,
    /// Units in this stack. Always at least 1.
    pub count: u32,
}

impl Item {
    /// A stack of `count` units, at least one.
    pub fn new(kind: impl Into<String>, count: u32) -> Self {
        Self {
            kind: kind.into(),
            count: count.max(1),
        }
    }
}

/// A slot holding at most one item entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSlot {
    item: Option<EntityId>,
}

impl ItemSlot {
    /// The held item, if any.
    pub fn item(&self) -> Option<EntityId> {
        self.item
    }

    /// Returns `true` if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }
}

/// Named item slots owned by one entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSlots {
    slots: BTreeMap<String, ItemSlot>,
}

impl ItemSlots {
    /// No slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: adds an empty slot named `id`.
    pub fn with_slot(mut self, id: impl Into<String>) -> Self {
        self.slots.entry(id.into()).or_default();
        self
    }

    /// The slot named `id`.
    pub fn get(&self, id: &str) -> Option<&ItemSlot> {
        self.slots.get(id)
    }

    /// Returns `true` if a slot named `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Every item currently held, in slot-id order.
    pub fn held_items(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.values().filter_map(ItemSlot::item)
    }
}

impl World {
    /// Spawns a loose item on the ground.
    pub fn spawn_item(&mut self, kind: &str, count: u32, position: Vec2) -> EntityId {
        let uid = self.spawn(kind, Transform::new(position, 0.0));
        self.items.insert(uid, Item::new(kind, count));
        self.placements.insert(uid, Placement::Ground);
        self.collision_wake.insert(uid, true);
        uid
    }

    /// The item stack of `uid`, if it is an item.
    pub fn item(&self, uid: EntityId) -> Option<&Item> {
        self.items.get(uid)
    }

    /// Where the item currently lives.
    pub fn placement(&self, uid: EntityId) -> Option<&Placement> {
        self.placements.get(uid)
    }

    /// Returns `true` if the item is loose on the floor.
    pub fn is_on_ground(&self, uid: EntityId) -> bool {
        matches!(self.placements.get(uid), Some(Placement::Ground))
    }

    /// Attaches named item slots to an entity, replacing any it had.
    pub fn set_item_slots(&mut self, uid: EntityId, slots: ItemSlots) {
        if self.entities.contains_key(uid) {
            self.item_slots.insert(uid, slots);
        }
    }

    /// The item in `slot` of `owner`.
    pub fn item_in_slot(&self, owner: EntityId, slot: &str) -> Option<EntityId> {
        self.item_slots.get(owner)?.get(slot)?.item()
    }

    /// Returns `true` if `slot` on `owner` exists and is empty.
    pub fn item_slot_accepts(&self, owner: EntityId, slot: &str) -> bool {
        self.item_slots
            .get(owner)
            .and_then(|slots| slots.get(slot))
            .is_some_and(ItemSlot::is_empty)
    }

    /// Moves `item` into an empty item slot, detaching it from wherever it was.
    pub fn insert_into_item_slot(&mut self, owner: EntityId, slot: &str, item: EntityId) -> bool {
        if !self.items.contains_key(item) || !self.item_slot_accepts(owner, slot) {
            return false;
        }

        self.detach(item);
        let Some(target) = self
            .item_slots
            .get_mut(owner)
            .and_then(|slots| slots.slots.get_mut(slot))
        else {
            return false;
        };
        target.item = Some(item);
        self.placements.insert(
            item,
            Placement::Slot {
                owner,
                slot: slot.to_owned(),
            },
        );
        trace!(?owner, slot, ?item, "item inserted into slot");
        true
    }

    /// Drops an item loose onto the floor at `position`.
    pub fn place_on_ground(&mut self, item: EntityId, position: Vec2) -> bool {
        if !self.items.contains_key(item) {
            return false;
        }

        self.detach(item);
        self.move_entity(item, position);
        self.placements.insert(item, Placement::Ground);
        true
    }

    /// Removes the item from its current holder. The caller must give it a
    /// new placement immediately afterwards.
    pub(crate) fn detach(&mut self, item: EntityId) {
        match self.placements.get(item).cloned() {
            Some(Placement::Container(bin)) => self.storage_detach(bin, item),
            Some(Placement::Slot { owner, slot }) => {
                if let Some(target) = self
                    .item_slots
                    .get_mut(owner)
                    .and_then(|slots| slots.slots.get_mut(&slot))
                    && target.item == Some(item)
                {
                    target.item = None;
                }
            }
            Some(Placement::Ground) | None => {}
        }
    }

    /// Sum of units across every live item of `kind`, wherever it is.
    pub fn total_units(&self, kind: &str) -> u32 {
        self.items
            .values()
            .filter(|item| item.kind == kind)
            .map(|item| item.count)
            .sum()
    }
}
