//! The contract a machine implements to be reachable by automation.

use crate::entity::EntityId;
use crate::filter::AutomationFilter;
use crate::link::{Link, LinkLayer};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One provide/accept point of a machine.
///
/// The input port accepts items and is registered as a sink; the output port
/// provides items and is registered as a source.
pub trait AutomationSlot: fmt::Debug + Send + Sync {
    /// The machine this slot belongs to.
    fn owner(&self) -> EntityId;

    fn input_port(&self) -> Option<&str> {
        None
    }

    fn output_port(&self) -> Option<&str> {
        None
    }

    /// Whether [`insert`](Self::insert) would accept `item` right now.
    fn can_insert(&self, _world: &World, _item: EntityId) -> bool {
        false
    }

    /// Takes `item` into the machine. Inserting an item the machine already
    /// holds must fail without side effects.
    fn insert(&self, _world: &mut World, _item: EntityId) -> bool {
        false
    }

    /// Selects an item `filter` allows, without removing it.
    fn get_item(&self, _world: &World, _filter: Option<&AutomationFilter>) -> Option<EntityId> {
        None
    }

    fn add_ports(&self, links: &mut LinkLayer) {
        if let Some(port) = self.input_port() {
            links.ensure_sink_ports(self.owner(), &[port]);
        }
        if let Some(port) = self.output_port() {
            links.ensure_source_ports(self.owner(), &[port]);
        }
    }

    /// Unregisters the ports and returns every link that was severed.
    fn remove_ports(&self, links: &mut LinkLayer) -> Vec<Link> {
        let mut severed = Vec::new();
        if let Some(port) = self.input_port() {
            severed.extend(links.remove_sink_port(self.owner(), port));
        }
        if let Some(port) = self.output_port() {
            severed.extend(links.remove_source_port(self.owner(), port));
        }
        severed
    }
}

/// The static slot list of a machine.
#[derive(Clone, Debug, Default)]
pub struct AutomationSlots {
    pub slots: Vec<Arc<dyn AutomationSlot>>,
}

impl AutomationSlots {
    /// Slots in lookup order.
    pub fn new(slots: Vec<Arc<dyn AutomationSlot>>) -> Self {
        Self { slots }
    }

    /// Index of the first slot exposing `port` in the given direction.
    pub fn position(&self, port: &str, input: bool) -> Option<usize> {
        self.slots.iter().position(|slot| {
            let exposed = if input {
                slot.input_port()
            } else {
                slot.output_port()
            };
            exposed == Some(port)
        })
    }
}

/// Marker: the machine's slots are currently reachable by automation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Automated;

/// A resolved slot reference that stays valid across reloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotHandle {
    pub machine: EntityId,
    pub index: usize,
}
