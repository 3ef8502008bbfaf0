//! Automation registry: which machine slots are reachable, and lookups by port.

use crate::entity::EntityId;
use crate::error::{AutomationError, AutomationResult};
use crate::slot::{Automated, AutomationSlot, AutomationSlots, SlotHandle};
use crate::world::World;
use std::sync::Arc;
use tracing::debug;

impl World {
    /// Gives a machine its slot list. Slots stay hidden until automation is enabled.
    pub fn set_automation_slots(&mut self, machine: EntityId, slots: AutomationSlots) {
        if self.entities.contains_key(machine) {
            self.automation_slots.insert(machine, slots);
        }
    }

    /// Returns `true` if the machine's slots are currently reachable.
    pub fn is_automated(&self, machine: EntityId) -> bool {
        self.automated.contains_key(machine)
    }

    /// Shows or hides a machine's slots, registering or unregistering their ports.
    ///
    /// Repeating the current state is a no-op, so ports are added and
    /// removed exactly once per transition.
    pub fn set_automation_enabled(&mut self, machine: EntityId, enabled: bool) -> AutomationResult<()> {
        if !self.entities.contains_key(machine) {
            return Err(AutomationError::UnknownEntity(machine));
        }
        let Some(slots) = self.automation_slots.get(machine).cloned() else {
            return Err(AutomationError::NotAutomatable(machine));
        };
        if enabled == self.is_automated(machine) {
            return Ok(());
        }

        if enabled {
            self.automated.insert(machine, Automated);
            for slot in &slots.slots {
                slot.add_ports(&mut self.links);
            }
            debug!(?machine, slots = slots.slots.len(), "automation enabled");
        } else {
            self.automated.remove(machine);
            self.remove_slot_ports(&slots);
            debug!(?machine, "automation disabled");
        }
        Ok(())
    }

    /// First slot of `machine` exposing `port` as an input (`input = true`) or
    /// output. `None` unless the machine is automation-enabled.
    pub fn get_slot(&self, machine: EntityId, port: &str, input: bool) -> Option<SlotHandle> {
        if !self.is_automated(machine) {
            return None;
        }
        let index = self.automation_slots.get(machine)?.position(port, input)?;
        Some(SlotHandle { machine, index })
    }

    /// Whether [`get_slot`](Self::get_slot) would find a slot.
    pub fn has_slot(&self, machine: EntityId, port: &str, input: bool) -> bool {
        self.get_slot(machine, port, input).is_some()
    }

    /// Re-validates a cached handle; hidden or despawned machines resolve to `None`.
    pub fn resolve_slot(&self, handle: SlotHandle) -> Option<Arc<dyn AutomationSlot>> {
        if !self.is_automated(handle.machine) {
            return None;
        }
        self.automation_slots
            .get(handle.machine)?
            .slots
            .get(handle.index)
            .cloned()
    }

    /// Unregisters every port of `slots` and notifies both ends of severed links.
    pub(crate) fn remove_slot_ports(&mut self, slots: &AutomationSlots) {
        for slot in &slots.slots {
            for link in slot.remove_ports(&mut self.links) {
                self.notify_disconnected(&link);
            }
        }
    }
}
