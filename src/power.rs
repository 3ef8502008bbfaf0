//! Power receivers: a powered flag read by machines and a load they write.

use crate::entity::EntityId;
use crate::world::World;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
/// Power-grid connection of a machine.
pub struct PowerReceiver {
    pub powered: bool,
    /// Current draw in watts.
    pub load: f32,
}

impl Default for PowerReceiver {
    fn default() -> Self {
        Self {
            powered: true,
            load: 0.0,
        }
    }
}

impl World {
    /// Entities without a receiver are always powered.
    pub fn is_powered(&self, uid: EntityId) -> bool {
        self.power.get(uid).is_none_or(|receiver| receiver.powered)
    }

    /// Switches the supply of a receiver on or off.
    pub fn set_powered(&mut self, uid: EntityId, powered: bool) {
        if let Some(receiver) = self.power.get_mut(uid) {
            receiver.powered = powered;
        }
    }

    /// Sets the draw a receiver reports to the grid.
    pub fn set_load(&mut self, uid: EntityId, watts: f32) {
        if let Some(receiver) = self.power.get_mut(uid) {
            receiver.load = watts;
        }
    }

    /// The receiver of `uid`, if it has one.
    pub fn power_receiver(&self, uid: EntityId) -> Option<&PowerReceiver> {
        self.power.get(uid)
    }
}
