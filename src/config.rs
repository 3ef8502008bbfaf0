//! Tunables for the world and its robotic arms.

use crate::link::PULSE_LOG_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every entity in a [`World`](crate::World).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of one grid tile in world units.
    pub tile_size: f32,
    /// How far a linked machine may sit from the arm's input/output point
    /// before the arm refuses to interact with it.
    pub snap_tolerance: f32,
    /// Half-extent of the square pickup zone in front of each arm.
    pub zone_half_extent: f32,
    /// Radius of the bounding circle of a loose item.
    pub item_radius: f32,
    /// How many recent signal pulses are kept between drains.
    pub signal_log_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            snap_tolerance: 0.25,
            zone_half_extent: 0.4,
            item_radius: 0.2,
            signal_log_capacity: PULSE_LOG_CAPACITY,
        }
    }
}

/// Configuration for a single robotic arm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// Sink port that input machines link their output slot to.
    pub input_port: String,
    /// Source port linked to an output machine's input slot.
    pub output_port: String,
    /// Source port pulsed once for every item successfully moved.
    pub moved_port: String,
    /// Id of the item slot that holds the carried item.
    pub item_slot_id: String,
    /// Time between a pickup and the first drop attempt.
    pub move_delay: Duration,
    /// Load in watts while waiting for work.
    pub idle_power_draw: f32,
    /// Load in watts while carrying an item.
    pub moving_power_draw: f32,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            input_port: "RoboticArmInput".to_owned(),
            output_port: "RoboticArmOutput".to_owned(),
            moved_port: "RoboticArmMoved".to_owned(),
            item_slot_id: "robotic_arm_item".to_owned(),
            move_delay: Duration::from_millis(600),
            idle_power_draw: 50.0,
            moving_power_draw: 300.0,
        }
    }
}
