// tests/common/mod.rs
#![allow(dead_code)]

use factory_automation::{ArmConfig, EntityId, Placement, World, WorldConfig};
use glam::{IVec2, Vec2};
use std::time::Duration;

pub const TICK: Duration = Duration::from_millis(100);
pub const MOVED: &str = "RoboticArmMoved";
pub const ARM_INPUT: &str = "RoboticArmInput";
pub const ARM_OUTPUT: &str = "RoboticArmOutput";

pub fn world() -> World {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    World::new(WorldConfig::default())
}

/// Centre of tile `(x, y)` with the default one-unit tiles.
pub fn tile(x: i32, y: i32) -> Vec2 {
    IVec2::new(x, y).as_vec2() + Vec2::splat(0.5)
}

/// An arm on tile (0, 0) facing +X: it picks up from (1, 0) and drops on (-1, 0).
pub fn spawn_arm(world: &mut World) -> EntityId {
    world
        .spawn_robotic_arm(tile(0, 0), 0.0, ArmConfig::default())
        .expect("arm with its item slot")
}

/// A storage bin with automation enabled.
pub fn spawn_bin(world: &mut World, x: i32, y: i32, capacity: usize) -> EntityId {
    let bin = world.spawn_storage_bin(tile(x, y), capacity);
    world
        .set_automation_enabled(bin, true)
        .expect("storage bins are automatable");
    bin
}

/// Stores a fresh item in `bin`, spawned far away from every pickup zone.
pub fn stock(world: &mut World, bin: EntityId, kind: &str, count: u32) -> EntityId {
    let item = world.spawn_item(kind, count, tile(50, 50));
    assert!(world.storage_insert(bin, item), "bin should accept {kind}");
    item
}

pub fn run(world: &mut World, ticks: usize) {
    for _ in 0..ticks {
        world.update(TICK);
    }
}

/// Asserts `item` is in exactly the place its placement claims.
pub fn assert_in_one_place(world: &World, item: EntityId) {
    match world.placement(item).expect("live item has a placement") {
        Placement::Ground => {}
        Placement::Container(bin) => {
            let stored = world.storage(*bin).expect("container is a bin");
            assert_eq!(
                stored.items().iter().filter(|&&i| i == item).count(),
                1,
                "item stored exactly once"
            );
        }
        Placement::Slot { owner, slot } => {
            assert_eq!(world.item_in_slot(*owner, slot), Some(item));
        }
    }
}
