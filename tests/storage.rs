// tests/storage.rs
mod common;

use common::{spawn_bin, tile};
use factory_automation::{
    AutomationFilter, Placement, STORAGE_INPUT_PORT, STORAGE_INSERTED_PORT, STORAGE_REMOVED_PORT,
};

#[test]
fn test_filter_rejects_before_commit() {
    let mut world = common::world();
    let bin = spawn_bin(&mut world, 0, 0, 4);
    world.set_filter(bin, Some(AutomationFilter::allow(["copper"])));
    let steel = world.spawn_item("steel", 1, tile(3, 3));

    assert!(!world.storage_insert(bin, steel));

    assert_eq!(world.placement(steel), Some(&Placement::Ground));
    assert_eq!(world.transform(steel).unwrap().position, tile(3, 3));
    assert!(world.storage(bin).unwrap().items().is_empty());
    assert_eq!(world.signal_count(bin, STORAGE_INSERTED_PORT), 0);
}

#[test]
fn test_insert_emits_one_signal_per_item() {
    let mut world = common::world();
    let bin = spawn_bin(&mut world, 0, 0, 4);
    let a = world.spawn_item("steel", 1, tile(3, 3));
    let b = world.spawn_item("copper", 2, tile(3, 3));

    assert!(world.storage_insert(bin, a));
    assert!(world.storage_insert(bin, b));

    assert_eq!(world.storage(bin).unwrap().items(), &[a, b]);
    assert_eq!(world.signal_count(bin, STORAGE_INSERTED_PORT), 2);
    assert_eq!(world.signal_count(bin, STORAGE_REMOVED_PORT), 0);
}

#[test]
fn test_double_insert_is_harmless() {
    let mut world = common::world();
    let bin = spawn_bin(&mut world, 0, 0, 4);
    let item = world.spawn_item("steel", 1, tile(3, 3));

    assert!(world.storage_insert(bin, item));
    assert!(!world.storage_insert(bin, item));

    assert_eq!(world.storage(bin).unwrap().items(), &[item]);
    assert_eq!(world.signal_count(bin, STORAGE_INSERTED_PORT), 1);
}

#[test]
fn test_capacity_is_enforced() {
    let mut world = common::world();
    let bin = spawn_bin(&mut world, 0, 0, 1);
    let a = world.spawn_item("steel", 1, tile(3, 3));
    let b = world.spawn_item("steel", 1, tile(3, 3));

    assert!(world.storage_insert(bin, a));
    assert!(world.storage(bin).unwrap().is_full());
    assert!(!world.storage_can_insert(bin, b));
    assert!(!world.storage_insert(bin, b));
    assert_eq!(world.placement(b), Some(&Placement::Ground));
}

#[test]
fn test_moving_between_bins_signals_both() {
    let mut world = common::world();
    let from = spawn_bin(&mut world, 0, 0, 4);
    let to = spawn_bin(&mut world, 2, 0, 4);
    let item = world.spawn_item("steel", 1, tile(3, 3));
    world.storage_insert(from, item);
    world.drain_signals();

    assert!(world.storage_insert(to, item));

    assert!(world.storage(from).unwrap().items().is_empty());
    assert_eq!(world.placement(item), Some(&Placement::Container(to)));
    assert_eq!(world.signal_count(from, STORAGE_REMOVED_PORT), 1);
    assert_eq!(world.signal_count(to, STORAGE_INSERTED_PORT), 1);
}

#[test]
fn test_eject_drops_item_on_bin_tile() {
    let mut world = common::world();
    let bin = spawn_bin(&mut world, 2, 2, 4);
    let item = world.spawn_item("steel", 1, tile(3, 3));
    world.storage_insert(bin, item);

    assert!(world.storage_eject(bin, item));
    assert!(!world.storage_eject(bin, item), "already out");

    assert_eq!(world.placement(item), Some(&Placement::Ground));
    assert_eq!(world.transform(item).unwrap().position, tile(2, 2));
    assert_eq!(world.signal_count(bin, STORAGE_REMOVED_PORT), 1);
}

#[test]
fn test_despawned_bin_spills_contents() {
    let mut world = common::world();
    let bin = spawn_bin(&mut world, 2, 2, 4);
    let item = world.spawn_item("steel", 1, tile(3, 3));
    world.storage_insert(bin, item);

    world.despawn(bin).unwrap();

    assert!(!world.contains(bin));
    assert!(!world.links().has_sink_port(bin, STORAGE_INPUT_PORT));
    assert_eq!(world.placement(item), Some(&Placement::Ground));
    assert_eq!(world.transform(item).unwrap().position, tile(2, 2));
}
