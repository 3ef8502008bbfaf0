// tests/arm_links.rs
mod common;

use common::{ARM_INPUT, ARM_OUTPUT, MOVED, TICK, run, spawn_arm, spawn_bin, stock, tile};
use factory_automation::{
    AutomationError, AutomationFilter, Placement, STORAGE_INPUT_PORT, STORAGE_INSERTED_PORT,
    STORAGE_OUTPUT_PORT, STORAGE_REMOVED_PORT,
};

#[test]
fn test_second_output_link_is_rejected() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let first = spawn_bin(&mut world, -1, 0, 4);
    let second = spawn_bin(&mut world, -1, 1, 4);

    world.try_link(arm, ARM_OUTPUT, first, STORAGE_INPUT_PORT).unwrap();
    let err = world
        .try_link(arm, ARM_OUTPUT, second, STORAGE_INPUT_PORT)
        .unwrap_err();

    assert!(matches!(err, AutomationError::LinkRejected { .. }), "got {err:?}");
    assert_eq!(
        world.arm(arm).unwrap().output_link(),
        Some((first, STORAGE_INPUT_PORT))
    );
    assert_eq!(world.links().links().len(), 1, "first link intact");
}

#[test]
fn test_second_input_link_is_rejected() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let first = spawn_bin(&mut world, 1, 0, 4);
    let second = spawn_bin(&mut world, 1, 1, 4);

    world.try_link(first, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();
    let err = world
        .try_link(second, STORAGE_OUTPUT_PORT, arm, ARM_INPUT)
        .unwrap_err();

    assert!(matches!(err, AutomationError::LinkRejected { .. }), "got {err:?}");
    assert_eq!(
        world.arm(arm).unwrap().input_link(),
        Some((first, STORAGE_OUTPUT_PORT))
    );

    let again = world
        .try_link(first, STORAGE_OUTPUT_PORT, arm, ARM_INPUT)
        .unwrap_err();
    assert!(matches!(again, AutomationError::AlreadyLinked { .. }));
}

#[test]
fn test_only_automation_ports_can_be_linked_as_machines() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let lamp = world.spawn_machine("lamp", tile(3, 3), 0.0);
    world.links_mut().ensure_sink_ports(lamp, &["Toggle"]);

    let err = world.try_link(arm, ARM_OUTPUT, lamp, "Toggle").unwrap_err();
    assert!(matches!(err, AutomationError::LinkRejected { .. }));
    assert_eq!(world.arm(arm).unwrap().output_link(), None);

    // control ports are free to link anywhere
    world.try_link(arm, MOVED, lamp, "Toggle").unwrap();
    assert_eq!(world.arm(arm).unwrap().output_link(), None);

    let hidden = world.spawn_storage_bin(tile(-1, 0), 4);
    let err = world
        .try_link(arm, ARM_OUTPUT, hidden, STORAGE_INPUT_PORT)
        .unwrap_err();
    assert!(matches!(err, AutomationError::PortNotFound { .. }), "got {err:?}");
}

#[test]
fn test_drop_into_linked_storage() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, -1, 0, 4);
    world.try_link(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT).unwrap();
    let item = world.spawn_item("steel", 1, tile(1, 0));

    world.update(TICK);
    assert_eq!(world.held_item(arm), Some(item));

    run(&mut world, 6);
    assert_eq!(world.held_item(arm), None);
    assert_eq!(world.placement(item), Some(&Placement::Container(bin)));
    assert_eq!(world.storage(bin).unwrap().items(), &[item]);
    assert_eq!(world.signal_count(bin, STORAGE_INSERTED_PORT), 1);
    assert_eq!(world.signal_count(arm, MOVED), 1);
}

#[test]
fn test_full_storage_keeps_item_carried() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, -1, 0, 1);
    world.try_link(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT).unwrap();
    let item = world.spawn_item("steel", 1, tile(1, 0));

    world.update(TICK);
    assert_eq!(world.held_item(arm), Some(item));
    stock(&mut world, bin, "steel", 1);

    for _ in 0..10 {
        run(&mut world, 10);
        assert_eq!(world.held_item(arm), Some(item), "item stays carried");
    }
    assert_eq!(world.signal_count(arm, MOVED), 0);
    assert_eq!(world.storage(bin).unwrap().items().len(), 1);
    assert_eq!(world.total_units("steel"), 2);
}

#[test]
fn test_zone_pickup_skips_items_output_rejects() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, -1, 0, 4);
    world.set_filter(bin, Some(AutomationFilter::allow(["copper"])));
    world.try_link(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT).unwrap();
    world.set_powered(arm, false);

    let copper = world.spawn_item("copper", 1, tile(1, 0));
    world.update(TICK);
    let steel = world.spawn_item("steel", 1, tile(1, 0));
    world.update(TICK);

    world.set_powered(arm, true);
    world.update(TICK);

    assert_eq!(world.held_item(arm), Some(copper), "newer steel would get stuck");
    assert_eq!(world.placement(steel), Some(&Placement::Ground));
}

#[test]
fn test_pickup_from_linked_storage() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, 1, 0, 4);
    let first = stock(&mut world, bin, "steel", 1);
    let second = stock(&mut world, bin, "steel", 1);
    world.try_link(bin, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();
    world.drain_signals();

    world.update(TICK);
    assert_eq!(world.held_item(arm), Some(first), "oldest item first");
    assert_eq!(world.signal_count(bin, STORAGE_REMOVED_PORT), 1);

    run(&mut world, 6);
    assert_eq!(world.transform(first).unwrap().position, tile(-1, 0));
    assert_eq!(world.signal_count(arm, MOVED), 1);

    world.update(TICK);
    assert_eq!(world.held_item(arm), Some(second));
    assert!(world.storage(bin).unwrap().items().is_empty());
}

#[test]
fn test_filter_gates_linked_input() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    world.set_filter(arm, Some(AutomationFilter::allow(["copper"])));
    let bin = spawn_bin(&mut world, 1, 0, 4);
    let steel = stock(&mut world, bin, "steel", 1);
    world.try_link(bin, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();

    run(&mut world, 10);
    assert_eq!(world.held_item(arm), None);
    assert_eq!(world.placement(steel), Some(&Placement::Container(bin)));

    let copper = stock(&mut world, bin, "copper", 1);
    world.update(TICK);
    assert_eq!(world.held_item(arm), Some(copper));
}

#[test]
fn test_filter_amount_splits_stack() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    world.set_filter(arm, Some(AutomationFilter::allow(["steel"]).with_amount(5)));
    let bin = spawn_bin(&mut world, 1, 0, 4);
    let stack = stock(&mut world, bin, "steel", 12);
    world.try_link(bin, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();
    world.drain_signals();

    world.update(TICK);

    let held = world.held_item(arm).expect("split stack picked up");
    assert_ne!(held, stack);
    assert_eq!(world.item(held).unwrap().count, 5);
    assert_eq!(world.item(stack).unwrap().count, 7);
    assert_eq!(world.placement(stack), Some(&Placement::Container(bin)));
    assert_eq!(world.total_units("steel"), 12);
    assert_eq!(
        world.signal_count(bin, STORAGE_REMOVED_PORT),
        1,
        "units leaving the bin count as a removal"
    );
}

#[test]
fn test_zero_amount_takes_whole_stack() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let mut filter = AutomationFilter::allow(["steel"]);
    filter.amount = Some(0);
    world.set_filter(arm, Some(filter));
    let bin = spawn_bin(&mut world, 1, 0, 4);
    let stack = stock(&mut world, bin, "steel", 3);
    world.try_link(bin, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();

    world.update(TICK);
    assert_eq!(world.held_item(arm), Some(stack));

    run(&mut world, 30);
    assert_eq!(world.total_units("steel"), 3);
    assert_eq!(world.transform(stack).unwrap().position, tile(-1, 0));
}

#[test]
fn test_zero_amount_reads_back_as_none() {
    let filter: AutomationFilter =
        serde_json::from_str(r#"{"mode":"Allow","kinds":["steel"],"amount":0}"#).unwrap();
    assert_eq!(filter.amount, None);

    let filter: AutomationFilter = serde_json::from_str(r#"{"kinds":["steel"]}"#).unwrap();
    assert_eq!(filter.amount, None);
    assert_eq!(AutomationFilter::allow(["steel"]).with_amount(0).amount, Some(1));
}

#[test]
fn test_filter_amount_waits_for_full_stack() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    world.set_filter(arm, Some(AutomationFilter::allow(["steel"]).with_amount(5)));
    let bin = spawn_bin(&mut world, 1, 0, 4);
    let stack = stock(&mut world, bin, "steel", 3);
    world.try_link(bin, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();

    run(&mut world, 10);

    assert_eq!(world.held_item(arm), None);
    assert_eq!(world.item(stack).unwrap().count, 3);
}

#[test]
fn test_relocated_output_machine_is_not_used() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, -1, 0, 4);
    world.try_link(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT).unwrap();
    world.set_position(bin, tile(-1, 3));
    let item = world.spawn_item("steel", 1, tile(1, 0));

    run(&mut world, 30);
    assert_eq!(world.held_item(arm), Some(item));
    assert!(world.storage(bin).unwrap().items().is_empty());

    world.set_position(bin, tile(-1, 0));
    world.update(TICK);
    assert_eq!(world.placement(item), Some(&Placement::Container(bin)));
}

#[test]
fn test_relocated_input_machine_is_not_used() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, 1, 0, 4);
    let item = stock(&mut world, bin, "steel", 1);
    world.try_link(bin, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();
    world.set_position(bin, tile(4, 0));

    run(&mut world, 10);

    assert_eq!(world.held_item(arm), None);
    assert_eq!(world.placement(item), Some(&Placement::Container(bin)));
}

#[test]
fn test_unlink_falls_back_to_free_tile() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, 5, 5, 4);
    world.try_link(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT).unwrap();

    world.unlink(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT).unwrap();
    assert_eq!(world.arm(arm).unwrap().output_link(), None);
    let err = world
        .unlink(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT)
        .unwrap_err();
    assert!(matches!(err, AutomationError::LinkNotFound { .. }));

    let item = world.spawn_item("steel", 1, tile(1, 0));
    run(&mut world, 7);
    assert_eq!(world.transform(item).unwrap().position, tile(-1, 0));
    assert_eq!(world.placement(item), Some(&Placement::Ground));
}

#[test]
fn test_disabling_automation_severs_links() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, -1, 0, 4);
    world.try_link(arm, ARM_OUTPUT, bin, STORAGE_INPUT_PORT).unwrap();

    world.set_automation_enabled(bin, false).unwrap();

    assert_eq!(world.arm(arm).unwrap().output_link(), None);
    assert!(world.links().links().is_empty());

    // the bin now just blocks the free tile
    world.spawn_item("steel", 1, tile(1, 0));
    run(&mut world, 10);
    assert_eq!(world.held_item(arm), None);
    assert_eq!(world.arm(arm).unwrap().queued_items().len(), 1);
}

#[test]
fn test_despawned_machine_clears_link() {
    let mut world = common::world();
    let arm = spawn_arm(&mut world);
    let bin = spawn_bin(&mut world, 1, 0, 4);
    world.try_link(bin, STORAGE_OUTPUT_PORT, arm, ARM_INPUT).unwrap();

    world.despawn(bin).unwrap();

    assert_eq!(world.arm(arm).unwrap().input_link(), None);
    let item = world.spawn_item("steel", 1, tile(1, 0));
    world.update(TICK);
    assert_eq!(world.held_item(arm), Some(item), "zone pickup takes over");
}
