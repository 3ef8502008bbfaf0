//! # factory-automation
//!
//! An engine-agnostic core for port-linked factory automation.
//!
//! Machines expose [`AutomationSlot`]s that accept or provide items. A
//! [`RoboticArm`] links to those slots through named ports and moves one item
//! at a time between them on a fixed cadence, falling back to a physical
//! pickup zone in front of it and a free tile behind it when nothing is
//! linked. [`StorageBin`] is the reference automatable container.
//!
//! Everything lives in a [`World`], which owns the entity arena, the link
//! layer, the tile grid and the zone tracker. Call [`World::update`] once per
//! simulation frame.

pub mod arm;
pub mod automation;
pub mod config;
pub mod entity;
pub mod error;
pub mod filter;
pub mod item;
pub mod link;
pub mod physics;
pub mod power;
pub mod slot;
pub mod storage;
pub mod tiles;
pub mod world;

pub use arm::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use filter::*;
pub use item::*;
pub use link::*;
pub use physics::*;
pub use power::*;
pub use slot::*;
pub use storage::*;
pub use tiles::*;
pub use world::*;
