//! The simulation world: entity arena, component tables and the tick loop.
//!
//! Components are stored structure-of-arrays style in [`SecondaryMap`]s keyed
//! by [`EntityId`]. A machine is "automatable" when it has both an
//! [`AutomationSlots`] entry and the [`Automated`] marker; each capability is
//! checked by presence.

use crate::arm::RoboticArm;
use crate::config::WorldConfig;
use crate::entity::{EntityId, Placement, Transform};
use crate::error::{AutomationError, AutomationResult};
use crate::filter::AutomationFilter;
use crate::item::{Item, ItemSlots};
use crate::link::{Link, LinkAttempt, LinkLayer, PortDisconnected, SignalPulse};
use crate::physics::ZoneTracker;
use crate::power::PowerReceiver;
use crate::slot::{Automated, AutomationSlots};
use crate::storage::StorageBin;
use crate::tiles::{CollisionGroup, TileMap};
use glam::Vec2;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Bookkeeping shared by every entity.
#[derive(Clone, Debug, Default)]
pub struct EntityMeta {
    pub name: String,
}

/// Owns every entity and collaborator of one simulation.
///
/// Nothing is global: dropping a `World` and creating a new one resets the
/// simulation completely.
#[derive(Debug, Default)]
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) now: Duration,

    pub(crate) entities: SlotMap<EntityId, EntityMeta>,
    pub(crate) transforms: SecondaryMap<EntityId, Transform>,
    pub(crate) anchored: SecondaryMap<EntityId, CollisionGroup>,

    // -- Items --
    pub(crate) items: SecondaryMap<EntityId, Item>,
    pub(crate) placements: SecondaryMap<EntityId, Placement>,
    pub(crate) thrown: SecondaryMap<EntityId, ()>,
    pub(crate) collision_wake: SecondaryMap<EntityId, bool>,
    pub(crate) item_slots: SecondaryMap<EntityId, ItemSlots>,

    // -- Machines --
    pub(crate) automation_slots: SecondaryMap<EntityId, AutomationSlots>,
    pub(crate) automated: SecondaryMap<EntityId, Automated>,
    pub(crate) filters: SecondaryMap<EntityId, AutomationFilter>,
    pub(crate) power: SecondaryMap<EntityId, PowerReceiver>,
    pub(crate) arms: SecondaryMap<EntityId, RoboticArm>,
    pub(crate) bins: SecondaryMap<EntityId, StorageBin>,

    // -- Collaborators --
    pub(crate) links: LinkLayer,
    pub(crate) tiles: TileMap,
    pub(crate) zones: ZoneTracker,
}

impl World {
    /// Creates an empty world.
    pub fn new(config: WorldConfig) -> Self {
        Self {
            links: LinkLayer::with_capacity(config.signal_log_capacity),
            config,
            ..Default::default()
        }
    }

    /// The configuration the world was created with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Simulation time elapsed since the world was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Advances the clock by `frame_time`, sweeps pickup zones, then runs
    /// every robotic arm once.
    ///
    /// Signals emitted during the update accumulate until
    /// [`drain_signals`](Self::drain_signals) is called. Only the last
    /// `WorldConfig::signal_log_capacity` pulses are kept in between, so a
    /// caller that consumes signals should drain once per update.
    pub fn update(&mut self, frame_time: Duration) {
        self.now += frame_time;
        self.step_physics();
        self.update_arms();
    }

    /// Returns `true` if `uid` refers to a live entity.
    pub fn contains(&self, uid: EntityId) -> bool {
        self.entities.contains_key(uid)
    }

    /// Name the entity was spawned with.
    pub fn name(&self, uid: EntityId) -> Option<&str> {
        self.entities.get(uid).map(|meta| meta.name.as_str())
    }

    /// World-space pose of `uid`.
    pub fn transform(&self, uid: EntityId) -> Option<&Transform> {
        self.transforms.get(uid)
    }

    /// Teleports an entity, e.g. an item pushed along by a conveyor or a
    /// machine that was unanchored and moved.
    pub fn set_position(&mut self, uid: EntityId, position: Vec2) {
        self.move_entity(uid, position);
    }

    pub(crate) fn spawn(&mut self, name: &str, transform: Transform) -> EntityId {
        let uid = self.entities.insert(EntityMeta {
            name: name.to_owned(),
        });
        self.transforms.insert(uid, transform);
        uid
    }

    /// Spawns an anchored, powered machine with no automation of its own.
    pub fn spawn_machine(&mut self, name: &str, position: Vec2, rotation: f32) -> EntityId {
        let uid = self.spawn(name, Transform::new(position, rotation));
        self.anchor(uid, CollisionGroup::MACHINE_LAYER);
        self.power.insert(uid, PowerReceiver::default());
        uid
    }

    /// Removes an entity and everything it owns.
    ///
    /// Arms drop their carried item at their output position, storage bins
    /// spill their contents onto their tile, and every link touching the
    /// entity is severed with the other end notified.
    pub fn despawn(&mut self, uid: EntityId) -> AutomationResult<()> {
        if !self.contains(uid) {
            return Err(AutomationError::UnknownEntity(uid));
        }
        let position = self.transforms.get(uid).map(|xform| xform.position);

        if let Some(arm) = self.arms.remove(uid) {
            arm.teardown(self, uid);
            self.zones.forget_zone(uid);
        }

        if self.automated.remove(uid).is_some()
            && let Some(slots) = self.automation_slots.get(uid).cloned()
        {
            self.remove_slot_ports(&slots);
        }

        if let Some(position) = position {
            let spilled: Vec<EntityId> = self
                .bins
                .get(uid)
                .map(|bin| bin.items().to_vec())
                .unwrap_or_default();
            let held: Vec<EntityId> = self
                .item_slots
                .get(uid)
                .map(|slots| slots.held_items().collect())
                .unwrap_or_default();
            for item in spilled.into_iter().chain(held) {
                self.place_on_ground(item, position);
            }
        }

        if self.items.contains_key(uid) {
            self.detach(uid);
        }

        for link in self.links.remove_entity(uid) {
            self.notify_disconnected(&link);
        }

        self.unanchor(uid);
        self.transforms.remove(uid);
        self.items.remove(uid);
        self.placements.remove(uid);
        self.thrown.remove(uid);
        self.collision_wake.remove(uid);
        self.item_slots.remove(uid);
        self.automation_slots.remove(uid);
        self.filters.remove(uid);
        self.power.remove(uid);
        self.bins.remove(uid);
        self.entities.remove(uid);
        debug!(?uid, "entity despawned");
        Ok(())
    }

    /// Links `source_port` on `source` to `sink_port` on `sink`.
    ///
    /// Both endpoints get a chance to veto the link first; a vetoed link
    /// leaves every existing link untouched.
    pub fn try_link(
        &mut self,
        source: EntityId,
        source_port: &str,
        sink: EntityId,
        sink_port: &str,
    ) -> AutomationResult<()> {
        for uid in [source, sink] {
            if !self.contains(uid) {
                return Err(AutomationError::UnknownEntity(uid));
            }
        }
        if !self.links.has_source_port(source, source_port) {
            return Err(AutomationError::PortNotFound {
                entity: source,
                port: source_port.to_owned(),
                direction: "source",
            });
        }
        if !self.links.has_sink_port(sink, sink_port) {
            return Err(AutomationError::PortNotFound {
                entity: sink,
                port: sink_port.to_owned(),
                direction: "sink",
            });
        }

        let link = Link::new(source, source_port, sink, sink_port);
        if self.links.contains(&link) {
            return Err(AutomationError::AlreadyLinked {
                source_port: link.source_port,
                sink_port: link.sink_port,
            });
        }

        let mut attempt = LinkAttempt::new(&link);
        self.notify_link_attempt(source, &mut attempt);
        if sink != source {
            self.notify_link_attempt(sink, &mut attempt);
        }
        if attempt.is_cancelled() {
            debug!(?source, source_port, ?sink, sink_port, "link vetoed");
            return Err(AutomationError::LinkRejected {
                source_port: link.source_port,
                sink_port: link.sink_port,
            });
        }

        self.links.insert(link.clone());
        self.with_arm(source, |world, arm| arm.on_new_link(world, source, &link));
        if sink != source {
            self.with_arm(sink, |world, arm| arm.on_new_link(world, sink, &link));
        }
        debug!(?source, source_port, ?sink, sink_port, "link established");
        Ok(())
    }

    /// Removes an existing link and notifies both endpoints.
    pub fn unlink(
        &mut self,
        source: EntityId,
        source_port: &str,
        sink: EntityId,
        sink_port: &str,
    ) -> AutomationResult<()> {
        let link = Link::new(source, source_port, sink, sink_port);
        if !self.links.remove(&link) {
            return Err(AutomationError::LinkNotFound {
                source_port: link.source_port,
                sink_port: link.sink_port,
            });
        }
        self.notify_disconnected(&link);
        Ok(())
    }

    /// Read access to ports and links.
    pub fn links(&self) -> &LinkLayer {
        &self.links
    }

    /// Direct access to the link layer, for registering ports on custom machines.
    pub fn links_mut(&mut self) -> &mut LinkLayer {
        &mut self.links
    }

    /// The most recent signals since the last [`drain_signals`](Self::drain_signals).
    pub fn signals(&self) -> &VecDeque<SignalPulse> {
        self.links.pulses()
    }

    /// Takes the signal log and resets every signal count.
    pub fn drain_signals(&mut self) -> Vec<SignalPulse> {
        self.links.drain_pulses()
    }

    /// Number of pulses emitted on `port` of `uid` since the last drain.
    pub fn signal_count(&self, uid: EntityId, port: &str) -> usize {
        self.links.pulse_count(uid, port)
    }

    fn notify_link_attempt(&self, uid: EntityId, attempt: &mut LinkAttempt) {
        if let Some(arm) = self.arms.get(uid) {
            arm.on_link_attempt(self, uid, attempt);
        }
    }

    pub(crate) fn notify_disconnected(&mut self, link: &Link) {
        let ends = [
            (link.source, link.source_port.clone()),
            (link.sink, link.sink_port.clone()),
        ];
        for (uid, port) in ends {
            self.with_arm(uid, |_, arm| arm.on_port_disconnected(&PortDisconnected { port }));
        }
    }

    /// Runs `f` with the arm of `uid` temporarily taken out of the world so
    /// both can be borrowed mutably.
    pub(crate) fn with_arm<R>(
        &mut self,
        uid: EntityId,
        f: impl FnOnce(&mut World, &mut RoboticArm) -> R,
    ) -> Option<R> {
        let mut arm = self.arms.remove(uid)?;
        let result = f(self, &mut arm);
        if self.contains(uid) {
            self.arms.insert(uid, arm);
        }
        Some(result)
    }
}
