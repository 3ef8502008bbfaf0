//! Device-link layer: named ports, links between them, and signal pulses.
//!
//! A *source* port emits signals and a *sink* port receives them. Links always
//! run from a source port on one entity to a sink port on another. The layer
//! itself has no policy; vetoing links is done by the owners of the ports via
//! [`LinkAttempt`].

use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Default number of recent pulses a [`LinkLayer`] keeps.
pub const PULSE_LOG_CAPACITY: usize = 256;

/// Ports registered on one entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePorts {
    pub sinks: BTreeSet<String>,
    pub sources: BTreeSet<String>,
}

/// An established connection from a source port to a sink port.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: EntityId,
    pub source_port: String,
    pub sink: EntityId,
    pub sink_port: String,
}

impl Link {
    /// A link from `source_port` on `source` to `sink_port` on `sink`.
    pub fn new(
        source: EntityId,
        source_port: impl Into<String>,
        sink: EntityId,
        sink_port: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_port: source_port.into(),
            sink,
            sink_port: sink_port.into(),
        }
    }

    /// Returns `true` if this link uses `port` on `entity` in either role.
    pub fn touches(&self, entity: EntityId, port: &str) -> bool {
        (self.source == entity && self.source_port == port)
            || (self.sink == entity && self.sink_port == port)
    }
}

/// Raised on both endpoints before a link is created. Any handler may cancel it.
#[derive(Clone, Debug)]
pub struct LinkAttempt {
    pub source: EntityId,
    pub source_port: String,
    pub sink: EntityId,
    pub sink_port: String,
    cancelled: bool,
}

impl LinkAttempt {
    /// An uncancelled attempt to create `link`.
    pub fn new(link: &Link) -> Self {
        Self {
            source: link.source,
            source_port: link.source_port.clone(),
            sink: link.sink,
            sink_port: link.sink_port.clone(),
            cancelled: false,
        }
    }

    /// Vetoes the link.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Returns `true` once any handler vetoed the link.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Raised on both endpoints after a link was created.
pub type NewLink = Link;

/// Raised on an endpoint when a link using `port` on it was removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortDisconnected {
    pub port: String,
}

/// A signal emitted by invoking a source port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPulse {
    pub source: EntityId,
    pub port: String,
    /// Sinks that received the pulse, as `(entity, port)`.
    pub targets: Vec<(EntityId, String)>,
}

/// Owns every port, link and emitted signal of a world.
///
/// Signals are kept as a bounded log of the most recent pulses plus a count
/// per `(entity, port)`; both reset on [`drain_pulses`](Self::drain_pulses).
#[derive(Debug)]
pub struct LinkLayer {
    ports: SecondaryMap<EntityId, DevicePorts>,
    links: Vec<Link>,
    pulses: VecDeque<SignalPulse>,
    pulse_capacity: usize,
    pulse_counts: SecondaryMap<EntityId, BTreeMap<String, usize>>,
}

impl Default for LinkLayer {
    fn default() -> Self {
        Self::with_capacity(PULSE_LOG_CAPACITY)
    }
}

impl LinkLayer {
    /// An empty layer with the default pulse log capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer whose pulse log keeps at most `pulse_capacity` entries.
    pub fn with_capacity(pulse_capacity: usize) -> Self {
        Self {
            ports: SecondaryMap::new(),
            links: Vec::new(),
            pulses: VecDeque::new(),
            pulse_capacity,
            pulse_counts: SecondaryMap::new(),
        }
    }

    /// Registers sink ports on `entity`; existing names are kept.
    pub fn ensure_sink_ports(&mut self, entity: EntityId, names: &[&str]) {
        let Some(ports) = self.ports_mut(entity) else {
            return;
        };
        ports.sinks.extend(names.iter().map(|name| (*name).to_owned()));
    }

    /// Registers source ports on `entity`; existing names are kept.
    pub fn ensure_source_ports(&mut self, entity: EntityId, names: &[&str]) {
        let Some(ports) = self.ports_mut(entity) else {
            return;
        };
        ports.sources.extend(names.iter().map(|name| (*name).to_owned()));
    }

    /// Unregisters a sink port and returns the links it severed.
    pub fn remove_sink_port(&mut self, entity: EntityId, name: &str) -> Vec<Link> {
        if let Some(ports) = self.ports.get_mut(entity) {
            ports.sinks.remove(name);
        }
        self.sever(|link| link.sink == entity && link.sink_port == name)
    }

    /// Unregisters a source port and returns the links it severed.
    pub fn remove_source_port(&mut self, entity: EntityId, name: &str) -> Vec<Link> {
        if let Some(ports) = self.ports.get_mut(entity) {
            ports.sources.remove(name);
        }
        self.sever(|link| link.source == entity && link.source_port == name)
    }

    /// Forgets every port of `entity` and returns the links it severed.
    pub fn remove_entity(&mut self, entity: EntityId) -> Vec<Link> {
        self.ports.remove(entity);
        self.pulse_counts.remove(entity);
        self.sever(|link| link.source == entity || link.sink == entity)
    }

    /// Ports registered on `entity`.
    pub fn ports(&self, entity: EntityId) -> Option<&DevicePorts> {
        self.ports.get(entity)
    }

    /// Returns `true` if `entity` has a sink port `name`.
    pub fn has_sink_port(&self, entity: EntityId, name: &str) -> bool {
        self.ports
            .get(entity)
            .is_some_and(|ports| ports.sinks.contains(name))
    }

    /// Returns `true` if `entity` has a source port `name`.
    pub fn has_source_port(&self, entity: EntityId, name: &str) -> bool {
        self.ports
            .get(entity)
            .is_some_and(|ports| ports.sources.contains(name))
    }

    /// Every established link, in creation order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns `true` if `link` is established.
    pub fn contains(&self, link: &Link) -> bool {
        self.links.contains(link)
    }

    pub(crate) fn insert(&mut self, link: Link) {
        if !self.contains(&link) {
            self.links.push(link);
        }
    }

    pub(crate) fn remove(&mut self, link: &Link) -> bool {
        let before = self.links.len();
        self.links.retain(|existing| existing != link);
        self.links.len() != before
    }

    /// Emits a pulse on a source port. Returns how many sinks received it.
    pub fn invoke_port(&mut self, entity: EntityId, port: &str) -> usize {
        if !self.has_source_port(entity, port) {
            return 0;
        }

        let targets: Vec<(EntityId, String)> = self
            .links
            .iter()
            .filter(|link| link.source == entity && link.source_port == port)
            .map(|link| (link.sink, link.sink_port.clone()))
            .collect();
        let delivered = targets.len();

        if let Some(counts) = self.pulse_counts.entry(entity) {
            *counts.or_default().entry(port.to_owned()).or_default() += 1;
        }
        if self.pulse_capacity > 0 {
            if self.pulses.len() == self.pulse_capacity {
                self.pulses.pop_front();
            }
            self.pulses.push_back(SignalPulse {
                source: entity,
                port: port.to_owned(),
                targets,
            });
        }
        delivered
    }

    /// The most recent pulses since the last drain, oldest first.
    pub fn pulses(&self) -> &VecDeque<SignalPulse> {
        &self.pulses
    }

    /// Pulses emitted on `port` of `entity` since the last drain, including
    /// those that fell out of the log.
    pub fn pulse_count(&self, entity: EntityId, port: &str) -> usize {
        self.pulse_counts
            .get(entity)
            .and_then(|counts| counts.get(port))
            .copied()
            .unwrap_or(0)
    }

    /// Takes the pulse log and resets every count.
    pub fn drain_pulses(&mut self) -> Vec<SignalPulse> {
        self.pulse_counts.clear();
        std::mem::take(&mut self.pulses).into()
    }

    fn ports_mut(&mut self, entity: EntityId) -> Option<&mut DevicePorts> {
        if !self.ports.contains_key(entity) {
            self.ports.insert(entity, DevicePorts::default());
        }
        self.ports.get_mut(entity)
    }

    fn sever(&mut self, pred: impl Fn(&Link) -> bool) -> Vec<Link> {
        let (severed, kept) = std::mem::take(&mut self.links)
            .into_iter()
            .partition(|link| pred(link));
        self.links = kept;
        severed
    }
}
