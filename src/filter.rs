//! Automation filters: which items, and how many units, a flow may move.

use crate::entity::{EntityId, Placement, Transform};
use crate::item::Item;
use crate::world::World;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Whether `kinds` lists the items that pass or the items that are blocked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    Allow,
    Deny,
}

/// A filter attached to an arm or machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationFilter {
    pub mode: FilterMode,

    /// Item kinds matched by this filter.
    pub kinds: BTreeSet<String>,

    /// Exact number of units to take per move. `None` takes whole stacks.
    /// Zero is read back as `None`.
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Option<u32>,
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.filter(|&amount| amount > 0))
}

impl AutomationFilter {
    /// A filter letting only the given kinds through.
    pub fn allow<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::Allow,
            kinds: kinds.into_iter().map(Into::into).collect(),
            amount: None,
        }
    }

    /// A filter blocking the given kinds.
    pub fn deny<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::Deny,
            kinds: kinds.into_iter().map(Into::into).collect(),
            amount: None,
        }
    }

    /// Takes exactly `amount` units per move. Zero is raised to one.
    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = Some(amount.max(1));
        self
    }

    /// Units to take per move; a zero amount counts as none.
    pub fn split_amount(&self) -> Option<u32> {
        self.amount.filter(|&amount| amount > 0)
    }

    /// Returns `true` if `item`'s kind passes the filter.
    pub fn allows(&self, item: &Item) -> bool {
        let listed = self.kinds.contains(&item.kind);
        match self.mode {
            FilterMode::Allow => listed,
            FilterMode::Deny => !listed,
        }
    }
}

impl fmt::Display for AutomationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.mode {
            FilterMode::Allow => "allow",
            FilterMode::Deny => "deny",
        };
        let kinds: Vec<&str> = self.kinds.iter().map(String::as_str).collect();
        write!(f, "{verb} [{}]", kinds.join(", "))?;
        if let Some(amount) = self.amount {
            write!(f, " x{amount}")?;
        }
        Ok(())
    }
}

/// Returns `true` if `filter` stops `item`. No filter blocks nothing.
pub fn is_blocked(filter: Option<&AutomationFilter>, item: &Item) -> bool {
    filter.is_some_and(|filter| !filter.allows(item))
}

impl World {
    /// The filter configured on `uid`, if any.
    pub fn filter_for(&self, uid: EntityId) -> Option<&AutomationFilter> {
        self.filters.get(uid)
    }

    /// Sets or clears the filter of `uid`.
    pub fn set_filter(&mut self, uid: EntityId, filter: Option<AutomationFilter>) {
        if !self.entities.contains_key(uid) {
            return;
        }
        match filter {
            Some(filter) => {
                self.filters.insert(uid, filter);
            }
            None => {
                self.filters.remove(uid);
            }
        }
    }

    /// Like [`is_blocked`], resolving `item` in this world. Unknown items are blocked.
    pub fn is_item_blocked(&self, filter: Option<&AutomationFilter>, item: EntityId) -> bool {
        self.items
            .get(item)
            .is_none_or(|item| is_blocked(filter, item))
    }

    /// Splits off the quantity `filter` permits from `item`.
    ///
    /// Without an amount the whole stack is returned as-is. A stack smaller
    /// than the amount yields `None`; a larger one is reduced and the taken
    /// units are spawned as a new entity next to it. Reducing a stack held in
    /// a storage bin pulses the bin's "removed" port.
    pub fn try_split(&mut self, filter: Option<&AutomationFilter>, item: EntityId) -> Option<EntityId> {
        let stack = self.items.get(item)?;
        if is_blocked(filter, stack) {
            return None;
        }

        let Some(amount) = filter.and_then(AutomationFilter::split_amount) else {
            return Some(item);
        };
        if stack.count < amount {
            return None;
        }
        if stack.count == amount {
            return Some(item);
        }

        let kind = stack.kind.clone();
        let xform = self.transforms.get(item).copied().unwrap_or_default();
        if let Some(stack) = self.items.get_mut(item) {
            stack.count -= amount;
        }
        if let Some(Placement::Container(bin)) = self.placements.get(item).cloned() {
            self.storage_units_removed(bin);
        }

        let split = self.spawn(&kind, Transform::new(xform.position, 0.0));
        self.items.insert(split, Item::new(kind.as_str(), amount));
        self.placements.insert(split, Placement::Ground);
        self.collision_wake.insert(split, false);
        debug!(?item, ?split, amount, "split stack");
        Some(split)
    }
}
