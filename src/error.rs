//! Error types for world-level automation operations.
//!
//! Per-tick operations (pickup, drop, slot insertion) never return these; they
//! report plain success/failure so the caller can retry next tick.

use crate::entity::EntityId;
use thiserror::Error;

/// Errors returned by fallible [`World`](crate::World) operations.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("unknown entity: {0:?}")]
    UnknownEntity(EntityId),
    #[error("entity {0:?} has no automation slots")]
    NotAutomatable(EntityId),
    #[error("entity {entity:?} has no {direction} port named `{port}`")]
    PortNotFound {
        entity: EntityId,
        port: String,
        direction: &'static str,
    },
    #[error("port `{source_port}` is already linked to `{sink_port}`")]
    AlreadyLinked {
        source_port: String,
        sink_port: String,
    },
    #[error("link from `{source_port}` to `{sink_port}` was rejected")]
    LinkRejected {
        source_port: String,
        sink_port: String,
    },
    #[error("no link from `{source_port}` to `{sink_port}`")]
    LinkNotFound {
        source_port: String,
        sink_port: String,
    },
    #[error("robotic arm {entity:?} is missing item slot `{slot}`")]
    MissingItemSlot { entity: EntityId, slot: String },
}

/// Convenience result type for automation operations.
pub type AutomationResult<T> = Result<T, AutomationError>;
