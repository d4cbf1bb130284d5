//! Convenience re-exports — `use tessera::prelude::*` for the common items.

pub use crate::config::WorldConfig;
pub use crate::ecs::{
    Archetype, Components, Entity, EntityId, HookError, Query, QueryFilter, QueryId, System,
    SystemId, World,
};
pub use crate::error::EcsError;
pub use crate::scene::{Snapshot, SnapshotEntity, SystemCatalog};
pub use crate::template::Templates;

#[cfg(feature = "diagnostics")]
pub use crate::diag::WorldStats;
