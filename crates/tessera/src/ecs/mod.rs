//! # Dynamic-Component ECS
//!
//! Entities are identities plus open, string-keyed component tables. Queries
//! are live caches kept consistent with every mutation. Systems are plain
//! functions run once per tick.
//!
//! ## Module Overview
//!
//! - [`entity`] — Stable identities and entity records
//! - [`component`] — Component tables and derived archetypes
//! - [`query`] — Live queries and the index that maintains them
//! - [`hooks`] — Lifecycle callbacks on membership transitions
//! - [`system`] — System trait and schedule runner
//! - [`world`] — Central container tying it all together

pub mod component;
pub mod entity;
pub mod hooks;
pub mod query;
pub mod system;
pub mod world;

pub use component::{Archetype, Components};
pub use entity::{Entity, EntityId};
pub use hooks::{Hook, HookError, LifecycleHooks};
pub use query::{Query, QueryFilter, QueryId, QueryIndex};
pub use system::{Schedule, System, SystemId};
pub use world::World;
