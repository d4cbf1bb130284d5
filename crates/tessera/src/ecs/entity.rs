//! # Entity — Stable Identities Plus a Component Table
//!
//! An [`Entity`] is an [`EntityId`] paired with an open set of named
//! components. The [`World`](super::world::World) owns every `Entity` record;
//! everything else (queries, hooks, systems) refers to entities by id.
//!
//! ## Design: Monotonic Identities
//!
//! hecs and bevy_ecs recycle entity slots and guard them with generations. Here
//! identities must also survive a save/load round trip and stay unique for the
//! lifetime of the world, so the allocator is a plain monotonic counter:
//!
//! ```text
//! next: 7        ← next identity handed out
//! create()  → 7, next = 8
//! restore([3, 12]) → next = max(8, 12 + 1) = 13
//! ```
//!
//! Identities are never reused, so there is nothing to generation-check. A
//! stale `EntityId` simply stops resolving once its entity is removed.
//!
//! ## Exhaustion
//!
//! `u64::MAX` is reserved as the "exhausted" marker and never handed out.
//! Allocation past it returns [`EcsError::IdentityExhausted`].

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::component::{Archetype, Components};
use crate::error::EcsError;

/// Stable identity of an entity within one [`World`](super::world::World).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub(crate) u64);

impl EntityId {
    /// Returns the raw identity value.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Wraps a raw identity value, e.g. one read back from a snapshot.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(EntityId)
    }
}

// Snapshots carry identities as strings. Integers are accepted on the way in
// so hand-written scene files stay readable.
impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = EntityId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an entity identity as a decimal string or unsigned integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EntityId, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<EntityId, E> {
                Ok(EntityId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<EntityId, E> {
                u64::try_from(v)
                    .map(EntityId)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// A stored entity: its identity and its current components.
///
/// Hooks, predicates, and queries see entities through `&Entity`. Mutation
/// goes through the [`World`](super::world::World) so queries stay in sync.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    components: Components,
}

impl Entity {
    pub(crate) fn new(id: EntityId, components: Components) -> Self {
        Self { id, components }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut Components {
        &mut self.components
    }

    /// Shorthand for `self.components().get(name)`.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.components.get(name)
    }

    /// Returns `true` if a component called `name` is attached.
    pub fn has(&self, name: &str) -> bool {
        self.components.contains(name)
    }

    /// Reads a numeric component, if present and numeric.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.components.get(name).and_then(serde_json::Value::as_f64)
    }

    /// The archetype derived from the current component names.
    pub fn archetype(&self) -> Archetype {
        self.components.archetype()
    }
}

/// Hands out entity identities. Never reuses one.
#[derive(Debug)]
pub(crate) struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocate the next identity.
    pub fn allocate(&mut self) -> Result<EntityId, EcsError> {
        if self.next == u64::MAX {
            return Err(EcsError::IdentityExhausted);
        }
        let id = EntityId(self.next);
        self.next += 1;
        Ok(id)
    }

    /// Move the counter past `id` so it can never be handed out again.
    pub fn advance_past(&mut self, id: EntityId) {
        self.next = self.next.max(id.0.saturating_add(1));
    }

    /// The identity the next `allocate` will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}
