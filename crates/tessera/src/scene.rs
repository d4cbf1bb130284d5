//! # Scene — Snapshot and Restore World State
//!
//! Serializes the entity set and the system list to a [`Snapshot`], and
//! restores a world from one. A [`SystemCatalog`] maps system names back to
//! runnable systems.
//!
//! ## Quick Start
//!
//! ```ignore
//! let mut catalog = SystemCatalog::new();
//! catalog.register_fn("movement", movement);
//!
//! // Save.
//! let json = world.serialize().to_json()?;
//!
//! // Load (into this or any other world).
//! let snapshot = Snapshot::from_json(&json)?;
//! world.deserialize(&snapshot, &catalog)?;
//! ```
//!
//! ## What Is (Not) Saved
//!
//! - Saved: every entity's identity and a copy of its component table, and
//!   the names of the scheduled systems, in order.
//! - Not saved: lifecycle hooks, live queries, templates. Those are runtime
//!   wiring; the host re-establishes them. Queries and hooks already
//!   registered on the restoring world survive and are recomputed.
//!
//! ## Systems Are Restored By Name
//!
//! Systems are code, and code isn't data. Instead of serializing a routine,
//! the snapshot stores its name and restore looks the name up in a catalog of
//! statically-known systems. An unknown name fails the whole restore.
//!
//! Closures added with `World::add_system` are all named `<closure>`, so a
//! snapshot can't tell them apart. Systems meant to survive a save must be
//! registered with `World::add_named_system` under a unique name.
//! `serialize` logs a warning for every name it can't restore unambiguously.
//!
//! ## Restore Is All-Or-Nothing
//!
//! The snapshot is fully validated and every system is built before the world
//! is touched. On error the world is exactly as it was.
//!
//! ## Wire Format
//!
//! ```text
//! {
//!   "entities": [ { "id": "0", "components": { "x": 0, "hp": 10 } } ],
//!   "systems":  [ "movement", "damage" ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ecs::system::short_system_name;
use crate::ecs::{Components, Entity, EntityId, System, World};
use crate::error::EcsError;

// ── SystemCatalog ────────────────────────────────────────────────────────

type SystemFactory = Box<dyn Fn() -> Box<dyn System>>;

/// Maps system names to constructors.
///
/// Register every system a snapshot may name before restoring it.
#[derive(Default)]
pub struct SystemCatalog {
    by_name: HashMap<String, SystemFactory>,
}

impl SystemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `Default`-constructible system type under its short type
    /// name (the same name `World::add_system` gives it).
    pub fn register<S>(&mut self)
    where
        S: System + Default + 'static,
    {
        let name = short_system_name(std::any::type_name::<S>());
        self.register_with(name, || Box::new(S::default()));
    }

    /// Register a prototype system under `name`; each restore gets a clone.
    ///
    /// Function items are `Clone`, so `catalog.register_fn("movement", movement)`
    /// is the common case.
    pub fn register_fn<S>(&mut self, name: impl Into<String>, system: S)
    where
        S: System + Clone + 'static,
    {
        self.register_with(name, move || Box::new(system.clone()));
    }

    /// Register an arbitrary factory under `name`.
    pub fn register_with<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn System> + 'static,
    {
        self.by_name.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn build(&self, name: &str) -> Option<Box<dyn System>> {
        self.by_name.get(name).map(|factory| factory())
    }
}

impl std::fmt::Debug for SystemCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// ── Snapshot (wire format) ───────────────────────────────────────────────

/// Serialized world state: entities plus system names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entities: Vec<SnapshotEntity>,
    #[serde(default)]
    pub systems: Vec<String>,
}

/// A single entity in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntity {
    pub id: EntityId,
    #[serde(default)]
    pub components: Components,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, EcsError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, EcsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EcsError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ── Save / Load ──────────────────────────────────────────────────────────

impl World {
    /// Snapshot every entity (ascending id order) and the system list.
    pub fn serialize(&self) -> Snapshot {
        let entities = self
            .entities
            .values()
            .map(|entity| SnapshotEntity {
                id: entity.id(),
                components: entity.components().clone(),
            })
            .collect();
        let systems: Vec<String> = self.schedule.names().map(str::to_string).collect();
        for name in ambiguous_system_names(&systems) {
            log::warn!(
                "system `{}` can't be told apart on restore; register it with add_named_system under a unique name",
                name
            );
        }
        Snapshot { entities, systems }
    }

    /// Replace all entities and systems with the contents of `snapshot`.
    ///
    /// Identities are preserved and the allocator moves past the largest one.
    /// Registered queries are recomputed from scratch; no hooks fire.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateIdentity`], [`EcsError::UnknownSystem`], or
    /// [`EcsError::TickInProgress`]. The world is unchanged on error.
    pub fn deserialize(
        &mut self,
        snapshot: &Snapshot,
        catalog: &SystemCatalog,
    ) -> Result<(), EcsError> {
        if self.schedule.is_running() {
            return Err(EcsError::TickInProgress);
        }

        let mut entities = BTreeMap::new();
        for record in &snapshot.entities {
            let entity = Entity::new(record.id, record.components.clone());
            if entities.insert(record.id, entity).is_some() {
                return Err(EcsError::DuplicateIdentity(record.id));
            }
        }

        let mut systems = Vec::with_capacity(snapshot.systems.len());
        for name in &snapshot.systems {
            let system = catalog
                .build(name)
                .ok_or_else(|| EcsError::UnknownSystem(name.clone()))?;
            systems.push((name.clone(), system));
        }

        // Validated; commit.
        if let Some(&max) = entities.keys().next_back() {
            self.allocator.advance_past(max);
        }
        self.entities = entities;
        self.schedule.replace(systems);
        self.queries.rebuild(self.entities.values());

        log::info!(
            "restored {} entities and {} systems (next id {})",
            self.entities.len(),
            snapshot.systems.len(),
            self.allocator.peek()
        );
        Ok(())
    }
}

/// Names that don't identify a single system: anonymous closures and any
/// name scheduled more than once. Each is reported once.
fn ambiguous_system_names(names: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut ambiguous = Vec::new();
    for name in names {
        let repeated = !seen.insert(name.as_str());
        if (repeated || name == "<closure>") && !ambiguous.contains(&name.as_str()) {
            ambiguous.push(name.as_str());
        }
    }
    ambiguous
}
