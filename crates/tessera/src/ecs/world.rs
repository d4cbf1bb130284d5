//! # World — The Central Container
//!
//! The [`World`] owns all entities, live queries, lifecycle hooks, systems,
//! and archetype templates. It's the single source of truth, and the only
//! way to mutate an entity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ World                                               │
//! │                                                     │
//! │  allocator: monotonic EntityId counter              │
//! │                                                     │
//! │  entities: BTreeMap<EntityId, Entity>               │
//! │    canonical records, ascending id = creation order │
//! │                                                     │
//! │  queries: QueryIndex                                │
//! │    live queries holding EntityIds, never data       │
//! │                                                     │
//! │  hooks: LifecycleHooks (world level)                │
//! │  schedule: Schedule (systems, in order)             │
//! │  templates: Templates (named default components)    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mutation Protocol
//!
//! Every mutating call runs the same three steps to completion before it
//! returns:
//!
//! 1. apply the change to the canonical record,
//! 2. re-evaluate that one entity against every live query,
//! 3. fire query hooks for real transitions, then world hooks (create/remove).
//!
//! `update_state` and `merge_state` batch any number of component changes
//! into one re-evaluation, so hooks fire at most once per query per call.
//!
//! ## Not Found
//!
//! Mutations on an unknown or removed `EntityId` are silent no-ops that
//! return `Ok(false)`. Lookups return `None`.
//!
//! ## Threading
//!
//! None. The world is single-writer and has no internal locking; hooks and
//! systems run on the calling thread. Hosts that share a world across threads
//! must wrap it in their own lock.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::component::Components;
use super::entity::{Entity, EntityAllocator, EntityId};
use super::hooks::{HookError, LifecycleHooks};
use super::query::{Query, QueryFilter, QueryId, QueryIndex};
use super::system::{Schedule, System, SystemId};
use crate::config::WorldConfig;
use crate::error::EcsError;
use crate::template::Templates;

/// The central container for all simulation state.
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) allocator: EntityAllocator,
    /// Canonical entity records.
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    pub(crate) queries: QueryIndex,
    /// World-level hooks, fired once per create/remove.
    pub(crate) hooks: LifecycleHooks,
    pub(crate) schedule: Schedule,
    pub(crate) templates: Templates,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            allocator: EntityAllocator::new(),
            entities: BTreeMap::new(),
            queries: QueryIndex::new(),
            hooks: LifecycleHooks::new(),
            schedule: Schedule::new(),
            templates: Templates::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ── Entity Management ────────────────────────────────────────────

    /// Create an entity with the given components.
    ///
    /// The entity is matched against every live query (firing their hooks)
    /// and then the world's `on_entity_added` hooks fire. If a hook fails the
    /// entity stays created; the error carries its id.
    pub fn create(&mut self, components: Components) -> Result<EntityId, EcsError> {
        let id = self.allocator.allocate()?;
        log::debug!("create {:?} {}", id, components.archetype());

        let entity: &Entity = self
            .entities
            .entry(id)
            .or_insert_with(|| Entity::new(id, components));
        let transitions = self.queries.reevaluate(entity, false);
        self.queries
            .dispatch(&transitions, entity)
            .map_err(|e| hook_error(id, e))?;
        self.hooks.fire_added(entity).map_err(|e| hook_error(id, e))?;
        Ok(id)
    }

    /// Remove an entity. It leaves every query that contains it, whatever its
    /// components, and then the world's `on_entity_removed` hooks fire.
    ///
    /// Returns `Ok(false)` if the entity was not present.
    pub fn remove(&mut self, id: EntityId) -> Result<bool, EcsError> {
        let Some(entity) = self.entities.remove(&id) else {
            return Ok(false);
        };
        log::debug!("remove {:?}", id);

        let transitions = self.queries.reevaluate(&entity, true);
        self.queries
            .dispatch(&transitions, &entity)
            .map_err(|e| hook_error(id, e))?;
        self.hooks.fire_removed(&entity).map_err(|e| hook_error(id, e))?;
        Ok(true)
    }

    /// Remove every entity, firing hooks as [`remove`](Self::remove) does.
    pub fn clear(&mut self) -> Result<(), EcsError> {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            self.remove(id)?;
        }
        Ok(())
    }

    /// Insert or overwrite a component.
    pub fn add_component(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
        value: Value,
    ) -> Result<bool, EcsError> {
        let name = name.into();
        self.mutate(id, move |components| {
            components.insert(name, value);
        })
    }

    /// Remove a component if present. Removing a component the entity never
    /// had changes nothing, so no hooks fire.
    pub fn remove_component(&mut self, id: EntityId, name: &str) -> Result<bool, EcsError> {
        self.mutate(id, |components| {
            components.remove(name);
        })
    }

    /// Apply an arbitrary mutation to an entity's components, then
    /// re-evaluate queries once.
    pub fn update_state<F>(&mut self, id: EntityId, update: F) -> Result<bool, EcsError>
    where
        F: FnOnce(&mut Components),
    {
        self.mutate(id, update)
    }

    /// Shallow-merge `patch` into an entity's components, then re-evaluate
    /// queries once.
    pub fn merge_state(&mut self, id: EntityId, patch: Components) -> Result<bool, EcsError> {
        self.mutate(id, move |components| components.merge(patch))
    }

    fn mutate<F>(&mut self, id: EntityId, update: F) -> Result<bool, EcsError>
    where
        F: FnOnce(&mut Components),
    {
        let Some(entity) = self.entities.get_mut(&id) else {
            log::debug!("mutation of missing {:?} ignored", id);
            return Ok(false);
        };
        update(entity.components_mut());

        let entity: &Entity = entity;
        let transitions = self.queries.reevaluate(entity, false);
        self.queries
            .dispatch(&transitions, entity)
            .map_err(|e| hook_error(id, e))?;
        Ok(true)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a single component value.
    pub fn component(&self, id: EntityId, name: &str) -> Option<&Value> {
        self.entities.get(&id)?.get(name)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Returns the number of stored entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// All entities, in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of distinct archetypes among stored entities.
    pub fn archetype_count(&self) -> usize {
        self.entities
            .values()
            .map(Entity::archetype)
            .collect::<HashSet<_>>()
            .len()
    }

    // ── Hooks ────────────────────────────────────────────────────────

    /// Append a hook fired after every `create`.
    pub fn on_entity_added<F>(&mut self, hook: F)
    where
        F: FnMut(&Entity) -> Result<(), HookError> + 'static,
    {
        self.hooks.on_added(hook);
    }

    /// Append a hook fired after every `remove`.
    pub fn on_entity_removed<F>(&mut self, hook: F)
    where
        F: FnMut(&Entity) -> Result<(), HookError> + 'static,
    {
        self.hooks.on_removed(hook);
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Register a live query. Its cache is filled by one scan of the current
    /// entities. Registering the same filter twice yields two independent
    /// queries.
    pub fn add_query(&mut self, filter: QueryFilter) -> QueryId {
        self.queries
            .register(filter, self.config.query_capacity, self.entities.values())
    }

    /// Entities carrying every one of `names`.
    pub fn query_has<I, S>(&mut self, names: I) -> QueryId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_query(QueryFilter::has(names))
    }

    /// Entities carrying none of `names`.
    pub fn query_none<I, S>(&mut self, names: I) -> QueryId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_query(QueryFilter::none(names))
    }

    /// Entities satisfying `predicate`.
    pub fn query_where<F>(&mut self, predicate: F) -> QueryId
    where
        F: Fn(&Entity) -> bool + 'static,
    {
        self.add_query(QueryFilter::matching(predicate))
    }

    /// Entities satisfying a fallible `predicate`; errors count as no match.
    pub fn try_query_where<F>(&mut self, predicate: F) -> QueryId
    where
        F: Fn(&Entity) -> Result<bool, HookError> + 'static,
    {
        self.add_query(QueryFilter::try_matching(predicate))
    }

    pub fn query(&self, id: QueryId) -> Option<&Query> {
        self.queries.get(id)
    }

    /// Mutable access for registering query hooks.
    pub fn query_mut(&mut self, id: QueryId) -> Option<&mut Query> {
        self.queries.get_mut(id)
    }

    /// The cached ids of a query, or an empty slice for an unknown query.
    pub fn query_ids(&self, id: QueryId) -> &[EntityId] {
        self.queries.get(id).map(Query::entities).unwrap_or(&[])
    }

    /// Resolve a query's members to their entity records.
    pub fn query_entities(&self, id: QueryId) -> impl Iterator<Item = &Entity> {
        self.query_ids(id)
            .iter()
            .filter_map(|e| self.entities.get(e))
    }

    /// Discard a query. Returns `false` if it was already gone.
    pub fn drop_query(&mut self, id: QueryId) -> bool {
        self.queries.remove(id)
    }

    pub fn queries(&self) -> &QueryIndex {
        &self.queries
    }

    // ── Systems ──────────────────────────────────────────────────────

    /// Add a system to the end of the schedule, named after its type.
    pub fn add_system<S: System + 'static>(&mut self, system: S) -> SystemId {
        self.schedule.add(system)
    }

    /// Add a system under an explicit name (the name snapshots record).
    pub fn add_named_system<S: System + 'static>(
        &mut self,
        name: impl Into<String>,
        system: S,
    ) -> SystemId {
        self.schedule.add_named(name, system)
    }

    /// Remove systems by id; unknown ids are ignored. During a tick, removed
    /// systems still finish the current tick.
    pub fn remove_systems(&mut self, ids: &[SystemId]) -> usize {
        self.schedule.remove(ids)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Run every system once, in order, with the same `dt`.
    ///
    /// The list is snapshotted first: systems added during the tick start
    /// running next tick. Calling `update` from inside a system is ignored.
    pub fn update(&mut self, dt: f64) {
        if self.schedule.is_running() {
            log::warn!("update({}) called during a tick; ignored", dt);
            return;
        }
        let mut running = self.schedule.begin_tick();
        for system in running.iter_mut() {
            #[cfg(feature = "diagnostics")]
            let start = std::time::Instant::now();

            system.run(self, dt);

            #[cfg(feature = "diagnostics")]
            self.schedule.record_timing(&system.name, start.elapsed());
        }
        self.schedule.end_tick(running);
    }

    /// [`update`](Self::update) with the configured default timestep.
    pub fn tick(&mut self) {
        self.update(self.config.default_timestep);
    }

    // ── Templates ────────────────────────────────────────────────────

    /// Define (or redefine) a named template of default components.
    pub fn define_template(&mut self, name: impl Into<String>, components: Components) {
        self.templates.define(name, components);
    }

    /// Create an entity from a template, with `overrides` merged on top.
    ///
    /// Returns `Ok(None)` if no template has that name.
    pub fn spawn_template(
        &mut self,
        name: &str,
        overrides: Components,
    ) -> Result<Option<EntityId>, EcsError> {
        let Some(components) = self.templates.instantiate(name, overrides) else {
            log::warn!("no template named '{}'", name);
            return Ok(None);
        };
        self.create(components).map(Some)
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("queries", &self.queries.len())
            .field("schedule", &self.schedule)
            .finish()
    }
}

fn hook_error(entity: EntityId, source: HookError) -> EcsError {
    EcsError::Hook { entity, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, impl FnMut(&Entity) -> Result<(), HookError> + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move |_: &Entity| {
            c.set(c.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn movement_query_fills_after_second_component() {
        let mut world = World::new();
        let a = world.create(components! { "x" => 0, "y" => 0 }).unwrap();
        let q = world.query_has(["x", "y", "dx", "dy"]);
        assert!(world.query(q).unwrap().is_empty());

        let (added, hook) = counter();
        world.query_mut(q).unwrap().on_entity_added(hook);

        world.add_component(a, "dx", json!(1)).unwrap();
        assert!(world.query(q).unwrap().is_empty());
        world.add_component(a, "dy", json!(-1)).unwrap();

        assert_eq!(world.query_ids(q), &[a]);
        assert_eq!(added.get(), 1);
    }

    #[test]
    fn where_query_created_after_entities() {
        let mut world = World::new();
        let _a = world.create(components! { "hp" => 10 }).unwrap();
        let b = world.create(components! { "hp" => 0 }).unwrap();
        let dead = world.query_where(|e| e.get_f64("hp").is_some_and(|hp| hp <= 0.0));
        assert_eq!(world.query_ids(dead), &[b]);
    }

    #[test]
    fn removing_absent_component_is_silent() {
        let mut world = World::new();
        let a = world.create(components! { "x" => 0 }).unwrap();
        let q = world.query_none(["hp"]);
        let (added, on_added) = counter();
        let (removed, on_removed) = counter();
        world.query_mut(q).unwrap().on_entity_added(on_added).on_entity_removed(on_removed);

        assert!(world.remove_component(a, "hp").unwrap());
        assert_eq!(added.get(), 0);
        assert_eq!(removed.get(), 0);
        assert_eq!(world.query_ids(q), &[a]);
    }

    #[test]
    fn identical_write_does_not_refire_hooks() {
        let mut world = World::new();
        let q = world.query_has(["x"]);
        let (added, hook) = counter();
        world.query_mut(q).unwrap().on_entity_added(hook);

        let a = world.create(components! { "x" => 1 }).unwrap();
        world.add_component(a, "x", json!(1)).unwrap();
        world.add_component(a, "x", json!(2)).unwrap();
        assert_eq!(added.get(), 1);
    }

    #[test]
    fn remove_evicts_even_when_components_still_match() {
        let mut world = World::new();
        let q = world.query_has(["x"]);
        let (removed, hook) = counter();
        world.query_mut(q).unwrap().on_entity_removed(hook);
        let (global_removed, global_hook) = counter();
        world.on_entity_removed(global_hook);

        let a = world.create(components! { "x" => 1 }).unwrap();
        assert!(world.remove(a).unwrap());
        assert!(world.query(q).unwrap().is_empty());
        assert_eq!(removed.get(), 1);
        assert_eq!(global_removed.get(), 1);

        assert!(!world.remove(a).unwrap());
        assert_eq!(global_removed.get(), 1);
        assert!(!world.add_component(a, "y", json!(0)).unwrap());
    }

    #[test]
    fn merge_state_reevaluates_once() {
        let mut world = World::new();
        let a = world.create(components! { "x" => 0 }).unwrap();
        let q = world.query_has(["x", "dx", "dy"]);
        let (added, hook) = counter();
        world.query_mut(q).unwrap().on_entity_added(hook);

        world
            .merge_state(a, components! { "dx" => 1, "dy" => 1 })
            .unwrap();
        assert_eq!(added.get(), 1);

        // Leave and re-enter within one update: no transition, no hooks.
        world
            .update_state(a, |c| {
                c.remove("dx");
                c.insert("dx", json!(5));
            })
            .unwrap();
        assert_eq!(added.get(), 1);
        assert_eq!(world.component(a, "dx"), Some(&json!(5)));
    }

    #[test]
    fn global_hooks_fire_per_create_independent_of_queries() {
        let mut world = World::new();
        let (added, hook) = counter();
        world.on_entity_added(hook);
        world.create(Components::new()).unwrap();
        world.create(components! { "x" => 1 }).unwrap();
        assert_eq!(added.get(), 2);
    }

    #[test]
    fn query_hooks_fire_before_global_hooks() {
        let mut world = World::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let q = world.query_has(["x"]);
        let o = order.clone();
        world.query_mut(q).unwrap().on_entity_added(move |_| {
            o.borrow_mut().push("query");
            Ok(())
        });
        let o = order.clone();
        world.on_entity_added(move |_| {
            o.borrow_mut().push("world");
            Ok(())
        });
        world.create(components! { "x" => 1 }).unwrap();
        assert_eq!(*order.borrow(), vec!["query", "world"]);
    }

    #[test]
    fn hook_failure_propagates_without_corrupting_caches() {
        let mut world = World::new();
        let first = world.query_has(["x"]);
        let second = world.query_has(["x"]);
        world
            .query_mut(first)
            .unwrap()
            .on_entity_added(|_| Err("hook refused".into()));

        let err = world.create(components! { "x" => 1 }).unwrap_err();
        let entity = match err {
            EcsError::Hook { entity, .. } => entity,
            other => panic!("expected hook error, got {other:?}"),
        };
        assert!(world.is_alive(entity));
        assert_eq!(world.query_ids(first), &[entity]);
        assert_eq!(world.query_ids(second), &[entity]);
    }

    #[test]
    fn duplicate_queries_are_independent() {
        let mut world = World::new();
        let a = world.query_has(["x"]);
        let b = world.query_has(["x"]);
        assert_ne!(a, b);
        world.create(components! { "x" => 1 }).unwrap();
        assert!(world.drop_query(a));
        assert!(world.query(a).is_none());
        assert_eq!(world.query(b).unwrap().len(), 1);
        world.create(components! { "x" => 2 }).unwrap();
        assert_eq!(world.query(b).unwrap().len(), 2);
    }

    #[test]
    fn systems_run_in_order_with_same_dt() {
        let mut world = World::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b", "c"] {
            let seen = seen.clone();
            world.add_named_system(name, move |_: &mut World, dt: f64| {
                seen.borrow_mut().push((name, dt));
            });
        }
        world.update(0.5);
        assert_eq!(
            *seen.borrow(),
            vec![("a", 0.5), ("b", 0.5), ("c", 0.5)]
        );
    }

    #[test]
    fn tick_uses_default_timestep() {
        let mut world = World::with_config(WorldConfig::default().with_default_timestep(0.25));
        let seen = Rc::new(Cell::new(0.0));
        let s = seen.clone();
        world.add_system(move |_: &mut World, dt: f64| s.set(dt));
        world.tick();
        assert_eq!(seen.get(), 0.25);
    }

    #[test]
    fn mutating_schedule_mid_tick_uses_snapshot() {
        let mut world = World::new();
        let runs = Rc::new(RefCell::new(Vec::new()));

        let r = runs.clone();
        let victim_slot: Rc<Cell<Option<SystemId>>> = Rc::new(Cell::new(None));
        let slot = victim_slot.clone();
        world.add_named_system("editor", move |world: &mut World, _dt: f64| {
            r.borrow_mut().push("editor");
            if let Some(victim) = slot.take() {
                world.remove_systems(&[victim]);
                let r = r.clone();
                world.add_named_system("late", move |_: &mut World, _: f64| {
                    r.borrow_mut().push("late");
                });
            }
        });
        let r = runs.clone();
        let victim = world.add_named_system("victim", move |_: &mut World, _: f64| {
            r.borrow_mut().push("victim");
        });
        victim_slot.set(Some(victim));

        world.update(1.0);
        assert_eq!(*runs.borrow(), vec!["editor", "victim"]);

        runs.borrow_mut().clear();
        world.update(1.0);
        assert_eq!(*runs.borrow(), vec!["editor", "late"]);
        assert_eq!(world.schedule().names().collect::<Vec<_>>(), vec!["editor", "late"]);
    }

    #[test]
    fn nested_update_is_ignored_and_removal_still_applies() {
        let mut world = World::new();
        let runs = Rc::new(RefCell::new(Vec::new()));

        let r = runs.clone();
        world.add_named_system("outer", move |world: &mut World, dt: f64| {
            r.borrow_mut().push("outer");
            world.update(dt);
            assert!(world.schedule().is_running());
        });
        let victim_slot: Rc<Cell<Option<SystemId>>> = Rc::new(Cell::new(None));
        let slot = victim_slot.clone();
        let removed = Rc::new(Cell::new(0));
        let n = removed.clone();
        world.add_named_system("remover", move |world: &mut World, _dt: f64| {
            if let Some(victim) = slot.take() {
                n.set(world.remove_systems(&[victim]));
            }
        });
        let r = runs.clone();
        let victim = world.add_named_system("victim", move |_: &mut World, _: f64| {
            r.borrow_mut().push("victim");
        });
        victim_slot.set(Some(victim));

        world.update(1.0);
        assert_eq!(*runs.borrow(), vec!["outer", "victim"]);
        assert_eq!(removed.get(), 1);
        assert!(!world.schedule().is_running());
        assert_eq!(
            world.schedule().names().collect::<Vec<_>>(),
            vec!["outer", "remover"]
        );
    }

    #[test]
    fn systems_mutate_entities_through_queries() {
        let mut world = World::new();
        let a = world
            .create(components! { "x" => 0.0, "dx" => 2.0 })
            .unwrap();
        let moving = world.query_has(["x", "dx"]);
        world.add_system(move |world: &mut World, dt: f64| {
            let ids = world.query_ids(moving).to_vec();
            for id in ids {
                world
                    .update_state(id, |c| {
                        let x = c.get("x").and_then(Value::as_f64).unwrap_or(0.0);
                        let dx = c.get("dx").and_then(Value::as_f64).unwrap_or(0.0);
                        c.insert("x", json!(x + dx * dt));
                    })
                    .unwrap();
            }
        });
        world.update(0.5);
        world.update(0.5);
        assert_eq!(world.get(a).unwrap().get_f64("x"), Some(2.0));
    }

    #[test]
    fn templates_stamp_out_entities() {
        let mut world = World::new();
        world.define_template("asteroid", components! { "x" => 0, "hp" => 3 });
        let id = world
            .spawn_template("asteroid", components! { "x" => 10 })
            .unwrap()
            .unwrap();
        assert_eq!(world.component(id, "x"), Some(&json!(10)));
        assert_eq!(world.component(id, "hp"), Some(&json!(3)));

        assert_eq!(world.spawn_template("comet", Components::new()).unwrap(), None);
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn archetype_count_groups_by_name_set() {
        let mut world = World::new();
        world.create(components! { "x" => 1, "y" => 1 }).unwrap();
        world.create(components! { "y" => 2, "x" => 2 }).unwrap();
        world.create(components! { "x" => 3 }).unwrap();
        assert_eq!(world.archetype_count(), 2);
    }

    #[test]
    fn clear_removes_everything_through_hooks() {
        let mut world = World::new();
        let q = world.query_has(["x"]);
        let (removed, hook) = counter();
        world.on_entity_removed(hook);
        for i in 0..3 {
            world.create(components! { "x" => i }).unwrap();
        }
        world.clear().unwrap();
        assert_eq!(world.entity_count(), 0);
        assert!(world.query(q).unwrap().is_empty());
        assert_eq!(removed.get(), 3);
    }
}
