//! # Query — Live, Cached Views Over Matching Entities
//!
//! A query is registered once and then kept up to date by the world. Reading
//! it is just a slice borrow; the cost is paid on every mutation instead.
//!
//! ## How Queries Stay In Sync
//!
//! ```text
//! world.add_component(e, "dy", -1)
//!   1. mutate e's component table
//!   2. QueryIndex::reevaluate(e)
//!        for q in live queries (registration order):
//!            matches = q.filter(e)
//!            matches && !member  → push e, record Added(q)
//!            !matches && member  → shift-remove e, record Removed(q)
//!            otherwise           → nothing
//!   3. fire the recorded transitions' hooks, in the same order
//! ```
//!
//! Every cache is brought up to date before any hook runs. A hook that fails
//! aborts dispatch, but no cache is ever left disagreeing with the store.
//!
//! Removal of an entity always counts as "no longer matches", whatever the
//! filter would say about the components it had.
//!
//! ## Cost
//!
//! Re-evaluation is O(live queries) per mutated entity. Creating a query scans
//! all entities once. `Has` and `None` test the component table directly;
//! archetypes are not indexed.
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: queries walk archetype tables on every call; bevy
//!   caches the matching archetype list, not the entities.
//! - **here**: the entity list itself is cached, so reads are a slice borrow.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::entity::{Entity, EntityId};
use super::hooks::{HookError, LifecycleHooks};

/// Handle to a registered query. Never reused within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub(crate) usize);

type Predicate = Box<dyn Fn(&Entity) -> Result<bool, HookError>>;

/// The fixed signature of a query.
pub enum QueryFilter {
    /// Entity must carry every named component.
    Has(Vec<String>),
    /// Entity must carry none of the named components.
    None(Vec<String>),
    /// Entity must satisfy an arbitrary predicate.
    Where(Predicate),
}

impl QueryFilter {
    pub fn has<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryFilter::Has(names.into_iter().map(Into::into).collect())
    }

    pub fn none<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryFilter::None(names.into_iter().map(Into::into).collect())
    }

    /// An infallible predicate filter.
    pub fn matching<F>(predicate: F) -> Self
    where
        F: Fn(&Entity) -> bool + 'static,
    {
        QueryFilter::Where(Box::new(move |e| Ok(predicate(e))))
    }

    /// A fallible predicate filter. An `Err` counts as "does not match" for
    /// this query only.
    pub fn try_matching<F>(predicate: F) -> Self
    where
        F: Fn(&Entity) -> Result<bool, HookError> + 'static,
    {
        QueryFilter::Where(Box::new(predicate))
    }

    /// Evaluate the filter against `entity`.
    pub fn matches(&self, entity: &Entity) -> Result<bool, HookError> {
        match self {
            QueryFilter::Has(names) => Ok(entity.components().contains_all(names)),
            QueryFilter::None(names) => Ok(entity.components().contains_none(names)),
            QueryFilter::Where(predicate) => predicate(entity),
        }
    }
}

impl fmt::Debug for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFilter::Has(names) => f.debug_tuple("Has").field(names).finish(),
            QueryFilter::None(names) => f.debug_tuple("None").field(names).finish(),
            QueryFilter::Where(_) => f.write_str("Where(<predicate>)"),
        }
    }
}

/// A live query: its filter, its cached members, and its hooks.
#[derive(Debug)]
pub struct Query {
    filter: QueryFilter,
    /// Members in insertion order.
    entities: Vec<EntityId>,
    members: HashSet<EntityId>,
    hooks: LifecycleHooks,
}

impl Query {
    fn new(filter: QueryFilter, capacity: usize) -> Self {
        Self {
            filter,
            entities: Vec::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            hooks: LifecycleHooks::new(),
        }
    }

    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    /// The cached members, in the order they entered.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Append a callback fired when an entity starts matching.
    pub fn on_entity_added<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnMut(&Entity) -> Result<(), HookError> + 'static,
    {
        self.hooks.on_added(hook);
        self
    }

    /// Append a callback fired when an entity stops matching.
    pub fn on_entity_removed<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnMut(&Entity) -> Result<(), HookError> + 'static,
    {
        self.hooks.on_removed(hook);
        self
    }

    fn evaluate(&self, entity: &Entity) -> bool {
        match self.filter.matches(entity) {
            Ok(matches) => matches,
            Err(err) => {
                log::warn!(
                    "query predicate failed for {:?}, treating as no match: {}",
                    entity.id(),
                    err
                );
                false
            }
        }
    }

    fn insert(&mut self, id: EntityId) -> bool {
        if self.members.insert(id) {
            self.entities.push(id);
            true
        } else {
            false
        }
    }

    fn evict(&mut self, id: EntityId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        // Shift, not swap: members keep their relative order.
        if let Some(pos) = self.entities.iter().position(|&e| e == id) {
            self.entities.remove(pos);
        }
        true
    }

    fn clear(&mut self) {
        self.entities.clear();
        self.members.clear();
    }
}

/// A membership change recorded during re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Added(QueryId),
    Removed(QueryId),
}

/// All live queries of a world.
///
/// Ids come from a counter and are never handed out twice. Dropping a query
/// removes it from the map, so per-mutation cost tracks live queries only.
#[derive(Debug, Default)]
pub struct QueryIndex {
    queries: BTreeMap<QueryId, Query>,
    next_id: usize,
}

impl QueryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query and fill its cache from `entities`. No hooks fire:
    /// the query has none yet.
    pub(crate) fn register<'a>(
        &mut self,
        filter: QueryFilter,
        capacity: usize,
        entities: impl Iterator<Item = &'a Entity>,
    ) -> QueryId {
        let mut query = Query::new(filter, capacity);
        for entity in entities {
            if query.evaluate(entity) {
                query.insert(entity.id());
            }
        }
        let id = QueryId(self.next_id);
        self.next_id += 1;
        log::debug!("registered {:?} {:?} with {} members", id, query.filter, query.len());
        self.queries.insert(id, query);
        id
    }

    pub fn get(&self, id: QueryId) -> Option<&Query> {
        self.queries.get(&id)
    }

    pub fn get_mut(&mut self, id: QueryId) -> Option<&mut Query> {
        self.queries.get_mut(&id)
    }

    /// Drop a query. Other queries are unaffected.
    pub(crate) fn remove(&mut self, id: QueryId) -> bool {
        self.queries.remove(&id).is_some()
    }

    /// Number of live queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Live queries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (QueryId, &Query)> {
        self.queries.iter().map(|(&id, q)| (id, q))
    }

    /// Bring every cache up to date for `entity` and return the transitions
    /// in query registration order. With `removal`, the entity leaves every
    /// query it belongs to.
    pub(crate) fn reevaluate(&mut self, entity: &Entity, removal: bool) -> Vec<Transition> {
        let id = entity.id();
        let mut transitions = Vec::new();
        for (&query_id, query) in self.queries.iter_mut() {
            let matches = !removal && query.evaluate(entity);
            let member = query.contains(id);
            if matches && !member {
                query.insert(id);
                transitions.push(Transition::Added(query_id));
            } else if !matches && member {
                query.evict(id);
                transitions.push(Transition::Removed(query_id));
            }
        }
        if !transitions.is_empty() {
            log::trace!("{:?} transitions: {:?}", id, transitions);
        }
        transitions
    }

    /// Fire the hooks for recorded transitions, stopping at the first failure.
    pub(crate) fn dispatch(
        &mut self,
        transitions: &[Transition],
        entity: &Entity,
    ) -> Result<(), HookError> {
        for transition in transitions {
            match *transition {
                Transition::Added(q) => {
                    if let Some(query) = self.get_mut(q) {
                        query.hooks.fire_added(entity)?;
                    }
                }
                Transition::Removed(q) => {
                    if let Some(query) = self.get_mut(q) {
                        query.hooks.fire_removed(entity)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Recompute every cache from scratch without firing hooks. Used after a
    /// snapshot restore replaces the whole entity set.
    pub(crate) fn rebuild<'a>(&mut self, entities: impl Iterator<Item = &'a Entity> + Clone) {
        for query in self.queries.values_mut() {
            query.clear();
            for entity in entities.clone() {
                if query.evaluate(entity) {
                    query.insert(entity.id());
                }
            }
        }
    }
}
