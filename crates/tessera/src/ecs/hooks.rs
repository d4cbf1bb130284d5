//! # Lifecycle Hooks — Callbacks on Membership Transitions
//!
//! Two hook lists exist at two levels:
//!
//! - **World level** — [`World::on_entity_added`](super::world::World::on_entity_added)
//!   and `on_entity_removed` fire once per create/remove.
//! - **Query level** — [`Query::on_entity_added`](super::query::Query::on_entity_added)
//!   and `on_entity_removed` fire once per membership transition.
//!
//! Hooks run synchronously, in registration order, on the thread performing
//! the mutation. A hook returning `Err` stops dispatch and the error surfaces
//! from the mutating call as [`EcsError::Hook`](crate::error::EcsError::Hook).
//! The mutation itself is not rolled back.

use super::entity::Entity;

/// Error type returned by failing hooks and fallible predicates.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A boxed lifecycle callback.
pub type Hook = Box<dyn FnMut(&Entity) -> Result<(), HookError>>;

/// An ordered pair of `added` / `removed` hook lists.
#[derive(Default)]
pub struct LifecycleHooks {
    added: Vec<Hook>,
    removed: Vec<Hook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback fired when an entity enters.
    pub fn on_added<F>(&mut self, hook: F)
    where
        F: FnMut(&Entity) -> Result<(), HookError> + 'static,
    {
        self.added.push(Box::new(hook));
    }

    /// Append a callback fired when an entity leaves.
    pub fn on_removed<F>(&mut self, hook: F)
    where
        F: FnMut(&Entity) -> Result<(), HookError> + 'static,
    {
        self.removed.push(Box::new(hook));
    }

    pub(crate) fn fire_added(&mut self, entity: &Entity) -> Result<(), HookError> {
        fire(&mut self.added, entity)
    }

    pub(crate) fn fire_removed(&mut self, entity: &Entity) -> Result<(), HookError> {
        fire(&mut self.removed, entity)
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

fn fire(hooks: &mut [Hook], entity: &Entity) -> Result<(), HookError> {
    for hook in hooks.iter_mut() {
        hook(entity)?;
    }
    Ok(())
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("added", &self.added.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Components;
    use crate::ecs::EntityId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn entity() -> Entity {
        Entity::new(EntityId::from_raw(1), Components::new())
    }

    #[test]
    fn hooks_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = LifecycleHooks::new();
        for i in 0..3 {
            let log = log.clone();
            hooks.on_added(move |_| {
                log.borrow_mut().push(i);
                Ok(())
            });
        }
        hooks.fire_added(&entity()).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn failing_hook_stops_dispatch() {
        let calls = Rc::new(RefCell::new(0));
        let mut hooks = LifecycleHooks::new();
        hooks.on_removed(|_| Err("boom".into()));
        let c = calls.clone();
        hooks.on_removed(move |_| {
            *c.borrow_mut() += 1;
            Ok(())
        });

        let err = hooks.fire_removed(&entity()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(*calls.borrow(), 0);
    }
}
