//! Named archetype templates.
//!
//! A template is a default component table stored under a name. Spawning
//! from a template clones the defaults, merges caller overrides on top, and
//! goes through [`World::create`](crate::ecs::World::create) like any other
//! entity. Templates carry no invariant of their own and are not part of a
//! [`Snapshot`](crate::scene::Snapshot).
//!
//! ```
//! use tessera::prelude::*;
//! use tessera::components;
//!
//! let mut world = World::new();
//! world.define_template("ship", components! { "x" => 0.0, "y" => 0.0, "hp" => 3 });
//! let ship = world.spawn_template("ship", components! { "x" => 5.0 }).unwrap();
//! assert!(ship.is_some());
//! ```

use std::collections::HashMap;

use crate::ecs::Components;

/// Template name → default components.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    by_name: HashMap<String, Components>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a template. Returns the previous definition, if any.
    pub fn define(&mut self, name: impl Into<String>, components: Components) -> Option<Components> {
        self.by_name.insert(name.into(), components)
    }

    pub fn get(&self, name: &str) -> Option<&Components> {
        self.by_name.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Components> {
        self.by_name.remove(name)
    }

    /// Clone a template's defaults and merge `overrides` over them.
    pub fn instantiate(&self, name: &str, overrides: Components) -> Option<Components> {
        let mut components = self.by_name.get(name)?.clone();
        components.merge(overrides);
        Some(components)
    }

    /// Template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
