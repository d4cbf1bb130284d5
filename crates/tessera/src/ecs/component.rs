//! # Component — Named, Dynamically-Shaped Data
//!
//! Components are named values attached to an entity. A component's *name* is
//! what queries match on; its *value* is arbitrary structured data.
//!
//! ## Why `serde_json::Value`?
//!
//! Entities are assembled at runtime from string-keyed blocks, and the whole
//! component table has to round-trip through a snapshot. A tagged variant type
//! keeps the "presence test" semantics of a dynamic object while staying fully
//! typed in Rust, and `serde_json::Value` is already the variant type the scene
//! format speaks.
//!
//! ```text
//! Components (BTreeMap, sorted by name)
//!   "dx"  → 1
//!   "hp"  → 10
//!   "x"   → 0.5
//!   "tag" → {"team": "red"}
//!
//! Archetype = {dx, hp, tag, x}   ← derived, never stored
//! ```
//!
//! ## Archetypes Are Derived
//!
//! There is no archetype table. [`Archetype`] is computed from the current
//! keys whenever someone asks for it, so two entities with the same key set
//! behave identically under queries without sharing any storage.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An entity's component table: component name → value.
///
/// Inserting under an existing name replaces the old value. Iteration is in
/// name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Components(BTreeMap<String, Value>);

impl Components {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace a component. Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// `true` if every name in `names` is present. Vacuously true for none.
    pub fn contains_all<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.0.contains_key(n.as_ref()))
    }

    /// `true` if no name in `names` is present.
    pub fn contains_none<S: AsRef<str>>(&self, names: &[S]) -> bool {
        !names.iter().any(|n| self.0.contains_key(n.as_ref()))
    }

    /// Copy every component of `patch` over this table (shallow merge).
    pub fn merge(&mut self, patch: Components) {
        self.0.extend(patch.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// The archetype (sorted component-name set) of this table.
    pub fn archetype(&self) -> Archetype {
        Archetype(self.0.keys().cloned().collect())
    }

    /// Build a table from a JSON object. Returns `None` for any other value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map.into_iter().collect())),
            _ => None,
        }
    }
}

impl FromIterator<(String, Value)> for Components {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Components {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Components {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<serde_json::Map<String, Value>> for Components {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

/// The set of component names present on an entity, in sorted order.
///
/// Two archetypes are equal when they name the same components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Archetype(Vec<String>);

impl Archetype {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.join(", "))
    }
}

/// Build a [`Components`] table inline.
///
/// ```
/// use tessera::components;
///
/// let c = components! { "x" => 0.0, "y" => 0.0, "name" => "ship" };
/// assert_eq!(c.len(), 3);
/// ```
#[macro_export]
macro_rules! components {
    () => {
        $crate::ecs::Components::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut components = $crate::ecs::Components::new();
        $( components.insert($name, $crate::serde_json::json!($value)); )+
        components
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_existing_value() {
        let mut c = Components::new();
        assert_eq!(c.insert("hp", json!(10)), None);
        assert_eq!(c.insert("hp", json!(5)), Some(json!(10)));
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("hp"), Some(&json!(5)));
    }

    #[test]
    fn presence_checks() {
        let c = components! { "x" => 0, "y" => 0 };
        assert!(c.contains_all(&["x", "y"]));
        assert!(!c.contains_all(&["x", "dx"]));
        assert!(c.contains_none(&["dx", "dy"]));
        assert!(!c.contains_none(&["dx", "y"]));
        assert!(c.contains_all::<&str>(&[]));
    }

    #[test]
    fn archetype_is_sorted_name_set() {
        let a = components! { "y" => 1, "x" => 2 }.archetype();
        let b = components! { "x" => "other", "y" => json!(null) }.archetype();
        assert_eq!(a, b);
        assert_eq!(a.names(), &["x".to_string(), "y".to_string()]);
        assert_eq!(a.to_string(), "{x, y}");
    }

    #[test]
    fn merge_is_shallow() {
        let mut c = components! { "pos" => json!({"x": 1, "y": 2}), "hp" => 3 };
        c.merge(components! { "pos" => json!({"x": 9}) });
        assert_eq!(c.get("pos"), Some(&json!({"x": 9})));
        assert_eq!(c.get("hp"), Some(&json!(3)));
    }

    #[test]
    fn from_value_requires_object() {
        assert!(Components::from_value(json!([1, 2])).is_none());
        let c = Components::from_value(json!({"a": 1})).unwrap();
        assert!(c.contains("a"));
    }
}
