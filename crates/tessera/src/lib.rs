//! # Tessera — Dynamic Entity Component System
//!
//! A small ECS runtime for games and simulations where entities are built at
//! runtime from named components, live queries stay in sync with every
//! mutation, and the whole world can be snapshotted to JSON and restored.
//!
//! Start with `use tessera::prelude::*` and a [`World`](ecs::World).
//!
//! ```
//! use tessera::prelude::*;
//! use tessera::{components, serde_json::json};
//!
//! let mut world = World::new();
//! let ship = world.create(components! { "x" => 0, "y" => 0 }).unwrap();
//! let moving = world.query_has(["x", "y", "dx", "dy"]);
//!
//! world.merge_state(ship, components! { "dx" => 1, "dy" => -1 }).unwrap();
//! assert_eq!(world.query_ids(moving), &[ship]);
//!
//! world.add_component(ship, "dx", json!(2)).unwrap();
//! world.remove(ship).unwrap();
//! assert!(world.query(moving).unwrap().is_empty());
//! ```

pub mod config;
pub mod ecs;
pub mod error;
pub mod prelude;
pub mod scene;
pub mod template;

#[cfg(feature = "diagnostics")]
pub mod diag;

pub use serde_json;
