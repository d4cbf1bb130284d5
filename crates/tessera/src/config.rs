//! World configuration.
//!
//! Built in code, or parsed from JSON alongside other game data:
//!
//! ```
//! use tessera::config::WorldConfig;
//!
//! let config = WorldConfig::from_json(r#"{ "default_timestep": 0.02 }"#).unwrap();
//! assert_eq!(config.default_timestep, 0.02);
//! assert_eq!(config.query_capacity, 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EcsError;

/// Tunables for a [`World`](crate::ecs::World).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Seconds passed to systems by `World::tick`.
    pub default_timestep: f64,
    /// Capacity reserved up front for each new query cache.
    pub query_capacity: usize,
}

impl WorldConfig {
    pub fn from_json(json: &str) -> Result<Self, EcsError> {
        serde_json::from_str(json).map_err(EcsError::Config)
    }

    pub fn with_default_timestep(mut self, dt: f64) -> Self {
        self.default_timestep = dt;
        self
    }

    pub fn with_query_capacity(mut self, capacity: usize) -> Self {
        self.query_capacity = capacity;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            default_timestep: 1.0 / 60.0,
            query_capacity: 0,
        }
    }
}
