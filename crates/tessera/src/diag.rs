//! # Diagnostics — World Stats and Logger Setup
//!
//! Enabled by the `diagnostics` feature (on by default).
//!
//! - [`World::stats`] collects a cheap summary of entity, archetype, query,
//!   and system state, including per-system timings from the last tick.
//! - [`init_logger`] installs `env_logger` as the `log` backend.
//!
//! ```ignore
//! tessera::diag::init_logger();
//! world.tick();
//! log::info!("{}", world.stats());
//! ```

use std::fmt;

use crate::ecs::system::SystemTiming;
use crate::ecs::{QueryId, World};

/// Summary of a world's state.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldStats {
    pub entity_count: usize,
    pub archetype_count: usize,
    /// Member count of every live query, in registration order.
    pub query_sizes: Vec<(QueryId, usize)>,
    /// System names in execution order.
    pub systems: Vec<String>,
    /// Per-system timings from the most recent tick.
    pub timings: Vec<SystemTiming>,
}

impl World {
    /// Collect a diagnostics snapshot of ECS state.
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            entity_count: self.entity_count(),
            archetype_count: self.archetype_count(),
            query_sizes: self.queries.iter().map(|(id, q)| (id, q.len())).collect(),
            systems: self.schedule.names().map(str::to_string).collect(),
            timings: self.schedule.timings.clone(),
        }
    }
}

impl WorldStats {
    /// Total time spent in systems during the last tick, in microseconds.
    pub fn tick_duration_us(&self) -> f64 {
        self.timings.iter().map(|t| t.duration_us).sum()
    }
}

impl fmt::Display for WorldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entities, {} archetypes, {} queries, {} systems ({:.1}us last tick)",
            self.entity_count,
            self.archetype_count,
            self.query_sizes.len(),
            self.systems.len(),
            self.tick_duration_us()
        )
    }
}

/// Install `env_logger` as the global logger.
///
/// Honors `RUST_LOG`; defaults to `info`. Calling it again is harmless.
pub fn init_logger() {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
    if result.is_err() {
        log::debug!("logger already initialized");
    }
}
