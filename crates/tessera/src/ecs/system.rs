//! # System — Per-Tick Update Routines
//!
//! A system is a function that takes `&mut World` and the elapsed time since
//! the last tick. That's it.
//!
//! - Any `FnMut(&mut World, f64)` is a [`System`].
//! - Systems run in the order they were added, once per `World::update`.
//! - No parallelism and no dependency graph.
//!
//! ## Identity
//!
//! Closures have no reference identity in Rust, so registration hands back a
//! [`SystemId`] and removal takes that id. Every system also carries a name:
//! given explicitly, or derived from its Rust type name. Names are what
//! snapshots store; see [`SystemCatalog`](crate::scene::SystemCatalog).
//!
//! ## Mutation During a Tick
//!
//! `World::update` takes the system list out of the schedule for the duration
//! of the tick, so the list being iterated can't change underneath it:
//!
//! ```text
//! tick start:  running = [a, b, c]      schedule.systems = []
//! b adds d:    schedule.systems = [d]    ← runs from the next tick
//! b removes c: pending_removals = [c]    ← c still runs this tick
//! tick end:    schedule.systems = [a, b, d]
//! ```
//!
//! Ticks don't nest. A system that calls `World::update` gets a warning and
//! nothing runs; the outer tick carries on unaffected.

use super::world::World;

/// A routine run once per tick.
pub trait System {
    fn run(&mut self, world: &mut World, dt: f64);
}

impl<F: FnMut(&mut World, f64)> System for F {
    fn run(&mut self, world: &mut World, dt: f64) {
        (self)(world, dt);
    }
}

/// Handle to a registered system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

pub(crate) struct NamedSystem {
    pub(crate) id: SystemId,
    pub(crate) name: String,
    system: Box<dyn System>,
}

/// Per-system timing recorded during a single tick.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, PartialEq)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// An ordered list of systems.
pub struct Schedule {
    systems: Vec<NamedSystem>,
    next_id: u64,
    /// Ids and names of the snapshot being executed, empty between ticks.
    running: Vec<(SystemId, String)>,
    in_tick: bool,
    pending_removals: Vec<SystemId>,
    /// Per-system timings from the most recent tick.
    #[cfg(feature = "diagnostics")]
    pub(crate) timings: Vec<SystemTiming>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            next_id: 0,
            running: Vec::new(),
            in_tick: false,
            pending_removals: Vec::new(),
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Add a system to the end of the schedule, named after its type.
    pub fn add<S: System + 'static>(&mut self, system: S) -> SystemId {
        self.add_named(short_system_name(std::any::type_name::<S>()), system)
    }

    /// Add a system under an explicit name.
    pub fn add_named<S: System + 'static>(&mut self, name: impl Into<String>, system: S) -> SystemId {
        self.push_boxed(name.into(), Box::new(system))
    }

    pub(crate) fn push_boxed(&mut self, name: String, system: Box<dyn System>) -> SystemId {
        let id = SystemId(self.next_id);
        self.next_id += 1;
        log::debug!("added system `{}` as {:?}", name, id);
        self.systems.push(NamedSystem { id, name, system });
        id
    }

    /// Remove systems by id. Unknown ids are ignored. Returns how many
    /// registered systems were removed (or scheduled for removal, mid-tick).
    pub fn remove(&mut self, ids: &[SystemId]) -> usize {
        let before = self.systems.len();
        self.systems.retain(|s| !ids.contains(&s.id));
        let mut removed = before - self.systems.len();
        for &id in ids {
            let in_snapshot = self.running.iter().any(|(r, _)| *r == id);
            if in_snapshot && !self.pending_removals.contains(&id) {
                self.pending_removals.push(id);
                removed += 1;
            }
        }
        removed
    }

    /// Returns the number of systems in this schedule.
    pub fn len(&self) -> usize {
        self.names().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// System names in execution order. Mid-tick, this is the executing
    /// snapshot (minus pending removals) followed by systems added since.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.running
            .iter()
            .filter(|(id, _)| !self.pending_removals.contains(id))
            .map(|(_, name)| name.as_str())
            .chain(self.systems.iter().map(|s| s.name.as_str()))
    }

    /// `true` while `World::update` is executing this schedule.
    pub fn is_running(&self) -> bool {
        self.in_tick
    }

    pub(crate) fn clear(&mut self) {
        self.systems.clear();
        self.pending_removals.clear();
    }

    pub(crate) fn replace(&mut self, systems: Vec<(String, Box<dyn System>)>) {
        self.clear();
        for (name, system) in systems {
            self.push_boxed(name, system);
        }
    }

    /// Start a tick: hand out the current list and leave an empty one behind
    /// to collect systems added while it runs.
    pub(crate) fn begin_tick(&mut self) -> Vec<NamedSystem> {
        self.in_tick = true;
        self.running = self.systems.iter().map(|s| (s.id, s.name.clone())).collect();
        #[cfg(feature = "diagnostics")]
        self.timings.clear();
        std::mem::take(&mut self.systems)
    }

    /// Finish a tick: put the snapshot back in front of anything added during
    /// the tick, then apply removals requested during the tick.
    pub(crate) fn end_tick(&mut self, mut ran: Vec<NamedSystem>) {
        self.in_tick = false;
        self.running.clear();
        ran.append(&mut self.systems);
        self.systems = ran;
        if !self.pending_removals.is_empty() {
            let pending = std::mem::take(&mut self.pending_removals);
            self.systems.retain(|s| !pending.contains(&s.id));
        }
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn record_timing(&mut self, name: &str, elapsed: std::time::Duration) {
        self.timings.push(SystemTiming {
            name: name.to_string(),
            duration_us: elapsed.as_secs_f64() * 1_000_000.0,
        });
    }
}

impl NamedSystem {
    pub(crate) fn run(&mut self, world: &mut World, dt: f64) {
        self.system.run(world, dt);
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `asteroids::movement` → `movement`,
/// `{{closure}}` → `<closure>`).
pub(crate) fn short_system_name(full: &str) -> String {
    let name = full.rsplit("::").next().unwrap_or(full);
    if name.contains("closure") {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_system(_world: &mut World, _dt: f64) {}

    #[test]
    fn schedule_captures_system_name() {
        let mut schedule = Schedule::new();
        schedule.add(dummy_system);
        assert_eq!(schedule.names().collect::<Vec<_>>(), vec!["dummy_system"]);
    }

    #[test]
    fn closure_system_name() {
        let mut schedule = Schedule::new();
        schedule.add(|_world: &mut World, _dt: f64| {});
        assert_eq!(schedule.systems[0].name, "<closure>");
    }

    #[test]
    fn remove_by_id_ignores_unknown() {
        let mut schedule = Schedule::new();
        let a = schedule.add_named("a", dummy_system);
        let b = schedule.add_named("b", dummy_system);
        assert_eq!(schedule.remove(&[a]), 1);
        assert_eq!(schedule.remove(&[a]), 0);
        assert_eq!(schedule.names().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(schedule.remove(&[b, SystemId(99)]), 1);
        assert!(schedule.is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut schedule = Schedule::new();
        let a = schedule.add(dummy_system);
        schedule.remove(&[a]);
        let b = schedule.add(dummy_system);
        assert_ne!(a, b);
    }

    #[test]
    fn tick_bracketing_keeps_order_and_defers_removal() {
        let mut schedule = Schedule::new();
        let a = schedule.add_named("a", dummy_system);
        schedule.add_named("b", dummy_system);

        let running = schedule.begin_tick();
        assert!(schedule.is_running());
        schedule.add_named("c", dummy_system);
        assert_eq!(schedule.remove(&[a]), 1);
        assert_eq!(schedule.remove(&[a, SystemId(42)]), 0);
        schedule.end_tick(running);
        assert!(!schedule.is_running());

        assert_eq!(schedule.names().collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
