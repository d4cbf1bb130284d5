//! Asteroids — a headless tick loop over a dynamic-component world.
//!
//! Spawns ships and rocks from templates. Systems read live queries to move
//! everything with velocity, drain hp from rocks, and remove the dead. The
//! world is snapshotted halfway through and restored into a fresh one.
//!
//! Run with: `RUST_LOG=debug cargo run -p tessera --example asteroids`

use tessera::components;
use tessera::diag::init_logger;
use tessera::prelude::*;
use tessera::serde_json::json;

fn num(entity: &Entity, name: &str) -> f64 {
    entity.get_f64(name).unwrap_or(0.0)
}

/// Live queries the systems read from. Registered once per world.
#[derive(Clone, Copy)]
struct Queries {
    moving: QueryId,
    rocks: QueryId,
    dying: QueryId,
    dead: QueryId,
}

impl Queries {
    fn register(world: &mut World) -> Self {
        let queries = Self {
            moving: world.query_has(["x", "y", "dx", "dy"]),
            rocks: world.query_has(["rock", "hp"]),
            dying: world.query_where(|e| e.get_f64("hp").is_some_and(|hp| hp < 2.0)),
            dead: world.query_where(|e| e.get_f64("hp").is_some_and(|hp| hp <= 0.0)),
        };
        if let Some(query) = world.query_mut(queries.dying) {
            query.on_entity_added(|e| {
                log::info!("{:?} is about to crumble", e.id());
                Ok(())
            });
        }
        world.on_entity_removed(|e| {
            log::info!("{:?} removed ({})", e.id(), e.archetype());
            Ok(())
        });
        queries
    }
}

// ── Systems ──────────────────────────────────────────────────────────────

fn movement(world: &mut World, dt: f64, moving: QueryId) {
    let moved: Vec<(EntityId, f64, f64)> = world
        .query_entities(moving)
        .map(|e| (e.id(), num(e, "x") + num(e, "dx") * dt, num(e, "y") + num(e, "dy") * dt))
        .collect();
    for (id, x, y) in moved {
        if let Err(err) = world.merge_state(id, components! { "x" => x, "y" => y }) {
            log::error!("movement: {err}");
        }
    }
}

fn erosion(world: &mut World, dt: f64, rocks: QueryId) {
    let rocks = world.query_ids(rocks).to_vec();
    for id in rocks {
        let result = world.update_state(id, |c| {
            let hp = c.get("hp").and_then(|v| v.as_f64()).unwrap_or(0.0);
            c.insert("hp", json!(hp - 10.0 * dt));
        });
        if let Err(err) = result {
            log::error!("erosion: {err}");
        }
    }
}

fn reaper(world: &mut World, dead: QueryId) {
    let dead = world.query_ids(dead).to_vec();
    for id in dead {
        if let Err(err) = world.remove(id) {
            log::error!("reaper: {err}");
        }
    }
}

fn catalog(q: Queries) -> SystemCatalog {
    let mut catalog = SystemCatalog::new();
    catalog.register_fn("movement", move |w: &mut World, dt: f64| movement(w, dt, q.moving));
    catalog.register_fn("erosion", move |w: &mut World, dt: f64| erosion(w, dt, q.rocks));
    catalog.register_fn("reaper", move |w: &mut World, _dt: f64| reaper(w, q.dead));
    catalog
}

fn setup(world: &mut World) -> Result<Queries, EcsError> {
    world.define_template("ship", components! { "x" => 0.0, "y" => 0.0, "hp" => 100.0, "ship" => true });
    world.define_template("rock", components! { "x" => 0.0, "y" => 0.0, "hp" => 5.0, "rock" => true });

    let q = Queries::register(world);

    world.spawn_template("ship", components! { "dx" => 1.0, "dy" => 0.5 })?;
    for i in 0..4 {
        let speed = f64::from(i) * 0.25;
        world.spawn_template(
            "rock",
            components! { "x" => f64::from(i) * 10.0, "dx" => -speed, "dy" => speed, "hp" => 2.0 + f64::from(i) },
        )?;
    }

    world.add_named_system("movement", move |w: &mut World, dt: f64| movement(w, dt, q.moving));
    world.add_named_system("erosion", move |w: &mut World, dt: f64| erosion(w, dt, q.rocks));
    world.add_named_system("reaper", move |w: &mut World, _dt: f64| reaper(w, q.dead));
    Ok(q)
}

fn main() -> Result<(), EcsError> {
    init_logger();

    let mut world = World::with_config(WorldConfig::default().with_default_timestep(0.1));
    let q = setup(&mut world)?;

    for _ in 0..3 {
        world.tick();
    }
    log::info!("{}", world.stats());
    log::info!("dying: {:?}", world.query_ids(q.dying));

    let json = world.serialize().to_json_pretty()?;
    log::info!("snapshot:\n{}", json);

    // Queries and hooks are runtime wiring: register them on the new world
    // first, then restore fills them without firing hooks.
    let mut restored = World::new();
    let rq = Queries::register(&mut restored);
    restored.deserialize(&Snapshot::from_json(&json)?, &catalog(rq))?;
    log::info!("restored movers: {:?}", restored.query_ids(rq.moving));
    for _ in 0..5 {
        restored.update(0.1);
    }
    log::info!("restored world after 5 ticks: {}", restored.stats());
    Ok(())
}
