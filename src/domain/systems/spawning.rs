// Hostile waves and the difficulty ramp.

use crate::domain::events::SessionEvent;
use crate::domain::state::SimHostile;
use crate::domain::tuning::HostileKind;
use crate::domain::world::World;
use rand::Rng;
use tracing::debug;

/// Spawns one batch of hostiles along the arena edges, up to the live cap.
/// Returns how many were spawned.
pub fn spawn_wave(world: &mut World) -> usize {
    let tuning = world.tuning.hostile;
    let cap = tuning.spawn_cap(world.difficulty);
    let room = cap.saturating_sub(world.store.hostiles.len());
    let batch = tuning.spawn_batch(world.difficulty).min(room);

    for _ in 0..batch {
        let kind = pick_kind(world);
        let (x, y) = edge_position(world);
        let hp = tuning.spawn_hp(kind, world.difficulty);
        let id = world.store.next_id();
        world.store.hostiles.insert(
            id,
            SimHostile {
                id,
                kind,
                x,
                y,
                kx: 0.0,
                ky: 0.0,
                hp,
                max_hp: hp,
                frozen: None,
                poisoned: None,
            },
        );
        world.events.broadcast(SessionEvent::HostileSpawned {
            hostile_id: id,
            kind,
            x,
            y,
            hp,
        });
    }
    batch
}

fn pick_kind(world: &mut World) -> HostileKind {
    let total: u32 = HostileKind::ALL.iter().map(|k| k.spawn_weight()).sum();
    let mut roll = world.rng.gen_range(0..total);
    for kind in HostileKind::ALL {
        if roll < kind.spawn_weight() {
            return kind;
        }
        roll -= kind.spawn_weight();
    }
    HostileKind::Normal
}

fn edge_position(world: &mut World) -> (f32, f32) {
    let arena = world.tuning.arena;
    let inset = world.tuning.hostile.radius;
    let along_x = world.rng.gen_range(inset..arena.width - inset);
    let along_y = world.rng.gen_range(inset..arena.height - inset);
    match world.rng.gen_range(0..4) {
        0 => (along_x, inset),
        1 => (along_x, arena.height - inset),
        2 => (inset, along_y),
        _ => (arena.width - inset, along_y),
    }
}

/// Raises the difficulty level by one. New spawns pick up the stronger stats.
pub fn raise_difficulty(world: &mut World) -> u32 {
    world.difficulty += 1;
    debug!(difficulty = world.difficulty, "difficulty raised");
    world.difficulty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::Tuning;

    fn world() -> World {
        let mut world = World::new(Tuning::default(), 21);
        world.spawn_crew(&[1]);
        world
    }

    #[test]
    fn when_wave_spawns_then_hostiles_sit_on_the_arena_edge() {
        let mut world = world();
        let spawned = spawn_wave(&mut world);
        assert_eq!(spawned, world.tuning.hostile.spawn_batch(1));

        let arena = world.tuning.arena;
        let inset = world.tuning.hostile.radius;
        for h in world.store.hostiles.values() {
            assert!(arena.contains(h.x, h.y));
            let on_edge = (h.x - inset).abs() < 1e-3
                || (h.x - (arena.width - inset)).abs() < 1e-3
                || (h.y - inset).abs() < 1e-3
                || (h.y - (arena.height - inset)).abs() < 1e-3;
            assert!(on_edge);
            assert_eq!(h.hp, world.tuning.hostile.spawn_hp(h.kind, 1));
        }
    }

    #[test]
    fn when_cap_is_reached_then_no_more_hostiles_spawn() {
        let mut world = world();
        let cap = world.tuning.hostile.spawn_cap(1);
        for _ in 0..cap * 2 {
            spawn_wave(&mut world);
        }
        assert_eq!(world.store.hostiles.len(), cap);
        assert_eq!(spawn_wave(&mut world), 0);
    }

    #[test]
    fn when_difficulty_rises_then_cap_and_batch_grow() {
        let mut world = world();
        assert_eq!(raise_difficulty(&mut world), 2);
        assert_eq!(spawn_wave(&mut world), 2);
    }
}
