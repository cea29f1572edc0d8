// Fixed-step integration for vehicles, projectiles, hostiles and pickups.

use crate::domain::events::{HitType, SessionEvent};
use crate::domain::geometry::{distance, reflect_axis, wrap_angle};
use crate::domain::state::{EntityId, PlayerId};
use crate::domain::world::World;

/// Poison damage that came due this step; applied by the collision resolver
/// so kills go through the regular kill path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoisonTick {
    pub hostile_id: EntityId,
    pub damage: i32,
    pub source: PlayerId,
}

/// Advances every moving entity by `dt` seconds.
pub fn integrate(world: &mut World, dt: f32) -> Vec<PoisonTick> {
    integrate_vehicles(world, dt);
    integrate_projectiles(world, dt);
    let poison = steer_hostiles(world, dt);
    attract_pickups(world, dt);
    poison
}

fn integrate_vehicles(world: &mut World, dt: f32) {
    let arena = world.tuning.arena;
    let radius = world.tuning.vehicle.radius;

    for v in world.store.vehicles.values_mut() {
        if v.is_destroyed() {
            continue;
        }

        v.vx *= arena.friction;
        v.vy *= arena.friction;
        v.x += v.vx * dt;
        v.y += v.vy * dt;

        // Bump off the walls instead of stopping dead.
        reflect_axis(&mut v.x, &mut v.vx, radius, arena.width - radius, arena.wall_damping);
        reflect_axis(&mut v.y, &mut v.vy, radius, arena.height - radius, arena.wall_damping);
    }
}

fn integrate_projectiles(world: &mut World, dt: f32) {
    let arena = world.tuning.arena;
    let tuning = world.tuning.projectile;
    let mut finished: Vec<EntityId> = Vec::new();

    // Homing targets are read before the mutable pass over projectiles.
    let hostiles: Vec<(f32, f32)> = world.store.hostiles.values().map(|h| (h.x, h.y)).collect();

    for p in world.store.projectiles.values_mut() {
        if p.charges.homing > 0 {
            let target = hostiles
                .iter()
                .map(|&(hx, hy)| (hx, hy, distance(p.x, p.y, hx, hy)))
                .filter(|&(_, _, d)| d <= tuning.homing_range)
                .min_by(|a, b| a.2.total_cmp(&b.2));
            if let Some((hx, hy, _)) = target {
                let speed = (p.vx * p.vx + p.vy * p.vy).sqrt();
                let current = p.vy.atan2(p.vx);
                let desired = (hy - p.y).atan2(hx - p.x);
                let max_turn = tuning.homing_turn_rate * p.charges.homing as f32 * dt;
                let turn = wrap_angle(desired - current).clamp(-max_turn, max_turn);
                let heading = current + turn;
                p.vx = heading.cos() * speed;
                p.vy = heading.sin() * speed;
            }
        }

        p.x += p.vx * dt;
        p.y += p.vy * dt;
        p.ttl -= dt;

        if p.ttl <= 0.0 {
            finished.push(p.id);
            continue;
        }

        if !arena.contains(p.x, p.y) {
            if p.charges.bounce == 0 {
                finished.push(p.id);
                continue;
            }
            // One charge per out-of-bounds step; a corner exit reflects both axes for it.
            p.charges.bounce -= 1;
            reflect_axis(&mut p.x, &mut p.vx, 0.0, arena.width, 1.0);
            reflect_axis(&mut p.y, &mut p.vy, 0.0, arena.height, 1.0);
        }
    }

    for id in finished {
        world.store.projectiles.remove(&id);
        world.events.broadcast(SessionEvent::ProjectileResolved {
            projectile_id: id,
            hit_type: HitType::Expired,
            target_id: None,
            damage: 0,
        });
    }
}

fn steer_hostiles(world: &mut World, dt: f32) -> Vec<PoisonTick> {
    let now = world.now_ms();
    let arena = world.tuning.arena;
    let tuning = world.tuning.hostile;
    let difficulty = world.difficulty;
    let mut poison = Vec::new();

    let targets: Vec<(f32, f32)> = world
        .store
        .vehicles
        .values()
        .filter(|v| !v.is_destroyed())
        .map(|v| (v.x, v.y))
        .collect();

    for h in world.store.hostiles.values_mut() {
        if h.frozen.is_some_and(|f| now >= f.until_ms) {
            h.frozen = None;
        }

        if let Some(p) = h.poisoned.as_mut() {
            // Wall-clock cadence, independent of how many ticks elapsed.
            if now >= p.last_tick_ms + tuning.poison_period_ms {
                p.last_tick_ms += tuning.poison_period_ms;
                poison.push(PoisonTick {
                    hostile_id: h.id,
                    damage: p.dps,
                    source: p.source,
                });
            }
            if now >= p.until_ms {
                h.poisoned = None;
            }
        }

        let nearest = targets
            .iter()
            .map(|&(vx, vy)| (vx, vy, distance(h.x, h.y, vx, vy)))
            .min_by(|a, b| a.2.total_cmp(&b.2));
        if let Some((vx, vy, dist)) = nearest {
            if dist > tuning.arrive_distance {
                let speed = tuning.speed(h.kind, h.slow(), difficulty);
                let step = (speed * dt).min(dist);
                h.x += (vx - h.x) / dist * step;
                h.y += (vy - h.y) / dist * step;
            }
        }

        h.x += h.kx * dt;
        h.y += h.ky * dt;
        h.kx *= arena.friction;
        h.ky *= arena.friction;
        h.x = h.x.clamp(0.0, arena.width);
        h.y = h.y.clamp(0.0, arena.height);
    }

    poison
}

fn attract_pickups(world: &mut World, dt: f32) {
    let now = world.now_ms();
    let progression = world.tuning.progression;

    let lifetime = progression.pickup_lifetime_ms;
    world
        .store
        .pickups
        .retain(|_, p| now.saturating_sub(p.created_ms) < lifetime);

    // Living seats: (player, seat x, seat y, attraction radius, vehicle x, vehicle y).
    let seats: Vec<(PlayerId, f32, f32, f32, f32, f32)> = world
        .store
        .players
        .values()
        .filter(|p| p.alive)
        .filter_map(|p| {
            let vehicle = world.store.vehicles.get(&p.vehicle_id)?;
            if vehicle.is_destroyed() {
                return None;
            }
            let (sx, sy) = world.store.seat_position(p.id, &world.tuning.vehicle)?;
            let params = world.params(p.id)?;
            let radius = progression.attraction_radius * (1.0 + params.magnet_bonus);
            Some((p.id, sx, sy, radius, vehicle.x, vehicle.y))
        })
        .collect();

    for pickup in world.store.pickups.values_mut() {
        // Drop an attraction whose player died or lost the vehicle.
        if let Some(owner) = pickup.attracted_by {
            if !seats.iter().any(|s| s.0 == owner) {
                pickup.attracted_by = None;
            }
        }

        if pickup.attracted_by.is_none() {
            let nearest = seats
                .iter()
                .map(|s| (s, distance(pickup.x, pickup.y, s.1, s.2)))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((seat, d)) = nearest {
                if d <= seat.3 {
                    pickup.attracted_by = Some(seat.0);
                }
            }
        }

        let Some(owner) = pickup.attracted_by else {
            continue;
        };
        let Some(&(_, _, _, _, vx, vy)) = seats.iter().find(|s| s.0 == owner) else {
            continue;
        };
        let d = distance(pickup.x, pickup.y, vx, vy);
        if d > 0.0 {
            let step = (progression.pull_speed * dt).min(d);
            pickup.x += (vx - pickup.x) / d * step;
            pickup.y += (vy - pickup.y) / d * step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abilities::Charges;
    use crate::domain::state::{Poisoned, SimHostile, SimPickup, SimProjectile};
    use crate::domain::tuning::{HostileKind, Tuning};
    use std::time::Duration;

    const DT: f32 = 1.0 / 60.0;

    fn world() -> World {
        let mut world = World::new(Tuning::default(), 11);
        world.spawn_crew(&[1]);
        world
    }

    fn projectile(world: &mut World, x: f32, y: f32, vx: f32, vy: f32, charges: Charges) -> EntityId {
        let id = world.store.next_id();
        world.store.projectiles.insert(
            id,
            SimProjectile {
                id,
                owner_id: 1,
                x,
                y,
                vx,
                vy,
                ttl: 5.0,
                damage: 1,
                charges,
                struck: Vec::new(),
            },
        );
        id
    }

    fn hostile(world: &mut World, x: f32, y: f32) -> EntityId {
        let id = world.store.next_id();
        world.store.hostiles.insert(
            id,
            SimHostile {
                id,
                kind: HostileKind::Normal,
                x,
                y,
                kx: 0.0,
                ky: 0.0,
                hp: 3,
                max_hp: 3,
                frozen: None,
                poisoned: None,
            },
        );
        id
    }

    #[test]
    fn when_vehicle_drifts_then_friction_slows_it() {
        let mut world = world();
        let vehicle = world.store.vehicle_of_mut(1).expect("vehicle");
        vehicle.vx = 100.0;
        let x0 = vehicle.x;

        integrate(&mut world, DT);
        let vehicle = world.store.vehicle_of(1).expect("vehicle");
        assert!((vehicle.vx - 98.0).abs() < 1e-4);
        assert!((vehicle.x - (x0 + 98.0 * DT)).abs() < 1e-3);
    }

    #[test]
    fn when_vehicle_hits_wall_then_it_bumps_back_with_damping() {
        let mut world = world();
        let radius = world.tuning.vehicle.radius;
        let vehicle = world.store.vehicle_of_mut(1).expect("vehicle");
        vehicle.x = radius + 0.5;
        vehicle.vx = -300.0;

        integrate(&mut world, DT);
        let vehicle = world.store.vehicle_of(1).expect("vehicle");
        assert_eq!(vehicle.x, radius);
        // -300 * 0.98 = -294, reflected with 0.5 damping.
        assert!((vehicle.vx - 147.0).abs() < 1e-3);
    }

    #[test]
    fn when_projectile_leaves_arena_with_bounce_then_it_reflects_and_spends_charge() {
        let mut world = world();
        let charges = Charges {
            bounce: 2,
            ..Charges::default()
        };
        let id = projectile(&mut world, 1.0, 600.0, -600.0, 0.0, charges);

        integrate(&mut world, DT);
        let p = world.store.projectiles.get(&id).expect("projectile survives");
        assert_eq!(p.charges.bounce, 1);
        assert_eq!(p.x, 0.0);
        assert!(p.vx > 0.0);
    }

    #[test]
    fn when_projectile_exits_through_a_corner_then_one_charge_reflects_both_axes() {
        let mut world = world();
        let charges = Charges {
            bounce: 2,
            ..Charges::default()
        };
        let id = projectile(&mut world, 1.0, 1.0, -600.0, -600.0, charges);

        integrate(&mut world, DT);
        let p = world.store.projectiles.get(&id).expect("projectile survives");
        assert_eq!(p.charges.bounce, 1);
        assert_eq!((p.x, p.y), (0.0, 0.0));
        assert!(p.vx > 0.0 && p.vy > 0.0);
    }

    #[test]
    fn when_projectile_leaves_arena_without_bounce_then_it_is_destroyed() {
        let mut world = world();
        let id = projectile(&mut world, 1.0, 600.0, -600.0, 0.0, Charges::default());

        integrate(&mut world, DT);
        assert!(!world.store.projectiles.contains_key(&id));
    }

    #[test]
    fn when_projectile_lifetime_ends_then_it_is_destroyed() {
        let mut world = world();
        let id = projectile(&mut world, 800.0, 100.0, 10.0, 0.0, Charges::default());
        world.store.projectiles.get_mut(&id).expect("projectile").ttl = DT * 0.5;

        integrate(&mut world, DT);
        assert!(!world.store.projectiles.contains_key(&id));
    }

    #[test]
    fn when_homing_projectile_flies_past_then_it_turns_toward_hostile() {
        let mut world = world();
        let charges = Charges {
            homing: 3,
            ..Charges::default()
        };
        let id = projectile(&mut world, 100.0, 100.0, 600.0, 0.0, charges);
        hostile(&mut world, 200.0, 200.0);

        integrate(&mut world, DT);
        let p = world.store.projectiles.get(&id).expect("projectile");
        assert!(p.vy > 0.0);
        assert!(((p.vx * p.vx + p.vy * p.vy).sqrt() - 600.0).abs() < 1e-2);
    }

    #[test]
    fn when_hostile_is_far_then_it_steers_toward_vehicle() {
        let mut world = world();
        let (vx, vy) = {
            let v = world.store.vehicle_of(1).expect("vehicle");
            (v.x, v.y)
        };
        let id = hostile(&mut world, vx - 300.0, vy);

        integrate(&mut world, DT);
        let h = world.store.hostiles.get(&id).expect("hostile");
        let expected = 70.0 * 1.05 * DT;
        assert!((h.x - (vx - 300.0 + expected)).abs() < 1e-3);
        assert!((h.y - vy).abs() < 1e-4);
    }

    #[test]
    fn when_hostile_has_arrived_then_it_stops_advancing() {
        let mut world = world();
        let (vx, vy) = {
            let v = world.store.vehicle_of(1).expect("vehicle");
            (v.x, v.y)
        };
        let id = hostile(&mut world, vx - 1.0, vy);

        integrate(&mut world, DT);
        let h = world.store.hostiles.get(&id).expect("hostile");
        assert_eq!(h.x, vx - 1.0);
    }

    #[test]
    fn when_poisoned_then_damage_comes_once_per_second_not_per_tick() {
        let mut world = world();
        let id = hostile(&mut world, 10.0, 10.0);
        world.store.hostiles.get_mut(&id).expect("hostile").poisoned = Some(Poisoned {
            dps: 2,
            until_ms: 3000,
            last_tick_ms: 0,
            source: 1,
        });

        let mut ticks = Vec::new();
        for _ in 0..120 {
            world.sim_time += Duration::from_micros(16_667);
            ticks.extend(integrate(&mut world, DT));
        }
        assert_eq!(ticks.len(), 2);
        assert!(ticks.iter().all(|t| t.damage == 2 && t.source == 1));
    }

    #[test]
    fn when_pickup_is_inside_attraction_radius_then_it_moves_toward_vehicle() {
        let mut world = world();
        let (vx, vy) = {
            let v = world.store.vehicle_of(1).expect("vehicle");
            (v.x, v.y)
        };
        let id = world.store.next_id();
        world.store.pickups.insert(
            id,
            SimPickup {
                id,
                x: vx + 80.0,
                y: vy,
                value: 10,
                created_ms: 0,
                attracted_by: None,
            },
        );

        integrate(&mut world, DT);
        let p = world.store.pickups.get(&id).expect("pickup");
        assert_eq!(p.attracted_by, Some(1));
        assert!(p.x < vx + 80.0);
    }

    #[test]
    fn when_pickup_times_out_then_it_is_removed() {
        let mut world = world();
        let id = world.store.next_id();
        world.store.pickups.insert(
            id,
            SimPickup {
                id,
                x: 5.0,
                y: 5.0,
                value: 10,
                created_ms: 0,
                attracted_by: None,
            },
        );
        world.sim_time = Duration::from_millis(world.tuning.progression.pickup_lifetime_ms);

        integrate(&mut world, DT);
        assert!(world.store.pickups.is_empty());
    }
}
