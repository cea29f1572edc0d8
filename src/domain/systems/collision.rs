// Per-tick hit detection and the gameplay consequences of each hit.

use crate::domain::abilities::Charges;
use crate::domain::events::{HitType, SessionEvent};
use crate::domain::geometry::distance;
use crate::domain::state::{EntityId, Frozen, PlayerId, Poisoned, SimPickup, SimProjectile};
use crate::domain::systems::physics::PoisonTick;
use crate::domain::systems::progression;
use crate::domain::world::World;
use rand::Rng;
use tracing::debug;

/// Resolves every collision for the current step. Runs after integration.
pub fn resolve(world: &mut World, poison: Vec<PoisonTick>) {
    for tick in poison {
        damage_hostile(world, tick.hostile_id, tick.damage, Some(tick.source));
    }
    projectile_hits(world);
    hostile_contacts(world);
    collect_pickups(world);
}

// Projectile vs hostile (naive O(P*H), fine at the entity counts a session sustains).
fn projectile_hits(world: &mut World) {
    let hit_radius = world.tuning.projectile.radius + world.tuning.hostile.radius;
    let projectile_ids: Vec<EntityId> = world.store.projectiles.keys().copied().collect();

    for projectile_id in projectile_ids {
        // Take the projectile out while it is resolved; reinsert it if it survives.
        let Some(mut p) = world.store.projectiles.remove(&projectile_id) else {
            continue;
        };
        let mut alive = true;

        let hostile_ids: Vec<EntityId> = world.store.hostiles.keys().copied().collect();
        for hostile_id in hostile_ids {
            if p.struck.contains(&hostile_id) {
                continue;
            }
            let Some(h) = world.store.hostiles.get(&hostile_id) else {
                // Removed earlier in this pass by an explosion or chain.
                continue;
            };
            if distance(p.x, p.y, h.x, h.y) > hit_radius {
                continue;
            }

            p.struck.push(hostile_id);
            strike(world, &p, hostile_id);

            if p.charges.pierce > 0 {
                p.charges.pierce -= 1;
            } else {
                alive = false;
                break;
            }
        }

        if alive {
            world.store.projectiles.insert(projectile_id, p);
        }
    }
}

// One projectile hit: crit roll, knockback, status charges, damage, and on-kill effects.
fn strike(world: &mut World, p: &SimProjectile, hostile_id: EntityId) {
    let now = world.now_ms();
    let hostile_tuning = world.tuning.hostile;
    let knockback = world.tuning.projectile.knockback;

    // Crit chance is player state, read live from the owner.
    let crit_chance = world.params(p.owner_id).map(|c| c.crit_chance).unwrap_or(0.0);
    let critical = crit_chance > 0.0 && world.rng.r#gen::<f32>() < crit_chance;
    let damage = if critical { p.damage * 2 } else { p.damage };

    let Some(h) = world.store.hostiles.get_mut(&hostile_id) else {
        return;
    };

    let speed = (p.vx * p.vx + p.vy * p.vy).sqrt();
    if speed > 0.0 {
        h.kx += p.vx / speed * knockback;
        h.ky += p.vy / speed * knockback;
    }

    if p.charges.freeze > 0 {
        let slow = (p.charges.freeze as f32 * hostile_tuning.freeze_slow_per_level)
            .min(hostile_tuning.freeze_max_slow);
        let until_ms = now + hostile_tuning.freeze_duration_ms;
        h.frozen = Some(match h.frozen {
            Some(f) => Frozen {
                slow: f.slow.max(slow),
                until_ms: f.until_ms.max(until_ms),
            },
            None => Frozen { slow, until_ms },
        });
    }

    if p.charges.poison > 0 {
        let dps = p.charges.poison as i32;
        let until_ms = now + hostile_tuning.poison_duration_ms;
        h.poisoned = Some(match h.poisoned {
            Some(existing) => Poisoned {
                dps: existing.dps.max(dps),
                until_ms: existing.until_ms.max(until_ms),
                ..existing
            },
            None => Poisoned {
                dps,
                until_ms,
                last_tick_ms: now,
                source: p.owner_id,
            },
        });
    }

    let (x, y) = (h.x, h.y);
    world.events.broadcast(SessionEvent::ProjectileResolved {
        projectile_id: p.id,
        hit_type: if critical {
            HitType::Critical
        } else {
            HitType::Hit
        },
        target_id: Some(hostile_id),
        damage,
    });

    if damage_hostile(world, hostile_id, damage, Some(p.owner_id)) {
        on_kill_effects(world, p, x, y);
    }
}

// Area effects triggered when a projectile kills its target. Kills caused here
// use the regular kill path but do not trigger further area effects.
fn on_kill_effects(world: &mut World, p: &SimProjectile, x: f32, y: f32) {
    let Charges {
        explosive, chain, ..
    } = p.charges;

    if explosive > 0 {
        let tuning = world.tuning.projectile;
        let radius =
            tuning.explosion_base_radius + tuning.explosion_radius_per_level * explosive as f32;
        let victims: Vec<EntityId> = world
            .store
            .hostiles
            .values()
            .filter(|h| distance(x, y, h.x, h.y) <= radius)
            .map(|h| h.id)
            .collect();
        for hostile_id in victims {
            world.events.broadcast(SessionEvent::ProjectileResolved {
                projectile_id: p.id,
                hit_type: HitType::Explosion,
                target_id: Some(hostile_id),
                damage: p.damage,
            });
            damage_hostile(world, hostile_id, p.damage, Some(p.owner_id));
        }
    }

    if chain > 0 {
        let range = world.tuning.projectile.chain_range;
        let mut struck = p.struck.clone();
        let (mut cx, mut cy) = (x, y);
        for _ in 0..chain {
            let next = world
                .store
                .hostiles
                .values()
                .filter(|h| !struck.contains(&h.id))
                .map(|h| (h.id, h.x, h.y, distance(cx, cy, h.x, h.y)))
                .filter(|&(_, _, _, d)| d <= range)
                .min_by(|a, b| a.3.total_cmp(&b.3));
            let Some((hostile_id, hx, hy, _)) = next else {
                break;
            };
            struck.push(hostile_id);
            world.events.broadcast(SessionEvent::ProjectileResolved {
                projectile_id: p.id,
                hit_type: HitType::Chain,
                target_id: Some(hostile_id),
                damage: p.damage,
            });
            damage_hostile(world, hostile_id, p.damage, Some(p.owner_id));
            (cx, cy) = (hx, hy);
        }
    }
}

/// Applies damage and runs the kill path on death. Returns true when the hostile died.
pub fn damage_hostile(
    world: &mut World,
    hostile_id: EntityId,
    damage: i32,
    killer: Option<PlayerId>,
) -> bool {
    let Some(h) = world.store.hostiles.get_mut(&hostile_id) else {
        return false;
    };
    h.hp -= damage;
    if h.hp > 0 {
        let event = SessionEvent::HostileUpdated {
            hostile_id,
            hp: h.hp,
            frozen: h.frozen.is_some(),
            poisoned: h.poisoned.is_some(),
        };
        world.events.broadcast(event);
        return false;
    }
    kill_hostile(world, hostile_id, killer);
    true
}

// Single kill path so rewards and events fire the same way for every cause of death.
fn kill_hostile(world: &mut World, hostile_id: EntityId, killer: Option<PlayerId>) {
    let Some(h) = world.store.hostiles.remove(&hostile_id) else {
        return;
    };
    world.kills += 1;

    if let Some(killer_id) = killer {
        let lifesteal = world.params(killer_id).map(|c| c.lifesteal).unwrap_or(0);
        if let Some(player) = world.store.player_mut(killer_id) {
            player.kills += 1;
        }
        if lifesteal > 0 {
            if let Some(vehicle) = world.store.vehicle_of_mut(killer_id) {
                vehicle.heal(lifesteal);
            }
        }
    }

    world.events.broadcast(SessionEvent::HostileDied {
        hostile_id,
        killer_id: killer,
    });

    let value = world
        .tuning
        .progression
        .pickup_value(world.difficulty, h.kind.exp_multiplier());
    let pickup_id = world.store.next_id();
    world.store.pickups.insert(
        pickup_id,
        SimPickup {
            id: pickup_id,
            x: h.x,
            y: h.y,
            value,
            created_ms: world.now_ms(),
            attracted_by: None,
        },
    );
    world.events.broadcast(SessionEvent::PickupSpawned {
        pickup_id,
        x: h.x,
        y: h.y,
        value,
    });
}

// Hostile vs vehicle: shields absorb, otherwise the shared hull takes contact damage.
fn hostile_contacts(world: &mut World) {
    let vehicle_radius = world.tuning.vehicle.radius;
    let contact_radius = vehicle_radius + world.tuning.hostile.radius;
    let contact_damage = world.tuning.vehicle.contact_damage;

    let contacts: Vec<(EntityId, EntityId)> = world
        .store
        .hostiles
        .values()
        .filter_map(|h| {
            let (vehicle_id, d) = world.store.nearest_living_vehicle(h.x, h.y)?;
            (d <= contact_radius).then_some((h.id, vehicle_id))
        })
        .collect();

    for (hostile_id, vehicle_id) in contacts {
        let Some(vehicle) = world.store.vehicles.get_mut(&vehicle_id) else {
            continue;
        };
        // An earlier contact this step may already have destroyed the hull.
        if vehicle.is_destroyed() {
            continue;
        }
        world.store.hostiles.remove(&hostile_id);

        let absorbed = vehicle.shield > 0;
        let destroyed = if absorbed {
            vehicle.shield -= 1;
            false
        } else {
            vehicle.take_damage(contact_damage)
        };
        let damaged = SessionEvent::VehicleDamaged {
            vehicle_id,
            hp: vehicle.hp,
            max_hp: vehicle.max_hp,
            shield: vehicle.shield,
            absorbed,
        };
        world.events.broadcast(SessionEvent::HostileDied {
            hostile_id,
            killer_id: None,
        });
        world.events.broadcast(damaged);

        if destroyed {
            destroy_vehicle(world, vehicle_id);
        }
    }
}

fn destroy_vehicle(world: &mut World, vehicle_id: EntityId) {
    let seats = world
        .store
        .vehicles
        .get(&vehicle_id)
        .map(|v| v.seats.clone())
        .unwrap_or_default();
    debug!(vehicle_id, crew = seats.len(), "vehicle destroyed");
    world
        .events
        .broadcast(SessionEvent::VehicleDestroyed { vehicle_id });

    for player_id in seats {
        let Some(player) = world.store.player_mut(player_id) else {
            continue;
        };
        if player.alive {
            player.alive = false;
            world.events.broadcast(SessionEvent::PlayerDied { player_id });
        }
    }
}

// Attracted pickups that reach their vehicle are collected; the whole living crew shares the experience.
fn collect_pickups(world: &mut World) {
    let vehicle_radius = world.tuning.vehicle.radius;

    let collected: Vec<(EntityId, PlayerId, EntityId)> = world
        .store
        .pickups
        .values()
        .filter_map(|pickup| {
            let owner = pickup.attracted_by?;
            let vehicle = world.store.vehicle_of(owner)?;
            (!vehicle.is_destroyed()
                && distance(pickup.x, pickup.y, vehicle.x, vehicle.y) <= vehicle_radius)
                .then_some((pickup.id, owner, vehicle.id))
        })
        .collect();

    for (pickup_id, owner, vehicle_id) in collected {
        let Some(pickup) = world.store.pickups.remove(&pickup_id) else {
            continue;
        };
        let multiplier = world
            .params(owner)
            .map(|c| c.magnet_exp_multiplier)
            .unwrap_or(1.0);
        let value = (pickup.value as f32 * multiplier).round() as u32;

        world.events.broadcast(SessionEvent::PickupCollected {
            pickup_id,
            player_id: owner,
            value,
        });
        for player_id in world.store.living_crew(vehicle_id) {
            progression::grant_experience(world, player_id, value);
        }
    }
}
