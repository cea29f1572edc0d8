// Firing, ammo and reload bookkeeping.

use crate::domain::events::SessionEvent;
use crate::domain::state::{PlayerId, SimProjectile};
use crate::domain::world::{Rejection, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Shot went out; `reload_ms` is set when it emptied the magazine.
    Fired {
        projectiles: usize,
        reload_ms: Option<u64>,
    },
    /// Magazine was already empty, so a reload started instead.
    ReloadStarted { duration_ms: u64 },
}

/// Fires the player's weapon along `(dir_x, dir_y)`.
pub fn fire(
    world: &mut World,
    player_id: PlayerId,
    dir_x: f32,
    dir_y: f32,
) -> Result<FireOutcome, Rejection> {
    let len = (dir_x * dir_x + dir_y * dir_y).sqrt();
    if !len.is_finite() || len < 1e-6 {
        return Err(Rejection::InvalidInput);
    }

    let player = world.store.player(player_id).ok_or(Rejection::UnknownPlayer)?;
    if !player.alive {
        return Err(Rejection::PlayerDead);
    }
    if world.store.vehicle_of(player_id).is_none_or(|v| v.is_destroyed()) {
        return Err(Rejection::VehicleDestroyed);
    }
    if world.pause.is_paused() {
        return Err(Rejection::Paused);
    }
    if player.reloading {
        return Err(Rejection::Reloading);
    }
    if player.ammo == 0 {
        let duration_ms = start_reload(world, player_id).ok_or(Rejection::OutOfAmmo)?;
        return Ok(FireOutcome::ReloadStarted { duration_ms });
    }

    let params = world.params(player_id).ok_or(Rejection::UnknownPlayer)?;
    let (origin_x, origin_y) = world
        .store
        .seat_position(player_id, &world.tuning.vehicle)
        .ok_or(Rejection::UnknownPlayer)?;

    let (ux, uy) = (dir_x / len, dir_y / len);
    let base_angle = uy.atan2(ux);
    let count = params.projectile_count.max(1);
    let spread = world.tuning.projectile.spread;
    let speed = world.tuning.projectile.speed * params.speed_multiplier;
    let ttl = world.tuning.projectile.life_time * params.lifetime_multiplier;

    for i in 0..count {
        let angle = base_angle + (i as f32 - (count as f32 - 1.0) * 0.5) * spread;
        let id = world.store.next_id();
        let projectile = SimProjectile {
            id,
            owner_id: player_id,
            x: origin_x,
            y: origin_y,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
            ttl,
            damage: params.damage,
            charges: params.charges,
            struck: Vec::new(),
        };
        world.events.broadcast(SessionEvent::ProjectileSpawned {
            projectile_id: id,
            owner_id: player_id,
            x: projectile.x,
            y: projectile.y,
            vx: projectile.vx,
            vy: projectile.vy,
        });
        world.store.projectiles.insert(id, projectile);
    }

    // Recoil pushes the shared hull away from the shot.
    let recoil = world.tuning.vehicle.recoil * params.recoil_multiplier;
    if let Some(vehicle) = world.store.vehicle_of_mut(player_id) {
        vehicle.vx -= ux * recoil;
        vehicle.vy -= uy * recoil;
    }

    let (ammo, max_ammo) = {
        let player = world
            .store
            .player_mut(player_id)
            .ok_or(Rejection::UnknownPlayer)?;
        player.ammo -= 1;
        player.aim = base_angle;
        (player.ammo, player.max_ammo)
    };
    world.events.broadcast(SessionEvent::AmmoUpdated {
        player_id,
        ammo,
        max_ammo,
    });

    let reload_ms = if ammo == 0 {
        start_reload(world, player_id)
    } else {
        None
    };

    Ok(FireOutcome::Fired {
        projectiles: count as usize,
        reload_ms,
    })
}

/// Explicit reload request. Ignored while reloading or when the magazine is full.
pub fn request_reload(world: &mut World, player_id: PlayerId) -> Result<u64, Rejection> {
    let player = world.store.player(player_id).ok_or(Rejection::UnknownPlayer)?;
    if !player.alive {
        return Err(Rejection::PlayerDead);
    }
    if player.reloading {
        return Err(Rejection::Reloading);
    }
    let params = world.params(player_id).ok_or(Rejection::UnknownPlayer)?;
    if player.ammo >= params.max_ammo(&world.tuning) {
        return Err(Rejection::AmmoFull);
    }
    start_reload(world, player_id).ok_or(Rejection::Reloading)
}

/// Marks the player as reloading and returns the scheduled duration.
fn start_reload(world: &mut World, player_id: PlayerId) -> Option<u64> {
    let duration_ms = world.params(player_id)?.reload_ms(&world.tuning);
    let player = world.store.player_mut(player_id)?;
    if player.reloading {
        return None;
    }
    player.reloading = true;
    world.events.broadcast(SessionEvent::ReloadStarted {
        player_id,
        duration_ms,
    });
    Some(duration_ms)
}

/// Completes a scheduled reload. Returns false when no reload was running.
pub fn finish_reload(world: &mut World, player_id: PlayerId) -> bool {
    let Some(params) = world.params(player_id) else {
        return false;
    };
    let max_ammo = params.max_ammo(&world.tuning);
    let Some(player) = world.store.player_mut(player_id) else {
        return false;
    };
    if !player.reloading {
        return false;
    }
    player.reloading = false;
    player.max_ammo = max_ammo;
    player.ammo = max_ammo;
    world.events.broadcast(SessionEvent::ReloadFinished {
        player_id,
        ammo: max_ammo,
        max_ammo,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abilities::AbilityId;
    use crate::domain::tuning::Tuning;

    fn world_with(player_ids: &[PlayerId]) -> World {
        let mut world = World::new(Tuning::default(), 3);
        world.spawn_crew(player_ids);
        world
    }

    #[test]
    fn when_firing_then_projectile_spawns_and_ammo_drops() {
        let mut world = world_with(&[1]);
        let outcome = fire(&mut world, 1, 1.0, 0.0).expect("fire accepted");

        assert_eq!(
            outcome,
            FireOutcome::Fired {
                projectiles: 1,
                reload_ms: None
            }
        );
        assert_eq!(world.store.projectiles.len(), 1);
        assert_eq!(world.store.player(1).expect("player").ammo, 4);
    }

    #[test]
    fn when_firing_then_vehicle_recoils_away_from_shot() {
        let mut world = world_with(&[1]);
        fire(&mut world, 1, 1.0, 0.0).expect("fire accepted");
        let vehicle = world.store.vehicle_of(1).expect("vehicle");
        assert!(vehicle.vx < 0.0);
        assert_eq!(vehicle.vy, 0.0);
    }

    #[test]
    fn when_last_round_is_fired_then_reload_starts() {
        let mut world = world_with(&[1]);
        world.store.player_mut(1).expect("player").ammo = 1;

        let outcome = fire(&mut world, 1, 0.0, 1.0).expect("fire accepted");
        assert_eq!(
            outcome,
            FireOutcome::Fired {
                projectiles: 1,
                reload_ms: Some(1500)
            }
        );
        assert!(world.store.player(1).expect("player").reloading);
    }

    #[test]
    fn when_firing_while_reloading_then_rejected() {
        let mut world = world_with(&[1]);
        world.store.player_mut(1).expect("player").reloading = true;
        assert_eq!(fire(&mut world, 1, 1.0, 0.0), Err(Rejection::Reloading));
        assert!(world.store.projectiles.is_empty());
    }

    #[test]
    fn when_firing_with_empty_magazine_then_reload_starts_instead() {
        let mut world = world_with(&[1]);
        world.store.player_mut(1).expect("player").ammo = 0;
        assert_eq!(
            fire(&mut world, 1, 1.0, 0.0),
            Ok(FireOutcome::ReloadStarted { duration_ms: 1500 })
        );
        assert!(world.store.projectiles.is_empty());
    }

    #[test]
    fn when_direction_is_zero_or_nan_then_rejected() {
        let mut world = world_with(&[1]);
        assert_eq!(fire(&mut world, 1, 0.0, 0.0), Err(Rejection::InvalidInput));
        assert_eq!(fire(&mut world, 1, f32::NAN, 1.0), Err(Rejection::InvalidInput));
    }

    #[test]
    fn when_dead_player_fires_then_rejected() {
        let mut world = world_with(&[1]);
        world.store.player_mut(1).expect("player").alive = false;
        assert_eq!(fire(&mut world, 1, 1.0, 0.0), Err(Rejection::PlayerDead));
    }

    #[test]
    fn when_multishot_owned_then_projectiles_carry_fire_time_charges() {
        let mut world = world_with(&[1]);
        {
            let player = world.store.player_mut(1).expect("player");
            player.abilities.increment(AbilityId::MultiShot);
            player.abilities.increment(AbilityId::Pierce);
        }
        fire(&mut world, 1, 1.0, 0.0).expect("fire accepted");
        assert_eq!(world.store.projectiles.len(), 2);

        // Later upgrades must not leak into projectiles already in flight.
        world
            .store
            .player_mut(1)
            .expect("player")
            .abilities
            .increment(AbilityId::Pierce);
        assert!(world.store.projectiles.values().all(|p| p.charges.pierce == 1));
    }

    #[test]
    fn when_reload_requested_twice_then_second_is_ignored() {
        let mut world = world_with(&[1]);
        world.store.player_mut(1).expect("player").ammo = 2;

        assert_eq!(request_reload(&mut world, 1), Ok(1500));
        assert_eq!(request_reload(&mut world, 1), Err(Rejection::Reloading));
    }

    #[test]
    fn when_magazine_full_then_reload_request_is_ignored() {
        let mut world = world_with(&[1]);
        assert_eq!(request_reload(&mut world, 1), Err(Rejection::AmmoFull));
    }

    #[test]
    fn when_reload_finishes_then_max_ammo_is_recomputed_before_refill() {
        let mut world = world_with(&[1]);
        world.store.player_mut(1).expect("player").ammo = 0;
        request_reload(&mut world, 1).expect("reload accepted");
        world
            .store
            .player_mut(1)
            .expect("player")
            .abilities
            .increment(AbilityId::AmmoCapacity);

        assert!(finish_reload(&mut world, 1));
        let player = world.store.player(1).expect("player");
        assert_eq!(player.max_ammo, 7);
        assert_eq!(player.ammo, 7);
        assert!(!player.reloading);
        assert!(!finish_reload(&mut world, 1));
    }
}
