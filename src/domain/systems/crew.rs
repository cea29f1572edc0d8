// Crew commands that do not touch the weapon: aiming, reviving, leaving.

use crate::domain::events::SessionEvent;
use crate::domain::geometry::wrap_angle;
use crate::domain::state::PlayerId;
use crate::domain::systems::progression;
use crate::domain::world::{Rejection, World};

/// Stores the player's aim. Presentation only; firing carries its own direction.
pub fn aim(world: &mut World, player_id: PlayerId, angle: f32) -> Result<(), Rejection> {
    if !angle.is_finite() {
        return Err(Rejection::InvalidInput);
    }
    let player = world
        .store
        .player_mut(player_id)
        .ok_or(Rejection::UnknownPlayer)?;
    if !player.alive {
        return Err(Rejection::PlayerDead);
    }
    player.aim = wrap_angle(angle);
    Ok(())
}

/// Brings a dead, still-connected crewmate on the same intact vehicle back to life.
pub fn revive(world: &mut World, player_id: PlayerId, target_id: PlayerId) -> Result<(), Rejection> {
    let requester = world.store.player(player_id).ok_or(Rejection::UnknownPlayer)?;
    if !requester.alive {
        return Err(Rejection::PlayerDead);
    }
    if world.pause.is_paused() {
        return Err(Rejection::Paused);
    }
    if target_id == player_id {
        return Err(Rejection::ReviveIneligible);
    }
    let target = world.store.player(target_id).ok_or(Rejection::ReviveIneligible)?;
    if target.alive || !target.connected || target.vehicle_id != requester.vehicle_id {
        return Err(Rejection::ReviveIneligible);
    }
    if world.store.vehicle_of(player_id).is_none_or(|v| v.is_destroyed()) {
        return Err(Rejection::VehicleDestroyed);
    }

    if let Some(target) = world.store.player_mut(target_id) {
        target.alive = true;
    }
    world.events.broadcast(SessionEvent::PlayerRevived {
        player_id: target_id,
        by: player_id,
    });
    Ok(())
}

/// Marks the player gone and dead, and releases any choice they still owed.
/// Returns false when the player was unknown or already disconnected.
pub fn disconnect(world: &mut World, player_id: PlayerId) -> bool {
    let Some(player) = world.store.player_mut(player_id) else {
        return false;
    };
    if !player.connected {
        return false;
    }
    player.connected = false;
    let was_alive = std::mem::replace(&mut player.alive, false);

    progression::drop_pending(world, player_id);
    if was_alive {
        world.events.broadcast(SessionEvent::PlayerDied { player_id });
    }
    true
}
