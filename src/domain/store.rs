// Entity containers for one session. No gameplay rules live here.

use crate::domain::geometry::distance;
use crate::domain::state::{
    EntityId, PlayerId, SimHostile, SimPickup, SimPlayer, SimProjectile, SimVehicle,
};
use crate::domain::tuning::VehicleTuning;
use std::collections::BTreeMap;

/// Id-keyed maps; `BTreeMap` keeps iteration (and therefore the simulation) stable.
#[derive(Default)]
pub struct EntityStore {
    pub vehicles: BTreeMap<EntityId, SimVehicle>,
    pub players: BTreeMap<PlayerId, SimPlayer>,
    pub projectiles: BTreeMap<EntityId, SimProjectile>,
    pub hostiles: BTreeMap<EntityId, SimHostile>,
    pub pickups: BTreeMap<EntityId, SimPickup>,
    next_id: EntityId,
}

impl EntityStore {
    /// Allocates an id for a vehicle, projectile, hostile or pickup.
    pub fn next_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&SimPlayer> {
        self.players.get(&player_id)
    }

    pub fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut SimPlayer> {
        self.players.get_mut(&player_id)
    }

    pub fn vehicle_of(&self, player_id: PlayerId) -> Option<&SimVehicle> {
        let player = self.players.get(&player_id)?;
        self.vehicles.get(&player.vehicle_id)
    }

    pub fn vehicle_of_mut(&mut self, player_id: PlayerId) -> Option<&mut SimVehicle> {
        let vehicle_id = self.players.get(&player_id)?.vehicle_id;
        self.vehicles.get_mut(&vehicle_id)
    }

    /// World position of a player's seat (aim origin).
    pub fn seat_position(&self, player_id: PlayerId, tuning: &VehicleTuning) -> Option<(f32, f32)> {
        let player = self.players.get(&player_id)?;
        let vehicle = self.vehicles.get(&player.vehicle_id)?;
        let (ox, oy) = tuning
            .seat_offsets
            .get(player.seat)
            .copied()
            .unwrap_or((0.0, 0.0));
        Some((vehicle.x + ox, vehicle.y + oy))
    }

    pub fn nearest_living_vehicle(&self, x: f32, y: f32) -> Option<(EntityId, f32)> {
        self.vehicles
            .values()
            .filter(|v| !v.is_destroyed())
            .map(|v| (v.id, distance(x, y, v.x, v.y)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn all_vehicles_destroyed(&self) -> bool {
        self.vehicles.values().all(SimVehicle::is_destroyed)
    }

    pub fn all_players_disconnected(&self) -> bool {
        self.players.values().all(|p| !p.connected)
    }

    /// Living crew members of a vehicle, in seat order.
    pub fn living_crew(&self, vehicle_id: EntityId) -> Vec<PlayerId> {
        let Some(vehicle) = self.vehicles.get(&vehicle_id) else {
            return Vec::new();
        };
        vehicle
            .seats
            .iter()
            .copied()
            .filter(|id| self.players.get(id).is_some_and(|p| p.alive))
            .collect()
    }
}
