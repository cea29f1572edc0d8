// Mutable session world shared by the per-tick systems.

use crate::domain::abilities::{AbilityLevels, CombatParams};
use crate::domain::events::EventSink;
use crate::domain::pause::PauseState;
use crate::domain::state::{PlayerId, SimPlayer, SimVehicle};
use crate::domain::store::EntityStore;
use crate::domain::tuning::Tuning;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::time::Duration;

/// Reason a command was dropped. Never sent to clients; only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnknownPlayer,
    PlayerDead,
    VehicleDestroyed,
    Paused,
    Reloading,
    OutOfAmmo,
    AmmoFull,
    InvalidInput,
    NoPendingChoice,
    NotOffered,
    AbilityMaxed,
    ReviveIneligible,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::UnknownPlayer => "unknown player",
            Rejection::PlayerDead => "player dead",
            Rejection::VehicleDestroyed => "vehicle destroyed",
            Rejection::Paused => "session paused",
            Rejection::Reloading => "reloading",
            Rejection::OutOfAmmo => "out of ammo",
            Rejection::AmmoFull => "ammo full",
            Rejection::InvalidInput => "invalid input",
            Rejection::NoPendingChoice => "no pending choice",
            Rejection::NotOffered => "ability not offered",
            Rejection::AbilityMaxed => "ability maxed",
            Rejection::ReviveIneligible => "revive target ineligible",
        }
    }
}

pub struct World {
    pub store: EntityStore,
    pub tuning: Tuning,
    pub pause: PauseState,
    pub difficulty: u32,

    // Simulation clock; frozen while paused so status effects and pickup
    // timeouts do not elapse during a choice.
    pub sim_time: Duration,

    pub kills: u32,
    pub rng: StdRng,
    pub events: EventSink,
}

impl World {
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        Self {
            store: EntityStore::default(),
            tuning,
            pause: PauseState::Running,
            difficulty: 1,
            sim_time: Duration::ZERO,
            kills: 0,
            rng: StdRng::seed_from_u64(seed),
            events: EventSink::default(),
        }
    }

    /// Seats the roster onto as many vehicles as needed, in roster order.
    pub fn spawn_crew(&mut self, player_ids: &[PlayerId]) {
        let seats = self.tuning.vehicle.seats().max(1);
        let groups: Vec<&[PlayerId]> = player_ids.chunks(seats).collect();
        let (cx, cy) = self.tuning.arena.center();
        let spacing = self.tuning.vehicle.radius * 5.0;
        let offset = (groups.len() as f32 - 1.0) * 0.5;

        for (index, crew) in groups.into_iter().enumerate() {
            let vehicle_id = self.store.next_id();
            self.store.vehicles.insert(
                vehicle_id,
                SimVehicle {
                    id: vehicle_id,
                    x: cx + (index as f32 - offset) * spacing,
                    y: cy,
                    vx: 0.0,
                    vy: 0.0,
                    hp: self.tuning.vehicle.max_hp,
                    max_hp: self.tuning.vehicle.max_hp,
                    shield: 0,
                    seats: crew.to_vec(),
                },
            );

            for (seat, &player_id) in crew.iter().enumerate() {
                let max_ammo = self.tuning.weapon.base_max_ammo;
                self.store.players.insert(
                    player_id,
                    SimPlayer {
                        id: player_id,
                        vehicle_id,
                        seat,
                        alive: true,
                        connected: true,
                        level: 1,
                        exp: 0,
                        exp_to_next: self.tuning.progression.exp_to_next(1),
                        abilities: AbilityLevels::default(),
                        offers: VecDeque::new(),
                        aim: 0.0,
                        ammo: max_ammo,
                        max_ammo,
                        reloading: false,
                        kills: 0,
                    },
                );
            }
        }
    }

    /// Simulation clock in whole milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.sim_time.as_millis() as u64
    }

    /// Combat parameters from the player's live ability levels.
    pub fn params(&self, player_id: PlayerId) -> Option<CombatParams> {
        let player = self.store.player(player_id)?;
        Some(CombatParams::resolve(&player.abilities, &self.tuning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_roster_exceeds_seats_then_extra_vehicle_is_created() {
        let mut world = World::new(Tuning::default(), 1);
        world.spawn_crew(&[1, 2, 3, 4, 5]);

        assert_eq!(world.store.vehicles.len(), 2);
        let first = world.store.vehicle_of(1).expect("vehicle").id;
        let fifth = world.store.vehicle_of(5).expect("vehicle").id;
        assert_ne!(first, fifth);
        assert_eq!(world.store.player(5).expect("player").seat, 0);
        assert_eq!(world.store.player(4).expect("player").seat, 3);
    }

    #[test]
    fn when_crew_spawns_then_players_start_at_level_one_with_full_ammo() {
        let mut world = World::new(Tuning::default(), 1);
        world.spawn_crew(&[9]);

        let player = world.store.player(9).expect("player");
        assert_eq!(player.level, 1);
        assert_eq!(player.exp_to_next, 100);
        assert_eq!(player.ammo, player.max_ammo);
        assert!(player.alive && player.connected);
    }
}
