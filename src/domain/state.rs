// Domain-level simulation entities and snapshot types.

use crate::domain::abilities::{AbilityId, AbilityLevels, Charges};
use crate::domain::tuning::HostileKind;
use std::collections::VecDeque;

pub type PlayerId = u64;
pub type EntityId = u64;

pub struct SimVehicle {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,

    // Shared hull, consumed by all damage regardless of which seat caused it.
    pub hp: i32,
    pub max_hp: i32,
    pub shield: u32,

    // Seat index is the position in this list.
    pub seats: Vec<PlayerId>,
}

impl SimVehicle {
    pub fn is_destroyed(&self) -> bool {
        self.hp == 0
    }

    /// Heals up to `max_hp`; destroyed hulls stay destroyed.
    pub fn heal(&mut self, amount: i32) {
        if self.is_destroyed() || amount <= 0 {
            return;
        }
        self.hp = (self.hp + amount).min(self.max_hp);
    }

    /// Applies hull damage and returns true when this hit destroyed the vehicle.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.is_destroyed() || amount <= 0 {
            return false;
        }
        self.hp = (self.hp - amount).max(0);
        self.is_destroyed()
    }
}

/// A pending level-up offer waiting for the player's choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityOffer {
    pub level: u32,
    pub options: Vec<AbilityId>,
}

pub struct SimPlayer {
    pub id: PlayerId,
    pub vehicle_id: EntityId,
    pub seat: usize,

    pub alive: bool,
    pub connected: bool,

    // Progression.
    pub level: u32,
    pub exp: u32,
    pub exp_to_next: u32,
    pub abilities: AbilityLevels,
    pub offers: VecDeque<AbilityOffer>,

    // Weapon state.
    pub aim: f32,
    pub ammo: u32,
    pub max_ammo: u32,
    pub reloading: bool,

    pub kills: u32,
}

pub struct SimProjectile {
    pub id: EntityId,
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub ttl: f32,
    pub damage: i32,

    // Fixed at fire time.
    pub charges: Charges,

    // Hostiles already struck, so a piercing shot never hits the same target twice.
    pub struck: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frozen {
    pub slow: f32,
    pub until_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Poisoned {
    pub dps: i32,
    pub until_ms: u64,
    pub last_tick_ms: u64,
    pub source: PlayerId,
}

pub struct SimHostile {
    pub id: EntityId,
    pub kind: HostileKind,
    pub x: f32,
    pub y: f32,

    // Knockback velocity; decays with friction.
    pub kx: f32,
    pub ky: f32,

    pub hp: i32,
    pub max_hp: i32,
    pub frozen: Option<Frozen>,
    pub poisoned: Option<Poisoned>,
}

impl SimHostile {
    pub fn slow(&self) -> f32 {
        self.frozen.map(|f| f.slow).unwrap_or(0.0)
    }
}

pub struct SimPickup {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub value: u32,
    pub created_ms: u64,
    pub attracted_by: Option<PlayerId>,
}

#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub shield: u32,
    pub seats: Vec<PlayerId>,
}

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub vehicle_id: EntityId,
    pub seat: usize,
    pub alive: bool,
    pub level: u32,
    pub aim: f32,
    pub ammo: u32,
    pub max_ammo: u32,
    pub reloading: bool,
}

#[derive(Debug, Clone)]
pub struct HostileSnapshot {
    pub id: EntityId,
    pub kind: HostileKind,
    pub x: f32,
    pub y: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub frozen: bool,
    pub poisoned: bool,
}

#[derive(Debug, Clone)]
pub struct PickupSnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub value: u32,
}

#[derive(Debug, Clone)]
pub struct ProjectileSnapshot {
    pub id: EntityId,
    pub owner_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub rot: f32,
}

impl From<&SimVehicle> for VehicleSnapshot {
    fn from(v: &SimVehicle) -> Self {
        Self {
            id: v.id,
            x: v.x,
            y: v.y,
            vx: v.vx,
            vy: v.vy,
            hp: v.hp,
            max_hp: v.max_hp,
            shield: v.shield,
            seats: v.seats.clone(),
        }
    }
}

impl From<&SimPlayer> for PlayerSnapshot {
    fn from(p: &SimPlayer) -> Self {
        Self {
            id: p.id,
            vehicle_id: p.vehicle_id,
            seat: p.seat,
            alive: p.alive,
            level: p.level,
            aim: p.aim,
            ammo: p.ammo,
            max_ammo: p.max_ammo,
            reloading: p.reloading,
        }
    }
}

impl From<&SimHostile> for HostileSnapshot {
    fn from(h: &SimHostile) -> Self {
        Self {
            id: h.id,
            kind: h.kind,
            x: h.x,
            y: h.y,
            hp: h.hp,
            max_hp: h.max_hp,
            frozen: h.frozen.is_some(),
            poisoned: h.poisoned.is_some(),
        }
    }
}

impl From<&SimPickup> for PickupSnapshot {
    fn from(p: &SimPickup) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            value: p.value,
        }
    }
}

impl From<&SimProjectile> for ProjectileSnapshot {
    fn from(p: &SimProjectile) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            x: p.x,
            y: p.y,
            rot: p.vy.atan2(p.vx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(hp: i32) -> SimVehicle {
        SimVehicle {
            id: 1,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            hp,
            max_hp: 100,
            shield: 0,
            seats: vec![],
        }
    }

    #[test]
    fn when_damage_exceeds_hp_then_hp_clamps_to_zero() {
        let mut v = vehicle(5);
        assert!(v.take_damage(10));
        assert_eq!(v.hp, 0);
        // Already destroyed; no second destruction report.
        assert!(!v.take_damage(10));
    }

    #[test]
    fn when_healing_past_max_then_hp_clamps_to_max() {
        let mut v = vehicle(95);
        v.heal(30);
        assert_eq!(v.hp, 100);
    }

    #[test]
    fn when_vehicle_is_destroyed_then_heal_does_nothing() {
        let mut v = vehicle(0);
        v.heal(30);
        assert_eq!(v.hp, 0);
    }
}
