// Wire protocol DTOs and conversions for public session messages.
// Internal service-to-service DTOs live next to their routes.

use crate::domain::events::PlayerSummary;
use crate::domain::{
    HostileSnapshot, PickupSnapshot, PlayerSnapshot, ProjectileSnapshot, SessionEvent,
    SessionSummary, VehicleSnapshot,
};
use crate::use_cases::{SessionState, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Confirmed identity after Join; `crew` is false for spectators.
    Identity { player_id: String, crew: bool },
    // Snapshot of the world, sent on the snapshot cadence.
    WorldUpdate(WorldUpdateDto),
    // Lifecycle transitions (starting, running, ended).
    SessionState(SessionStateDto),
    // One gameplay event.
    Event(EventDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message with the roster identity.
    Join(JoinPayload),
    Fire { dir_x: f32, dir_y: f32 },
    ReloadRequest,
    ReviveRequest { target_player_id: String },
    AimUpdate { angle: f32 },
    AbilityChoice { ability_id: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub paused: bool,
    pub pending: Vec<String>,
    pub difficulty: u32,
    pub vehicles: Vec<VehicleDto>,
    pub players: Vec<PlayerDto>,
    pub hostiles: Vec<HostileDto>,
    pub pickups: Vec<PickupDto>,
    #[serde(default)]
    pub projectiles: Vec<ProjectileDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            elapsed_ms: update.elapsed_ms,
            paused: update.paused,
            pending: update.pending.iter().map(u64::to_string).collect(),
            difficulty: update.difficulty,
            vehicles: update.vehicles.iter().map(VehicleDto::from).collect(),
            players: update.players.iter().map(PlayerDto::from).collect(),
            hostiles: update.hostiles.iter().map(HostileDto::from).collect(),
            pickups: update.pickups.iter().map(PickupDto::from).collect(),
            projectiles: update.projectiles.iter().map(ProjectileDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleDto {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub shield: u32,
    pub seats: Vec<String>,
}

impl From<&VehicleSnapshot> for VehicleDto {
    fn from(v: &VehicleSnapshot) -> Self {
        Self {
            id: v.id,
            x: v.x,
            y: v.y,
            vx: v.vx,
            vy: v.vy,
            hp: v.hp,
            max_hp: v.max_hp,
            shield: v.shield,
            seats: v.seats.iter().map(u64::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub id: String,
    pub vehicle_id: u64,
    pub seat: usize,
    pub alive: bool,
    pub level: u32,
    pub aim: f32,
    pub ammo: u32,
    pub max_ammo: u32,
    pub reloading: bool,
}

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(p: &PlayerSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
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

#[derive(Debug, Clone, Serialize)]
pub struct HostileDto {
    pub id: u64,
    pub kind: &'static str,
    pub x: f32,
    pub y: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub frozen: bool,
    pub poisoned: bool,
}

impl From<&HostileSnapshot> for HostileDto {
    fn from(h: &HostileSnapshot) -> Self {
        Self {
            id: h.id,
            kind: h.kind.as_str(),
            x: h.x,
            y: h.y,
            hp: h.hp,
            max_hp: h.max_hp,
            frozen: h.frozen,
            poisoned: h.poisoned,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PickupDto {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub value: u32,
}

impl From<&PickupSnapshot> for PickupDto {
    fn from(p: &PickupSnapshot) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            value: p.value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileDto {
    pub id: u64,
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub rot: f32,
}

impl From<&ProjectileSnapshot> for ProjectileDto {
    fn from(p: &ProjectileSnapshot) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id.to_string(),
            x: p.x,
            y: p.y,
            rot: p.rot,
        }
    }
}

/// Session lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
pub enum SessionStateDto {
    Starting,
    Running,
    Ended { result: SessionSummaryDto },
}

impl From<SessionState> for SessionStateDto {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Starting => SessionStateDto::Starting,
            SessionState::Running => SessionStateDto::Running,
            SessionState::Ended { summary } => SessionStateDto::Ended {
                result: SessionSummaryDto::from(&summary),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummaryDto {
    pub outcome: &'static str,
    pub elapsed_ms: u64,
    pub difficulty: u32,
    pub kills: u32,
    pub players: Vec<PlayerSummaryDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummaryDto {
    pub player_id: String,
    pub level: u32,
    pub kills: u32,
}

impl From<&PlayerSummary> for PlayerSummaryDto {
    fn from(p: &PlayerSummary) -> Self {
        Self {
            player_id: p.player_id.to_string(),
            level: p.level,
            kills: p.kills,
        }
    }
}

impl From<&SessionSummary> for SessionSummaryDto {
    fn from(summary: &SessionSummary) -> Self {
        Self {
            outcome: summary.outcome.as_str(),
            elapsed_ms: summary.elapsed_ms,
            difficulty: summary.difficulty,
            kills: summary.kills,
            players: summary.players.iter().map(PlayerSummaryDto::from).collect(),
        }
    }
}

/// Gameplay events, tagged by camelCase event name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EventDto {
    ProjectileSpawned {
        projectile_id: u64,
        owner_id: String,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    },
    ProjectileResolved {
        projectile_id: u64,
        hit_type: &'static str,
        target_id: Option<u64>,
        damage: i32,
    },
    HostileSpawned {
        hostile_id: u64,
        kind: &'static str,
        x: f32,
        y: f32,
        hp: i32,
    },
    HostileUpdated {
        hostile_id: u64,
        hp: i32,
        frozen: bool,
        poisoned: bool,
    },
    HostileDied {
        hostile_id: u64,
        killer_id: Option<String>,
    },
    PickupSpawned {
        pickup_id: u64,
        x: f32,
        y: f32,
        value: u32,
    },
    PickupCollected {
        pickup_id: u64,
        player_id: String,
        value: u32,
    },
    ExperienceUpdated {
        player_id: String,
        level: u32,
        exp: u32,
        exp_to_next: u32,
        abilities: Vec<AbilityLevelDto>,
    },
    LevelUp {
        player_id: String,
        level: u32,
    },
    AbilityChoices {
        level: u32,
        options: Vec<&'static str>,
    },
    AbilityChosen {
        player_id: String,
        ability_id: &'static str,
        level: u32,
    },
    SessionPaused {
        pending: Vec<String>,
    },
    SessionResumed,
    AmmoUpdated {
        player_id: String,
        ammo: u32,
        max_ammo: u32,
    },
    ReloadStarted {
        player_id: String,
        duration_ms: u64,
    },
    ReloadFinished {
        player_id: String,
        ammo: u32,
        max_ammo: u32,
    },
    VehicleDamaged {
        vehicle_id: u64,
        hp: i32,
        max_hp: i32,
        shield: u32,
        absorbed: bool,
    },
    VehicleDestroyed {
        vehicle_id: u64,
    },
    PlayerDied {
        player_id: String,
    },
    PlayerRevived {
        player_id: String,
        by: String,
    },
    SessionEnded {
        result: SessionSummaryDto,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AbilityLevelDto {
    pub ability_id: &'static str,
    pub level: u32,
}

impl From<&SessionEvent> for EventDto {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::ProjectileSpawned {
                projectile_id,
                owner_id,
                x,
                y,
                vx,
                vy,
            } => EventDto::ProjectileSpawned {
                projectile_id: *projectile_id,
                owner_id: owner_id.to_string(),
                x: *x,
                y: *y,
                vx: *vx,
                vy: *vy,
            },
            SessionEvent::ProjectileResolved {
                projectile_id,
                hit_type,
                target_id,
                damage,
            } => EventDto::ProjectileResolved {
                projectile_id: *projectile_id,
                hit_type: hit_type.as_str(),
                target_id: *target_id,
                damage: *damage,
            },
            SessionEvent::HostileSpawned {
                hostile_id,
                kind,
                x,
                y,
                hp,
            } => EventDto::HostileSpawned {
                hostile_id: *hostile_id,
                kind: kind.as_str(),
                x: *x,
                y: *y,
                hp: *hp,
            },
            SessionEvent::HostileUpdated {
                hostile_id,
                hp,
                frozen,
                poisoned,
            } => EventDto::HostileUpdated {
                hostile_id: *hostile_id,
                hp: *hp,
                frozen: *frozen,
                poisoned: *poisoned,
            },
            SessionEvent::HostileDied {
                hostile_id,
                killer_id,
            } => EventDto::HostileDied {
                hostile_id: *hostile_id,
                killer_id: killer_id.map(|id| id.to_string()),
            },
            SessionEvent::PickupSpawned {
                pickup_id,
                x,
                y,
                value,
            } => EventDto::PickupSpawned {
                pickup_id: *pickup_id,
                x: *x,
                y: *y,
                value: *value,
            },
            SessionEvent::PickupCollected {
                pickup_id,
                player_id,
                value,
            } => EventDto::PickupCollected {
                pickup_id: *pickup_id,
                player_id: player_id.to_string(),
                value: *value,
            },
            SessionEvent::ExperienceUpdated {
                player_id,
                level,
                exp,
                exp_to_next,
                abilities,
            } => EventDto::ExperienceUpdated {
                player_id: player_id.to_string(),
                level: *level,
                exp: *exp,
                exp_to_next: *exp_to_next,
                abilities: abilities
                    .iter()
                    .map(|(ability, level)| AbilityLevelDto {
                        ability_id: ability.as_str(),
                        level: *level,
                    })
                    .collect(),
            },
            SessionEvent::LevelUp { player_id, level } => EventDto::LevelUp {
                player_id: player_id.to_string(),
                level: *level,
            },
            SessionEvent::AbilityChoices { level, options } => EventDto::AbilityChoices {
                level: *level,
                options: options.iter().map(|a| a.as_str()).collect(),
            },
            SessionEvent::AbilityChosen {
                player_id,
                ability,
                level,
            } => EventDto::AbilityChosen {
                player_id: player_id.to_string(),
                ability_id: ability.as_str(),
                level: *level,
            },
            SessionEvent::SessionPaused { pending } => EventDto::SessionPaused {
                pending: pending.iter().map(u64::to_string).collect(),
            },
            SessionEvent::SessionResumed => EventDto::SessionResumed,
            SessionEvent::AmmoUpdated {
                player_id,
                ammo,
                max_ammo,
            } => EventDto::AmmoUpdated {
                player_id: player_id.to_string(),
                ammo: *ammo,
                max_ammo: *max_ammo,
            },
            SessionEvent::ReloadStarted {
                player_id,
                duration_ms,
            } => EventDto::ReloadStarted {
                player_id: player_id.to_string(),
                duration_ms: *duration_ms,
            },
            SessionEvent::ReloadFinished {
                player_id,
                ammo,
                max_ammo,
            } => EventDto::ReloadFinished {
                player_id: player_id.to_string(),
                ammo: *ammo,
                max_ammo: *max_ammo,
            },
            SessionEvent::VehicleDamaged {
                vehicle_id,
                hp,
                max_hp,
                shield,
                absorbed,
            } => EventDto::VehicleDamaged {
                vehicle_id: *vehicle_id,
                hp: *hp,
                max_hp: *max_hp,
                shield: *shield,
                absorbed: *absorbed,
            },
            SessionEvent::VehicleDestroyed { vehicle_id } => EventDto::VehicleDestroyed {
                vehicle_id: *vehicle_id,
            },
            SessionEvent::PlayerDied { player_id } => EventDto::PlayerDied {
                player_id: player_id.to_string(),
            },
            SessionEvent::PlayerRevived { player_id, by } => EventDto::PlayerRevived {
                player_id: player_id.to_string(),
                by: by.to_string(),
            },
            SessionEvent::SessionEnded { summary } => EventDto::SessionEnded {
                result: SessionSummaryDto::from(summary),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AbilityId;

    #[test]
    fn when_fire_message_arrives_then_it_parses_with_tagged_layout() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Fire","data":{"dir_x":1.0,"dir_y":-0.5}}"#)
                .expect("fire parses");
        assert!(matches!(msg, ClientMessage::Fire { dir_x, dir_y } if dir_x == 1.0 && dir_y == -0.5));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"ReloadRequest"}"#).expect("reload parses");
        assert!(matches!(msg, ClientMessage::ReloadRequest));
    }

    #[test]
    fn when_event_is_serialized_then_name_is_camel_case() {
        let event = SessionEvent::AbilityChoices {
            level: 2,
            options: vec![AbilityId::Pierce, AbilityId::QuickReload],
        };
        let msg = ServerMessage::Event(EventDto::from(&event));
        let json = serde_json::to_value(&msg).expect("serializes");

        assert_eq!(json["type"], "Event");
        assert_eq!(json["data"]["event"], "abilityChoices");
        assert_eq!(json["data"]["options"][1], "quick_reload");
    }

    #[test]
    fn when_resumed_event_is_serialized_then_it_has_only_a_tag() {
        let json = serde_json::to_value(EventDto::from(&SessionEvent::SessionResumed))
            .expect("serializes");
        assert_eq!(json, serde_json::json!({ "event": "sessionResumed" }));
    }
}
