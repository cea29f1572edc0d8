// Outbound gameplay events produced by the simulation, plus their addressing.

use crate::domain::abilities::AbilityId;
use crate::domain::state::{EntityId, PlayerId};
use crate::domain::tuning::HostileKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(PlayerId),
}

impl Recipient {
    pub fn includes(self, player_id: PlayerId) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Player(id) => id == player_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitType {
    Hit,
    Critical,
    Explosion,
    Chain,
    Expired,
}

impl HitType {
    pub fn as_str(self) -> &'static str {
        match self {
            HitType::Hit => "hit",
            HitType::Critical => "critical",
            HitType::Explosion => "explosion",
            HitType::Chain => "chain",
            HitType::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    // Every vehicle was destroyed.
    Defeat,
    // Every crew member disconnected.
    Abandoned,
}

impl SessionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOutcome::Defeat => "defeat",
            SessionOutcome::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub level: u32,
    pub kills: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub elapsed_ms: u64,
    pub difficulty: u32,
    pub kills: u32,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ProjectileSpawned {
        projectile_id: EntityId,
        owner_id: PlayerId,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    },
    ProjectileResolved {
        projectile_id: EntityId,
        hit_type: HitType,
        target_id: Option<EntityId>,
        damage: i32,
    },
    HostileSpawned {
        hostile_id: EntityId,
        kind: HostileKind,
        x: f32,
        y: f32,
        hp: i32,
    },
    HostileUpdated {
        hostile_id: EntityId,
        hp: i32,
        frozen: bool,
        poisoned: bool,
    },
    HostileDied {
        hostile_id: EntityId,
        killer_id: Option<PlayerId>,
    },
    PickupSpawned {
        pickup_id: EntityId,
        x: f32,
        y: f32,
        value: u32,
    },
    PickupCollected {
        pickup_id: EntityId,
        player_id: PlayerId,
        value: u32,
    },
    ExperienceUpdated {
        player_id: PlayerId,
        level: u32,
        exp: u32,
        exp_to_next: u32,
        abilities: Vec<(AbilityId, u32)>,
    },
    LevelUp {
        player_id: PlayerId,
        level: u32,
    },
    AbilityChoices {
        level: u32,
        options: Vec<AbilityId>,
    },
    AbilityChosen {
        player_id: PlayerId,
        ability: AbilityId,
        level: u32,
    },
    SessionPaused {
        pending: Vec<PlayerId>,
    },
    SessionResumed,
    AmmoUpdated {
        player_id: PlayerId,
        ammo: u32,
        max_ammo: u32,
    },
    ReloadStarted {
        player_id: PlayerId,
        duration_ms: u64,
    },
    ReloadFinished {
        player_id: PlayerId,
        ammo: u32,
        max_ammo: u32,
    },
    VehicleDamaged {
        vehicle_id: EntityId,
        hp: i32,
        max_hp: i32,
        shield: u32,
        absorbed: bool,
    },
    VehicleDestroyed {
        vehicle_id: EntityId,
    },
    PlayerDied {
        player_id: PlayerId,
    },
    PlayerRevived {
        player_id: PlayerId,
        by: PlayerId,
    },
    SessionEnded {
        summary: SessionSummary,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub event: SessionEvent,
}

/// Ordered buffer of events produced while handling one command or tick.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<Outbound>,
}

impl EventSink {
    pub fn broadcast(&mut self, event: SessionEvent) {
        self.events.push(Outbound {
            to: Recipient::All,
            event,
        });
    }

    pub fn send_to(&mut self, player_id: PlayerId, event: SessionEvent) {
        self.events.push(Outbound {
            to: Recipient::Player(player_id),
            event,
        });
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outbound> {
        self.events.iter()
    }
}
