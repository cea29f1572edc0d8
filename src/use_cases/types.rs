// Use-case level inputs/outputs for the session loop.

use crate::domain::{
    AbilityId, HostileSnapshot, PickupSnapshot, PlayerId, PlayerSnapshot, ProjectileSnapshot,
    SessionSummary, VehicleSnapshot,
};

/// Gameplay commands a crew member can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fire { dir_x: f32, dir_y: f32 },
    Reload,
    Revive { target_player_id: PlayerId },
    Aim { angle: f32 },
    ChooseAbility { ability: AbilityId },
}

#[derive(Debug, Clone)]
pub enum GameEvent {
    Command {
        player_id: PlayerId,
        command: Command,
    },
    // The roster's disconnect notification for a crew member.
    Disconnect {
        player_id: PlayerId,
    },
    // A crew member (re)connected; resend anything addressed only to them.
    Resync {
        player_id: PlayerId,
    },
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Starting,
    Running,
    Ended { summary: SessionSummary },
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub paused: bool,
    pub pending: Vec<PlayerId>,
    pub difficulty: u32,
    pub vehicles: Vec<VehicleSnapshot>,
    pub players: Vec<PlayerSnapshot>,
    pub hostiles: Vec<HostileSnapshot>,
    pub pickups: Vec<PickupSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
}
