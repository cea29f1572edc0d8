use std::{env, time::Duration};

// Runtime/server settings (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// How long an ended session stays registered so in-flight events still land.
pub fn teardown_grace() -> Duration {
    let millis = env::var("SESSION_TEARDOWN_GRACE_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(2000);
    Duration::from_millis(millis)
}

/// Fixed RNG seed for reproducible sessions; unset means a fresh seed per session.
pub fn session_seed() -> Option<u64> {
    env::var("SESSION_SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const EVENT_BROADCAST_CAPACITY: usize = 1024;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
// Snapshots go out at a third of the physics rate.
pub const SNAPSHOT_EVERY_TICKS: u64 = 3;
