// Per-tick and per-command rules over the session world.

pub mod collision;
pub mod crew;
pub mod physics;
pub mod progression;
pub mod spawning;
pub mod weapons;
