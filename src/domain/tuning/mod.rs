// Gameplay tuning tables, kept apart from runtime/server configuration.

pub mod arena;
pub mod hostile;
pub mod progression;
pub mod projectile;
pub mod vehicle;
pub mod weapon;

pub use arena::ArenaTuning;
pub use hostile::{HostileKind, HostileTuning};
pub use progression::ProgressionTuning;
pub use projectile::ProjectileTuning;
pub use vehicle::VehicleTuning;
pub use weapon::WeaponTuning;

/// Every gameplay knob a session needs, bundled so tests can override single values.
#[derive(Debug, Clone, Default)]
pub struct Tuning {
    pub arena: ArenaTuning,
    pub vehicle: VehicleTuning,
    pub projectile: ProjectileTuning,
    pub hostile: HostileTuning,
    pub progression: ProgressionTuning,
    pub weapon: WeaponTuning,
}
