// Domain layer: core simulation types and rules.

pub mod abilities;
pub mod events;
pub mod geometry;
pub mod pause;
pub mod state;
pub mod store;
pub mod systems;
pub mod tuning;
pub mod world;

pub use abilities::{AbilityId, CombatParams};
pub use events::{Outbound, Recipient, SessionEvent, SessionOutcome, SessionSummary};
pub use pause::PauseState;
pub use state::{
    EntityId, HostileSnapshot, PickupSnapshot, PlayerId, PlayerSnapshot, ProjectileSnapshot,
    VehicleSnapshot,
};
pub use world::{Rejection, World};
