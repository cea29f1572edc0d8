/// Gameplay tuning for projectiles.

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Initial projectile speed in pixels per second.
    pub speed: f32,

    /// Lifetime in seconds before the projectile is despawned.
    pub life_time: f32,

    /// World-space collision radius in pixels.
    pub radius: f32,

    /// Damage of a shot before the damage ability is applied.
    pub base_damage: i32,

    /// Angle in radians between simultaneous projectiles of one shot.
    pub spread: f32,

    /// Knockback velocity (px/s) given to a hostile on hit.
    pub knockback: f32,

    /// Turn rate in radians per second per homing level.
    pub homing_turn_rate: f32,

    /// Maximum distance at which homing projectiles pick a target.
    pub homing_range: f32,

    /// Explosion radius is `explosion_base_radius + explosion_radius_per_level * level`.
    pub explosion_base_radius: f32,
    pub explosion_radius_per_level: f32,

    /// Maximum jump distance for chain hits.
    pub chain_range: f32,

    /// Critical-hit chance gained per level of the critical ability.
    pub crit_chance_per_level: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 600.0,
            life_time: 1.2,
            radius: 6.0,
            base_damage: 1,
            spread: 0.12,
            knockback: 180.0,
            homing_turn_rate: 2.0,
            homing_range: 300.0,
            explosion_base_radius: 50.0,
            explosion_radius_per_level: 25.0,
            chain_range: 160.0,
            crit_chance_per_level: 0.1,
        }
    }
}
