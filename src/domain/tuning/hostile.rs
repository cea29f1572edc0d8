/// Gameplay tuning for hostiles and the difficulty ramp.

/// Hostile archetype; selects the speed/hp/experience multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostileKind {
    Normal,
    Fast,
    Heavy,
}

impl HostileKind {
    pub const ALL: [HostileKind; 3] = [HostileKind::Normal, HostileKind::Fast, HostileKind::Heavy];

    pub fn speed_multiplier(self) -> f32 {
        match self {
            HostileKind::Normal => 1.0,
            HostileKind::Fast => 1.6,
            HostileKind::Heavy => 0.6,
        }
    }

    pub fn hp_multiplier(self) -> f32 {
        match self {
            HostileKind::Normal => 1.0,
            HostileKind::Fast => 0.6,
            HostileKind::Heavy => 2.0,
        }
    }

    pub fn exp_multiplier(self) -> f32 {
        match self {
            HostileKind::Normal => 1.0,
            HostileKind::Fast => 1.2,
            HostileKind::Heavy => 2.5,
        }
    }

    pub fn spawn_weight(self) -> u32 {
        match self {
            HostileKind::Normal => 60,
            HostileKind::Fast => 25,
            HostileKind::Heavy => 15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HostileKind::Normal => "normal",
            HostileKind::Fast => "fast",
            HostileKind::Heavy => "heavy",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HostileTuning {
    /// Speed in pixels per second before multipliers.
    pub base_speed: f32,

    pub base_hp: i32,

    /// World-space collision radius in pixels.
    pub radius: f32,

    /// Below this distance a hostile stops advancing.
    pub arrive_distance: f32,

    /// Speed gain per difficulty level.
    pub speed_scaling: f32,

    /// Hit point gain per difficulty level above the first.
    pub hp_scaling: f32,

    pub spawn_interval_ms: u64,
    pub difficulty_interval_ms: u64,

    /// Cap is `cap_base + cap_per_level * difficulty`.
    pub cap_base: usize,
    pub cap_per_level: usize,

    pub freeze_slow_per_level: f32,
    pub freeze_max_slow: f32,
    pub freeze_duration_ms: u64,

    pub poison_duration_ms: u64,
    pub poison_period_ms: u64,
}

impl Default for HostileTuning {
    fn default() -> Self {
        Self {
            base_speed: 70.0,
            base_hp: 3,
            radius: 18.0,
            arrive_distance: 2.0,
            speed_scaling: 0.05,
            hp_scaling: 0.25,
            spawn_interval_ms: 1000,
            difficulty_interval_ms: 30_000,
            cap_base: 5,
            cap_per_level: 3,
            freeze_slow_per_level: 0.25,
            freeze_max_slow: 0.75,
            freeze_duration_ms: 1500,
            poison_duration_ms: 3000,
            poison_period_ms: 1000,
        }
    }
}

impl HostileTuning {
    /// Spawn hit points, rounded up so scaled hostiles never lose a point.
    pub fn spawn_hp(&self, kind: HostileKind, difficulty: u32) -> i32 {
        let ramp = 1.0 + difficulty.saturating_sub(1) as f32 * self.hp_scaling;
        let hp = (self.base_hp as f32 * kind.hp_multiplier() * ramp).ceil() as i32;
        hp.max(1)
    }

    pub fn speed(&self, kind: HostileKind, slow: f32, difficulty: u32) -> f32 {
        self.base_speed
            * kind.speed_multiplier()
            * (1.0 - slow)
            * (1.0 + difficulty as f32 * self.speed_scaling)
    }

    pub fn spawn_cap(&self, difficulty: u32) -> usize {
        self.cap_base + self.cap_per_level * difficulty as usize
    }

    pub fn spawn_batch(&self, difficulty: u32) -> usize {
        1 + difficulty as usize / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_heavy_spawns_at_difficulty_one_then_hp_is_doubled() {
        let tuning = HostileTuning::default();
        assert_eq!(tuning.spawn_hp(HostileKind::Heavy, 1), 6);
        assert_eq!(tuning.spawn_hp(HostileKind::Normal, 1), 3);
    }

    #[test]
    fn when_fractional_hp_then_rounds_up() {
        let tuning = HostileTuning::default();
        // 3 * 0.6 = 1.8
        assert_eq!(tuning.spawn_hp(HostileKind::Fast, 1), 2);
        // 3 * 1.0 * 1.25 = 3.75
        assert_eq!(tuning.spawn_hp(HostileKind::Normal, 2), 4);
    }

    #[test]
    fn when_frozen_then_speed_drops_by_slow_fraction() {
        let tuning = HostileTuning::default();
        let full = tuning.speed(HostileKind::Normal, 0.0, 1);
        let slowed = tuning.speed(HostileKind::Normal, 0.5, 1);
        assert!((slowed - full * 0.5).abs() < 1e-4);
        assert!((full - 70.0 * 1.05).abs() < 1e-4);
    }
}
