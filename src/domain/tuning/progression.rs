/// Experience curve and pickup tuning.

#[derive(Debug, Clone, Copy)]
pub struct ProgressionTuning {
    /// Experience needed to leave level 1.
    pub base_exp_to_next: u32,

    /// Extra experience needed per level above the first.
    pub exp_to_next_per_level: u32,

    /// Pickup value before the difficulty bonus and hostile multiplier.
    pub pickup_base_value: u32,
    pub pickup_value_per_difficulty: u32,

    /// Pickups left on the floor longer than this disappear.
    pub pickup_lifetime_ms: u64,

    /// Base attraction radius in pixels, scaled by the magnet bonus.
    pub attraction_radius: f32,

    /// Constant pull speed toward the attracting vehicle, in px/s.
    pub pull_speed: f32,

    /// Hull points restored by the repair ability.
    pub repair_amount: i32,

    /// Options per ability offer.
    pub offer_size: usize,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            base_exp_to_next: 100,
            exp_to_next_per_level: 50,
            pickup_base_value: 10,
            pickup_value_per_difficulty: 2,
            pickup_lifetime_ms: 20_000,
            attraction_radius: 120.0,
            pull_speed: 320.0,
            repair_amount: 30,
            offer_size: 3,
        }
    }
}

impl ProgressionTuning {
    pub fn exp_to_next(&self, level: u32) -> u32 {
        self.base_exp_to_next + self.exp_to_next_per_level * level.saturating_sub(1)
    }

    pub fn pickup_value(&self, difficulty: u32, exp_multiplier: f32) -> u32 {
        let base =
            self.pickup_base_value + self.pickup_value_per_difficulty * difficulty.saturating_sub(1);
        (base as f32 * exp_multiplier).round() as u32
    }
}
