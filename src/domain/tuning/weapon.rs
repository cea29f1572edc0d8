/// Ammo and reload tuning shared by every crew member.

#[derive(Debug, Clone, Copy)]
pub struct WeaponTuning {
    pub base_max_ammo: u32,

    /// Reload duration before the reload ability multiplier.
    pub reload_ms: u64,

    /// Lowest reload multiplier reachable through abilities.
    pub min_reload_multiplier: f32,
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            base_max_ammo: 5,
            reload_ms: 1500,
            min_reload_multiplier: 0.3,
        }
    }
}
