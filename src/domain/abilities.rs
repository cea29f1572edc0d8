// Ability catalogue and the pure level -> combat parameter resolver.

use crate::domain::tuning::Tuning;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every ability a player can be offered on level-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbilityId {
    MultiShot,
    Damage,
    Recoil,
    Velocity,
    Range,
    Pierce,
    Bounce,
    Homing,
    Freeze,
    Poison,
    Explosive,
    Chain,
    QuickReload,
    AmmoCapacity,
    Lifesteal,
    Critical,
    Magnet,
    Luck,
    Repair,
    Shield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
}

impl Rarity {
    /// Offer weight; luck only favours the rarer tiers.
    pub fn weight(self, luck: u32) -> f32 {
        let luck = luck as f32;
        match self {
            Rarity::Common => 60.0,
            Rarity::Rare => 30.0 * (1.0 + 0.25 * luck),
            Rarity::Epic => 10.0 * (1.0 + 0.5 * luck),
        }
    }
}

/// One-shot effects applied the moment an ability level is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateEffect {
    Repair,
    AddShield,
}

impl AbilityId {
    pub const ALL: [AbilityId; 20] = [
        AbilityId::MultiShot,
        AbilityId::Damage,
        AbilityId::Recoil,
        AbilityId::Velocity,
        AbilityId::Range,
        AbilityId::Pierce,
        AbilityId::Bounce,
        AbilityId::Homing,
        AbilityId::Freeze,
        AbilityId::Poison,
        AbilityId::Explosive,
        AbilityId::Chain,
        AbilityId::QuickReload,
        AbilityId::AmmoCapacity,
        AbilityId::Lifesteal,
        AbilityId::Critical,
        AbilityId::Magnet,
        AbilityId::Luck,
        AbilityId::Repair,
        AbilityId::Shield,
    ];

    pub fn rarity(self) -> Rarity {
        match self {
            AbilityId::Damage
            | AbilityId::Recoil
            | AbilityId::Velocity
            | AbilityId::Range
            | AbilityId::QuickReload
            | AbilityId::AmmoCapacity
            | AbilityId::Magnet
            | AbilityId::Repair => Rarity::Common,
            AbilityId::MultiShot
            | AbilityId::Pierce
            | AbilityId::Bounce
            | AbilityId::Freeze
            | AbilityId::Poison
            | AbilityId::Lifesteal
            | AbilityId::Critical
            | AbilityId::Luck
            | AbilityId::Shield => Rarity::Rare,
            AbilityId::Homing | AbilityId::Explosive | AbilityId::Chain => Rarity::Epic,
        }
    }

    pub fn max_level(self) -> u32 {
        match self {
            AbilityId::MultiShot | AbilityId::QuickReload => 4,
            AbilityId::Damage
            | AbilityId::Velocity
            | AbilityId::Range
            | AbilityId::AmmoCapacity
            | AbilityId::Critical
            | AbilityId::Magnet
            | AbilityId::Repair
            | AbilityId::Shield => 5,
            AbilityId::Recoil
            | AbilityId::Pierce
            | AbilityId::Bounce
            | AbilityId::Homing
            | AbilityId::Freeze
            | AbilityId::Poison
            | AbilityId::Explosive
            | AbilityId::Chain
            | AbilityId::Lifesteal
            | AbilityId::Luck => 3,
        }
    }

    pub fn immediate_effect(self) -> Option<ImmediateEffect> {
        match self {
            AbilityId::Repair => Some(ImmediateEffect::Repair),
            AbilityId::Shield => Some(ImmediateEffect::AddShield),
            _ => None,
        }
    }

    /// Stable wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            AbilityId::MultiShot => "multi_shot",
            AbilityId::Damage => "damage",
            AbilityId::Recoil => "recoil",
            AbilityId::Velocity => "velocity",
            AbilityId::Range => "range",
            AbilityId::Pierce => "pierce",
            AbilityId::Bounce => "bounce",
            AbilityId::Homing => "homing",
            AbilityId::Freeze => "freeze",
            AbilityId::Poison => "poison",
            AbilityId::Explosive => "explosive",
            AbilityId::Chain => "chain",
            AbilityId::QuickReload => "quick_reload",
            AbilityId::AmmoCapacity => "ammo_capacity",
            AbilityId::Lifesteal => "lifesteal",
            AbilityId::Critical => "critical",
            AbilityId::Magnet => "magnet",
            AbilityId::Luck => "luck",
            AbilityId::Repair => "repair",
            AbilityId::Shield => "shield",
        }
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbilityId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AbilityId::ALL
            .into_iter()
            .find(|ability| ability.as_str() == s)
            .ok_or(())
    }
}

/// Acquired ability levels; a missing entry means level 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbilityLevels(BTreeMap<AbilityId, u32>);

impl AbilityLevels {
    pub fn level(&self, ability: AbilityId) -> u32 {
        self.0.get(&ability).copied().unwrap_or(0)
    }

    pub fn is_maxed(&self, ability: AbilityId) -> bool {
        self.level(ability) >= ability.max_level()
    }

    /// Raises the level by one and returns the new level, or `None` when already maxed.
    pub fn increment(&mut self, ability: AbilityId) -> Option<u32> {
        if self.is_maxed(ability) {
            return None;
        }
        let level = self.0.entry(ability).or_insert(0);
        *level += 1;
        Some(*level)
    }

    pub fn owned(&self) -> impl Iterator<Item = (AbilityId, u32)> + '_ {
        self.0
            .iter()
            .filter(|(_, level)| **level > 0)
            .map(|(ability, level)| (*ability, *level))
    }
}

/// Projectile-state charges, stamped at fire time and never re-read from the owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Charges {
    pub pierce: u32,
    pub bounce: u32,
    pub homing: u32,
    pub freeze: u32,
    pub poison: u32,
    pub explosive: u32,
    pub chain: u32,
}

/// Combat parameters derived from a player's ability levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatParams {
    pub projectile_count: u32,
    pub damage: i32,
    pub recoil_multiplier: f32,
    pub speed_multiplier: f32,
    pub lifetime_multiplier: f32,
    pub charges: Charges,
    pub reload_multiplier: f32,
    pub ammo_bonus: u32,
    pub lifesteal: i32,
    pub crit_chance: f32,
    pub magnet_bonus: f32,
    pub magnet_exp_multiplier: f32,
    pub luck: u32,
}

impl CombatParams {
    pub fn resolve(levels: &AbilityLevels, tuning: &Tuning) -> Self {
        let lv = |ability| levels.level(ability);
        let lf = |ability| levels.level(ability) as f32;

        Self {
            projectile_count: 1 + lv(AbilityId::MultiShot),
            damage: tuning.projectile.base_damage + lv(AbilityId::Damage) as i32,
            recoil_multiplier: 1.0 + 0.25 * lf(AbilityId::Recoil),
            speed_multiplier: 1.0 + 0.15 * lf(AbilityId::Velocity),
            lifetime_multiplier: 1.0 + 0.2 * lf(AbilityId::Range),
            charges: Charges {
                pierce: lv(AbilityId::Pierce),
                bounce: lv(AbilityId::Bounce),
                homing: lv(AbilityId::Homing),
                freeze: lv(AbilityId::Freeze),
                poison: lv(AbilityId::Poison),
                explosive: lv(AbilityId::Explosive),
                chain: lv(AbilityId::Chain),
            },
            reload_multiplier: (1.0 - 0.15 * lf(AbilityId::QuickReload))
                .max(tuning.weapon.min_reload_multiplier),
            ammo_bonus: 2 * lv(AbilityId::AmmoCapacity),
            lifesteal: lv(AbilityId::Lifesteal) as i32,
            crit_chance: (tuning.projectile.crit_chance_per_level * lf(AbilityId::Critical))
                .min(1.0),
            magnet_bonus: 0.5 * lf(AbilityId::Magnet),
            magnet_exp_multiplier: 1.0 + 0.1 * lf(AbilityId::Magnet),
            luck: lv(AbilityId::Luck),
        }
    }

    pub fn max_ammo(&self, tuning: &Tuning) -> u32 {
        tuning.weapon.base_max_ammo + self.ammo_bonus
    }

    pub fn reload_ms(&self, tuning: &Tuning) -> u64 {
        (tuning.weapon.reload_ms as f32 * self.reload_multiplier).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(entries: &[(AbilityId, u32)]) -> AbilityLevels {
        let mut levels = AbilityLevels::default();
        for (ability, level) in entries {
            for _ in 0..*level {
                levels.increment(*ability);
            }
        }
        levels
    }

    #[test]
    fn when_no_abilities_then_params_are_baseline() {
        let tuning = Tuning::default();
        let params = CombatParams::resolve(&AbilityLevels::default(), &tuning);
        assert_eq!(params.projectile_count, 1);
        assert_eq!(params.damage, 1);
        assert_eq!(params.charges, Charges::default());
        assert_eq!(params.max_ammo(&tuning), 5);
        assert_eq!(params.reload_ms(&tuning), 1500);
        assert_eq!(params.crit_chance, 0.0);
    }

    #[test]
    fn when_reload_ability_is_maxed_then_reload_is_never_instant() {
        let tuning = Tuning::default();
        let params =
            CombatParams::resolve(&levels(&[(AbilityId::QuickReload, 4)]), &tuning);
        // 1 - 0.6 = 0.4 stays above the 0.3 floor
        assert!((params.reload_multiplier - 0.4).abs() < 1e-6);

        let mut tight = tuning.clone();
        tight.weapon.min_reload_multiplier = 0.5;
        let params = CombatParams::resolve(&levels(&[(AbilityId::QuickReload, 4)]), &tight);
        assert_eq!(params.reload_multiplier, 0.5);
        assert_eq!(params.reload_ms(&tight), 750);
    }

    #[test]
    fn when_charge_abilities_owned_then_charges_mirror_levels() {
        let tuning = Tuning::default();
        let params = CombatParams::resolve(
            &levels(&[
                (AbilityId::Pierce, 2),
                (AbilityId::Bounce, 1),
                (AbilityId::Chain, 3),
                (AbilityId::MultiShot, 2),
                (AbilityId::AmmoCapacity, 1),
            ]),
            &tuning,
        );
        assert_eq!(params.charges.pierce, 2);
        assert_eq!(params.charges.bounce, 1);
        assert_eq!(params.charges.chain, 3);
        assert_eq!(params.projectile_count, 3);
        assert_eq!(params.max_ammo(&tuning), 7);
    }

    #[test]
    fn when_ability_is_maxed_then_increment_is_refused() {
        let mut levels = levels(&[(AbilityId::Luck, 3)]);
        assert!(levels.is_maxed(AbilityId::Luck));
        assert_eq!(levels.increment(AbilityId::Luck), None);
        assert_eq!(levels.level(AbilityId::Luck), 3);
    }

    #[test]
    fn when_parsing_wire_ids_then_every_ability_round_trips() {
        for ability in AbilityId::ALL {
            assert_eq!(ability.as_str().parse::<AbilityId>(), Ok(ability));
        }
        assert!("laser".parse::<AbilityId>().is_err());
    }

    #[test]
    fn when_luck_rises_then_rare_tiers_gain_weight() {
        assert_eq!(Rarity::Common.weight(3), Rarity::Common.weight(0));
        assert!(Rarity::Epic.weight(2) > Rarity::Epic.weight(0));
        assert!(Rarity::Rare.weight(1) > Rarity::Rare.weight(0));
    }
}
