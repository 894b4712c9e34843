use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::actor::Defenses;
use crate::error::DiceParseError;
use crate::{AdMode, Dice};

/// Most dice a single notation may ask for.
pub const MAX_DICE_COUNT: u32 = 100;
/// Largest die a notation may name.
pub const MAX_DICE_SIDES: u32 = 1000;

/// `count`d`sides`, written `2d6` in content files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DamageDice {
    pub count: u32,
    pub sides: u32,
}

impl DamageDice {
    pub const fn new(count: u32, sides: u32) -> Self {
        Self { count, sides }
    }
}

impl fmt::Display for DamageDice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

impl FromStr for DamageDice {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (count, sides) = lowered
            .split_once('d')
            .ok_or_else(|| DiceParseError(s.to_string()))?;
        let count = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| DiceParseError(s.to_string()))?
        };
        let sides: u32 = sides.parse().map_err(|_| DiceParseError(s.to_string()))?;
        if !(1..=MAX_DICE_COUNT).contains(&count) || !(1..=MAX_DICE_SIDES).contains(&sides) {
            return Err(DiceParseError(s.to_string()));
        }
        Ok(Self { count, sides })
    }
}

impl TryFrom<String> for DamageDice {
    type Error = DiceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DamageDice> for String {
    fn from(value: DamageDice) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Bludgeoning,
    Piercing,
    Slashing,
    Fire,
    Cold,
    Lightning,
    Acid,
    Poison,
    Psychic,
    Radiant,
    Necrotic,
    Thunder,
    Force,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackResult {
    /// The kept d20.
    pub roll: i32,
    pub raw_rolls: Vec<u32>,
    pub total: i32,
    pub ac: i32,
    pub mode: AdMode,
    pub hit: bool,
    pub is_crit: bool,
    pub nat20: bool,
    pub nat1: bool,
}

/// Single merged d20 against an armor value.
///
/// A kept 20 always hits and crits; a kept 1 always misses.
pub fn attack(dice: &mut Dice, mode: AdMode, bonus: i32, ac: i32) -> AttackResult {
    let d20 = dice.d20_roll(mode);
    let roll = d20.kept as i32;
    let total = roll + bonus;
    let nat20 = d20.is_natural_max();
    let nat1 = d20.is_natural_min();
    let hit = nat20 || (!nat1 && total >= ac);
    AttackResult {
        roll,
        raw_rolls: d20.rolls,
        total,
        ac,
        mode,
        hit,
        is_crit: nat20,
        nat20,
        nat1,
    }
}

/// Roll damage; a critical doubles the dice, never the modifier. Never negative.
pub fn damage(dice: &mut Dice, dd: DamageDice, modifier: i32, crit: bool) -> i32 {
    let mut rolled = dice.roll_dice(dd);
    if crit {
        rolled = rolled.saturating_add(dice.roll_dice(dd));
    }
    rolled.saturating_add(modifier).max(0)
}

pub fn adjust_damage_by_type(raw: i32, dtype: DamageType, defenses: &Defenses) -> i32 {
    if defenses.immunities.contains(&dtype) {
        return 0;
    }
    let mut dmg = raw;
    if defenses.resistances.contains(&dtype) {
        dmg /= 2;
    }
    if defenses.vulnerabilities.contains(&dtype) {
        dmg *= 2;
    }
    dmg
}

pub(crate) fn format_d20_sequence(raw: &[u32], kept: i32) -> String {
    match raw {
        [] => format!("d20=? (keep={})", kept),
        [only] => format!("d20={}", only),
        [first, second] => format!("d20={} vs d20={} (keep={})", first, second, kept),
        _ => {
            let joined = raw
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("d20s=[{}] (keep={})", joined, kept)
        }
    }
}

pub(crate) fn describe_attack(atk: &AttackResult) -> String {
    let rolls = format_d20_sequence(&atk.raw_rolls, atk.roll);
    let outcome = if atk.is_crit {
        "CRIT!"
    } else if atk.hit {
        "HIT"
    } else if atk.nat1 {
        "MISS (NAT1)"
    } else {
        "MISS"
    };
    format!("{} to-hit={} vs AC={} → {}", rolls, atk.total, atk.ac, outcome)
}
