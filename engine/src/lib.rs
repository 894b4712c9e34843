use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod abilities;
pub mod actor;
pub mod api;
pub mod checks;
pub mod combat;
pub mod conditions;
pub mod content;
pub mod encounter;
pub mod error;
pub mod grapple;
pub mod life;
pub mod rules;
pub mod turn;

pub use abilities::{ability_mod, Ability, AbilityScores, SavingThrow, Skill};
pub use actor::{Actor, ActorId, ActorSpec, Defenses, Size, Weapon};
pub use combat::actions::{Action, ActionOutcome, ActionSlot, ConditionChange, Resolution};
pub use combat::attack::{adjust_damage_by_type, attack, damage, AttackResult, DamageDice, DamageType};
pub use conditions::{Condition, ConditionSet};
pub use encounter::Encounter;
pub use error::{ActionError, InvariantViolation};
pub use grapple::{GrappleEdge, GrappleLedger, GrappleMethod, GrappleProfile};
pub use rules::{EscapeDcRule, RulesConfig};
pub use turn::{Decider, Movement, TurnBudget, TurnPlan, TurnReport};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum AdMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl AdMode {
    /// Advantage and disadvantage cancel no matter how many sources grant each.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Self {
        match (advantage, disadvantage) {
            (true, false) => AdMode::Advantage,
            (false, true) => AdMode::Disadvantage,
            _ => AdMode::Normal,
        }
    }
}

/// One d20 roll as seen by the table: every die thrown and the one kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D20Roll {
    pub kept: u32,
    pub rolls: Vec<u32>,
    pub mode: AdMode,
}

impl D20Roll {
    pub fn is_natural_max(&self) -> bool {
        self.kept == 20
    }

    pub fn is_natural_min(&self) -> bool {
        self.kept == 1
    }
}

#[derive(Debug, Clone)]
enum Source {
    Seeded(ChaCha8Rng),
    Scripted { values: Vec<u32>, next: usize },
}

/// Die source for every roll in an encounter.
///
/// Seeded dice are reproducible; scripted dice replay a fixed sequence (cycling when
/// exhausted) so tests can force exact outcomes.
#[derive(Debug, Clone)]
pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    pub fn from_scripted(values: Vec<u32>) -> Self {
        Self { source: Source::Scripted { values, next: 0 } }
    }

    /// Uniform roll in `1..=sides`. Scripted values are clamped into that range.
    pub fn roll(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(1..=sides),
            Source::Scripted { values, next } => {
                if values.is_empty() {
                    return 1;
                }
                let value = values[*next % values.len()];
                *next += 1;
                value.clamp(1, sides)
            }
        }
    }

    pub fn roll_d20(&mut self, advantage: bool, disadvantage: bool) -> D20Roll {
        self.d20_roll(AdMode::from_flags(advantage, disadvantage))
    }

    pub fn d20_roll(&mut self, mode: AdMode) -> D20Roll {
        match mode {
            AdMode::Normal => {
                let a = self.roll(20);
                D20Roll { kept: a, rolls: vec![a], mode }
            }
            AdMode::Advantage => {
                let (a, b) = (self.roll(20), self.roll(20));
                D20Roll { kept: a.max(b), rolls: vec![a, b], mode }
            }
            AdMode::Disadvantage => {
                let (a, b) = (self.roll(20), self.roll(20));
                D20Roll { kept: a.min(b), rolls: vec![a, b], mode }
            }
        }
    }

    pub fn d20(&mut self, mode: AdMode) -> u32 {
        self.d20_roll(mode).kept
    }

    /// Sum of `dice.count` rolls of `dice.sides`, saturating at `i32::MAX`.
    pub fn roll_dice(&mut self, dice: DamageDice) -> i32 {
        (0..dice.count).fold(0i32, |total, _| {
            let roll = i32::try_from(self.roll(dice.sides)).unwrap_or(i32::MAX);
            total.saturating_add(roll)
        })
    }
}

/* ---------------- typed check API ---------------- */

#[derive(Debug, Clone, Copy)]
pub struct CheckInput {
    pub dc: i32,
    pub modifier: i32,
    pub mode: AdMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult {
    pub roll: i32,
    pub total: i32,
    pub dc: i32,
    pub passed: bool,
}

/// Roll a d20 (with advantage/disadvantage), add modifier, compare vs DC.
pub fn check(dice: &mut Dice, input: CheckInput) -> CheckResult {
    let roll = dice.d20(input.mode) as i32;
    let total = roll + input.modifier;
    CheckResult { roll, total, dc: input.dc, passed: total >= input.dc }
}
