use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::AdMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Grappled,
    Grappling,
    Restrained,
    Prone,
    Dodging,
    Paralyzed,
    Stunned,
    Unconscious,
    Petrified,
    Incapacitated,
}

impl Condition {
    pub const ALL: [Condition; 10] = [
        Condition::Grappled,
        Condition::Grappling,
        Condition::Restrained,
        Condition::Prone,
        Condition::Dodging,
        Condition::Paralyzed,
        Condition::Stunned,
        Condition::Unconscious,
        Condition::Petrified,
        Condition::Incapacitated,
    ];

    pub fn flag(self) -> ConditionSet {
        match self {
            Condition::Grappled => ConditionSet::GRAPPLED,
            Condition::Grappling => ConditionSet::GRAPPLING,
            Condition::Restrained => ConditionSet::RESTRAINED,
            Condition::Prone => ConditionSet::PRONE,
            Condition::Dodging => ConditionSet::DODGING,
            Condition::Paralyzed => ConditionSet::PARALYZED,
            Condition::Stunned => ConditionSet::STUNNED,
            Condition::Unconscious => ConditionSet::UNCONSCIOUS,
            Condition::Petrified => ConditionSet::PETRIFIED,
            Condition::Incapacitated => ConditionSet::INCAPACITATED,
        }
    }

    /// Paralyzed, Stunned, Unconscious and Petrified each carry Incapacitated with them.
    pub fn implies_incapacitated(self) -> bool {
        ConditionSet::INCAPACITATING.contains(self.flag())
    }

    /// Grappled and Grappling only change through the grapple ledger.
    pub fn is_grapple_role(self) -> bool {
        matches!(self, Condition::Grappled | Condition::Grappling)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConditionSet: u16 {
        const GRAPPLED = 1 << 0;
        const GRAPPLING = 1 << 1;
        const RESTRAINED = 1 << 2;
        const PRONE = 1 << 3;
        const DODGING = 1 << 4;
        const PARALYZED = 1 << 5;
        const STUNNED = 1 << 6;
        const UNCONSCIOUS = 1 << 7;
        const PETRIFIED = 1 << 8;
        const INCAPACITATED = 1 << 9;
    }
}

impl ConditionSet {
    pub const INCAPACITATING: ConditionSet = ConditionSet::PARALYZED
        .union(ConditionSet::STUNNED)
        .union(ConditionSet::UNCONSCIOUS)
        .union(ConditionSet::PETRIFIED)
        .union(ConditionSet::INCAPACITATED);

    /// Conditions that force speed to zero while any is active.
    pub const IMMOBILIZING: ConditionSet = ConditionSet::GRAPPLED.union(ConditionSet::RESTRAINED);

    pub fn conditions(self) -> impl Iterator<Item = Condition> {
        Condition::ALL.into_iter().filter(move |c| self.contains(c.flag()))
    }
}

/// Per-actor condition registry.
///
/// Owns the speed cache: the first immobilizing condition stores the actor's speed and
/// zeroes it, the last one to clear restores the stored value exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    active: ConditionSet,
    cached_speed: Option<i32>,
    /// Restrained was applied by an outside effect, independent of any hold.
    restrained_by_effect: bool,
}

impl Conditions {
    pub fn has(&self, condition: Condition) -> bool {
        self.active.contains(condition.flag())
    }

    pub fn set_view(&self) -> ConditionSet {
        self.active
    }

    pub fn is_incapacitated(&self) -> bool {
        self.active.intersects(ConditionSet::INCAPACITATING)
    }

    pub fn is_immobilized(&self) -> bool {
        self.active.intersects(ConditionSet::IMMOBILIZING)
    }

    pub fn cached_speed(&self) -> Option<i32> {
        self.cached_speed
    }

    pub fn restrained_by_effect(&self) -> bool {
        self.restrained_by_effect
    }

    pub(crate) fn mark_restrained_by_effect(&mut self, on: bool) {
        self.restrained_by_effect = on;
    }

    pub(crate) fn recache_speed(&mut self, value: i32) {
        if self.cached_speed.is_some() {
            self.cached_speed = Some(value.max(0));
        }
    }

    /// Returns true when the active set changed.
    pub(crate) fn set(&mut self, condition: Condition, active: bool, speed: &mut i32) -> bool {
        let flag = condition.flag();
        if self.active.contains(flag) == active {
            return false;
        }
        let was_immobilized = self.is_immobilized();
        self.active.set(flag, active);
        let now_immobilized = self.is_immobilized();

        if !was_immobilized && now_immobilized {
            self.cached_speed = Some(*speed);
            *speed = 0;
        } else if was_immobilized && !now_immobilized {
            if let Some(original) = self.cached_speed.take() {
                *speed = original;
            }
        }
        true
    }
}

/// Named reasons feeding a single merged roll mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VantageSources {
    pub advantage: Vec<&'static str>,
    pub disadvantage: Vec<&'static str>,
}

impl VantageSources {
    pub fn grant_advantage(&mut self, why: &'static str) {
        self.advantage.push(why);
    }

    pub fn grant_disadvantage(&mut self, why: &'static str) {
        self.disadvantage.push(why);
    }

    pub fn mode(&self) -> AdMode {
        AdMode::from_flags(!self.advantage.is_empty(), !self.disadvantage.is_empty())
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.advantage.is_empty() {
            parts.push(format!("adv: {}", self.advantage.join(", ")));
        }
        if !self.disadvantage.is_empty() {
            parts.push(format!("dis: {}", self.disadvantage.join(", ")));
        }
        if parts.is_empty() {
            "straight".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Whether the attack is melee or ranged (used for prone interactions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackStyle {
    Melee,
    Ranged,
}

/// Collect vantage sources from attacker and target conditions.
///
/// `defender_holds_attacker` is true when the defender is one of the attacker's own
/// grapplers; a grappled creature only suffers disadvantage against everyone else.
pub fn attack_vantage(
    attacker: &Conditions,
    target: &Conditions,
    defender_holds_attacker: bool,
    style: AttackStyle,
) -> VantageSources {
    let mut sources = VantageSources::default();

    if attacker.has(Condition::Grappled) && !defender_holds_attacker {
        sources.grant_disadvantage("grappled");
    }
    if attacker.has(Condition::Prone) {
        sources.grant_disadvantage("prone");
    }

    if target.has(Condition::Restrained) {
        sources.grant_advantage("target restrained");
    }
    if target.set_view().intersects(
        ConditionSet::PARALYZED
            .union(ConditionSet::STUNNED)
            .union(ConditionSet::UNCONSCIOUS)
            .union(ConditionSet::PETRIFIED),
    ) {
        sources.grant_advantage("target helpless");
    }
    if target.has(Condition::Prone) {
        match style {
            AttackStyle::Melee => sources.grant_advantage("target prone"),
            AttackStyle::Ranged => sources.grant_disadvantage("target prone"),
        }
    }
    if target.has(Condition::Dodging) {
        sources.grant_disadvantage("target dodging");
    }

    sources
}
