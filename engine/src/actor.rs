use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::abilities::proficiency_for_level;
use crate::combat::attack::{DamageDice, DamageType};
use crate::conditions::{Condition, ConditionSet, Conditions};
use crate::grapple::GrappleProfile;
use crate::life::Health;
use crate::{Ability, AbilityScores, Skill};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The six-step size ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl Size {
    pub const LADDER: [Size; 6] = [
        Size::Tiny,
        Size::Small,
        Size::Medium,
        Size::Large,
        Size::Huge,
        Size::Gargantuan,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// A target may be at most one step larger than its grappler.
    pub fn can_grapple(self, target: Size) -> bool {
        target.index() <= self.index() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub dice: DamageDice,
    #[serde(default = "default_damage_type")]
    pub damage_type: DamageType,
    /// Melee reach, or normal range for ranged weapons.
    #[serde(default = "default_reach")]
    pub reach: i32,
    #[serde(default)]
    pub finesse: bool,
    #[serde(default)]
    pub ranged: bool,
    /// Magic bonus applied to attack and damage.
    #[serde(default)]
    pub bonus: i32,
}

impl Weapon {
    pub fn unarmed() -> Self {
        Self {
            name: "Unarmed Strike".to_string(),
            dice: DamageDice::new(1, 1),
            damage_type: DamageType::Bludgeoning,
            reach: 5,
            finesse: false,
            ranged: false,
            bonus: 0,
        }
    }
}

fn default_damage_type() -> DamageType {
    DamageType::Bludgeoning
}

fn default_reach() -> i32 {
    5
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defenses {
    #[serde(default)]
    pub resistances: Vec<DamageType>,
    #[serde(default)]
    pub vulnerabilities: Vec<DamageType>,
    #[serde(default)]
    pub immunities: Vec<DamageType>,
}

/// Serializable description of a combatant before it joins an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpec {
    pub name: String,
    #[serde(default)]
    pub team: String,
    pub hp: i32,
    pub ac: i32,
    #[serde(default = "default_speed")]
    pub speed: i32,
    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub save_proficiencies: Vec<Ability>,
    #[serde(default)]
    pub skill_proficiencies: Vec<Skill>,
    #[serde(default)]
    pub initiative_bonus: i32,
    #[serde(default = "Weapon::unarmed")]
    pub weapon: Weapon,
    #[serde(default)]
    pub grapple: Option<GrappleProfile>,
    #[serde(default)]
    pub defenses: Defenses,
    #[serde(default)]
    pub position: i32,
}

fn default_speed() -> i32 {
    30
}

fn default_level() -> u32 {
    1
}

impl ActorSpec {
    /// A plain medium humanoid: 10 in every ability, 10 HP, AC 10, speed 30.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: String::new(),
            hp: 10,
            ac: 10,
            speed: default_speed(),
            size: Size::Medium,
            level: 1,
            abilities: AbilityScores::default(),
            save_proficiencies: Vec::new(),
            skill_proficiencies: Vec::new(),
            initiative_bonus: 0,
            weapon: Weapon::unarmed(),
            grapple: None,
            defenses: Defenses::default(),
            position: 0,
        }
    }
}

/// A combat participant.
///
/// Conditions are private: the registry is read through [`Actor::has`] and changed
/// through the encounter, which keeps grapple roles in step with the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub team: String,
    pub health: Health,
    pub ac: i32,
    pub position: i32,
    pub size: Size,
    pub level: u32,
    pub abilities: AbilityScores,
    pub save_proficiencies: HashSet<Ability>,
    pub skill_proficiencies: HashSet<Skill>,
    pub initiative_bonus: i32,
    pub weapon: Weapon,
    pub grapple: Option<GrappleProfile>,
    pub defenses: Defenses,
    pub concentration: Option<String>,
    speed: i32,
    conditions: Conditions,
}

impl Actor {
    pub fn from_spec(id: ActorId, spec: ActorSpec) -> Self {
        Self {
            id,
            name: spec.name,
            team: spec.team,
            health: Health::new(spec.hp),
            ac: spec.ac,
            position: spec.position,
            size: spec.size,
            level: spec.level,
            abilities: spec.abilities,
            save_proficiencies: spec.save_proficiencies.into_iter().collect(),
            skill_proficiencies: spec.skill_proficiencies.into_iter().collect(),
            initiative_bonus: spec.initiative_bonus,
            weapon: spec.weapon,
            grapple: spec.grapple,
            defenses: spec.defenses,
            concentration: None,
            speed: spec.speed,
            conditions: Conditions::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    pub fn has(&self, condition: Condition) -> bool {
        self.conditions.has(condition)
    }

    pub fn conditions(&self) -> ConditionSet {
        self.conditions.set_view()
    }

    pub fn registry(&self) -> &Conditions {
        &self.conditions
    }

    pub fn is_incapacitated(&self) -> bool {
        self.conditions.is_incapacitated()
    }

    /// Current speed; zero while Grappled or Restrained.
    pub fn effective_speed(&self) -> i32 {
        if self.conditions.is_immobilized() {
            0
        } else {
            self.speed
        }
    }

    /// Speed the actor will have once every immobilizing condition clears.
    pub fn unrestricted_speed(&self) -> i32 {
        self.conditions.cached_speed().unwrap_or(self.speed)
    }

    /// Temporary speed modifiers (haste-like effects). While immobilized the change
    /// applies to the cached value that is restored later.
    pub fn adjust_speed(&mut self, delta: i32) {
        if self.conditions.is_immobilized() {
            let base = self.conditions.cached_speed().unwrap_or(0);
            self.conditions.recache_speed(base + delta);
        } else {
            self.speed = (self.speed + delta).max(0);
        }
    }

    pub(crate) fn set_condition(&mut self, condition: Condition, active: bool) -> bool {
        self.conditions.set(condition, active, &mut self.speed)
    }

    pub(crate) fn mark_restrained_by_effect(&mut self, on: bool) {
        self.conditions.mark_restrained_by_effect(on);
    }

    pub fn proficiency_bonus(&self) -> i32 {
        proficiency_for_level(self.level)
    }

    pub fn ability_mod(&self, ability: Ability) -> i32 {
        self.abilities.mod_of(ability)
    }

    pub fn save_mod(&self, ability: Ability) -> i32 {
        let base = self.ability_mod(ability);
        if self.save_proficiencies.contains(&ability) {
            base + self.proficiency_bonus()
        } else {
            base
        }
    }

    pub fn skill_mod(&self, skill: Skill) -> i32 {
        let base = self.ability_mod(skill.ability());
        if self.skill_proficiencies.contains(&skill) {
            base + self.proficiency_bonus()
        } else {
            base
        }
    }

    /// Ability used with the equipped weapon: DEX for ranged, the better of STR/DEX for
    /// finesse, STR otherwise.
    pub fn weapon_ability(&self) -> Ability {
        if self.weapon.ranged {
            Ability::Dex
        } else if self.weapon.finesse && self.ability_mod(Ability::Dex) > self.ability_mod(Ability::Str) {
            Ability::Dex
        } else {
            Ability::Str
        }
    }

    pub fn weapon_attack_bonus(&self) -> i32 {
        self.ability_mod(self.weapon_ability()) + self.proficiency_bonus() + self.weapon.bonus
    }

    pub fn weapon_damage_mod(&self) -> i32 {
        self.ability_mod(self.weapon_ability()) + self.weapon.bonus
    }

    pub fn distance_to(&self, other: &Actor) -> i32 {
        (self.position - other.position).abs()
    }
}

/// Every actor in one encounter, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    actors: IndexMap<ActorId, Actor>,
    next_id: u32,
}

impl Roster {
    pub fn insert(&mut self, spec: ActorSpec) -> ActorId {
        self.next_id += 1;
        let id = ActorId(self.next_id);
        self.actors.insert(id, Actor::from_spec(id, spec));
        id
    }

    /// Drop an actor from the encounter (fled, banished). Its edges become stale.
    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.shift_remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn name_of(&self, id: ActorId) -> String {
        self.get(id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
