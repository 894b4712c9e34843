use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::actor::{ActorId, ActorSpec};
use crate::combat::actions::Action;
use crate::conditions::Condition;
use crate::content::{builtin_creatures, builtin_encounters};
use crate::encounter::Encounter;
use crate::rules::RulesConfig;
use crate::turn::{Decider, Movement, TurnPlan};

const DEFAULT_MAX_ROUNDS: u32 = 30;

/// Creature templates by id.
pub type Bestiary = IndexMap<String, ActorSpec>;

pub fn parse_bestiary(text: &str) -> Result<Bestiary> {
    serde_yaml::from_str(text).context("failed to parse bestiary YAML")
}

pub fn builtin_bestiary() -> Result<Bestiary> {
    parse_bestiary(builtin_creatures()).context("built-in bestiary is malformed")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CombatantEntry {
    pub creature: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub position: i32,
}

/// An encounter as written in YAML (or JSON).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterFile {
    pub name: String,
    #[serde(default)]
    pub rules: RulesConfig,
    /// Extra creatures; these shadow bestiary entries with the same id.
    #[serde(default)]
    pub creatures: Bestiary,
    pub combatants: Vec<CombatantEntry>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

impl EncounterFile {
    /// Instantiate every combatant into a fresh encounter.
    pub fn build(&self, bestiary: &Bestiary, seed: u64) -> Result<Encounter> {
        if self.combatants.is_empty() {
            bail!("encounter '{}' has no combatants", self.name);
        }
        let mut enc = Encounter::seeded(seed).with_rules(self.rules.clone());
        for (i, entry) in self.combatants.iter().enumerate() {
            let mut spec = self
                .creatures
                .get(&entry.creature)
                .or_else(|| bestiary.get(&entry.creature))
                .cloned()
                .with_context(|| {
                    format!("combatant {} refers to unknown creature '{}'", i, entry.creature)
                })?;
            if let Some(name) = &entry.name {
                spec.name = name.clone();
            }
            if let Some(team) = &entry.team {
                spec.team = team.clone();
            }
            if spec.team.is_empty() {
                spec.team = spec.name.clone();
            }
            spec.position = entry.position;
            enc.add_actor(spec);
        }
        Ok(enc)
    }
}

pub fn parse_encounter(text: &str) -> Result<EncounterFile> {
    serde_yaml::from_str(text).context("failed to parse encounter YAML")
}

/// Resolve a built-in encounter name, or read a file (JSON by extension, YAML otherwise).
pub fn load_encounter(name_or_path: &str) -> Result<EncounterFile> {
    if let Some(text) = builtin_encounters().get(name_or_path) {
        return parse_encounter(text)
            .with_context(|| format!("built-in encounter '{}' is malformed", name_or_path));
    }
    let path = Path::new(name_or_path);
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read encounter file: {}", path.display()))?;
    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse encounter JSON: {}", path.display()))
    } else {
        parse_encounter(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ActorState {
    pub name: String,
    pub team: String,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
    pub position: i32,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterResult {
    pub encounter: String,
    pub seed: u64,
    pub winner: Option<String>,
    pub rounds: u32,
    pub actors: Vec<ActorState>,
    pub log: Vec<String>,
}

pub fn final_states(enc: &Encounter) -> Vec<ActorState> {
    enc.actors()
        .map(|a| ActorState {
            name: a.name.clone(),
            team: a.team.clone(),
            hp: a.health.hp,
            max_hp: a.health.max_hp,
            alive: a.is_alive(),
            position: a.position,
            conditions: a.conditions().conditions().collect(),
        })
        .collect()
}

/// Run one encounter to completion with [`BasicTactics`].
pub fn simulate_encounter(file: &EncounterFile, seed: u64, record_log: bool) -> Result<EncounterResult> {
    let bestiary = builtin_bestiary()?;
    let mut enc = file.build(&bestiary, seed)?.record_log(record_log);
    let summary = enc.run(&mut BasicTactics, file.max_rounds);
    Ok(EncounterResult {
        encounter: file.name.clone(),
        seed,
        winner: summary.winner,
        rounds: summary.rounds,
        actors: final_states(&enc),
        log: enc.take_log(),
    })
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchSummary {
    pub encounter: String,
    pub runs: u32,
    pub wins: BTreeMap<String, u32>,
    /// Fights that hit the round cap with more than one team standing.
    pub unresolved: u32,
    pub mean_rounds: f64,
}

impl BatchSummary {
    pub fn win_rate(&self, team: &str) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        f64::from(self.wins.get(team).copied().unwrap_or(0)) / f64::from(self.runs)
    }
}

/// Monte Carlo: run `runs` fights with seeds `seed, seed+1, ...`, narration off.
pub fn simulate_encounter_many(file: &EncounterFile, seed: u64, runs: u32) -> Result<BatchSummary> {
    let bestiary = builtin_bestiary()?;
    let mut summary = BatchSummary { encounter: file.name.clone(), runs, ..BatchSummary::default() };
    let mut total_rounds = 0u64;
    for i in 0..runs {
        let mut enc = file.build(&bestiary, seed.wrapping_add(u64::from(i)))?.record_log(false);
        let result = enc.run(&mut BasicTactics, file.max_rounds);
        total_rounds += u64::from(result.rounds);
        match result.winner {
            Some(team) => *summary.wins.entry(team).or_insert(0) += 1,
            None => summary.unresolved += 1,
        }
    }
    if runs > 0 {
        summary.mean_rounds = total_rounds as f64 / f64::from(runs);
    }
    Ok(summary)
}

/// Straightforward monster-manual tactics for the harness.
///
/// Held creatures try to escape. Creatures with a grapple profile seize whoever is in
/// reach and crush what they hold; everyone else closes on the nearest enemy and hits it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTactics;

impl BasicTactics {
    fn nearest_enemy(enc: &Encounter, id: ActorId) -> Option<(ActorId, i32)> {
        let me = enc.actor(id)?;
        enc.actors()
            .filter(|a| a.is_alive() && a.team != me.team)
            .map(|a| (a.id, me.distance_to(a)))
            .min_by_key(|&(_, d)| d)
    }
}

impl Decider for BasicTactics {
    fn plan(&mut self, id: ActorId, enc: &Encounter) -> TurnPlan {
        let Some(me) = enc.actor(id) else {
            return TurnPlan::idle();
        };
        if me.has(Condition::Grappled) {
            return TurnPlan::act(Action::Escape);
        }

        if let Some(profile) = &me.grapple {
            let holding = enc.ledger().holding(id);
            if holding < profile.capacity {
                let prey = enc
                    .actors()
                    .filter(|a| a.is_alive() && a.team != me.team)
                    .filter(|a| me.distance_to(a) <= profile.reach)
                    .filter(|a| me.size.can_grapple(a.size))
                    .find(|a| enc.ledger().edge(id, a.id).is_none());
                if let Some(prey) = prey {
                    return TurnPlan::act(Action::Grapple { target: prey.id });
                }
            }
            if holding > 0 {
                return TurnPlan::act(Action::Crush);
            }
        }

        let Some((enemy, distance)) = Self::nearest_enemy(enc, id) else {
            return TurnPlan::idle();
        };
        let reach = me.weapon.reach;
        if distance <= reach {
            return TurnPlan::act(Action::Attack { target: enemy });
        }
        let closing = (distance - 5).min(me.effective_speed()).max(0);
        let plan = TurnPlan::idle().moving(Movement::Toward(enemy));
        if distance - closing <= reach {
            TurnPlan { action: Some(Action::Attack { target: enemy }), ..plan }
        } else {
            TurnPlan { action: Some(Action::Dodge), ..plan }
        }
    }
}
