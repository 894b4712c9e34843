use std::collections::{BTreeSet, HashMap};

use crate::actor::{Actor, ActorId, ActorSpec, Roster, Size};
use crate::combat::attack::{adjust_damage_by_type, DamageType};
use crate::conditions::{Condition, ConditionSet};
use crate::error::ActionError;
use crate::grapple::{GrappleLedger, ValidationReport};
use crate::life::{self, DamageReport};
use crate::rules::RulesConfig;
use crate::turn::TurnBudget;
use crate::Dice;

/// Human-readable combat log. Every line is also emitted as a `tracing` event, so a
/// headless caller can switch recording off and lose nothing but the buffer.
#[derive(Debug, Clone, Default)]
pub struct Narration {
    record: bool,
    lines: Vec<String>,
}

impl Narration {
    pub fn push(&mut self, line: String) {
        tracing::debug!(target: "combat_engine::narration", "{}", line);
        if self.record {
            self.lines.push(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// One combat: actors, the grapple ledger, dice and turn bookkeeping.
///
/// This is the context object every operation goes through; nothing about an encounter
/// lives in globals, and it is dropped when the fight ends.
#[derive(Debug, Clone)]
pub struct Encounter {
    pub(crate) roster: Roster,
    pub(crate) ledger: GrappleLedger,
    pub(crate) dice: Dice,
    pub(crate) rules: RulesConfig,
    pub(crate) narration: Narration,
    pub(crate) round: u32,
    pub(crate) order: Vec<(ActorId, i32)>,
    pub(crate) budgets: HashMap<ActorId, TurnBudget>,
}

impl Encounter {
    pub fn new(dice: Dice) -> Self {
        Self {
            roster: Roster::default(),
            ledger: GrappleLedger::default(),
            dice,
            rules: RulesConfig::default(),
            narration: Narration { record: true, lines: Vec::new() },
            round: 0,
            order: Vec::new(),
            budgets: HashMap::new(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Dice::from_seed(seed))
    }

    pub fn with_rules(mut self, rules: RulesConfig) -> Self {
        self.rules = rules;
        self
    }

    pub fn record_log(mut self, record: bool) -> Self {
        self.narration.record = record;
        self
    }

    pub fn add_actor(&mut self, spec: ActorSpec) -> ActorId {
        let id = self.roster.insert(spec);
        tracing::trace!(actor = id.0, "actor joined encounter");
        id
    }

    /// Take an actor out of the fight entirely; its grapples end.
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        let removed = self.roster.remove(id)?;
        self.order.retain(|(a, _)| *a != id);
        self.budgets.remove(&id);
        self.narration.push(format!("[LEAVE][{}] leaves the encounter", removed.name));
        self.validate_grapples();
        Some(removed)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.roster.get(id)
    }

    /// Edit an actor in place, then run a validator pass so any grapple the edit broke
    /// (position, hit points, size) ends before anyone can observe it.
    pub fn update_actor<R>(
        &mut self,
        id: ActorId,
        edit: impl FnOnce(&mut Actor) -> R,
    ) -> Result<(R, ValidationReport), ActionError> {
        let actor = self.roster.get_mut(id).ok_or(ActionError::UnknownActor(id))?;
        let value = edit(actor);
        Ok((value, self.validate_grapples()))
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.roster.iter()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ledger(&self) -> &GrappleLedger {
        &self.ledger
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn dice_mut(&mut self) -> &mut Dice {
        &mut self.dice
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn log(&self) -> &[String] {
        self.narration.lines()
    }

    pub fn take_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.narration.lines)
    }

    pub fn narrate(&mut self, line: impl Into<String>) {
        self.narration.push(line.into());
    }

    pub(crate) fn require(&self, id: ActorId) -> Result<&Actor, ActionError> {
        self.roster.get(id).ok_or(ActionError::UnknownActor(id))
    }

    /// Living and not incapacitated: the actor may spend actions and reactions.
    pub fn can_act(&self, id: ActorId) -> Result<(), ActionError> {
        let actor = self.require(id)?;
        if !actor.is_alive() {
            return Err(ActionError::NotAlive(id));
        }
        if actor.is_incapacitated() {
            return Err(ActionError::Incapacitated(id));
        }
        Ok(())
    }

    pub(crate) fn name_of(&self, id: ActorId) -> String {
        self.roster.name_of(id)
    }

    pub fn distance(&self, a: ActorId, b: ActorId) -> Result<i32, ActionError> {
        Ok(self.require(a)?.distance_to(self.require(b)?))
    }

    /// Condition entry point for spells and abilities.
    ///
    /// Grapple roles are refused: they only change with an edge. Any change is followed
    /// by a validator pass so a newly incapacitated grappler lets go immediately.
    pub fn set_condition(
        &mut self,
        id: ActorId,
        condition: Condition,
        active: bool,
    ) -> Result<bool, ActionError> {
        if condition.is_grapple_role() {
            return Err(ActionError::LedgerOwned(condition));
        }
        let held = self.ledger.incoming(id).any(|e| e.restrains);
        let actor = self.roster.get_mut(id).ok_or(ActionError::UnknownActor(id))?;
        if condition == Condition::Restrained {
            if !active && held {
                // The effect ends but the hold keeps the creature restrained.
                if !actor.registry().restrained_by_effect() {
                    return Err(ActionError::LedgerOwned(condition));
                }
                actor.mark_restrained_by_effect(false);
                let line = format!("[COND][{}] Restrained effect ends; still held", actor.name);
                self.narration.push(line);
                return Ok(false);
            }
            actor.mark_restrained_by_effect(active);
        }
        let changed = actor.set_condition(condition, active);
        if !changed {
            return Ok(false);
        }
        let name = actor.name.clone();
        let lost_focus = if active && actor.is_incapacitated() {
            actor.concentration.take()
        } else {
            None
        };

        tracing::debug!(actor = id.0, ?condition, active, "condition changed");
        if active {
            self.narration.push(format!("[COND][{}] gains {:?}", name, condition));
        } else {
            self.narration.push(format!("[COND][{}] is no longer {:?}", name, condition));
        }
        if let Some(effect) = lost_focus {
            self.narration
                .push(format!("[CONC][{}] loses concentration on {}", name, effect));
        }
        self.validate_grapples();
        Ok(true)
    }

    /// Forced displacement (shoves, spells): ignores speed, then reconciles grapples.
    pub fn force_move(&mut self, id: ActorId, to: i32) -> Result<ValidationReport, ActionError> {
        self.relocate(id, to, "is forced")
    }

    pub fn teleport(&mut self, id: ActorId, to: i32) -> Result<ValidationReport, ActionError> {
        self.relocate(id, to, "teleports")
    }

    fn relocate(&mut self, id: ActorId, to: i32, verb: &str) -> Result<ValidationReport, ActionError> {
        let actor = self.roster.get_mut(id).ok_or(ActionError::UnknownActor(id))?;
        let from = actor.position;
        actor.position = to;
        let line = format!("[MOVE][{}] {} from {}ft to {}ft", actor.name, verb, from, to);
        self.narration.push(line);
        Ok(self.validate_grapples())
    }

    /// Magical growth or shrinking; a hold on a creature that grew too large breaks.
    pub fn set_size(&mut self, id: ActorId, size: Size) -> Result<ValidationReport, ActionError> {
        let actor = self.roster.get_mut(id).ok_or(ActionError::UnknownActor(id))?;
        let before = actor.size;
        actor.size = size;
        let line = format!("[SIZE][{}] {:?} → {:?}", actor.name, before, size);
        self.narration.push(line);
        Ok(self.validate_grapples())
    }

    /// Damage pipeline shared by attacks, grapples, crushes and outside effects.
    pub fn deal_damage(
        &mut self,
        target: ActorId,
        raw: i32,
        dtype: DamageType,
    ) -> Result<DamageReport, ActionError> {
        let floor = self.rules.concentration_dc_floor;
        let Encounter { roster, dice, narration, .. } = &mut *self;
        let actor = roster.get_mut(target).ok_or(ActionError::UnknownActor(target))?;
        let dmg = adjust_damage_by_type(raw, dtype, &actor.defenses);
        if dmg != raw {
            narration.push(format!(
                "[DEF][{}] {:?} damage adjusted {} → {}",
                actor.name, dtype, raw, dmg
            ));
        }
        let report = life::apply_damage(actor, dmg, floor, dice, |m| narration.push(m));
        if let Some(effect) = &report.concentration_broken {
            let line = format!("[CONC][{}] loses concentration on {}", actor.name, effect);
            narration.push(line);
        }
        if report.killed {
            tracing::info!(actor = target.0, "actor died");
            self.validate_grapples();
        }
        Ok(report)
    }

    pub fn heal(&mut self, id: ActorId, amount: i32) -> Result<i32, ActionError> {
        let Encounter { roster, narration, .. } = &mut *self;
        let actor = roster.get_mut(id).ok_or(ActionError::UnknownActor(id))?;
        Ok(life::heal(actor, amount, |m| narration.push(m)))
    }

    /// Begin concentrating; returns the effect that was dropped to make room, if any.
    pub fn start_concentration(
        &mut self,
        id: ActorId,
        effect: impl Into<String>,
    ) -> Result<Option<String>, ActionError> {
        let effect = effect.into();
        let actor = self.roster.get_mut(id).ok_or(ActionError::UnknownActor(id))?;
        if !actor.is_alive() {
            return Err(ActionError::NotAlive(id));
        }
        if actor.is_incapacitated() {
            return Err(ActionError::Incapacitated(id));
        }
        let previous = actor.concentration.replace(effect.clone());
        let line = format!("[CONC][{}] begins concentrating on {}", actor.name, effect);
        self.narration.push(line);
        Ok(previous)
    }

    pub fn living(&self) -> Vec<ActorId> {
        self.roster
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| a.id)
            .collect()
    }

    pub fn living_teams(&self) -> BTreeSet<String> {
        self.roster
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| a.team.clone())
            .collect()
    }

    /// Over once living actors belong to at most one team.
    pub fn is_over(&self) -> bool {
        self.living_teams().len() <= 1
    }

    pub fn winner(&self) -> Option<String> {
        let teams = self.living_teams();
        if teams.len() == 1 {
            teams.into_iter().next()
        } else {
            None
        }
    }

    pub(crate) fn condition_snapshot(&self) -> Vec<(ActorId, ConditionSet)> {
        self.roster.iter().map(|a| (a.id, a.conditions())).collect()
    }
}
