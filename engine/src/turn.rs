use std::cmp::Reverse;

use crate::actor::ActorId;
use crate::combat::actions::{Action, ActionOutcome, ActionSlot, ConditionChange};
use crate::conditions::Condition;
use crate::encounter::Encounter;
use crate::error::ActionError;
use crate::grapple::{GrappleEdge, ValidationReport};
use crate::{Ability, AdMode};

/// What an actor still has available this turn. The reaction survives until the start
/// of the owner's next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnBudget {
    pub action_used: bool,
    pub bonus_used: bool,
    pub reaction_used: bool,
    pub movement_left: i32,
}

impl TurnBudget {
    pub fn fresh(speed: i32) -> Self {
        Self { action_used: false, bonus_used: false, reaction_used: false, movement_left: speed }
    }

    pub fn is_used(&self, slot: ActionSlot) -> bool {
        match slot {
            ActionSlot::Action => self.action_used,
            ActionSlot::BonusAction => self.bonus_used,
            ActionSlot::Reaction => self.reaction_used,
        }
    }

    fn spend(&mut self, slot: ActionSlot) {
        match slot {
            ActionSlot::Action => self.action_used = true,
            ActionSlot::BonusAction => self.bonus_used = true,
            ActionSlot::Reaction => self.reaction_used = true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Walk to an absolute position.
    To(i32),
    /// Close to within five feet of another actor.
    Toward(ActorId),
}

/// One actor's intentions for its turn, produced by a [`Decider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnPlan {
    pub movement: Option<Movement>,
    pub bonus_action: Option<Action>,
    pub action: Option<Action>,
}

impl TurnPlan {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn act(action: Action) -> Self {
        Self { action: Some(action), ..Self::default() }
    }

    pub fn moving(mut self, movement: Movement) -> Self {
        self.movement = Some(movement);
        self
    }
}

/// The decision layer. The engine validates whatever comes back, so a decider can be
/// as naive as it likes.
pub trait Decider {
    fn plan(&mut self, actor: ActorId, encounter: &Encounter) -> TurnPlan;
}

impl<F> Decider for F
where
    F: FnMut(ActorId, &Encounter) -> TurnPlan,
{
    fn plan(&mut self, actor: ActorId, encounter: &Encounter) -> TurnPlan {
        self(actor, encounter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub from: i32,
    pub to: i32,
    pub spent: i32,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub actor: ActorId,
    pub round: u32,
    /// Set when the actor could not act at all.
    pub skipped: Option<ActionError>,
    pub start: ValidationReport,
    pub movement: Option<Result<MoveReport, ActionError>>,
    pub outcomes: Vec<ActionOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: u32,
    pub winner: Option<String>,
}

impl Encounter {
    pub fn initiative_order(&self) -> &[(ActorId, i32)] {
        &self.order
    }

    pub fn budget(&self, id: ActorId) -> Option<&TurnBudget> {
        self.budgets.get(&id)
    }

    /// d20 + DEX + initiative bonus for every actor, highest first. Ties keep roster
    /// order.
    pub fn roll_initiative(&mut self) -> &[(ActorId, i32)] {
        let mut order = Vec::with_capacity(self.roster.len());
        for id in self.roster.ids() {
            let Some(actor) = self.roster.get(id) else {
                continue;
            };
            let bonus = actor.ability_mod(Ability::Dex) + actor.initiative_bonus;
            let name = actor.name.clone();
            let roll = self.dice.d20(AdMode::Normal) as i32;
            self.narration
                .push(format!("[INIT][{}] d20={} {:+} = {}", name, roll, bonus, roll + bonus));
            order.push((id, roll + bonus));
        }
        order.sort_by_key(|&(_, score)| Reverse(score));
        tracing::debug!(?order, "initiative rolled");
        self.order = order;
        &self.order
    }

    /// Start-of-turn bookkeeping: fresh budget, Dodging lapses, grapples reconciled.
    pub fn begin_turn(&mut self, id: ActorId) -> Result<ValidationReport, ActionError> {
        let speed = self.require(id)?.unrestricted_speed();
        self.budgets.insert(id, TurnBudget::fresh(speed));
        if self.require(id)?.has(Condition::Dodging) {
            self.set_condition(id, Condition::Dodging, false)?;
        }
        Ok(self.validate_grapples())
    }

    /// Voluntary movement toward `to`, cut short when the movement budget runs out.
    pub fn move_actor(&mut self, id: ActorId, to: i32) -> Result<MoveReport, ActionError> {
        let actor = self.require(id)?;
        if !actor.is_alive() {
            return Err(ActionError::NotAlive(id));
        }
        if actor.is_incapacitated() {
            return Err(ActionError::Incapacitated(id));
        }
        if actor.effective_speed() == 0 {
            return Err(ActionError::Immobilized(id));
        }
        let from = actor.position;
        let name = actor.name.clone();
        let speed = actor.effective_speed();

        let budget = self.budgets.entry(id).or_insert_with(|| TurnBudget::fresh(speed));
        let allowed = budget.movement_left.min(speed);
        let spent = (to - from).abs().min(allowed);
        budget.movement_left -= spent;
        let dest = from + (to - from).signum() * spent;

        if let Some(actor) = self.roster.get_mut(id) {
            actor.position = dest;
        }
        self.narration
            .push(format!("[MOVE][{}] {}ft → {}ft ({}ft used)", name, from, dest, spent));
        let validation = self.validate_grapples();
        Ok(MoveReport { from, to: dest, spent, validation })
    }

    fn movement_target(&self, id: ActorId, movement: Movement) -> Result<i32, ActionError> {
        match movement {
            Movement::To(pos) => Ok(pos),
            Movement::Toward(other) => {
                let here = self.require(id)?.position;
                let there = self.require(other)?.position;
                if (there - here).abs() <= 5 {
                    Ok(here)
                } else {
                    Ok(there - 5 * (there - here).signum())
                }
            }
        }
    }

    /// Spend `slot` on `action`. Refused actions still spend the slot; only a slot that
    /// is already spent (or an unknown actor) is an `Err`. Dead and incapacitated actors
    /// are refused before anything resolves.
    pub fn perform(
        &mut self,
        actor: ActorId,
        action: Action,
        slot: ActionSlot,
    ) -> Result<ActionOutcome, ActionError> {
        let speed = self.require(actor)?.unrestricted_speed();
        let budget = *self.budgets.entry(actor).or_insert_with(|| TurnBudget::fresh(speed));
        if budget.is_used(slot) {
            return Err(ActionError::AlreadyUsed { actor, slot });
        }

        let conditions_before = self.condition_snapshot();
        let edges_before: Vec<GrappleEdge> = self.ledger.edges().to_vec();

        let resolution = self.resolve(actor, &action);
        if let Some(b) = self.budgets.get_mut(&actor) {
            b.spend(slot);
        }

        let mut changes = Vec::new();
        for (id, after) in self.condition_snapshot() {
            let before = conditions_before
                .iter()
                .find(|(b, _)| *b == id)
                .map(|(_, set)| *set)
                .unwrap_or_default();
            for condition in after.difference(before).conditions() {
                changes.push(ConditionChange { actor: id, condition, active: true });
            }
            for condition in before.difference(after).conditions() {
                changes.push(ConditionChange { actor: id, condition, active: false });
            }
        }
        let same = |a: &GrappleEdge, b: &GrappleEdge| a.grappler == b.grappler && a.target == b.target;
        let edges_after = self.ledger.edges();
        let edges_created = edges_after
            .iter()
            .filter(|e| !edges_before.iter().any(|b| same(b, e)))
            .copied()
            .collect();
        let edges_ended = edges_before
            .iter()
            .filter(|b| !edges_after.iter().any(|e| same(b, e)))
            .copied()
            .collect();

        tracing::debug!(
            actor = actor.0,
            action = action.label(),
            ?slot,
            success = resolution.success(),
            "action resolved"
        );
        Ok(ActionOutcome {
            actor,
            success: resolution.success(),
            damage_dealt: resolution.damage_dealt(),
            action,
            slot,
            resolution,
            changes,
            edges_created,
            edges_ended,
        })
    }

    /// Out-of-turn response; one per round.
    pub fn take_reaction(&mut self, actor: ActorId, action: Action) -> Result<ActionOutcome, ActionError> {
        self.perform(actor, action, ActionSlot::Reaction)
    }

    pub fn run_turn(&mut self, id: ActorId, decider: &mut impl Decider) -> Result<TurnReport, ActionError> {
        let start = self.begin_turn(id)?;
        let mut report = TurnReport {
            actor: id,
            round: self.round,
            skipped: None,
            start,
            movement: None,
            outcomes: Vec::new(),
        };

        let name = self.require(id)?.name.clone();
        if let Err(reason) = self.can_act(id) {
            self.narration.push(format!("[TURN][{}] skipped: {}", name, reason));
            report.skipped = Some(reason);
            return Ok(report);
        }
        self.narration.push(format!("[TURN][{}] round {}", name, self.round));

        let plan = decider.plan(id, self);
        if let Some(movement) = plan.movement {
            let moved = self
                .movement_target(id, movement)
                .and_then(|to| self.move_actor(id, to));
            if let Err(err) = &moved {
                let line = format!("[MOVE][{}] cannot move: {}", self.name_of(id), err);
                self.narration.push(line);
            }
            report.movement = Some(moved);
        }
        if let Some(bonus) = plan.bonus_action {
            report.outcomes.push(self.perform(id, bonus, ActionSlot::BonusAction)?);
        }
        if let Some(action) = plan.action {
            report.outcomes.push(self.perform(id, action, ActionSlot::Action)?);
        }
        Ok(report)
    }

    /// One full round in initiative order. Rolls initiative first if nobody has.
    pub fn run_round(&mut self, decider: &mut impl Decider) -> Vec<TurnReport> {
        if self.order.is_empty() {
            self.roll_initiative();
        }
        self.round += 1;
        self.narration.push(format!("[ROUND] {}", self.round));

        let order: Vec<ActorId> = self.order.iter().map(|(id, _)| *id).collect();
        let mut reports = Vec::with_capacity(order.len());
        for id in order {
            if self.is_over() {
                break;
            }
            if !self.roster.contains(id) {
                continue;
            }
            match self.run_turn(id, decider) {
                Ok(report) => reports.push(report),
                Err(err) => tracing::warn!(actor = id.0, %err, "turn aborted"),
            }
        }
        reports
    }

    /// Fight until one team is left or `max_rounds` pass.
    pub fn run(&mut self, decider: &mut impl Decider, max_rounds: u32) -> RunSummary {
        while !self.is_over() && self.round < max_rounds {
            self.run_round(decider);
        }
        let winner = self.winner();
        self.narration.push(format!(
            "[END] rounds={} winner={}",
            self.round,
            winner.as_deref().unwrap_or("none")
        ));
        tracing::info!(rounds = self.round, winner = ?winner, "encounter finished");
        RunSummary { rounds: self.round, winner }
    }
}
