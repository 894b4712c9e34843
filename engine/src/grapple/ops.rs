use crate::actor::ActorId;
use crate::checks::{escape_check, saving_throw, EscapeRoll};
use crate::combat::attack::{attack, damage, describe_attack, AttackResult};
use crate::conditions::{attack_vantage, AttackStyle, Condition};
use crate::encounter::Encounter;
use crate::error::ActionError;
use crate::grapple::ledger::{bind, unbind, GrappleEdge};
use crate::grapple::{GrappleMethod, GrappleProfile};
use crate::life::DamageReport;
use crate::{Ability, CheckResult, DamageDice, DamageType};

/// Parameters of one grapple attempt, normally taken from the grappler's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrappleAttempt {
    pub escape_dc: i32,
    pub damage: DamageDice,
    pub damage_type: DamageType,
    pub range: i32,
    pub method: GrappleMethod,
    pub restrains: bool,
    pub save_ability: Ability,
}

impl GrappleAttempt {
    pub fn from_profile(profile: &GrappleProfile, escape_dc: i32) -> Self {
        Self {
            escape_dc,
            damage: profile.damage,
            damage_type: profile.damage_type,
            range: profile.reach,
            method: profile.method,
            restrains: profile.restrains,
            save_ability: profile.save_ability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrappleOutcome {
    pub success: bool,
    pub attack: Option<AttackResult>,
    pub save: Option<CheckResult>,
    pub damage: Option<DamageReport>,
    pub edge: Option<GrappleEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeOutcome {
    pub grappler: ActorId,
    pub escaped: bool,
    /// Freed without a roll because the hold was already orphaned.
    pub automatic: bool,
    pub roll: Option<EscapeRoll>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrushOutcome {
    pub target: ActorId,
    pub damage: DamageReport,
    pub still_held: bool,
}

impl Encounter {
    /// Grapple parameters for `grappler` under the encounter's rules.
    pub fn grapple_attempt_for(&self, grappler: ActorId) -> Result<GrappleAttempt, ActionError> {
        let actor = self.require(grappler)?;
        let profile = self.rules.grapple_profile(actor);
        Ok(GrappleAttempt::from_profile(profile, self.rules.escape_dc(actor)))
    }

    /// Grapple with the grappler's own profile.
    pub fn grapple(&mut self, grappler: ActorId, target: ActorId) -> Result<GrappleOutcome, ActionError> {
        let attempt = self.grapple_attempt_for(grappler)?;
        self.attempt_grapple(grappler, target, &attempt)
    }

    fn grapple_precheck(&self, grappler: ActorId, target: ActorId, range: i32) -> Result<(), ActionError> {
        if grappler == target {
            return Err(ActionError::SelfTarget(grappler));
        }
        let g = self.require(grappler)?;
        let t = self.require(target)?;
        if !g.is_alive() {
            return Err(ActionError::NotAlive(grappler));
        }
        if !t.is_alive() {
            return Err(ActionError::NotAlive(target));
        }
        if g.is_incapacitated() {
            return Err(ActionError::Incapacitated(grappler));
        }
        let distance = g.distance_to(t);
        if distance > range {
            return Err(ActionError::OutOfRange { distance, reach: range });
        }
        if !g.size.can_grapple(t.size) {
            return Err(ActionError::SizeMismatch { grappler: g.size, target: t.size });
        }
        if self.ledger.edge(grappler, target).is_some() {
            return Err(ActionError::AlreadyGrappling { grappler, target });
        }
        let capacity = self.rules.grapple_profile(g).capacity;
        let holding = self.ledger.holding(grappler);
        if holding >= capacity {
            return Err(ActionError::AtCapacity { holding, capacity });
        }
        Ok(())
    }

    /// Try to seize `target`. Validation failures change nothing; a hit (or failed save)
    /// deals damage first and binds only if the target survives it.
    pub fn attempt_grapple(
        &mut self,
        grappler: ActorId,
        target: ActorId,
        attempt: &GrappleAttempt,
    ) -> Result<GrappleOutcome, ActionError> {
        let g_name = self.name_of(grappler);
        let t_name = self.name_of(target);
        if let Err(err) = self.grapple_precheck(grappler, target, attempt.range) {
            self.narration
                .push(format!("[GRAPPLE][{}] cannot grapple {}: {}", g_name, t_name, err));
            return Err(err);
        }
        self.narration
            .push(format!("[GRAPPLE][{}] attempts to grapple {}", g_name, t_name));

        let mut outcome = GrappleOutcome { success: false, attack: None, save: None, damage: None, edge: None };
        let Encounter { roster, ledger, dice, narration, .. } = &mut *self;
        let (g, t) = match (roster.get(grappler), roster.get(target)) {
            (Some(g), Some(t)) => (g, t),
            _ => return Err(ActionError::UnknownActor(target)),
        };
        let str_mod = g.ability_mod(Ability::Str);

        let (caught, crit) = match attempt.method {
            GrappleMethod::Attack => {
                let held_by_target = ledger.is_held_by(grappler, target);
                let sources = attack_vantage(g.registry(), t.registry(), held_by_target, AttackStyle::Melee);
                let atk = attack(dice, sources.mode(), str_mod + g.proficiency_bonus(), t.ac);
                narration.push(format!(
                    "[ATTACK][{}] grapple {} [{}]",
                    g_name,
                    describe_attack(&atk),
                    sources.describe()
                ));
                let result = (atk.hit, atk.is_crit);
                outcome.attack = Some(atk);
                result
            }
            GrappleMethod::Save => {
                let res = saving_throw(dice, t, attempt.save_ability, attempt.escape_dc);
                narration.push(format!(
                    "[SAVE][{}] {:?} save DC {} vs grapple: roll={} total={} → {}",
                    t_name,
                    attempt.save_ability,
                    attempt.escape_dc,
                    res.roll,
                    res.total,
                    if res.passed { "RESISTED" } else { "FAILED" }
                ));
                outcome.save = Some(res);
                (!res.passed, false)
            }
        };

        if !caught {
            tracing::debug!(grappler = grappler.0, target = target.0, "grapple attempt failed");
            return Ok(outcome);
        }

        let dmg = damage(dice, attempt.damage, str_mod, crit);
        narration.push(format!(
            "[DMG][{}] {}{} {:+} = {} [{:?}]",
            g_name,
            if crit { "crit: 2×" } else { "" },
            attempt.damage,
            str_mod,
            dmg,
            attempt.damage_type
        ));
        let report = self.deal_damage(target, dmg, attempt.damage_type)?;
        outcome.damage = Some(report);

        if !self.roster.get(target).is_some_and(|t| t.is_alive()) {
            self.narration
                .push(format!("[GRAPPLE][{}] {} does not survive the grab", g_name, t_name));
            return Ok(outcome);
        }

        let edge = GrappleEdge {
            grappler,
            target,
            escape_dc: attempt.escape_dc,
            range: attempt.range,
            restrains: attempt.restrains,
        };
        let Encounter { roster, ledger, narration, .. } = &mut *self;
        if bind(ledger, roster, edge, |m| narration.push(m)) {
            outcome.success = true;
            outcome.edge = Some(edge);
        }
        Ok(outcome)
    }

    /// Escape the first hold on `target`.
    pub fn attempt_escape(&mut self, target: ActorId) -> Result<EscapeOutcome, ActionError> {
        let grappler = self
            .ledger
            .incoming(target)
            .next()
            .map(|e| e.grappler)
            .ok_or(ActionError::NotGrappled(target))?;
        self.attempt_escape_from(target, grappler)
    }

    pub fn attempt_escape_from(
        &mut self,
        target: ActorId,
        grappler: ActorId,
    ) -> Result<EscapeOutcome, ActionError> {
        let t = self.require(target)?;
        if !t.is_alive() {
            return Err(ActionError::NotAlive(target));
        }
        if t.is_incapacitated() {
            return Err(ActionError::Incapacitated(target));
        }
        let edge = match self.ledger.edge(grappler, target) {
            Some(edge) if t.has(Condition::Grappled) => *edge,
            _ => return Err(ActionError::NotGrappled(target)),
        };
        let t_name = t.name.clone();
        let g_name = self.name_of(grappler);

        let orphaned = match self.roster.get(grappler) {
            None => Some("is gone"),
            Some(g) if !g.is_alive() => Some("is dead"),
            Some(g) if !g.has(Condition::Grappling) => Some("is no longer grappling"),
            _ => None,
        };

        let Encounter { roster, ledger, dice, narration, .. } = &mut *self;
        if let Some(why) = orphaned {
            narration.push(format!(
                "[ESCAPE][{}] {} {}; automatically freed",
                t_name, g_name, why
            ));
            unbind(ledger, roster, grappler, target, |m| narration.push(m));
            return Ok(EscapeOutcome { grappler, escaped: true, automatic: true, roll: None });
        }

        let Some(t) = roster.get(target) else {
            return Err(ActionError::UnknownActor(target));
        };
        let roll = escape_check(dice, t, edge.escape_dc);
        narration.push(format!(
            "[ESCAPE][{}] {:?} d20={} {:+} = {} vs DC {} → {}",
            t_name,
            roll.skill,
            roll.roll,
            roll.modifier,
            roll.total,
            roll.dc,
            if roll.passed { "BREAKS FREE" } else { "STILL HELD" }
        ));
        if roll.passed {
            unbind(ledger, roster, grappler, target, |m| narration.push(m));
        }
        Ok(EscapeOutcome { grappler, escaped: roll.passed, automatic: false, roll: Some(roll) })
    }

    /// Squeeze the first creature `grappler` holds. Guaranteed damage, no roll to hit;
    /// the hold persists.
    pub fn crush(&mut self, grappler: ActorId) -> Result<CrushOutcome, ActionError> {
        let target = self
            .ledger
            .outgoing(grappler)
            .next()
            .map(|e| e.target)
            .ok_or(ActionError::NotGrappling(grappler))?;
        self.crush_target(grappler, target)
    }

    pub fn crush_target(&mut self, grappler: ActorId, target: ActorId) -> Result<CrushOutcome, ActionError> {
        let (g_name, dd, dtype, str_mod) = {
            let g = self.require(grappler)?;
            if !g.is_alive() {
                return Err(ActionError::NotAlive(grappler));
            }
            if g.is_incapacitated() {
                return Err(ActionError::Incapacitated(grappler));
            }
            let profile = self.rules.grapple_profile(g);
            (
                g.name.clone(),
                profile.crush.unwrap_or(profile.damage),
                profile.damage_type,
                g.ability_mod(Ability::Str),
            )
        };
        if self.ledger.edge(grappler, target).is_none() {
            return Err(ActionError::NotGrappling(grappler));
        }
        if !self.roster.get(target).is_some_and(|t| t.is_alive()) {
            self.validate_grapples();
            return Err(ActionError::NotAlive(target));
        }
        let t_name = self.name_of(target);

        let dmg = damage(&mut self.dice, dd, str_mod, false);
        self.narration.push(format!(
            "[CRUSH][{}] crushes {}: {} {:+} = {} [{:?}] (guaranteed)",
            g_name, t_name, dd, str_mod, dmg, dtype
        ));
        let report = self.deal_damage(target, dmg, dtype)?;
        let still_held = self.ledger.edge(grappler, target).is_some();
        if still_held {
            self.narration
                .push(format!("[CRUSH][{}] remains grappled", t_name));
        }
        Ok(CrushOutcome { target, damage: report, still_held })
    }

    /// Unconditional teardown: voluntary release, or a spell that frees the target.
    pub fn release(&mut self, grappler: ActorId, target: ActorId) -> Option<GrappleEdge> {
        let g_name = self.name_of(grappler);
        let t_name = self.name_of(target);
        let Encounter { roster, ledger, narration, .. } = &mut *self;
        if ledger.edge(grappler, target).is_none() {
            return None;
        }
        narration.push(format!("[GRAPPLE][{}] releases {}", g_name, t_name));
        unbind(ledger, roster, grappler, target, |m| narration.push(m))
    }
}
