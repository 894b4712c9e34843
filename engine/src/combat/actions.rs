use crate::actor::ActorId;
use crate::combat::attack::{attack, damage, describe_attack, AttackResult};
use crate::conditions::{attack_vantage, AttackStyle, Condition, VantageSources};
use crate::encounter::Encounter;
use crate::error::ActionError;
use crate::grapple::{CrushOutcome, EscapeOutcome, GrappleEdge, GrappleOutcome};
use crate::life::DamageReport;

/// Everything the decision layer can ask an actor to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Weapon (or unarmed) attack.
    Attack { target: ActorId },
    Grapple { target: ActorId },
    /// Break free of the first creature holding the actor.
    Escape,
    /// Squeeze the first creature the actor holds.
    Crush,
    Release { target: ActorId },
    Dodge,
    /// Anything else; the engine only spends the slot and narrates it.
    Other { name: String },
}

impl Action {
    pub fn target(&self) -> Option<ActorId> {
        match self {
            Action::Attack { target } | Action::Grapple { target } | Action::Release { target } => Some(*target),
            Action::Escape | Action::Crush | Action::Dodge | Action::Other { .. } => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Action::Attack { .. } => "attack",
            Action::Grapple { .. } => "grapple",
            Action::Escape => "escape",
            Action::Crush => "crush",
            Action::Release { .. } => "release",
            Action::Dodge => "dodge",
            Action::Other { name } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionSlot {
    Action,
    BonusAction,
    Reaction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub attack: AttackResult,
    pub vantage: VantageSources,
    pub damage: Option<DamageReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Attack(AttackOutcome),
    Grapple(GrappleOutcome),
    Escape(EscapeOutcome),
    Crush(CrushOutcome),
    Release(Option<GrappleEdge>),
    Dodge,
    Other,
    /// The attempt was invalid; the slot is still spent.
    Refused(ActionError),
}

impl Resolution {
    pub fn success(&self) -> bool {
        match self {
            Resolution::Attack(o) => o.attack.hit,
            Resolution::Grapple(o) => o.success,
            Resolution::Escape(o) => o.escaped,
            Resolution::Crush(_) => true,
            Resolution::Release(edge) => edge.is_some(),
            Resolution::Dodge | Resolution::Other => true,
            Resolution::Refused(_) => false,
        }
    }

    pub fn damage_dealt(&self) -> i32 {
        match self {
            Resolution::Attack(o) => o.damage.as_ref().map_or(0, |d| d.dealt),
            Resolution::Grapple(o) => o.damage.as_ref().map_or(0, |d| d.dealt),
            Resolution::Crush(o) => o.damage.dealt,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionChange {
    pub actor: ActorId,
    pub condition: Condition,
    pub active: bool,
}

/// Structured result handed back to the caller for narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub actor: ActorId,
    pub action: Action,
    pub slot: ActionSlot,
    pub success: bool,
    pub damage_dealt: i32,
    pub resolution: Resolution,
    pub changes: Vec<ConditionChange>,
    pub edges_created: Vec<GrappleEdge>,
    pub edges_ended: Vec<GrappleEdge>,
}

impl Encounter {
    pub fn weapon_attack(&mut self, attacker: ActorId, target: ActorId) -> Result<AttackOutcome, ActionError> {
        if attacker == target {
            return Err(ActionError::SelfTarget(attacker));
        }
        let a = self.require(attacker)?;
        let t = self.require(target)?;
        if !a.is_alive() {
            return Err(ActionError::NotAlive(attacker));
        }
        if !t.is_alive() {
            return Err(ActionError::NotAlive(target));
        }
        if a.is_incapacitated() {
            return Err(ActionError::Incapacitated(attacker));
        }
        let distance = a.distance_to(t);
        if distance > a.weapon.reach {
            return Err(ActionError::OutOfRange { distance, reach: a.weapon.reach });
        }

        let style = if a.weapon.ranged { AttackStyle::Ranged } else { AttackStyle::Melee };
        let vantage = attack_vantage(
            a.registry(),
            t.registry(),
            self.ledger.is_held_by(attacker, target),
            style,
        );
        let bonus = a.weapon_attack_bonus();
        let ac = t.ac;
        let weapon = a.weapon.clone();
        let damage_mod = a.weapon_damage_mod();
        let a_name = a.name.clone();

        let atk = attack(&mut self.dice, vantage.mode(), bonus, ac);
        self.narration.push(format!(
            "[ATTACK][{}] {} {} [{}]",
            a_name,
            weapon.name,
            describe_attack(&atk),
            vantage.describe()
        ));

        let mut outcome = AttackOutcome { attack: atk, vantage, damage: None };
        if !outcome.attack.hit {
            return Ok(outcome);
        }
        let crit = outcome.attack.is_crit;
        let dmg = damage(&mut self.dice, weapon.dice, damage_mod, crit);
        self.narration.push(format!(
            "[DMG][{}] {}{} {:+} = {} [{:?}]",
            a_name,
            if crit { "crit: 2×" } else { "" },
            weapon.dice,
            damage_mod,
            dmg,
            weapon.damage_type
        ));
        outcome.damage = Some(self.deal_damage(target, dmg, weapon.damage_type)?);
        Ok(outcome)
    }

    pub fn dodge(&mut self, actor: ActorId) -> Result<(), ActionError> {
        self.can_act(actor)?;
        self.set_condition(actor, Condition::Dodging, true)?;
        Ok(())
    }

    /// Dispatch one action with no turn bookkeeping. Invalid attempts come back as
    /// [`Resolution::Refused`].
    pub(crate) fn resolve(&mut self, actor: ActorId, action: &Action) -> Resolution {
        let result = self.can_act(actor).and_then(|()| match action {
            Action::Attack { target } => self.weapon_attack(actor, *target).map(Resolution::Attack),
            Action::Grapple { target } => self.grapple(actor, *target).map(Resolution::Grapple),
            Action::Escape => self.attempt_escape(actor).map(Resolution::Escape),
            Action::Crush => self.crush(actor).map(Resolution::Crush),
            Action::Release { target } => Ok(Resolution::Release(self.release(actor, *target))),
            Action::Dodge => self.dodge(actor).map(|_| Resolution::Dodge),
            Action::Other { name } => {
                let line = format!("[ACTION][{}] uses {}", self.name_of(actor), name);
                self.narration.push(line);
                Ok(Resolution::Other)
            }
        });
        result.unwrap_or_else(|err| {
            let line = format!(
                "[ACTION][{}] {} fails: {}",
                self.name_of(actor),
                action.label(),
                err
            );
            self.narration.push(line);
            Resolution::Refused(err)
        })
    }
}
