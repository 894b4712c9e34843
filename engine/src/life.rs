use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::{check, Ability, AdMode, CheckInput, Dice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub hp: i32,
    pub max_hp: i32,
}

impl Health {
    pub fn new(max_hp: i32) -> Self {
        let max_hp = max_hp.max(0);
        Self { hp: max_hp, max_hp }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// What one application of damage did to a creature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageReport {
    pub before: i32,
    pub after: i32,
    pub dealt: i32,
    pub killed: bool,
    pub concentration_broken: Option<String>,
}

/// Apply damage and handle the drop to 0. Health never goes negative.
///
/// A concentrating survivor makes a CON save against `max(dc_floor, damage / 2)`.
pub fn apply_damage(
    actor: &mut Actor,
    dmg: i32,
    dc_floor: i32,
    dice: &mut Dice,
    mut log: impl FnMut(String),
) -> DamageReport {
    let before = actor.health.hp;
    if !actor.is_alive() {
        return DamageReport { before, after: before, dealt: 0, killed: false, concentration_broken: None };
    }

    let dmg = dmg.max(0);
    actor.health.hp = (actor.health.hp - dmg).max(0);
    log(format!(
        "[HP][{}] {} → {} (−{})",
        actor.name, before, actor.health.hp, dmg
    ));

    let mut report = DamageReport {
        before,
        after: actor.health.hp,
        dealt: before - actor.health.hp,
        killed: false,
        concentration_broken: None,
    };

    if actor.health.hp == 0 {
        report.killed = true;
        report.concentration_broken = actor.concentration.take();
        log(format!("[STATE][{}] drops to 0 HP and dies", actor.name));
        return report;
    }

    if dmg > 0 && actor.concentration.is_some() {
        let dc = dc_floor.max(dmg / 2);
        let res = check(
            dice,
            CheckInput { dc, modifier: actor.save_mod(Ability::Con), mode: AdMode::Normal },
        );
        log(format!(
            "[SAVE][{}] concentration CON save DC {}: roll={} total={} → {}",
            actor.name,
            dc,
            res.roll,
            res.total,
            if res.passed { "HELD" } else { "BROKEN" }
        ));
        if !res.passed {
            report.concentration_broken = actor.concentration.take();
        }
    }
    report
}

/// Healing for living creatures, capped at max HP. Returns HP actually restored.
pub fn heal(actor: &mut Actor, amount: i32, mut log: impl FnMut(String)) -> i32 {
    if amount <= 0 || !actor.is_alive() {
        return 0;
    }
    let before = actor.health.hp;
    actor.health.hp = (actor.health.hp + amount).min(actor.health.max_hp);
    log(format!(
        "[HEAL][{}] +{} HP ({} → {})",
        actor.name, amount, before, actor.health.hp
    ));
    actor.health.hp - before
}
