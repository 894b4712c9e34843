use crate::actor::Actor;
use crate::conditions::Condition;
use crate::{check, Ability, AdMode, CheckInput, CheckResult, Dice, Skill};

/// Choose the better of Athletics and Acrobatics; ties go to Athletics.
pub fn best_escape_skill(actor: &Actor) -> (Skill, i32) {
    let athletics = actor.skill_mod(Skill::Athletics);
    let acrobatics = actor.skill_mod(Skill::Acrobatics);
    if acrobatics > athletics {
        (Skill::Acrobatics, acrobatics)
    } else {
        (Skill::Athletics, athletics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeRoll {
    pub skill: Skill,
    pub modifier: i32,
    pub roll: i32,
    pub total: i32,
    pub dc: i32,
    pub passed: bool,
}

/// One straight d20 with the better escape skill; meeting the DC is enough.
pub fn escape_check(dice: &mut Dice, actor: &Actor, dc: i32) -> EscapeRoll {
    let (skill, modifier) = best_escape_skill(actor);
    let CheckResult { roll, total, passed, .. } =
        check(dice, CheckInput { dc, modifier, mode: AdMode::Normal });
    EscapeRoll { skill, modifier, roll, total, dc, passed }
}

/// Saving throw with proficiency; Restrained creatures roll DEX saves at disadvantage.
pub fn saving_throw(dice: &mut Dice, actor: &Actor, ability: Ability, dc: i32) -> CheckResult {
    let mode = if ability == Ability::Dex && actor.has(Condition::Restrained) {
        AdMode::Disadvantage
    } else {
        AdMode::Normal
    };
    check(dice, CheckInput { dc, modifier: actor.save_mod(ability), mode })
}

pub fn skill_check(dice: &mut Dice, actor: &Actor, skill: Skill, mode: AdMode, dc: i32) -> CheckResult {
    check(dice, CheckInput { dc, modifier: actor.skill_mod(skill), mode })
}
