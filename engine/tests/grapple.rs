use combat_engine::grapple::ReleaseReason;
use combat_engine::{
    Ability, ActionError, ActorId, ActorSpec, Condition, DamageDice, DamageType, Dice, Encounter,
    GrappleMethod, GrappleProfile, Size, Skill,
};

fn profile(reach: i32, capacity: usize, escape_dc: i32) -> GrappleProfile {
    GrappleProfile {
        method: GrappleMethod::Attack,
        damage: DamageDice::new(1, 4),
        damage_type: DamageType::Bludgeoning,
        reach,
        restrains: false,
        capacity,
        escape_dc: Some(escape_dc),
        crush: None,
        save_ability: Ability::Str,
    }
}

fn grappler(name: &str, position: i32, grapple: GrappleProfile) -> ActorSpec {
    let mut spec = ActorSpec::named(name);
    spec.hp = 20;
    spec.abilities.str_ = 14;
    spec.position = position;
    spec.team = "monsters".into();
    spec.grapple = Some(grapple);
    spec
}

fn target(name: &str, position: i32) -> ActorSpec {
    let mut spec = ActorSpec::named(name);
    spec.hp = 20;
    spec.position = position;
    spec.team = "party".into();
    spec
}

/// G (reach 10, escape DC 13) at 0 grabs T at 8. Rolls: attack 15, damage 3.
fn grappled_pair(extra: &[u32]) -> (Encounter, ActorId, ActorId) {
    let mut rolls = vec![15, 3];
    rolls.extend_from_slice(extra);
    let mut enc = Encounter::new(Dice::from_scripted(rolls));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    let t = enc.add_actor(target("T", 8));
    let outcome = enc.grapple(g, t).unwrap();
    assert!(outcome.success);
    (enc, g, t)
}

#[test]
fn successful_grapple_binds_both_sides() {
    let (enc, g, t) = grappled_pair(&[]);

    assert_eq!(enc.ledger().len(), 1);
    let edge = enc.ledger().edge(g, t).unwrap();
    assert_eq!(edge.escape_dc, 13);
    assert_eq!(edge.range, 10);

    let tgt = enc.actor(t).unwrap();
    assert!(tgt.has(Condition::Grappled));
    assert!(!tgt.has(Condition::Restrained));
    assert_eq!(tgt.effective_speed(), 0);
    assert_eq!(tgt.unrestricted_speed(), 30);
    // 1d4 rolled 3, +2 STR
    assert_eq!(tgt.health.hp, 15);

    assert!(enc.actor(g).unwrap().has(Condition::Grappling));
    assert_eq!(enc.check_invariants(), Ok(()));
}

#[test]
fn forced_displacement_beyond_range_breaks_the_hold() {
    let (mut enc, g, t) = grappled_pair(&[]);

    let report = enc.force_move(g, 33).unwrap();

    assert!(report.released(g, t));
    assert!(matches!(
        report.releases[0].reason,
        ReleaseReason::OutOfRange { distance: 25, range: 10 }
    ));
    assert!(enc.ledger().is_empty());
    let tgt = enc.actor(t).unwrap();
    assert!(!tgt.has(Condition::Grappled));
    assert_eq!(tgt.effective_speed(), 30);
    assert!(!enc.actor(g).unwrap().has(Condition::Grappling));
}

#[test]
fn paralyzed_grappler_lets_go() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15, 3]));
    let mut constrict = profile(10, 1, 13);
    constrict.restrains = true;
    let g = enc.add_actor(grappler("G", 0, constrict));
    let t = enc.add_actor(target("T", 8));
    enc.grapple(g, t).unwrap();
    assert!(enc.actor(t).unwrap().has(Condition::Restrained));

    enc.set_condition(g, Condition::Paralyzed, true).unwrap();

    assert!(enc.ledger().is_empty());
    let tgt = enc.actor(t).unwrap();
    assert!(!tgt.has(Condition::Grappled));
    assert!(!tgt.has(Condition::Restrained));
    assert_eq!(tgt.effective_speed(), 30);
    assert!(!enc.actor(g).unwrap().has(Condition::Grappling));
}

#[test]
fn escape_meeting_the_dc_exactly_succeeds() {
    let (mut enc, g, t) = grappled_pair(&[13]);

    let outcome = enc.attempt_escape(t).unwrap();

    assert!(outcome.escaped);
    assert!(!outcome.automatic);
    assert_eq!(outcome.grappler, g);
    assert_eq!(outcome.roll.unwrap().total, 13);
    assert!(enc.ledger().is_empty());
    assert_eq!(enc.actor(t).unwrap().effective_speed(), 30);
}

#[test]
fn escape_one_below_the_dc_changes_nothing() {
    let (mut enc, g, t) = grappled_pair(&[12]);
    let before = enc.ledger().clone();

    let outcome = enc.attempt_escape(t).unwrap();

    assert!(!outcome.escaped);
    assert_eq!(enc.ledger(), &before);
    assert!(enc.actor(t).unwrap().has(Condition::Grappled));
    assert!(enc.actor(g).unwrap().has(Condition::Grappling));
}

#[test]
fn escape_uses_the_better_of_athletics_and_acrobatics() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15, 3, 10]));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    let mut nimble = target("Nimble", 5);
    nimble.abilities.dex = 16;
    nimble.skill_proficiencies = vec![Skill::Acrobatics];
    let t = enc.add_actor(nimble);
    enc.grapple(g, t).unwrap();

    let outcome = enc.attempt_escape(t).unwrap();
    let roll = outcome.roll.unwrap();
    assert_eq!(roll.skill, Skill::Acrobatics);
    assert_eq!(roll.modifier, 5);
    assert!(outcome.escaped);
}

#[test]
fn grapple_out_of_range_is_refused_without_side_effects() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![20]));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    let t = enc.add_actor(target("T", 15));

    let err = enc.grapple(g, t).unwrap_err();

    assert_eq!(err, ActionError::OutOfRange { distance: 15, reach: 10 });
    assert!(enc.ledger().is_empty());
    assert_eq!(enc.actor(t).unwrap().health.hp, 20);
    assert!(enc.actor(t).unwrap().conditions().is_empty());
    assert!(enc.log().iter().any(|l| l.contains("out of range")));
}

#[test]
fn size_ladder_limits_every_pairing() {
    for gs in Size::LADDER {
        for ts in Size::LADDER {
            let mut enc = Encounter::new(Dice::from_scripted(vec![20, 1]));
            let mut g_spec = grappler("G", 0, profile(5, 1, 12));
            g_spec.size = gs;
            let mut t_spec = target("T", 5);
            t_spec.size = ts;
            let g = enc.add_actor(g_spec);
            let t = enc.add_actor(t_spec);

            let result = enc.grapple(g, t);
            if ts.index() > gs.index() + 1 {
                assert_eq!(
                    result.unwrap_err(),
                    ActionError::SizeMismatch { grappler: gs, target: ts },
                    "{:?} grappling {:?}",
                    gs,
                    ts
                );
                assert!(enc.ledger().is_empty());
                assert_eq!(enc.actor(t).unwrap().health.hp, 20);
                assert!(enc.actor(t).unwrap().conditions().is_empty());
            } else {
                assert!(result.unwrap().success, "{:?} grappling {:?}", gs, ts);
            }
        }
    }
}

#[test]
fn capacity_and_duplicate_grapples_are_refused() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    let t1 = enc.add_actor(target("T1", 5));
    let t2 = enc.add_actor(target("T2", 5));
    enc.grapple(g, t1).unwrap();

    assert_eq!(
        enc.grapple(g, t1).unwrap_err(),
        ActionError::AlreadyGrappling { grappler: g, target: t1 }
    );
    assert_eq!(
        enc.grapple(g, t2).unwrap_err(),
        ActionError::AtCapacity { holding: 1, capacity: 1 }
    );
    assert_eq!(enc.ledger().len(), 1);
    assert!(!enc.actor(t2).unwrap().has(Condition::Grappled));
}

#[test]
fn refusals_report_the_failed_precondition() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    let t = enc.add_actor(target("T", 5));

    assert_eq!(enc.grapple(g, g).unwrap_err(), ActionError::SelfTarget(g));
    assert_eq!(
        enc.grapple(g, ActorId(99)).unwrap_err(),
        ActionError::UnknownActor(ActorId(99))
    );

    enc.set_condition(g, Condition::Stunned, true).unwrap();
    assert_eq!(enc.grapple(g, t).unwrap_err(), ActionError::Incapacitated(g));

    enc.set_condition(g, Condition::Stunned, false).unwrap();
    enc.deal_damage(t, 50, DamageType::Force).unwrap();
    assert_eq!(enc.grapple(g, t).unwrap_err(), ActionError::NotAlive(t));
}

#[test]
fn natural_one_misses_and_rolls_no_damage() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![1, 4]));
    let mut strong = grappler("G", 0, profile(10, 1, 13));
    strong.abilities.str_ = 30;
    let g = enc.add_actor(strong);
    let t = enc.add_actor(target("T", 5));

    let outcome = enc.grapple(g, t).unwrap();

    assert!(!outcome.success);
    assert!(outcome.attack.as_ref().unwrap().nat1);
    assert!(outcome.damage.is_none());
    assert!(enc.ledger().is_empty());
    assert_eq!(enc.actor(t).unwrap().health.hp, 20);
}

#[test]
fn save_method_catches_on_a_failed_save() {
    let mut tendril = profile(50, 4, 15);
    tendril.method = GrappleMethod::Save;

    let mut enc = Encounter::new(Dice::from_scripted(vec![5, 2]));
    let g = enc.add_actor(grappler("Roper", 0, tendril.clone()));
    let t = enc.add_actor(target("T", 40));
    let outcome = enc.grapple(g, t).unwrap();
    assert!(outcome.success);
    assert!(outcome.attack.is_none());
    assert!(!outcome.save.unwrap().passed);
    assert_eq!(enc.ledger().edge(g, t).unwrap().escape_dc, 15);

    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let g = enc.add_actor(grappler("Roper", 0, tendril));
    let t = enc.add_actor(target("T", 40));
    let outcome = enc.grapple(g, t).unwrap();
    assert!(!outcome.success);
    assert!(outcome.save.unwrap().passed);
    assert!(enc.ledger().is_empty());
}

#[test]
fn target_killed_by_the_grab_is_not_bound() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15, 4]));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    let mut frail = target("Frail", 5);
    frail.hp = 3;
    let t = enc.add_actor(frail);

    let outcome = enc.grapple(g, t).unwrap();

    assert!(!outcome.success);
    assert!(outcome.damage.unwrap().killed);
    assert!(outcome.edge.is_none());
    assert!(enc.ledger().is_empty());
    assert!(!enc.actor(g).unwrap().has(Condition::Grappling));
    assert!(!enc.actor(t).unwrap().has(Condition::Grappled));
}

#[test]
fn crush_deals_guaranteed_damage_and_keeps_the_hold() {
    let (mut enc, g, t) = grappled_pair(&[4]);

    let outcome = enc.crush(g).unwrap();

    assert_eq!(outcome.target, t);
    assert_eq!(outcome.damage.dealt, 6);
    assert!(outcome.still_held);
    assert_eq!(enc.actor(t).unwrap().health.hp, 9);
    assert!(enc.ledger().edge(g, t).is_some());
}

#[test]
fn crush_needs_an_outgoing_edge() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    enc.add_actor(target("T", 5));
    assert_eq!(enc.crush(g).unwrap_err(), ActionError::NotGrappling(g));
}

#[test]
fn killing_crush_ends_the_grapple() {
    let (mut enc, g, t) = grappled_pair(&[4]);
    enc.update_actor(t, |actor| actor.health.hp = 2).unwrap();

    let outcome = enc.crush(g).unwrap();

    assert!(outcome.damage.killed);
    assert!(!outcome.still_held);
    assert!(enc.ledger().is_empty());
    assert!(!enc.actor(g).unwrap().has(Condition::Grappling));
}

#[test]
fn two_grapplers_share_one_target() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let mut coils = profile(10, 1, 14);
    coils.restrains = true;
    let snake = enc.add_actor(grappler("Snake", 0, coils));
    let thug = enc.add_actor(grappler("Thug", 10, profile(5, 1, 12)));
    let t = enc.add_actor(target("T", 5));

    enc.grapple(snake, t).unwrap();
    enc.grapple(thug, t).unwrap();
    assert_eq!(enc.ledger().incoming(t).count(), 2);

    assert!(enc.release(snake, t).is_some());
    let tgt = enc.actor(t).unwrap();
    assert!(tgt.has(Condition::Grappled));
    assert!(!tgt.has(Condition::Restrained));
    assert_eq!(tgt.effective_speed(), 0);

    assert!(enc.release(thug, t).is_some());
    let tgt = enc.actor(t).unwrap();
    assert!(!tgt.has(Condition::Grappled));
    assert_eq!(tgt.effective_speed(), 30);
    assert_eq!(enc.check_invariants(), Ok(()));
}

#[test]
fn release_without_an_edge_is_a_no_op() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let g = enc.add_actor(grappler("G", 0, profile(10, 1, 13)));
    let t = enc.add_actor(target("T", 5));
    assert!(enc.release(g, t).is_none());
    assert!(enc.actor(g).unwrap().conditions().is_empty());
}

fn restraining_pair() -> (Encounter, ActorId, ActorId) {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let mut hold = profile(10, 1, 13);
    hold.restrains = true;
    let g = enc.add_actor(grappler("G", 0, hold));
    let t = enc.add_actor(target("T", 5));
    (enc, g, t)
}

#[test]
fn restraint_from_an_effect_outlasts_the_hold() {
    let (mut enc, g, t) = restraining_pair();
    assert_eq!(enc.set_condition(t, Condition::Restrained, true), Ok(true));
    assert!(enc.grapple(g, t).unwrap().success);

    assert!(enc.release(g, t).is_some());

    let tgt = enc.actor(t).unwrap();
    assert!(tgt.has(Condition::Restrained));
    assert!(!tgt.has(Condition::Grappled));
    assert_eq!(tgt.effective_speed(), 0);
    assert_eq!(enc.check_invariants(), Ok(()));

    assert_eq!(enc.set_condition(t, Condition::Restrained, false), Ok(true));
    assert_eq!(enc.actor(t).unwrap().effective_speed(), 30);
    assert_eq!(enc.check_invariants(), Ok(()));
}

#[test]
fn ending_the_effect_leaves_the_hold_restraining() {
    let (mut enc, g, t) = restraining_pair();
    enc.set_condition(t, Condition::Restrained, true).unwrap();
    assert!(enc.grapple(g, t).unwrap().success);

    assert_eq!(enc.set_condition(t, Condition::Restrained, false), Ok(false));
    assert!(enc.actor(t).unwrap().has(Condition::Restrained));
    assert!(enc.log().iter().any(|l| l.contains("Restrained effect ends; still held")));
    assert_eq!(enc.check_invariants(), Ok(()));
    // Only the hold is left, so it can no longer be cleared from outside.
    assert_eq!(
        enc.set_condition(t, Condition::Restrained, false),
        Err(ActionError::LedgerOwned(Condition::Restrained))
    );

    enc.release(g, t);
    assert!(!enc.actor(t).unwrap().has(Condition::Restrained));
    assert_eq!(enc.actor(t).unwrap().effective_speed(), 30);
}

#[test]
fn escape_requires_being_grappled() {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let t = enc.add_actor(target("T", 5));
    assert_eq!(enc.attempt_escape(t).unwrap_err(), ActionError::NotGrappled(t));
}

#[test]
fn grapple_roles_cannot_be_set_directly() {
    let (mut enc, _g, t) = grappled_pair(&[]);
    assert_eq!(
        enc.set_condition(t, Condition::Grappled, false).unwrap_err(),
        ActionError::LedgerOwned(Condition::Grappled)
    );
    assert!(enc.actor(t).unwrap().has(Condition::Grappled));
}
