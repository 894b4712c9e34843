use combat_engine::grapple::{audit, ReleaseReason};
use combat_engine::{
    Ability, ActionError, ActorId, ActorSpec, Condition, DamageDice, DamageType, Dice, Encounter, GrappleMethod,
    GrappleProfile, Size,
};

fn tentacles(capacity: usize) -> GrappleProfile {
    GrappleProfile {
        method: GrappleMethod::Attack,
        damage: DamageDice::new(1, 4),
        damage_type: DamageType::Bludgeoning,
        reach: 15,
        restrains: true,
        capacity,
        escape_dc: Some(16),
        crush: None,
        save_ability: Ability::Str,
    }
}

fn creature(name: &str, position: i32) -> ActorSpec {
    let mut spec = ActorSpec::named(name);
    spec.hp = 30;
    spec.position = position;
    spec
}

/// A Large many-armed grappler at 0 holding one Medium target per entry of `positions`.
/// Every scripted roll is 15: attacks hit, 1d4 damage is 4.
fn octopus_holding(positions: &[i32]) -> (Encounter, ActorId, Vec<ActorId>) {
    let mut enc = Encounter::new(Dice::from_scripted(vec![15]));
    let mut spec = creature("Octopus", 0);
    spec.size = Size::Large;
    spec.grapple = Some(tentacles(positions.len()));
    let g = enc.add_actor(spec);
    let targets: Vec<ActorId> = positions
        .iter()
        .enumerate()
        .map(|(i, &pos)| enc.add_actor(creature(&format!("T{}", i), pos)))
        .collect();
    for &t in &targets {
        assert!(enc.grapple(g, t).unwrap().success);
    }
    (enc, g, targets)
}

#[test]
fn incapacitated_grappler_drops_every_hold_in_one_pass() {
    let (mut enc, g, targets) = octopus_holding(&[5, 10, 15]);
    assert_eq!(enc.ledger().len(), 3);
    for &t in &targets {
        assert_eq!(enc.actor(t).unwrap().effective_speed(), 0);
    }

    enc.set_condition(g, Condition::Stunned, true).unwrap();

    assert!(enc.ledger().is_empty());
    assert!(!enc.actor(g).unwrap().has(Condition::Grappling));
    for &t in &targets {
        let tgt = enc.actor(t).unwrap();
        assert!(!tgt.has(Condition::Grappled));
        assert!(!tgt.has(Condition::Restrained));
        assert_eq!(tgt.effective_speed(), 30);
    }
    assert_eq!(enc.check_invariants(), Ok(()));
}

#[test]
fn grappler_state_outranks_distance() {
    let (mut enc, g, targets) = octopus_holding(&[5]);
    let t = targets[0];

    // Dead and out of range after one edit; the pass reports the stronger reason.
    let (_, report) = enc
        .update_actor(g, |actor| {
            actor.health.hp = 0;
            actor.position = -100;
        })
        .unwrap();

    assert_eq!(report.releases.len(), 1);
    assert_eq!(report.releases[0].target, t);
    assert_eq!(report.releases[0].reason, ReleaseReason::GrapplerDead);
    assert!(audit(enc.ledger(), enc.roster()).is_empty());
}

#[test]
fn unconscious_grappler_lets_go_at_once() {
    let (mut enc, g, _) = octopus_holding(&[5]);
    let report = enc.set_condition(g, Condition::Unconscious, true);
    assert!(report.is_ok());
    assert!(enc.ledger().is_empty());
    assert!(enc.log().iter().any(|l| l.contains("grappler is incapacitated")));
}

#[test]
fn editing_an_actor_out_of_reach_ends_the_hold() {
    let (mut enc, g, targets) = octopus_holding(&[5, 10]);

    let (_, report) = enc.update_actor(targets[1], |actor| actor.position = 200).unwrap();

    assert!(report.released(g, targets[1]));
    assert!(matches!(report.releases[0].reason, ReleaseReason::OutOfRange { .. }));
    assert!(!enc.actor(targets[1]).unwrap().has(Condition::Grappled));
    assert!(enc.actor(targets[0]).unwrap().has(Condition::Grappled));
    assert_eq!(enc.check_invariants(), Ok(()));
    assert_eq!(enc.update_actor(ActorId(99), |_| ()).unwrap_err(), ActionError::UnknownActor(ActorId(99)));
}

#[test]
fn validator_is_idempotent() {
    let (mut enc, g, targets) = octopus_holding(&[5, 10]);
    let (_, first) = enc.update_actor(targets[0], |actor| actor.position = 60).unwrap();
    assert!(first.released(g, targets[0]));
    assert!(!first.released(g, targets[1]));

    let ledger = enc.ledger().clone();
    let second = enc.validate_grapples();
    assert!(second.is_clean());
    assert_eq!(enc.ledger(), &ledger);
}

#[test]
fn clean_state_needs_no_repair() {
    let (mut enc, _, _) = octopus_holding(&[5]);
    assert!(enc.validate_grapples().is_clean());
}

#[test]
fn teleporting_target_is_released() {
    let (mut enc, g, targets) = octopus_holding(&[5]);
    let t = targets[0];

    let report = enc.teleport(t, 200).unwrap();

    assert_eq!(
        report.releases[0].reason,
        ReleaseReason::OutOfRange { distance: 200, range: 15 }
    );
    assert!(enc.ledger().edge(g, t).is_none());
    assert_eq!(enc.actor(t).unwrap().effective_speed(), 30);
}

#[test]
fn moving_within_range_keeps_the_hold() {
    let (mut enc, _, targets) = octopus_holding(&[5]);
    let report = enc.force_move(targets[0], 15).unwrap();
    assert!(report.is_clean());
    assert_eq!(enc.ledger().len(), 1);
}

#[test]
fn enlarged_target_slips_free() {
    let (mut enc, g, targets) = octopus_holding(&[5]);
    let t = targets[0];

    let still = enc.set_size(t, Size::Huge).unwrap();
    assert!(still.is_clean());

    let report = enc.set_size(t, Size::Gargantuan).unwrap();
    assert_eq!(
        report.releases[0].reason,
        ReleaseReason::SizeMismatch { grappler: Size::Large, target: Size::Gargantuan }
    );
    assert!(enc.ledger().edge(g, t).is_none());
}

#[test]
fn death_of_either_side_ends_the_edge() {
    let (mut enc, g, targets) = octopus_holding(&[5, 10]);

    let report = enc.deal_damage(targets[0], 100, DamageType::Force).unwrap();
    assert!(report.killed);
    assert!(enc.ledger().edge(g, targets[0]).is_none());
    assert!(enc.ledger().edge(g, targets[1]).is_some());

    enc.deal_damage(g, 100, DamageType::Force).unwrap();
    assert!(enc.ledger().is_empty());
    assert!(!enc.actor(targets[1]).unwrap().has(Condition::Grappled));
    assert_eq!(enc.check_invariants(), Ok(()));
}

#[test]
fn removing_an_actor_frees_what_it_held() {
    let (mut enc, g, targets) = octopus_holding(&[5]);

    let removed = enc.remove_actor(g).unwrap();

    assert_eq!(removed.name, "Octopus");
    assert!(enc.ledger().is_empty());
    let tgt = enc.actor(targets[0]).unwrap();
    assert!(!tgt.has(Condition::Grappled));
    assert_eq!(tgt.effective_speed(), 30);
}

#[test]
fn restrained_from_a_hold_cannot_be_lifted_while_it_lasts() {
    let (mut enc, _, targets) = octopus_holding(&[5]);
    let t = targets[0];
    assert!(enc.set_condition(t, Condition::Restrained, false).is_err());
    assert!(enc.actor(t).unwrap().has(Condition::Restrained));
}

#[test]
fn unrelated_condition_changes_leave_holds_alone() {
    let (mut enc, _, targets) = octopus_holding(&[5]);
    enc.set_condition(targets[0], Condition::Prone, true).unwrap();
    assert_eq!(enc.ledger().len(), 1);
    assert!(enc.actor(targets[0]).unwrap().has(Condition::Prone));
}
