use combat_engine::api::{
    builtin_bestiary, load_encounter, parse_encounter, simulate_encounter, simulate_encounter_many, BasicTactics,
};
use combat_engine::{Action, Condition, Decider, GrappleMethod, Movement, TurnPlan};

#[test]
fn builtin_bestiary_parses() {
    let bestiary = builtin_bestiary().unwrap();
    let ids: Vec<&str> = bestiary.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        vec!["paladin", "goblin", "hobgoblin_warrior", "giant_constrictor_snake", "giant_octopus", "roper"]
    );
    let roper = &bestiary["roper"];
    let tendrils = roper.grapple.as_ref().unwrap();
    assert_eq!(tendrils.method, GrappleMethod::Save);
    assert_eq!(tendrils.capacity, 4);
    assert_eq!(tendrils.reach, 50);
}

#[test]
fn builtin_encounters_load_by_name() {
    let pit = load_encounter("snake_pit").unwrap();
    assert_eq!(pit.name, "Snake Pit");
    assert_eq!(pit.combatants.len(), 3);

    let lair = load_encounter("roper_lair").unwrap();
    assert!(lair.creatures.contains_key("cave_scout"));
}

#[test]
fn same_seed_same_fight() {
    let pit = load_encounter("snake_pit").unwrap();
    let first = simulate_encounter(&pit, 7, true).unwrap();
    let second = simulate_encounter(&pit, 7, true).unwrap();
    assert_eq!(first.log, second.log);
    assert_eq!(first.winner, second.winner);
    assert!(first.rounds >= 1 && first.rounds <= pit.max_rounds);
    assert!(first.log.iter().any(|l| l.starts_with("[INIT]")));
}

#[test]
fn quiet_runs_keep_no_log() {
    let pit = load_encounter("snake_pit").unwrap();
    let result = simulate_encounter(&pit, 3, false).unwrap();
    assert!(result.log.is_empty());
    assert_eq!(result.actors.len(), 3);
}

#[test]
fn batch_accounts_for_every_run() {
    let lair = load_encounter("roper_lair").unwrap();
    let summary = simulate_encounter_many(&lair, 100, 25).unwrap();
    let wins: u32 = summary.wins.values().sum();
    assert_eq!(wins + summary.unresolved, 25);
    assert!(summary.mean_rounds >= 1.0);
    let total: f64 = summary.wins.keys().map(|t| summary.win_rate(t)).sum();
    assert!(total <= 1.0 + 1e-9);
}

#[test]
fn unknown_creature_is_an_error() {
    let file = parse_encounter(
        "name: Broken\ncombatants:\n  - creature: tarrasque\n    team: monsters\n",
    )
    .unwrap();
    let err = simulate_encounter(&file, 1, false).unwrap_err();
    assert!(format!("{:#}", err).contains("tarrasque"));
}

#[test]
fn empty_encounter_is_an_error() {
    let file = parse_encounter("name: Empty\ncombatants: []\n").unwrap();
    assert!(simulate_encounter(&file, 1, false).is_err());
}

#[test]
fn missing_file_is_an_error() {
    let err = load_encounter("/no/such/encounter.yaml").unwrap_err();
    assert!(format!("{:#}", err).contains("failed to read encounter file"));
}

#[test]
fn custom_encounter_with_inline_creature() {
    let yaml = r#"
name: Alley
max_rounds: 5
creatures:
  thug:
    name: Thug
    hp: 11
    ac: 11
    abilities: { str: 15, dex: 11, con: 14, int: 10, wis: 10, cha: 11 }
    weapon: { name: Mace, dice: 1d6 }
combatants:
  - creature: thug
    position: 0
  - creature: thug
    name: Other Thug
    position: 5
"#;
    let file = parse_encounter(yaml).unwrap();
    let result = simulate_encounter(&file, 11, false).unwrap();
    // No teams given: everyone fights for themselves.
    assert_eq!(result.actors[0].team, "Thug");
    assert_eq!(result.actors[1].team, "Other Thug");
    assert!(result.rounds <= 5);
}

#[test]
fn tactics_escape_first_then_grapple_then_close_in() {
    let file = parse_encounter(
        r#"
name: Tactics
combatants:
  - creature: giant_constrictor_snake
    team: monsters
    position: 0
  - creature: paladin
    team: party
    position: 5
  - creature: goblin
    team: party
    position: 60
"#,
    )
    .unwrap();
    let bestiary = builtin_bestiary().unwrap();
    let mut enc = file.build(&bestiary, 5).unwrap();
    let ids: Vec<_> = enc.actors().map(|a| a.id).collect();
    let (snake, paladin, goblin) = (ids[0], ids[1], ids[2]);
    let mut tactics = BasicTactics;

    assert_eq!(tactics.plan(snake, &enc), TurnPlan::act(Action::Grapple { target: paladin }));
    assert_eq!(
        tactics.plan(goblin, &enc),
        TurnPlan { movement: Some(Movement::Toward(snake)), action: Some(Action::Dodge), bonus_action: None }
    );

    enc.update_actor(goblin, |actor| actor.position = 30).unwrap();
    assert_eq!(
        tactics.plan(goblin, &enc),
        TurnPlan::act(Action::Attack { target: snake }).moving(Movement::Toward(snake))
    );

    enc.set_condition(paladin, Condition::Prone, true).unwrap();
    assert_eq!(tactics.plan(paladin, &enc), TurnPlan::act(Action::Attack { target: snake }));
}
