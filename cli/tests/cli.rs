use assert_cmd::Command;
use predicates::prelude::*;

fn combat() -> Command {
    Command::cargo_bin("combat").unwrap()
}

#[test]
fn roll_prints_one_line_per_roll() {
    let out = combat()
        .args(["roll", "--seed", "1", "--rolls", "3", "--adv", "advantage"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    let rolls: Vec<u32> = text.lines().map(|l| l.trim().parse().unwrap()).collect();
    assert_eq!(rolls.len(), 3);
    assert!(rolls.iter().all(|r| (1..=20).contains(r)));
}

#[test]
fn check_reports_a_verdict() {
    combat()
        .args(["check", "--dc", "1", "--modifier", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dc=1 => SUCCESS"));
}

#[test]
fn creatures_lists_bestiary_and_encounters() {
    combat()
        .arg("creatures")
        .assert()
        .success()
        .stdout(predicate::str::contains("giant_constrictor_snake"))
        .stdout(predicate::str::contains("roper_lair"))
        .stdout(predicate::str::contains("capacity=4"));
}

#[test]
fn simulate_narrates_and_names_a_result() {
    combat()
        .args(["simulate", "--encounter", "snake_pit", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[INIT]"))
        .stdout(predicate::str::contains("winner="))
        .stdout(predicate::str::contains("Snik"));
}

#[test]
fn quiet_simulate_prints_only_the_result() {
    combat()
        .args(["-q", "simulate", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[INIT]").not())
        .stdout(predicate::str::contains("rounds="));
}

#[test]
fn simulate_json_is_machine_readable() {
    let out = combat()
        .args(["simulate", "--encounter", "roper_lair", "--seed", "9", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["encounter"], "Roper's Lair");
    assert_eq!(value["seed"], 9);
    assert_eq!(value["actors"].as_array().unwrap().len(), 5);
    assert!(!value["log"].as_array().unwrap().is_empty());
}

#[test]
fn batch_summarizes_every_run() {
    combat()
        .args(["batch", "--runs", "10", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("encounter=Snake Pit runs=10"))
        .stdout(predicate::str::contains("mean_rounds="));
}

#[test]
fn unknown_encounter_fails_with_context() {
    combat()
        .args(["simulate", "--encounter", "no_such_place"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot load encounter 'no_such_place'"));
}
