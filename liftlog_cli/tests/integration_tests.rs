//! Integration tests for the liftlog binary.
//!
//! These tests verify end-to-end behavior including:
//! - User registration and progression display
//! - Workout create/update/delete through request files
//! - Ownership errors surfacing as not-found
//! - Data persistence across runs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("liftlog"))
}

/// Pull the id printed after `prefix` on a success line
fn printed_id(stdout: &[u8], prefix: &str) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(prefix))
        .map(|rest| rest.split_whitespace().next().unwrap_or("").to_string())
        .unwrap_or_else(|| panic!("no line starting with {:?} in:\n{}", prefix, stdout))
}

fn create_user(data_dir: &Path, name: &str) -> String {
    let output = cli()
        .arg("user")
        .arg("create")
        .arg("--name")
        .arg(name)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    printed_id(&output, "✓ Created user ")
}

fn write_request(dir: &Path, file: &str, json: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(file);
    fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();
    path
}

fn ppl_request(dir: &Path) -> std::path::PathBuf {
    write_request(
        dir,
        "ppl.json",
        serde_json::json!({
            "name": "PPL",
            "numExercises": 2,
            "eNames": ["Curls", "Bench"],
            "eSets": [2, 2],
            "eWeights": [[30, 40], [40, 45]],
            "eReps": [[12, 10], [8, 6]]
        }),
    )
}

fn add_workout(data_dir: &Path, user: &str, request: &Path) -> String {
    let output = cli()
        .arg("workout")
        .arg("add")
        .arg("--user")
        .arg(user)
        .arg("--request")
        .arg(request)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    printed_id(&output, "✓ Created workout ")
}

fn read_db(data_dir: &Path) -> serde_json::Value {
    let contents = fs::read_to_string(data_dir.join("db/liftlog.json")).expect("Failed to read db");
    serde_json::from_str(&contents).expect("db is not valid JSON")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strength workout tracker"));
}

#[test]
fn test_create_user_persists() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let user = create_user(data_dir, "sam");

    let db = read_db(data_dir);
    let stored = &db["users"][&user];
    assert_eq!(stored["name"], "sam");
    assert_eq!(stored["progress"]["points"], 50);
    assert_eq!(stored["progress"]["next_star"], 20);

    cli()
        .arg("user")
        .arg("show")
        .arg("--user")
        .arg(&user)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Points:    50"));
}

#[test]
fn test_invalid_user_name_fails() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("user")
        .arg("create")
        .arg("--name")
        .arg("")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .failure();
}

#[test]
fn test_add_workout_scores_sets() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let user = create_user(data_dir, "sam");

    let request = ppl_request(data_dir);
    let workout = add_workout(data_dir, &user, &request);

    let db = read_db(data_dir);
    let stored = &db["workouts"][&workout];
    assert_eq!(stored["name"], "PPL");
    assert_eq!(stored["num_exercises"], 2);

    let ids = stored["exercises"].as_array().unwrap();
    assert_eq!(ids.len(), 2);

    let curls = &db["exercises"][ids[0].as_str().unwrap()];
    assert_eq!(curls["scores"], serde_json::json!([360.0, 400.0]));
    assert_eq!(curls["pr"], 400.0);

    let bench = &db["exercises"][ids[1].as_str().unwrap()];
    assert_eq!(bench["scores"], serde_json::json!([320.0, 270.0]));
    assert_eq!(bench["pr"], 320.0);

    let progress = &db["users"][&user]["progress"];
    assert_eq!(progress["num_workouts"], 1);
    assert_eq!(progress["points"], 55);
}

#[test]
fn test_list_workouts_as_json() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let user = create_user(data_dir, "sam");
    let request = ppl_request(data_dir);
    add_workout(data_dir, &user, &request);
    add_workout(data_dir, &user, &request);

    let output = cli()
        .arg("workout")
        .arg("list")
        .arg("--user")
        .arg(&user)
        .arg("--json")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let views: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let views = views.as_array().unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0]["exercises"][0]["name"], "Curls");
}

#[test]
fn test_update_with_zero_exercises_deletes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let user = create_user(data_dir, "sam");
    let workout = add_workout(data_dir, &user, &ppl_request(data_dir));

    let request = write_request(data_dir, "empty.json", serde_json::json!({ "numExercises": 0 }));
    cli()
        .arg("workout")
        .arg("update")
        .arg("--user")
        .arg(&user)
        .arg("--id")
        .arg(&workout)
        .arg("--request")
        .arg(&request)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted workout"));

    let db = read_db(data_dir);
    assert!(db["workouts"].as_object().unwrap().is_empty());
    assert!(db["exercises"].as_object().unwrap().is_empty());
    assert_eq!(db["users"][&user]["progress"]["num_workouts"], 0);
    assert_eq!(db["users"][&user]["progress"]["points"], 55);
}

#[test]
fn test_update_reuses_existing_exercise() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let user = create_user(data_dir, "sam");
    let workout = add_workout(data_dir, &user, &ppl_request(data_dir));

    let db = read_db(data_dir);
    let bench = db["workouts"][&workout]["exercises"][1]
        .as_str()
        .unwrap()
        .to_string();

    let request = write_request(
        data_dir,
        "update.json",
        serde_json::json!({
            "numExercises": 1,
            "eNames": [null],
            "eSets": [1],
            "eWeights": [[50]],
            "eReps": [[5]],
            "numExistingExercises": 1,
            "existingExercises": [bench]
        }),
    );

    cli()
        .arg("workout")
        .arg("update")
        .arg("--user")
        .arg(&user)
        .arg("--id")
        .arg(&workout)
        .arg("--request")
        .arg(&request)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench: 50x5 (PR 250)"));

    let db = read_db(data_dir);
    assert_eq!(db["workouts"][&workout]["exercises"], serde_json::json!([bench]));
    assert_eq!(db["exercises"].as_object().unwrap().len(), 1);
}

#[test]
fn test_other_users_workout_is_not_found() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let owner = create_user(data_dir, "owner");
    let intruder = create_user(data_dir, "intruder");
    let workout = add_workout(data_dir, &owner, &ppl_request(data_dir));

    cli()
        .arg("workout")
        .arg("delete")
        .arg("--user")
        .arg(&intruder)
        .arg("--id")
        .arg(&workout)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"))
        .stderr(predicate::str::contains("Ownership").not());

    let db = read_db(data_dir);
    assert!(db["workouts"].get(&workout).is_some());
    assert_eq!(db["exercises"].as_object().unwrap().len(), 2);
}

#[test]
fn test_malformed_request_writes_nothing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let user = create_user(data_dir, "sam");

    let request = write_request(
        data_dir,
        "short.json",
        serde_json::json!({
            "name": "Legs",
            "numExercises": 1,
            "eNames": ["Squat"],
            "eSets": [3],
            "eWeights": [[100]],
            "eReps": [[5, 5, 5]]
        }),
    );

    cli()
        .arg("workout")
        .arg("add")
        .arg("--user")
        .arg(&user)
        .arg("--request")
        .arg(&request)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure();

    let db = read_db(data_dir);
    assert!(db["exercises"].as_object().unwrap().is_empty());
    assert_eq!(db["users"][&user]["progress"]["num_workouts"], 0);
}

#[test]
fn test_duplicate_and_awards() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let user = create_user(data_dir, "sam");
    let workout = add_workout(data_dir, &user, &ppl_request(data_dir));

    cli()
        .arg("workout")
        .arg("duplicate")
        .arg("--user")
        .arg(&user)
        .arg("--id")
        .arg(&workout)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Duplicated workout"));

    cli()
        .arg("points")
        .arg("add")
        .arg("--user")
        .arg(&user)
        .arg("--increment")
        .arg("15")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .arg("points")
        .arg("star")
        .arg("--user")
        .arg(&user)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Stars:     1"));

    let progress = &read_db(data_dir)["users"][&user]["progress"];
    assert_eq!(progress["num_workouts"], 2);
    assert_eq!(progress["points"], 50 + 5 + 5 + 15 + 50);
    assert_eq!(progress["next_star"], 40);
}

#[test]
fn test_corrupt_database_is_reported() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let user = create_user(data_dir, "sam");

    let db_path = data_dir.join("db/liftlog.json");
    fs::write(&db_path, "{ not json").unwrap();

    cli()
        .arg("user")
        .arg("show")
        .arg("--user")
        .arg(&user)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));

    // Left in place for manual recovery
    assert_eq!(fs::read_to_string(&db_path).unwrap(), "{ not json");
}

#[test]
fn test_config_init_writes_defaults() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("cfg.toml");
    let data_dir = temp_dir.path().join("data");

    cli()
        .arg("config")
        .arg("init")
        .arg("--config")
        .arg(&config_path)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote config"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("first_star_at = 20"));

    // An existing file is kept unless forced
    cli()
        .arg("config")
        .arg("init")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(fs::read_to_string(&config_path).unwrap(), contents);

    // The written data_dir is picked up without the flag
    let output = cli()
        .arg("user")
        .arg("create")
        .arg("--name")
        .arg("sam")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let user = printed_id(&output, "✓ Created user ");
    assert_eq!(read_db(&data_dir)["users"][&user]["name"], "sam");

    cli()
        .arg("config")
        .arg("init")
        .arg("--force")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success();
    assert!(!fs::read_to_string(&config_path)
        .unwrap()
        .contains(data_dir.to_str().unwrap()));
}
