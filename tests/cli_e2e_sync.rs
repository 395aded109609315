//! End-to-end tests for the `feature-sync sync` command.
//!
//! Tests that need `git merge-file` are gated behind `integration-tests`.

mod common;
use common::prelude::*;

fn ci_workspace() -> TestWorkspace {
    TestWorkspace::new()
        .with_feature("ci", "1.0.0", r#"{"files": ["ci.yml"]}"#, &[("ci.yml", "a\nb\nc\n")])
        .with_feature(
            "ci",
            "2.0.0",
            r#"{"files": ["ci.yml"], "changes": {"2.0.0": {"deletes": ["old-ci.yml"]}}}"#,
            &[("ci.yml", "template\nb\nc\n")],
        )
}

#[test]
fn test_sync_writes_and_deletes() {
    let fixture = ci_workspace()
        .with_project("web", r#"{"ci": "2.0.0"}"#)
        .with_repo_file("web", "old-ci.yml", "stale\n");

    fixture
        .command()
        .arg("sync")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("[SYNC] web: applied 2 action(s)"))
        .stdout(predicate::str::contains("- delete old-ci.yml"))
        .stdout(predicate::str::contains("+ write ci.yml (ci@2.0.0)"));

    assert_eq!(
        fixture.read_repo_file("web", "ci.yml").unwrap(),
        "template\nb\nc\n"
    );
    assert!(fixture.read_repo_file("web", "old-ci.yml").is_none());
}

#[test]
fn test_sync_failing_project_does_not_stop_others() {
    let fixture = ci_workspace()
        .with_project("aaa-broken", r#"{"ghost": "9.9.9"}"#)
        .with_project("zzz-good", r#"{"ci": "1.0.0"}"#);

    fixture
        .command()
        .arg("sync")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("[SYNC] zzz-good: applied 1 action(s)"))
        .stderr(predicate::str::contains("1 project(s) could not be synced"))
        .stderr(predicate::str::contains("aaa-broken: Feature not found: ghost@9.9.9"));

    assert_eq!(
        fixture.read_repo_file("zzz-good", "ci.yml").unwrap(),
        "a\nb\nc\n"
    );
}

#[test]
fn test_sync_dry_run() {
    let fixture = ci_workspace().with_project("web", r#"{"ci": "2.0.0"}"#);

    fixture
        .command()
        .args(["sync", "--dry-run"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("planned 1 action(s)"));

    assert!(fixture.read_repo_file("web", "ci.yml").is_none());
}

#[test]
fn test_sync_second_run_is_noop() {
    let fixture = ci_workspace().with_project("web", r#"{"ci": "1.0.0"}"#);

    fixture.command().arg("sync").assert().code(0);
    fixture
        .command()
        .arg("sync")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("[OK] web: nothing to do"));
}

#[test]
fn test_sync_json_output() {
    let fixture = ci_workspace().with_project("web", r#"{"ci": "1.0.0"}"#);

    let output = fixture
        .command()
        .args(["sync", "--json", "-n"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();

    let results: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(results[0]["project"], "web");
    assert_eq!(results[0]["actions"][0]["kind"], "write");
    assert_eq!(results[0]["actions"][0]["path"], "ci.yml");
    assert!(results[0].get("applied").is_none());
}

#[test]
fn test_sync_rejects_unknown_strategy() {
    let fixture = ci_workspace().with_project("web", r#"{"ci": "1.0.0"}"#);

    fixture
        .command()
        .args(["sync", "--strategy", "theirs"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("keep-local"));
}

#[test]
fn test_sync_overwrite_strategy_from_env() {
    // no older version declares the path, so no merge is needed
    let fixture = TestWorkspace::new()
        .with_feature("ci", "1.0.0", r#"{"files": ["ci.yml"]}"#, &[("ci.yml", "ci\n")])
        .with_project("web", r#"{"ci": "1.0.0"}"#)
        .with_repo_file("web", "ci.yml", "edited\n");

    fixture
        .command()
        .env("FEATURE_SYNC_STRATEGY", "overwrite")
        .arg("sync")
        .assert()
        .code(0);
    assert_eq!(fixture.read_repo_file("web", "ci.yml").unwrap(), "ci\n");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_conflict_blocks_project() {
    if !git_available() {
        println!("Skipping: git not available");
        return;
    }
    let fixture = ci_workspace()
        .with_project("web", r#"{"ci": "2.0.0"}"#)
        .with_repo_file("web", "ci.yml", "local\nb\nc\n")
        .with_repo_file("web", "old-ci.yml", "stale\n");

    fixture
        .command()
        .arg("sync")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[BLOCKED] web: blocked"))
        .stdout(predicate::str::contains("ci.yml: merge conflict"));

    // nothing from a blocked plan is applied
    assert_eq!(fixture.read_repo_file("web", "ci.yml").unwrap(), "local\nb\nc\n");
    assert!(fixture.read_repo_file("web", "old-ci.yml").is_some());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_keep_local_strategy() {
    if !git_available() {
        println!("Skipping: git not available");
        return;
    }
    let fixture = ci_workspace()
        .with_project("web", r#"{"ci": "2.0.0"}"#)
        .with_repo_file("web", "ci.yml", "local\nb\nc\n");

    fixture
        .command()
        .args(["sync", "--strategy", "keep-local"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("-> kept local"));
    assert_eq!(fixture.read_repo_file("web", "ci.yml").unwrap(), "local\nb\nc\n");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sync_clean_merge_keeps_local_edit() {
    if !git_available() {
        println!("Skipping: git not available");
        return;
    }
    let fixture = TestWorkspace::new()
        .with_feature("ci", "1.0.0", r#"{"files": ["ci.yml"]}"#, &[("ci.yml", "a\nb\nc\n")])
        .with_feature("ci", "2.0.0", r#"{"files": ["ci.yml"]}"#, &[("ci.yml", "a\nb\nc\nd\n")])
        .with_project("web", r#"{"ci": "2.0.0"}"#)
        .with_repo_file("web", "ci.yml", "local\nb\nc\n");

    fixture.command().arg("sync").assert().code(0);
    assert_eq!(
        fixture.read_repo_file("web", "ci.yml").unwrap(),
        "local\nb\nc\nd\n"
    );
}
