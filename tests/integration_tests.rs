//! Integration tests for the gk CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a gk command isolated from the caller's environment
fn gk(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gk").unwrap();
    cmd.current_dir(tmp.path())
        .env_remove("GK_USER")
        .env_remove("GK_PROJECT")
        .env_remove("GK_DATABASE")
        .env_remove("GK_LOG");
    cmd
}

/// Run as `user` inside the workspace
fn gk_as(tmp: &TempDir, user: &str) -> Command {
    let mut cmd = gk(tmp);
    cmd.args(["--user", user]);
    cmd
}

const BOQ_CSV: &str = "pozicija;opis;jm;količina;jedinična cena
BoQ-001;Excavation;m3;1.000,5;2,50
BoQ-002;Concrete;m3;100;2,50
;Ukupno;;;
";

/// Workspace with an admin, a project, a contractor, a supervisor and two BoQ items
fn setup_book() -> TempDir {
    let tmp = TempDir::new().unwrap();
    gk(&tmp)
        .args(["init", ".", "--admin", "root"])
        .assert()
        .success();
    gk_as(&tmp, "root")
        .args(["project", "new", "--code", "BR-1", "--name", "Bridge"])
        .assert()
        .success();
    gk_as(&tmp, "root")
        .args(["team", "add", "--username", "JSmith", "--role", "contractor"])
        .assert()
        .success();
    gk_as(&tmp, "root")
        .args(["team", "add", "--username", "nadzor", "--role", "supervisor"])
        .assert()
        .success();

    fs::write(tmp.path().join("boq.csv"), BOQ_CSV).unwrap();
    gk_as(&tmp, "jsmith")
        .args(["boq", "import", "boq.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 created"));
    tmp
}

fn new_sheet(tmp: &TempDir, number: &str) {
    gk_as(tmp, "jsmith")
        .args(["sheet", "new", "--number", number, "--from", "2024-01-01", "--to", "2024-01-31"])
        .assert()
        .success();
}

fn sheet_json(tmp: &TempDir, user: &str, sheet: &str) -> serde_json::Value {
    let output = gk_as(tmp, user)
        .args(["sheet", "show", sheet, "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    gk(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bill of quantities"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    gk(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gk"));
}

#[test]
fn test_commands_outside_workspace_fail() {
    let tmp = TempDir::new().unwrap();
    gk(&tmp)
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a gk workspace"));
}

// ============================================================================
// Init and identity
// ============================================================================

#[test]
fn test_init_creates_workspace_and_roles() {
    let tmp = TempDir::new().unwrap();
    gk(&tmp)
        .args(["init", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized gk workspace"));

    assert!(tmp.path().join(".gk/config.yaml").exists());
    assert!(tmp.path().join(".gk/gk.db").exists());

    gk(&tmp)
        .args(["team", "roles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("contractor"))
        .stdout(predicate::str::contains("supervisor"))
        .stdout(predicate::str::contains("investor"))
        .stdout(predicate::str::contains("admin"));
}

#[test]
fn test_init_twice_is_reported() {
    let tmp = TempDir::new().unwrap();
    gk(&tmp).args(["init", "."]).assert().success();
    gk(&tmp)
        .args(["init", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_whoami_and_unknown_user() {
    let tmp = setup_book();
    gk_as(&tmp, "JSMITH")
        .args(["team", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jsmith"))
        .stdout(predicate::str::contains("contractor"));

    gk_as(&tmp, "ghost")
        .args(["team", "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("user not found"));

    gk(&tmp)
        .args(["team", "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no acting user"));
}

#[test]
fn test_user_from_workspace_config() {
    let tmp = setup_book();
    fs::write(tmp.path().join(".gk/config.yaml"), "user: nadzor\n").unwrap();
    gk(&tmp)
        .args(["team", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nadzor"));
}

#[test]
fn test_only_admin_adds_users() {
    let tmp = setup_book();
    gk_as(&tmp, "jsmith")
        .args(["team", "add", "--username", "mallory", "--role", "admin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));
}

// ============================================================================
// Projects and BoQ
// ============================================================================

#[test]
fn test_duplicate_project_code_rejected() {
    let tmp = setup_book();
    gk_as(&tmp, "root")
        .args(["project", "new", "--code", "BR-1", "--name", "Again"])
        .assert()
        .failure();
    gk(&tmp)
        .args(["project", "list", "--format", "id"])
        .assert()
        .success()
        .stdout("BR-1\n");
}

#[test]
fn test_boq_import_parses_local_numbers() {
    let tmp = setup_book();
    let output = gk(&tmp)
        .args(["boq", "list", "--format", "json"])
        .output()
        .unwrap();
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["code"], "BoQ-001");
    assert_eq!(items[0]["contracted_quantity"], "1000.500");
    assert_eq!(items[0]["unit_price"], "2.50");
}

#[test]
fn test_boq_import_dry_run_saves_nothing() {
    let tmp = setup_book();
    fs::write(
        tmp.path().join("more.csv"),
        "code,title,uom,quantity,unit_price\nBoQ-003,Rebar,kg,10,1.20\n",
    )
    .unwrap();
    gk_as(&tmp, "jsmith")
        .args(["boq", "import", "more.csv", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would import"));
    gk(&tmp)
        .args(["boq", "list", "--format", "id"])
        .assert()
        .success()
        .stdout("BoQ-001\nBoQ-002\n");
}

#[test]
fn test_boq_rename_locked_once_used() {
    let tmp = setup_book();
    gk_as(&tmp, "jsmith")
        .args(["boq", "rename", "BoQ-002", "BoQ-020"])
        .assert()
        .success();

    new_sheet(&tmp, "1");
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-020=1"])
        .assert()
        .success();
    gk_as(&tmp, "jsmith")
        .args(["boq", "rename", "BoQ-020", "BoQ-021"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gk::boq::locked"));
}

#[test]
fn test_boq_edit_locked_once_used() {
    let tmp = setup_book();
    gk_as(&tmp, "jsmith")
        .args(["boq", "edit", "BoQ-002"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));
    gk_as(&tmp, "nadzor")
        .args(["boq", "edit", "BoQ-002", "--price", "3"])
        .assert()
        .failure();

    let output = gk_as(&tmp, "jsmith")
        .args(["boq", "edit", "BoQ-002", "--title", "Concrete C30/37", "--price", "3", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let item: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(item["title"], "Concrete C30/37");
    assert_eq!(item["unit_price"], "3.00");
    assert_eq!(item["uom"], "m3");

    new_sheet(&tmp, "1");
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-002=1"])
        .assert()
        .success();
    gk_as(&tmp, "jsmith")
        .args(["boq", "edit", "BoQ-002", "--uom", "m2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gk::boq::locked"));
}

// ============================================================================
// Sheets
// ============================================================================

#[test]
fn test_contractor_edits_own_draft() {
    let tmp = setup_book();
    new_sheet(&tmp, "1");

    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-001=5"])
        .assert()
        .success();
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "#1", "--set", "BoQ-001=7.25", "--set", "BoQ-002=1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 2 entries"));

    let detail = sheet_json(&tmp, "nadzor", "1");
    assert_eq!(detail["sheet"]["status"], "draft");
    assert_eq!(detail["can_edit"], false);
    assert_eq!(detail["total"], "20.63");
    let entries = detail["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["boq_code"], "BoQ-001");
    assert_eq!(entries[0]["quantity"], "7.250");

    assert_eq!(sheet_json(&tmp, "jsmith", "1")["can_edit"], true);
}

#[test]
fn test_sheet_edit_from_file_replaces_entries() {
    let tmp = setup_book();
    new_sheet(&tmp, "1");
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-001=5", "--set", "BoQ-002=5"])
        .assert()
        .success();

    fs::write(
        tmp.path().join("entries.csv"),
        "code,quantity,note\nBoQ-002,3,north abutment\n",
    )
    .unwrap();
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--file", "entries.csv"])
        .assert()
        .success();

    let detail = sheet_json(&tmp, "jsmith", "1");
    let entries = detail["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["boq_code"], "BoQ-002");
    assert_eq!(entries[0]["note"], "north abutment");
}

#[test]
fn test_sheet_edit_requires_clear_for_empty_set() {
    let tmp = setup_book();
    new_sheet(&tmp, "1");
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-001=5"])
        .assert()
        .success();

    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1"])
        .assert()
        .failure();
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--clear"])
        .assert()
        .success();
    assert!(sheet_json(&tmp, "jsmith", "1")["entries"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn test_invalid_batch_saves_nothing() {
    let tmp = setup_book();
    new_sheet(&tmp, "1");
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-001=5"])
        .assert()
        .success();

    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-001=1.2345", "--set", "BoQ-002=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 validation error(s)"));
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-999=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown BoQ code"));

    let detail = sheet_json(&tmp, "jsmith", "1");
    assert_eq!(detail["entries"][0]["quantity"], "5.000");
}

#[test]
fn test_supervisor_cannot_create_or_edit() {
    let tmp = setup_book();
    gk_as(&tmp, "nadzor")
        .args(["sheet", "new", "--number", "1", "--from", "2024-01-01", "--to", "2024-01-31"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));

    new_sheet(&tmp, "1");
    gk_as(&tmp, "nadzor")
        .args(["sheet", "edit", "1", "--set", "BoQ-001=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed"));
}

#[test]
fn test_duplicate_sheet_number_rejected() {
    let tmp = setup_book();
    new_sheet(&tmp, "1");
    gk_as(&tmp, "jsmith")
        .args(["sheet", "new", "--number", "1", "--from", "2024-02-01", "--to", "2024-02-29"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already in use"));
}

#[test]
fn test_sheet_list_newest_first_and_filters() {
    let tmp = setup_book();
    new_sheet(&tmp, "1");
    gk_as(&tmp, "jsmith")
        .args(["sheet", "new", "--number", "2", "--from", "2024-02-01", "--to", "2024-02-29"])
        .assert()
        .success();
    gk_as(&tmp, "jsmith")
        .args(["sheet", "edit", "1", "--set", "BoQ-002=1"])
        .assert()
        .success();

    let output = gk(&tmp)
        .args(["sheet", "list", "--format", "json"])
        .output()
        .unwrap();
    let sheets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let numbers: Vec<_> = sheets
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 1]);

    let output = gk(&tmp)
        .args(["sheet", "list", "--boq", "BoQ-002", "--format", "json"])
        .output()
        .unwrap();
    let sheets: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sheets.as_array().unwrap().len(), 1);
    assert_eq!(sheets[0]["number"], 1);

    gk(&tmp)
        .args(["sheet", "list", "--status", "submitted"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sheets found"));
}

#[test]
fn test_period_must_be_ordered() {
    let tmp = setup_book();
    gk_as(&tmp, "jsmith")
        .args(["sheet", "new", "--number", "1", "--from", "2024-02-01", "--to", "2024-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is after period end"));
}
