//! End-to-end tests for the deckhand binary.
//!
//! Each test runs the compiled binary against a throwaway projects
//! directory, wired up through `DECKHAND_PROJECTS_DIR`. Nothing here
//! touches the real crontab or shells out to Ansible: invalid input is
//! rejected before any external tool would be spawned.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A deckhand invocation scoped to a temporary projects directory.
fn deckhand(projects_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("deckhand").unwrap();
    cmd.env("DECKHAND_PROJECTS_DIR", projects_dir)
        .env("NO_COLOR", "1")
        .env_remove("DECKHAND_CONFIG")
        .env_remove("DECKHAND_DB_PATH")
        .env_remove("DECKHAND_CONSOLE_LOG_LEVEL")
        .env_remove("DECKHAND_FILE_LOG_LEVEL")
        .env_remove("DECKHAND_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Lay down a minimal valid project tree.
fn scaffold_project(projects_dir: &Path, name: &str) {
    let root = projects_dir.join(name);
    for dir in ["project", "inventory", "env"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    for file in ["project/main.yml", "env/envvars", "env/ssh_key"] {
        fs::write(root.join(file), "").unwrap();
    }
}

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    deckhand(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("facts"))
        .stdout(predicate::str::contains("inventory"))
        .stdout(predicate::str::contains("cron"));
}

#[test]
fn invalid_log_level_is_a_startup_error() {
    let tmp = TempDir::new().unwrap();
    deckhand(tmp.path())
        .env("DECKHAND_CONSOLE_LOG_LEVEL", "loud")
        .args(["facts", "hosts"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid console_log_level"));
}

#[test]
fn missing_config_file_is_a_startup_error() {
    let tmp = TempDir::new().unwrap();
    deckhand(tmp.path())
        .args(["--config", "/nonexistent/deckhand.toml", "facts", "hosts"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn missing_project_layout_is_reported() {
    let tmp = TempDir::new().unwrap();
    deckhand(tmp.path())
        .args(["run", "ghost"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains(
            "missing required files or directories",
        ));
}

#[test]
fn unsafe_project_name_is_rejected() {
    let tmp = TempDir::new().unwrap();
    deckhand(tmp.path())
        .args(["run", "../escape"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid project name"));
}

#[test]
fn run_without_playbook_lists_available_ones() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");
    fs::write(tmp.path().join("fleet/project/site.yml"), "").unwrap();

    deckhand(tmp.path())
        .args(["run", "fleet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("specify a playbook"))
        .stdout(predicate::str::contains("main.yml"))
        .stdout(predicate::str::contains("site.yml"));
}

#[test]
fn run_with_unknown_playbook_fails_and_lists() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");

    deckhand(tmp.path())
        .args(["run", "fleet", "absent.yml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("'absent.yml' not found"))
        .stdout(predicate::str::contains("main.yml"));
}

#[test]
fn report_with_no_artifacts() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");

    deckhand(tmp.path())
        .args(["report", "fleet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No artifacts found."));
}

#[test]
fn report_renders_recap_table() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");

    let artifact = tmp.path().join("fleet/artifacts/20240101T120000-abcd1234");
    fs::create_dir_all(&artifact).unwrap();
    fs::write(
        artifact.join("stdout"),
        "PLAY RECAP *********************************************************************\n\
         web01                      : ok=5    changed=1    unreachable=0    failed=0    skipped=2    rescued=0    ignored=0\n\
         \n",
    )
    .unwrap();
    fs::write(
        artifact.join("command"),
        r#"{"command": ["ansible-playbook", "project/site.yml", "-i", "inventory"]}"#,
    )
    .unwrap();
    fs::write(artifact.join("rc"), "0").unwrap();
    fs::write(artifact.join("status"), "successful").unwrap();

    deckhand(tmp.path())
        .args(["report", "fleet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("site.yml completed at"))
        .stdout(predicate::str::contains("web01"))
        .stdout(predicate::str::contains("unreachable"));
}

#[test]
fn cron_add_rejects_out_of_range_minute() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");

    // Fails during validation, before any crontab access.
    deckhand(tmp.path())
        .args([
            "cron", "add", "fleet", "main.yml", "--cadence", "hourly", "--minute", "75",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn cron_add_rejects_out_of_range_hour() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");

    deckhand(tmp.path())
        .args([
            "cron", "add", "fleet", "main.yml", "--cadence", "daily", "--hour", "24",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn facts_hosts_on_empty_database() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");

    deckhand(tmp.path())
        .env("DECKHAND_DB_PATH", tmp.path().join("facts.db"))
        .args(["facts", "hosts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No hosts found in database"));
}

#[test]
fn facts_collect_picks_up_cache_files() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");

    let cache = tmp.path().join("fleet/artifacts/run1/fact_cache");
    fs::create_dir_all(&cache).unwrap();
    fs::write(
        cache.join("web01"),
        r#"{"ansible_distribution": "Debian"}"#,
    )
    .unwrap();

    let mut cmd = deckhand(tmp.path());
    cmd.env("DECKHAND_DB_PATH", tmp.path().join("facts.db"));
    cmd.args(["facts", "collect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web01"));

    deckhand(tmp.path())
        .env("DECKHAND_DB_PATH", tmp.path().join("facts.db"))
        .args(["facts", "query", "web01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ansible_distribution: Debian"));
}

#[test]
fn inventory_lists_hosts_of_a_group() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");
    fs::write(
        tmp.path().join("fleet/inventory/hosts"),
        "[webservers]\nweb01\nweb02\n\n[databases]\ndb01\n",
    )
    .unwrap();

    deckhand(tmp.path())
        .args(["inventory", "list-hosts", "fleet", "webservers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web01"))
        .stdout(predicate::str::contains("web02"))
        .stdout(predicate::str::contains("db01").not());
}

#[test]
fn inventory_reports_groups_of_a_host() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");
    fs::write(
        tmp.path().join("fleet/inventory/hosts"),
        "[webservers]\nweb01\n\n[production:children]\nwebservers\n",
    )
    .unwrap();

    deckhand(tmp.path())
        .args(["inventory", "host-groups", "fleet", "web01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("webservers"))
        .stdout(predicate::str::contains("production"));
}

#[test]
fn inventory_unknown_host_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    scaffold_project(tmp.path(), "fleet");
    fs::write(tmp.path().join("fleet/inventory/hosts"), "[webservers]\nweb01\n").unwrap();

    deckhand(tmp.path())
        .args(["inventory", "host-groups", "fleet", "ghost"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not found in the inventory"));
}

#[test]
fn inventory_rejects_path_traversal_in_project_name() {
    let tmp = TempDir::new().unwrap();
    let projects = tmp.path().join("projects");
    fs::create_dir_all(&projects).unwrap();

    // An inventory beside the projects directory must stay out of reach.
    let outside = tmp.path().join("outside/inventory");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("hosts"), "[stolen]\nleak01\n").unwrap();

    deckhand(&projects)
        .args(["inventory", "list-hosts", "../outside", "stolen"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid project name"))
        .stdout(predicate::str::contains("leak01").not());
}

#[test]
fn inventory_requires_a_valid_project_layout() {
    let tmp = TempDir::new().unwrap();
    deckhand(tmp.path())
        .args(["inventory", "list-hosts", "ghost"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains(
            "missing required files or directories",
        ));
}

#[test]
fn completions_generate_for_bash() {
    let tmp = TempDir::new().unwrap();
    deckhand(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deckhand"));
}
