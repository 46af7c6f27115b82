//! CLI integration tests for polysql.
//!
//! These tests verify argument parsing, exit codes and query output against
//! SQLite databases.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;

/// Get a command for the polysql binary.
fn cmd() -> Command {
    Command::cargo_bin("polysql").unwrap()
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite:{}", path.display())
}

/// A file database holding a small people table.
fn people_db() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let url = sqlite_url(&dir.path().join("people.db"));
    cmd()
        .args([
            "--url",
            &url,
            "exec",
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT, nick TEXT);
             INSERT INTO people (name, nick) VALUES ('Alice', 'Al'), ('Bob', NULL), ('Carol', 'Caz');",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Affected rows: 3"))
        .stdout(predicate::str::contains("Last insert id: 3"));
    (dir, url)
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("drivers"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_query_subcommand_help() {
    cmd()
        .args(["query", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--param"))
        .stdout(predicate::str::contains("--named-param"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("polysql"));
}

#[test]
fn test_logging_flags_exist() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests - Configuration Errors (Exit Code 2)
// =============================================================================

#[test]
fn test_no_connection_exits_with_code_2() {
    cmd()
        .args(["query", "SELECT 1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--url or --config"));
}

#[test]
fn test_missing_config_exits_with_code_2() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connections: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_profile_without_scheme_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connections:").unwrap();
    writeln!(file, "  local:").unwrap();
    writeln!(file, "    url: data.db").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_profile_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connections:").unwrap();
    writeln!(file, "  local:").unwrap();
    writeln!(file, "    url: \"sqlite::memory:\"").unwrap();

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "--connection",
            "missing",
            "health-check",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn test_unknown_scheme_exits_with_code_2() {
    cmd()
        .args(["--url", "nosuchdb:whatever", "health-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nosuchdb"));
}

#[test]
fn test_invalid_param_exits_with_code_2() {
    cmd()
        .args(["--url", "sqlite::memory:", "query", "SELECT ?", "--param", "int:abc"])
        .assert()
        .code(2);
}

// =============================================================================
// Exit Code Tests - Database Errors (Exit Code 1)
// =============================================================================

#[test]
fn test_bad_sql_exits_with_code_1() {
    cmd()
        .args(["--url", "sqlite::memory:", "query", "SELEC nonsense"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Prepare failed"));
}

#[test]
fn test_constraint_violation_exits_with_code_1() {
    let (_dir, url) = people_db();
    cmd()
        .args(["--url", &url, "exec", "INSERT INTO people (id, name) VALUES (1, 'Dup')"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Execute failed"));
}

#[test]
fn test_unknown_named_param_exits_with_code_1() {
    cmd()
        .args([
            "--url",
            "sqlite::memory:",
            "query",
            "SELECT :id",
            "--named-param",
            "other=1",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Bind failed"));
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_drivers_lists_sqlite() {
    cmd()
        .arg("drivers")
        .assert()
        .success()
        .stdout(predicate::str::contains("sqlite: sqlite"));
}

#[test]
fn test_health_check_in_memory() {
    cmd()
        .args(["--url", "sqlite::memory:", "health-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Connection OK: sqlite"));
}

#[test]
fn test_query_prints_header_and_rows() {
    let (_dir, url) = people_db();
    cmd()
        .args(["--url", &url, "query", "SELECT id, name, nick FROM people ORDER BY id"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "id | name | nick\n1 | Alice | Al\n2 | Bob | NULL\n3 | Carol | Caz\n",
        ));
}

#[test]
fn test_every_mode_prints_the_same_rows() {
    let (_dir, url) = people_db();
    for mode in ["cursor", "buffered", "callback"] {
        cmd()
            .args([
                "--url",
                &url,
                "query",
                "SELECT name FROM people ORDER BY id",
                "--mode",
                mode,
            ])
            .assert()
            .success()
            .stdout(predicate::str::diff("name\nAlice\nBob\nCarol\n"));
    }
}

#[test]
fn test_limit_stops_early_in_every_mode() {
    let (_dir, url) = people_db();
    for mode in ["cursor", "buffered", "callback"] {
        cmd()
            .args([
                "--url",
                &url,
                "query",
                "SELECT name FROM people ORDER BY id",
                "--mode",
                mode,
                "--limit",
                "2",
            ])
            .assert()
            .success()
            .stdout(predicate::str::diff("name\nAlice\nBob\n"));
    }
}

#[test]
fn test_positional_and_named_params() {
    let (_dir, url) = people_db();
    cmd()
        .args([
            "--url",
            &url,
            "query",
            "SELECT name FROM people WHERE id > ? ORDER BY id",
            "--param",
            "int:1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("name\nBob\nCarol\n"));

    cmd()
        .args([
            "--url",
            &url,
            "query",
            "SELECT id FROM people WHERE name = :name",
            "--named-param",
            "name=Carol",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("id\n3\n"));
}

#[test]
fn test_typed_param_literals() {
    cmd()
        .args([
            "--url",
            "sqlite::memory:",
            "query",
            "SELECT ? AS b, ? AS n, ? AS t",
            "--param",
            "hex:0102",
            "--param",
            "null",
            "--param",
            "text:null",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("b | n | t\n0102 | NULL | null\n"));
}

#[test]
fn test_json_output() {
    let (_dir, url) = people_db();
    cmd()
        .args([
            "--url",
            &url,
            "query",
            "SELECT id, nick FROM people WHERE id = 2",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"id\":2,\"nick\":null}\n"));
}

#[test]
fn test_empty_result_prints_header_only() {
    let (_dir, url) = people_db();
    cmd()
        .args(["--url", &url, "query", "SELECT id, name FROM people WHERE id > 100"])
        .assert()
        .success()
        .stdout(predicate::str::diff("id | name\n"));
}

#[test]
fn test_profile_runs_init_and_uses_output_settings() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("app.db");
    let config_path = dir.path().join("polysql.yaml");
    std::fs::write(
        &config_path,
        format!(
            "default_connection: local\n\
             connections:\n\
             \x20 local:\n\
             \x20   url: \"{}\"\n\
             \x20   init:\n\
             \x20     - \"CREATE TABLE IF NOT EXISTS t (x INTEGER, y TEXT)\"\n\
             output:\n\
             \x20 null_text: \"-\"\n\
             \x20 separator: \",\"\n",
            sqlite_url(&db)
        ),
    )
    .unwrap();
    let config = config_path.to_str().unwrap();

    cmd()
        .args(["--config", config, "exec", "INSERT INTO t VALUES (1, NULL)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Affected rows: 1"));

    cmd()
        .args(["--config", config, "query", "SELECT x, y FROM t"])
        .assert()
        .success()
        .stdout(predicate::str::diff("x,y\n1,-\n"));
}
