//! E2E tests for the read commands against a small on-disk data set.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FACTS: &str = r#"
foo-libs:
  rpms:
    python-foo-libs:
      arch: x86_64
      py_deps:
        "python(abi) = 2.7": 2
        "python(abi) = 3.9": 3
bar:
  rpms:
    python3-bar:
      arch: noarch
      py_deps:
        "python(abi) = 3.9": 3
baz:
  rpms:
    python2-baz:
      arch: noarch
      py_deps: {"python(abi) = 2.7": 2}
    python3-baz:
      arch: noarch
      py_deps: {"python(abi) = 3.9": 3}
    python3-baz-cli:
      arch: noarch
      py_deps: {"python(abi) = 3.9": 3}
    python3-baz-gui:
      arch: noarch
      py_deps: {"python(abi) = 3.9": 3}
app:
  rpms:
    python2-app:
      arch: noarch
      py_deps: {"python(abi) = 2.7": 2}
      requires: ["python-foo-libs", "python3-bar >= 1.0"]
six:
  is_misnamed: true
  rpms:
    python-six:
      arch: noarch
      py_deps: {"python(abi) = 2.7": 2}
web:
  rpms:
    python2-web:
      arch: noarch
      py_deps: {"python(abi) = 2.7": 2}
      requires: ["python-six", "python2-app"]
"#;

const GROUPS: &str = r"
webstack:
  name: Web stack
  packages: [web]
legacy:
  name: Legacy
  hidden: true
  packages: [baz]
";

const OVERRIDES: &str = r"
six:
  status: in-progress
  note: porting upstream
";

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("fedora.yaml"), FACTS).unwrap();
    fs::write(dir.path().join("groups.yaml"), GROUPS).unwrap();
    fs::write(dir.path().join("overrides.yaml"), OVERRIDES).unwrap();
    dir
}

fn portdb(data: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("portdb"));
    cmd.env("PORTDB_LOG", "error");
    cmd.env_remove("PORTDB_DATA");
    cmd.env_remove("PORTDB_FORMAT");
    cmd.arg("--datadir").arg(data);
    cmd
}

fn json(data: &Path, args: &[&str]) -> Value {
    let output = portdb(data)
        .args(args)
        .arg("--json")
        .output()
        .expect("portdb should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

#[test]
fn load_summarizes_the_data_set() {
    let dir = data_dir();
    let summary = json(dir.path(), &["load"]);
    assert_eq!(summary["collection"], "fedora");
    assert_eq!(summary["packages"], 6);
    assert_eq!(summary["groups"], 2);
    assert_eq!(summary["cycles"], 0);
    assert!(summary["graph_hash"].as_str().unwrap().starts_with("blake3:"));
}

#[test]
fn status_counts_finished_packages() {
    let dir = data_dir();
    let status = json(dir.path(), &["status"]);
    assert_eq!(status["total"], 6);
    assert_eq!(status["done"], 2);

    portdb(dir.path())
        .args(["status", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(" 33.3% fedora"));
}

#[test]
fn show_reports_derived_status_and_pending_requirements() {
    let dir = data_dir();
    let app = json(dir.path(), &["show", "app"]);
    assert_eq!(app["status"], "blocked");
    assert_eq!(app["derived"], "idle");
    assert_eq!(app["pending_requirements"], serde_json::json!(["foo-libs", "bar"]));
    assert_eq!(app["naming"], "ambiguous");

    let six = json(dir.path(), &["show", "six"]);
    assert_eq!(six["status"], "in-progress");
    assert_eq!(six["overridden"], true);
    assert_eq!(six["note"], "porting upstream");

    assert_eq!(json(dir.path(), &["show", "foo-libs"])["status"], "mispackaged");
    assert_eq!(json(dir.path(), &["show", "bar"])["status"], "py3-only");
    assert_eq!(json(dir.path(), &["show", "baz"])["status"], "legacy-leaf");
    assert_eq!(json(dir.path(), &["show", "web"])["status"], "blocked");
}

#[test]
fn unknown_package_fails_with_error_code() {
    let dir = data_dir();
    let output = portdb(dir.path())
        .args(["show", "ghost", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error on stderr");
    assert_eq!(err["error"]["error_code"], "E2001");
    assert!(err["error"]["message"].as_str().unwrap().contains("ghost"));

    portdb(dir.path())
        .args(["show", "ghost", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2001]"));
}

#[test]
fn report_filters_by_status() {
    let dir = data_dir();
    let rows = json(dir.path(), &["report", "--status", "blocked"]);
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["app", "web"]);
}

#[test]
fn deps_prints_requirement_tree() {
    let dir = data_dir();
    portdb(dir.path())
        .args(["deps", "web", "--format", "text"])
        .assert()
        .success()
        .stdout("web\n  app\n    bar\n    foo-libs\n  six\n");

    portdb(dir.path())
        .args(["deps", "web", "-x", "app", "--format", "text"])
        .assert()
        .success()
        .stdout("web\n  app (excluded)\n  six\n");
}

#[test]
fn group_membership_is_the_requirement_closure() {
    let dir = data_dir();
    let group = json(dir.path(), &["group", "webstack"]);
    let mut members: Vec<&str> = group["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    members.sort_unstable();
    assert_eq!(members, vec!["app", "bar", "foo-libs", "six", "web"]);

    let listing = json(dir.path(), &["group"]);
    assert_eq!(listing.as_array().unwrap().len(), 1, "hidden groups are not listed");
    let listing = json(dir.path(), &["group", "--all"]);
    assert_eq!(listing.as_array().unwrap().len(), 2);

    portdb(dir.path())
        .args(["group", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));
}

#[test]
fn naming_buckets_misnamed_providers_and_requirers() {
    let dir = data_dir();
    let buckets = json(dir.path(), &["naming"]);
    let bucket = |name: &str| -> Vec<String> {
        buckets
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["bucket"] == name)
            .unwrap()["packages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(bucket("misnamed"), vec!["six"]);
    assert_eq!(bucket("blocked"), vec!["web"]);
    assert_eq!(bucket("ambiguous"), vec!["app"]);
}

#[test]
fn tiers_put_finished_leaves_first() {
    let dir = data_dir();
    let tiers = json(dir.path(), &["tiers"]);
    let tier0: Vec<&str> = tiers["tiers"][0]["packages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap())
        .collect();
    assert_eq!(tiers["tiers"][0]["tier"], 0);
    assert_eq!(tier0, vec!["bar", "baz"]);
    assert_eq!(tiers["max_tier"], 3);
}

#[test]
fn cycles_reports_none_for_acyclic_data() {
    let dir = data_dir();
    portdb(dir.path())
        .args(["cycles", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependency cycles found."));
}
