//! End-to-end tests against a scripted fake solver.
//!
//! Each test writes a small shell script standing in for the dnf-json
//! binary. The script consumes stdin, appends to an invocation counter,
//! and prints a canned response, which lets the tests observe caching
//! behavior and error propagation without a real depsolver.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dnfjson::{BaseSolver, SolverError};
use rpmmd::{PackageSet, RepoConfig};
use tempfile::TempDir;

const DEPSOLVE_RESPONSE: &str = r#"{
  "solver": "dnf5",
  "packages": [
    {"name": "bash", "epoch": 0, "version": "5.2.15", "release": "3.fc38",
     "arch": "x86_64", "repo_id": "fedora",
     "remote_location": "https://example.org/bash-5.2.15-3.fc38.x86_64.rpm",
     "checksum": "sha256:1111111111111111111111111111111111111111111111111111111111111111"},
    {"name": "bind", "epoch": 32, "version": "9.18.0", "release": "1.fc38",
     "arch": "x86_64", "repo_id": "fedora",
     "remote_location": "https://example.org/bind-9.18.0-1.fc38.x86_64.rpm",
     "checksum": "sha256:2222222222222222222222222222222222222222222222222222222222222222"}
  ],
  "repos": {"fedora": {}}
}"#;

fn write_fake_solver(dir: &Path, counter: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-dnf-json");
    let script = format!(
        "#!/bin/sh\ncat > /dev/null\necho run >> {}\n{}\n",
        counter.display(),
        body
    );
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn invocations(counter: &Path) -> usize {
    fs::read_to_string(counter).map(|s| s.lines().count()).unwrap_or(0)
}

fn test_chain() -> Vec<PackageSet> {
    vec![PackageSet {
        include: vec!["bash".into(), "bind".into()],
        exclude: Vec::new(),
        repositories: vec![RepoConfig {
            id: "fedora".into(),
            base_urls: vec!["https://example.org/f38".into()],
            check_gpg: Some(true),
            ..Default::default()
        }],
    }]
}

fn fake_base(dir: &TempDir, response_body: &str) -> (BaseSolver, PathBuf) {
    let counter = dir.path().join("invocations");
    let script = write_fake_solver(
        dir.path(),
        &counter,
        &format!("cat <<'EOF'\n{response_body}\nEOF"),
    );
    let mut base = BaseSolver::new(dir.path().join("cache"));
    base.set_solver_path(script);
    (base, counter)
}

#[test]
fn depsolve_returns_resolved_packages() {
    let dir = TempDir::new().unwrap();
    let (base, _) = fake_base(&dir, DEPSOLVE_RESPONSE);
    let solver = base.with_config("platform:f38", "38", "x86_64", "fedora-38");

    let specs = solver.depsolve(&test_chain()).unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].name, "bash");
    assert_eq!(specs[1].nevra(), "bind-32:9.18.0-1.fc38.x86_64");
    assert!(specs[1].remote_location.ends_with(".rpm"));
}

#[test]
fn second_depsolve_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let (base, counter) = fake_base(&dir, DEPSOLVE_RESPONSE);
    let solver = base.with_config("platform:f38", "38", "x86_64", "fedora-38");

    let first = solver.depsolve(&test_chain()).unwrap();
    assert_eq!(invocations(&counter), 1);

    let second = solver.depsolve(&test_chain()).unwrap();
    assert_eq!(first, second);
    assert_eq!(invocations(&counter), 1, "cache hit must not invoke the solver");
}

#[test]
fn different_arch_misses_the_cache() {
    let dir = TempDir::new().unwrap();
    let (base, counter) = fake_base(&dir, DEPSOLVE_RESPONSE);

    base.with_config("platform:f38", "38", "x86_64", "fedora-38")
        .depsolve(&test_chain())
        .unwrap();
    base.with_config("platform:f38", "38", "aarch64", "fedora-38")
        .depsolve(&test_chain())
        .unwrap();
    assert_eq!(invocations(&counter), 2);
}

#[test]
fn solver_error_document_maps_to_typed_error() {
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("invocations");
    let script = write_fake_solver(
        dir.path(),
        &counter,
        "echo '{\"kind\": \"DepsolveError\", \"reason\": \"nothing provides libfoo\"}'\nexit 1",
    );
    let mut base = BaseSolver::new(dir.path().join("cache"));
    base.set_solver_path(script);
    let solver = base.with_config("platform:f38", "38", "x86_64", "fedora-38");

    let err = solver.depsolve(&test_chain()).unwrap_err();
    assert!(matches!(err, SolverError::Depsolve { .. }), "got: {err}");
    assert!(err.to_string().contains("nothing provides libfoo"));
}

#[test]
fn solver_crash_is_a_transport_error() {
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("invocations");
    let script = write_fake_solver(dir.path(), &counter, "echo 'segfault' >&2\nexit 139");
    let mut base = BaseSolver::new(dir.path().join("cache"));
    base.set_solver_path(script);
    let solver = base.with_config("platform:f38", "38", "x86_64", "fedora-38");

    let err = solver.depsolve(&test_chain()).unwrap_err();
    assert!(matches!(err, SolverError::Transport { .. }), "got: {err}");
}

#[test]
fn slow_solver_times_out() {
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("invocations");
    let script = write_fake_solver(dir.path(), &counter, "sleep 30");
    let mut base = BaseSolver::new(dir.path().join("cache"));
    base.set_solver_path(script);
    let mut solver = base.with_config("platform:f38", "38", "x86_64", "fedora-38");
    solver.set_timeout(Duration::from_millis(250));

    let err = solver.depsolve(&test_chain()).unwrap_err();
    assert!(matches!(err, SolverError::Timeout(_)), "got: {err}");
}

#[test]
fn search_metadata_returns_package_infos() {
    let dir = TempDir::new().unwrap();
    let response = r#"{
      "packages": [
        {"name": "bind", "summary": "DNS server", "version": "9.18.0",
         "release": "1.fc38", "arch": "x86_64"}
      ]
    }"#;
    let (base, _) = fake_base(&dir, response);
    let solver = base.with_config("platform:f38", "38", "x86_64", "fedora-38");

    let repos = vec![RepoConfig {
        id: "fedora".into(),
        base_urls: vec!["https://example.org/f38".into()],
        ..Default::default()
    }];
    let infos = solver.search_metadata(&repos, &["bind".to_string()]).unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].summary, "DNS server");
}

#[test]
fn cache_cleanup_respects_quota() {
    let dir = TempDir::new().unwrap();
    let (base, counter) = fake_base(&dir, DEPSOLVE_RESPONSE);
    let solver = base.with_config("platform:f38", "38", "x86_64", "fedora-38");
    solver.depsolve(&test_chain()).unwrap();

    let mut small = base.clone();
    small.set_max_cache_size(1);
    small.clean_cache().unwrap();

    // quota of one byte evicts the stored solution, so the next call
    // invokes the solver again
    solver.depsolve(&test_chain()).unwrap();
    assert_eq!(invocations(&counter), 2);
}
