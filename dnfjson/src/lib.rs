//! Client for the external dnf-json dependency solver.
//!
//! The solver is a separate binary speaking a one-shot JSON protocol: the
//! client spawns it per request, writes one request document to its stdin,
//! and reads one response document from its stdout. Results are cached on
//! disk keyed by a fingerprint of everything that affects the outcome, so
//! repeated plans for the same inputs never re-invoke the solver.
//!
//! A [`BaseSolver`] owns the cache root; [`BaseSolver::with_config`] binds
//! the four dimensions that affect solve results (module platform ID,
//! release version, architecture, distribution) and yields a [`Solver`].

mod cache;
mod error;
mod protocol;

pub use cache::DEFAULT_MAX_CACHE_SIZE;
pub use error::SolverError;
pub use protocol::PackageInfo;

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use rpmmd::{PackageSet, PackageSpec, RepoConfig};

use cache::Cache;
use protocol::{Arguments, ErrorResponse, MetadataResponse, Request, Response, Search, Transaction, WireRepo};

/// Overrides the path to the solver binary.
pub const SOLVER_ENV: &str = "OSBUILD_SOLVER";
/// Overrides the cache root directory.
pub const SOLVER_CACHE_ENV: &str = "OSBUILD_SOLVER_CACHE";

const DEFAULT_SOLVER_PATH: &str = "/usr/libexec/osbuild-composer/dnf-json";

/// Grace period between SIGTERM and SIGKILL when a call times out.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Known cross-distribution package name mismatches, applied to both the
/// include and exclude lists before a request is framed. An extension
/// point; one entry today.
const PACKAGE_NAME_OVERRIDES: &[(&str, &str)] = &[("python3-pyyaml", "python3-PyYAML")];

/// A solver bound to a cache root but not yet to a distribution.
#[derive(Debug, Clone)]
pub struct BaseSolver {
    cache: Cache,
    solver_cmd: PathBuf,
}

impl BaseSolver {
    /// Create a solver rooted at `cache_root`. The `OSBUILD_SOLVER` and
    /// `OSBUILD_SOLVER_CACHE` environment variables override the solver
    /// binary and the cache root respectively.
    pub fn new(cache_root: impl Into<PathBuf>) -> BaseSolver {
        let cache_root = std::env::var_os(SOLVER_CACHE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| cache_root.into());
        let solver_cmd = std::env::var_os(SOLVER_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOLVER_PATH));
        BaseSolver {
            cache: Cache::new(cache_root),
            solver_cmd,
        }
    }

    /// Bound the combined size of the metadata and solution caches.
    pub fn set_max_cache_size(&mut self, bytes: u64) {
        self.cache.max_size = bytes;
    }

    /// Point at a specific solver binary, bypassing the default path and
    /// the `OSBUILD_SOLVER` override. Used by tests and embedders that
    /// ship their own solver.
    pub fn set_solver_path(&mut self, path: impl Into<PathBuf>) {
        self.solver_cmd = path.into();
    }

    /// Evict oldest cache entries down to the configured quota. Advisory;
    /// may be called between batches by any process sharing the root.
    pub fn clean_cache(&self) -> anyhow::Result<()> {
        self.cache.clean()
    }

    /// Bind the dimensions that affect solve outcomes.
    pub fn with_config(
        &self,
        module_platform_id: impl Into<String>,
        releasever: impl Into<String>,
        arch: impl Into<String>,
        distro: impl Into<String>,
    ) -> Solver {
        Solver {
            config: SolverConfig {
                module_platform_id: module_platform_id.into(),
                releasever: releasever.into(),
                arch: arch.into(),
                distro: distro.into(),
            },
            cache: self.cache.clone(),
            solver_cmd: self.solver_cmd.clone(),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
struct SolverConfig {
    module_platform_id: String,
    releasever: String,
    arch: String,
    distro: String,
}

/// A fully configured solver client.
#[derive(Debug, Clone)]
pub struct Solver {
    config: SolverConfig,
    cache: Cache,
    solver_cmd: PathBuf,
    timeout: Option<Duration>,
}

impl Solver {
    /// Set a deadline for each solver invocation. On expiry the subprocess
    /// is terminated (TERM, then KILL after a grace period) and
    /// [`SolverError::Timeout`] is returned.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Solve a package-set chain into a flat list of resolved packages.
    ///
    /// Each set in the chain is a transaction atop the previous ones, so
    /// excludes in later sets may remove packages pulled in by earlier
    /// sets. The union of installed packages after the last transaction is
    /// returned. Results are served from the solution cache when the
    /// request fingerprint matches a previous call.
    pub fn depsolve(&self, chain: &[PackageSet]) -> Result<Vec<PackageSpec>, SolverError> {
        if chain.is_empty() {
            return Err(SolverError::config("empty package-set chain"));
        }
        let chain: Vec<PackageSet> = chain.iter().map(apply_name_overrides).collect();
        for (idx, set) in chain.iter().enumerate() {
            if set.repositories.is_empty() {
                return Err(SolverError::config(format!(
                    "package set {idx} in chain has no repositories"
                )));
            }
        }

        let fingerprint = self.fingerprint(&chain);
        if let Some(specs) = self.cache.load_solution(&fingerprint) {
            return Ok(specs);
        }

        let (repos, transactions) = wire_chain(&chain);
        let request = self.request("depsolve", repos, transactions, None);
        let stdout = self.invoke(&request)?;
        let response: Response = parse_result(&stdout, &fingerprint)?;

        if let Err(err) = self.cache.store_solution(&fingerprint, &response.packages) {
            // a cold cache next time, not a failed request
            tracing::warn!("failed to cache depsolve solution {fingerprint}: {err:#}");
        }
        Ok(response.packages)
    }

    /// Query package metadata for a set of names without solving.
    pub fn search_metadata(
        &self,
        repos: &[RepoConfig],
        names: &[String],
    ) -> Result<Vec<PackageInfo>, SolverError> {
        if names.is_empty() {
            return Err(SolverError::config("no package names to search for"));
        }
        let wire = wire_repos(repos);
        let request = self.request(
            "search",
            wire,
            Vec::new(),
            Some(Search {
                packages: names.to_vec(),
            }),
        );
        let stdout = self.invoke(&request)?;
        let response: MetadataResponse = parse_result(&stdout, "search")?;
        Ok(response.packages)
    }

    /// Dump all package metadata the given repositories provide.
    pub fn dump(&self, repos: &[RepoConfig]) -> Result<Vec<PackageInfo>, SolverError> {
        let wire = wire_repos(repos);
        let request = self.request("dump", wire, Vec::new(), None);
        let stdout = self.invoke(&request)?;
        let response: MetadataResponse = parse_result(&stdout, "dump")?;
        Ok(response.packages)
    }

    fn request(
        &self,
        command: &'static str,
        repos: Vec<WireRepo>,
        transactions: Vec<Transaction>,
        search: Option<Search>,
    ) -> Request {
        Request {
            command,
            arch: self.config.arch.clone(),
            module_platform_id: self.config.module_platform_id.clone(),
            releasever: self.config.releasever.clone(),
            cachedir: self.cache.rpmmd_dir().to_string_lossy().into_owned(),
            arguments: Arguments {
                repos,
                transactions,
                search,
            },
        }
    }

    /// Stable hash over everything that affects a depsolve outcome.
    ///
    /// Include/Exclude ordering is significant and preserved;
    /// repositories are sorted by id for hashing only.
    fn fingerprint(&self, chain: &[PackageSet]) -> String {
        let mut hasher = Sha256::new();
        let mut feed = |part: &str| {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        };
        feed(&self.config.module_platform_id);
        feed(&self.config.releasever);
        feed(&self.config.arch);
        feed(&self.config.distro);
        for set in chain {
            feed("set");
            for name in &set.include {
                feed(name);
            }
            feed("exclude");
            for name in &set.exclude {
                feed(name);
            }
            let mut repos: Vec<&RepoConfig> = set.repositories.iter().collect();
            repos.sort_by(|a, b| a.id.cmp(&b.id));
            for repo in repos {
                feed("repo");
                feed(&repo.id);
                for url in &repo.base_urls {
                    feed(url);
                }
                feed(&format!("{:?}", repo.check_gpg));
                for module in &repo.enabled_modules {
                    feed(module);
                }
                if let Some(checksum) = &repo.metadata_checksum {
                    feed(checksum);
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// Spawn the solver, write the request, collect stdout, enforce the
    /// deadline. Non-zero exit with a parsable error document becomes a
    /// typed solver error at the caller; everything else is transport.
    fn invoke(&self, request: &Request) -> Result<Vec<u8>, SolverError> {
        let request_bytes = serde_json::to_vec(request)
            .map_err(|err| SolverError::transport(format!("encoding request: {err}")))?;

        std::fs::create_dir_all(self.cache.rpmmd_dir())
            .map_err(|err| SolverError::transport(format!("creating metadata cache: {err}")))?;

        let mut child = Command::new(&self.solver_cmd)
            .arg("dnf.json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                SolverError::transport(format!(
                    "spawning solver '{}': {err}",
                    self.solver_cmd.display()
                ))
            })?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin
            .write_all(&request_bytes)
            .map_err(|err| SolverError::transport(format!("writing request: {err}")))?;
        drop(stdin);

        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
        let stdout_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            std::io::Read::read_to_end(&mut stdout_pipe, &mut buf).map(|_| buf)
        });
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            std::io::Read::read_to_end(&mut stderr_pipe, &mut buf).map(|_| buf)
        });

        let status = self.wait_with_deadline(&mut child)?;
        let stdout = stdout_reader
            .join()
            .expect("stdout reader panicked")
            .map_err(|err| SolverError::transport(format!("reading solver stdout: {err}")))?;
        let stderr = stderr_reader
            .join()
            .expect("stderr reader panicked")
            .unwrap_or_default();

        if !status.success() && serde_json::from_slice::<ErrorResponse>(&stdout).is_err() {
            return Err(SolverError::transport(format!(
                "solver exited with {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(stdout)
    }

    fn wait_with_deadline(
        &self,
        child: &mut Child,
    ) -> Result<std::process::ExitStatus, SolverError> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(err) => {
                    return Err(SolverError::transport(format!("waiting for solver: {err}")))
                }
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    terminate(child);
                    return Err(SolverError::Timeout(self.timeout.unwrap()));
                }
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

/// TERM first, KILL after the grace period.
fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    let _ = kill(pid, Signal::SIGTERM);

    let grace_end = Instant::now() + KILL_GRACE;
    while Instant::now() < grace_end {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn apply_name_overrides(set: &PackageSet) -> PackageSet {
    let rename = |name: &String| -> String {
        for (from, to) in PACKAGE_NAME_OVERRIDES {
            if name == from {
                return (*to).to_string();
            }
        }
        name.clone()
    };
    PackageSet {
        include: set.include.iter().map(rename).collect(),
        exclude: set.exclude.iter().map(rename).collect(),
        repositories: set.repositories.clone(),
    }
}

/// Union of repositories across the chain (deduplicated by wire id) plus
/// one transaction per set referencing its repositories by id.
fn wire_chain(chain: &[PackageSet]) -> (Vec<WireRepo>, Vec<Transaction>) {
    let mut repos: Vec<WireRepo> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut transactions = Vec::with_capacity(chain.len());

    for set in chain {
        let mut repo_ids = Vec::with_capacity(set.repositories.len());
        for repo in &set.repositories {
            let wire = WireRepo::from_config(repo, format!("repo-{}", repos.len()));
            let id = wire.id.clone();
            if seen.insert(id.clone()) {
                repos.push(wire);
            }
            repo_ids.push(id);
        }
        transactions.push(Transaction {
            package_specs: set.include.clone(),
            exclude_specs: set.exclude.clone(),
            repo_ids,
        });
    }
    (repos, transactions)
}

fn wire_repos(repos: &[RepoConfig]) -> Vec<WireRepo> {
    repos
        .iter()
        .enumerate()
        .map(|(idx, repo)| WireRepo::from_config(repo, format!("repo-{idx}")))
        .collect()
}

/// Decode a result document, turning `{kind, reason}` into a typed error.
fn parse_result<T: serde::de::DeserializeOwned>(
    stdout: &[u8],
    fingerprint: &str,
) -> Result<T, SolverError> {
    if let Ok(err) = serde_json::from_slice::<ErrorResponse>(stdout) {
        return Err(SolverError::from_response(&err.kind, err.reason, fingerprint));
    }
    serde_json::from_slice(stdout).map_err(|err| {
        SolverError::transport(format!(
            "malformed solver response: {err}: {}",
            String::from_utf8_lossy(&stdout[..stdout.len().min(256)])
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver(tmp: &std::path::Path) -> Solver {
        BaseSolver::new(tmp).with_config("platform:f38", "38", "x86_64", "fedora-38")
    }

    fn chain_with_repo(include: &[&str]) -> Vec<PackageSet> {
        vec![PackageSet {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            repositories: vec![RepoConfig {
                id: "fedora".into(),
                base_urls: vec!["https://example.org/f38".into()],
                ..Default::default()
            }],
        }]
    }

    #[test]
    fn fingerprint_is_stable_across_repo_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let solver = solver(tmp.path());

        let repo_a = RepoConfig {
            id: "a".into(),
            ..Default::default()
        };
        let repo_b = RepoConfig {
            id: "b".into(),
            ..Default::default()
        };
        let mut chain = chain_with_repo(&["kernel"]);
        chain[0].repositories = vec![repo_a.clone(), repo_b.clone()];
        let fp_ab = solver.fingerprint(&chain);
        chain[0].repositories = vec![repo_b, repo_a];
        let fp_ba = solver.fingerprint(&chain);
        assert_eq!(fp_ab, fp_ba);
    }

    #[test]
    fn fingerprint_is_sensitive_to_include_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let solver = solver(tmp.path());
        let fp_1 = solver.fingerprint(&chain_with_repo(&["a", "b"]));
        let fp_2 = solver.fingerprint(&chain_with_repo(&["b", "a"]));
        assert_ne!(fp_1, fp_2);
    }

    #[test]
    fn fingerprint_is_sensitive_to_config_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let base = BaseSolver::new(tmp.path());
        let chain = chain_with_repo(&["kernel"]);
        let fp_x86 = base
            .with_config("platform:f38", "38", "x86_64", "fedora-38")
            .fingerprint(&chain);
        let fp_arm = base
            .with_config("platform:f38", "38", "aarch64", "fedora-38")
            .fingerprint(&chain);
        assert_ne!(fp_x86, fp_arm);
    }

    #[test]
    fn name_overrides_apply_to_include_and_exclude() {
        let set = PackageSet {
            include: vec!["python3-pyyaml".into(), "bash".into()],
            exclude: vec!["python3-pyyaml".into()],
            repositories: Vec::new(),
        };
        let mapped = apply_name_overrides(&set);
        assert_eq!(mapped.include, vec!["python3-PyYAML", "bash"]);
        assert_eq!(mapped.exclude, vec!["python3-PyYAML"]);
    }

    #[test]
    fn empty_chain_is_a_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = solver(tmp.path()).depsolve(&[]).unwrap_err();
        assert!(matches!(err, SolverError::Config { .. }));
    }

    #[test]
    fn set_without_repositories_is_a_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let chain = vec![PackageSet {
            include: vec!["bash".into()],
            ..Default::default()
        }];
        let err = solver(tmp.path()).depsolve(&chain).unwrap_err();
        assert!(matches!(err, SolverError::Config { .. }));
    }

    #[test]
    fn wire_chain_dedups_repos_and_keeps_per_set_ids() {
        let shared = RepoConfig {
            id: "baseos".into(),
            ..Default::default()
        };
        let extra = RepoConfig {
            id: "appstream".into(),
            ..Default::default()
        };
        let chain = vec![
            PackageSet {
                include: vec!["kernel".into()],
                repositories: vec![shared.clone()],
                ..Default::default()
            },
            PackageSet {
                include: vec!["bind".into()],
                repositories: vec![shared, extra],
                ..Default::default()
            },
        ];
        let (repos, transactions) = wire_chain(&chain);
        assert_eq!(repos.len(), 2);
        assert_eq!(transactions[0].repo_ids, vec!["baseos"]);
        assert_eq!(transactions[1].repo_ids, vec!["baseos", "appstream"]);
    }

    #[test]
    fn error_document_becomes_typed_error() {
        let doc = br#"{"kind": "DepsolveError", "reason": "nothing provides libfoo"}"#;
        let err = parse_result::<Response>(doc, "fp").unwrap_err();
        assert!(matches!(err, SolverError::Depsolve { .. }));
        assert!(err.to_string().contains("nothing provides libfoo"));
    }

    #[test]
    fn malformed_document_is_transport_error() {
        let err = parse_result::<Response>(b"not json at all", "fp").unwrap_err();
        assert!(matches!(err, SolverError::Transport { .. }));
    }
}
