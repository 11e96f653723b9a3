//! On-disk caching of depsolve results and repository metadata.
//!
//! The cache root holds two trees sharing one size quota:
//!
//! - `rpmmd/`: repository metadata, populated by the solver itself (the
//!   client only hands the directory over and evicts from it);
//! - `solutions/`: one JSON file per depsolve request fingerprint.
//!
//! Writers create a temp file in the destination directory and rename it
//! into place, so readers never observe a partial file. Eviction takes an
//! advisory lock on the cache root for the duration of the cleanup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use fs2::FileExt;
use rpmmd::PackageSpec;

const SOLUTIONS_DIR: &str = "solutions";
const RPMMD_DIR: &str = "rpmmd";
const LOCK_FILE: &str = ".lock";

/// Default quota shared by metadata and solution caches: 1 GiB.
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub(crate) struct Cache {
    root: PathBuf,
    pub(crate) max_size: u64,
}

impl Cache {
    pub(crate) fn new(root: PathBuf) -> Cache {
        Cache {
            root,
            max_size: DEFAULT_MAX_CACHE_SIZE,
        }
    }

    /// Directory handed to the solver for repository metadata.
    pub(crate) fn rpmmd_dir(&self) -> PathBuf {
        self.root.join(RPMMD_DIR)
    }

    fn solution_path(&self, fingerprint: &str) -> PathBuf {
        self.root.join(SOLUTIONS_DIR).join(format!("{fingerprint}.json"))
    }

    /// Look up a cached solution. A missing file is a miss; an unreadable
    /// or unparsable file is treated as a miss and removed, since it can
    /// only be the leftover of an interrupted writer from before the
    /// tmp+rename discipline, or manual tampering.
    pub(crate) fn load_solution(&self, fingerprint: &str) -> Option<Vec<PackageSpec>> {
        let path = self.solution_path(fingerprint);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(specs) => Some(specs),
            Err(err) => {
                tracing::warn!(
                    "discarding corrupt cached solution {}: {err}",
                    path.display()
                );
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    /// Persist a solution atomically (write to a temp file, rename over).
    pub(crate) fn store_solution(&self, fingerprint: &str, specs: &[PackageSpec]) -> Result<()> {
        let path = self.solution_path(fingerprint);
        let dir = self.root.join(SOLUTIONS_DIR);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating solution cache directory {}", dir.display()))?;

        let tmp = dir.join(format!(".{fingerprint}.tmp"));
        let content = serde_json::to_vec(specs).context("serializing depsolve solution")?;
        fs::write(&tmp, content)
            .with_context(|| format!("writing solution cache file {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("renaming solution cache file into {}", path.display()))?;
        Ok(())
    }

    /// Evict oldest entries until the combined size of the metadata and
    /// solution caches fits under the quota. Advisory; safe to call
    /// between batches from any process sharing the cache root.
    pub(crate) fn clean(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating cache root {}", self.root.display()))?;
        let lock = fs::File::create(self.root.join(LOCK_FILE))
            .with_context(|| format!("opening cache lock in {}", self.root.display()))?;
        lock.lock_exclusive().context("locking cache root")?;

        let result = self.evict_locked();

        // fs2 unlocks on drop as well; unlock explicitly so an error from it
        // is not silently swallowed.
        fs2::FileExt::unlock(&lock).context("unlocking cache root")?;
        result
    }

    fn evict_locked(&self) -> Result<()> {
        let mut entries: Vec<(SystemTime, u64, PathBuf)> = Vec::new();
        for dir in [self.root.join(SOLUTIONS_DIR), self.root.join(RPMMD_DIR)] {
            collect_files(&dir, &mut entries)?;
        }

        let mut total: u64 = entries.iter().map(|(_, size, _)| size).sum();
        if total <= self.max_size {
            return Ok(());
        }

        // oldest first
        entries.sort_by_key(|(mtime, _, _)| *mtime);
        for (_, size, path) in entries {
            if total <= self.max_size {
                break;
            }
            match fs::remove_file(&path) {
                Ok(()) => total = total.saturating_sub(size),
                Err(err) => tracing::warn!("failed to evict {}: {err}", path.display()),
            }
        }
        Ok(())
    }
}

fn collect_files(dir: &Path, entries: &mut Vec<(SystemTime, u64, PathBuf)>) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir).with_context(|| format!("reading cache dir {}", dir.display()))?
    {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            collect_files(&entry.path(), entries)?;
        } else {
            let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((mtime, meta.len(), entry.path()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::TempDir;

    fn spec(name: &str) -> PackageSpec {
        PackageSpec {
            name: name.into(),
            version: "1.0".into(),
            release: "1".into(),
            arch: "x86_64".into(),
            ..Default::default()
        }
    }

    #[test]
    fn store_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());
        cache.store_solution("abcd", &[spec("bash")]).unwrap();
        let loaded = cache.load_solution("abcd").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "bash");
    }

    #[test]
    fn missing_solution_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());
        assert!(cache.load_solution("unknown").is_none());
    }

    #[test]
    fn corrupt_solution_is_removed_and_missed() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());
        let solutions = dir.path().join(SOLUTIONS_DIR);
        fs::create_dir_all(&solutions).unwrap();
        let path = solutions.join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(cache.load_solution("bad").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn clean_evicts_oldest_until_under_quota() {
        let dir = TempDir::new().unwrap();
        let mut cache = Cache::new(dir.path().to_path_buf());
        cache.store_solution("old", &[spec("bash"), spec("kernel")]).unwrap();
        // mtime resolution on some filesystems is coarse
        thread::sleep(Duration::from_millis(20));
        cache.store_solution("new", &[spec("vim")]).unwrap();

        cache.max_size = fs::metadata(cache.solution_path("new")).unwrap().len();
        cache.clean().unwrap();

        assert!(cache.load_solution("old").is_none());
        assert!(cache.load_solution("new").is_some());
    }

    #[test]
    fn clean_on_empty_cache_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());
        cache.clean().unwrap();
    }
}
