//! Path policies for user-supplied mountpoints, directories and files.
//!
//! A policy is a set of path prefixes, each either allowed or denied.
//! Checking a path finds the longest matching prefix and applies its
//! verdict; an `exact` entry matches only the path itself, not its
//! subtree.

use std::path::{Component, Path};

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy)]
struct Entry {
    path: &'static str,
    deny: bool,
    /// Applies to this path only; descendants fall through to the parent.
    exact: bool,
}

/// A prefix-based allow/deny policy over absolute paths.
#[derive(Debug, Clone)]
pub struct PathPolicies {
    what: &'static str,
    entries: &'static [Entry],
}

impl PathPolicies {
    /// Check one path against the policy. Paths must be absolute and
    /// normalized (no `..` or `.` components).
    pub fn check(&self, path: &str) -> Result<()> {
        let p = Path::new(path);
        if !p.is_absolute() {
            bail!("path {path:?} must be absolute");
        }
        if p.components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
        {
            bail!("path {path:?} must be canonical");
        }

        let mut best: Option<&Entry> = None;
        for entry in self.entries {
            let matches = if entry.exact {
                p == Path::new(entry.path)
            } else {
                p.starts_with(entry.path)
            };
            if matches {
                let better = match best {
                    None => true,
                    Some(prev) => entry.path.len() > prev.path.len() || (entry.exact && !prev.exact),
                };
                if better {
                    best = Some(entry);
                }
            }
        }

        match best {
            Some(entry) if !entry.deny => Ok(()),
            Some(entry) => bail!(
                "path {path:?} is not allowed for {}: {:?} and its subtree are reserved",
                self.what,
                entry.path
            ),
            None => bail!("path {path:?} is not allowed for {}", self.what),
        }
    }
}

const MOUNTPOINT_ENTRIES: &[Entry] = &[
    Entry { path: "/", deny: false, exact: false },
    Entry { path: "/bin", deny: true, exact: false },
    Entry { path: "/boot", deny: false, exact: true },
    Entry { path: "/boot/efi", deny: true, exact: false },
    Entry { path: "/dev", deny: true, exact: false },
    Entry { path: "/etc", deny: true, exact: false },
    Entry { path: "/lib", deny: true, exact: false },
    Entry { path: "/lib64", deny: true, exact: false },
    Entry { path: "/lost+found", deny: true, exact: false },
    Entry { path: "/proc", deny: true, exact: false },
    Entry { path: "/run", deny: true, exact: false },
    Entry { path: "/sbin", deny: true, exact: false },
    Entry { path: "/sys", deny: true, exact: false },
    Entry { path: "/sysroot", deny: true, exact: false },
    Entry { path: "/tmp", deny: true, exact: false },
    Entry { path: "/usr", deny: false, exact: true },
    Entry { path: "/var/run", deny: true, exact: false },
    Entry { path: "/var/tmp", deny: true, exact: false },
];

/// Where blueprint `Filesystem` customizations may put mountpoints.
pub fn mountpoint_policies() -> PathPolicies {
    PathPolicies {
        what: "mountpoints",
        entries: MOUNTPOINT_ENTRIES,
    }
}

const CUSTOM_DIRECTORIES_ENTRIES: &[Entry] = &[
    Entry { path: "/etc", deny: false, exact: false },
    Entry { path: "/root", deny: false, exact: false },
    Entry { path: "/srv", deny: false, exact: false },
    Entry { path: "/var", deny: false, exact: false },
    Entry { path: "/var/run", deny: true, exact: false },
    Entry { path: "/var/tmp", deny: true, exact: false },
];

/// Where blueprint `Directories` customizations may create directories.
pub fn custom_directories_policies() -> PathPolicies {
    PathPolicies {
        what: "custom directories",
        entries: CUSTOM_DIRECTORIES_ENTRIES,
    }
}

const CUSTOM_FILES_ENTRIES: &[Entry] = &[
    Entry { path: "/etc", deny: false, exact: false },
    Entry { path: "/etc/fstab", deny: true, exact: false },
    Entry { path: "/etc/passwd", deny: true, exact: false },
    Entry { path: "/etc/group", deny: true, exact: false },
    Entry { path: "/etc/shadow", deny: true, exact: false },
    Entry { path: "/etc/gshadow", deny: true, exact: false },
    Entry { path: "/root", deny: false, exact: false },
    Entry { path: "/srv", deny: false, exact: false },
    Entry { path: "/var", deny: false, exact: false },
    Entry { path: "/var/run", deny: true, exact: false },
    Entry { path: "/var/tmp", deny: true, exact: false },
];

/// Where blueprint `Files` customizations may write files.
pub fn custom_files_policies() -> PathPolicies {
    PathPolicies {
        what: "custom files",
        entries: CUSTOM_FILES_ENTRIES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_and_data_mountpoints_are_allowed() {
        let policy = mountpoint_policies();
        for path in ["/", "/home", "/opt", "/srv", "/var/lib/data", "/boot"] {
            assert!(policy.check(path).is_ok(), "{path} should be allowed");
        }
    }

    #[test]
    fn reserved_mountpoints_are_denied() {
        let policy = mountpoint_policies();
        for path in ["/proc", "/sys/kernel", "/boot/efi", "/etc", "/run/user"] {
            assert!(policy.check(path).is_err(), "{path} should be denied");
        }
    }

    #[test]
    fn usr_is_allowed_only_exactly() {
        let policy = mountpoint_policies();
        assert!(policy.check("/usr").is_ok());
        assert!(policy.check("/usr/local").is_err());
    }

    #[test]
    fn relative_and_non_canonical_paths_are_rejected() {
        let policy = mountpoint_policies();
        assert!(policy.check("home").is_err());
        assert!(policy.check("/home/../etc").is_err());
    }

    #[test]
    fn custom_files_cannot_touch_account_databases() {
        let policy = custom_files_policies();
        assert!(policy.check("/etc/motd").is_ok());
        assert!(policy.check("/etc/shadow").is_err());
        assert!(policy.check("/usr/bin/evil").is_err());
    }

    #[test]
    fn custom_directories_stay_out_of_usr() {
        let policy = custom_directories_policies();
        assert!(policy.check("/etc/systemd/system").is_ok());
        assert!(policy.check("/usr/share/extra").is_err());
    }
}
