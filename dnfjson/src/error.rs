//! Solver error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the dnf-json solver client.
///
/// The first four variants carry the solver's textual reason verbatim,
/// together with the fingerprint of the request that produced them.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("no solution found (request {fingerprint}): {reason}")]
    Depsolve { fingerprint: String, reason: String },

    #[error("package marking failed (request {fingerprint}): {reason}")]
    Marking { fingerprint: String, reason: String },

    #[error("repository error (request {fingerprint}): {reason}")]
    Repo { fingerprint: String, reason: String },

    #[error("solver timed out after {0:?}")]
    Timeout(Duration),

    #[error("solver transport error: {reason}")]
    Transport { reason: String },

    #[error("invalid solver configuration: {reason}")]
    Config { reason: String },
}

impl SolverError {
    /// Map an error response `{kind, reason}` from the solver onto a typed
    /// variant. Unknown kinds degrade to a transport error so that a newer
    /// solver never gets misreported as a dependency problem.
    pub(crate) fn from_response(kind: &str, reason: String, fingerprint: &str) -> SolverError {
        let fingerprint = fingerprint.to_string();
        match kind {
            "DepsolveError" => SolverError::Depsolve { fingerprint, reason },
            "MarkingError" | "MarkingErrors" => SolverError::Marking { fingerprint, reason },
            "RepoError" | "RepoInfoError" => SolverError::Repo { fingerprint, reason },
            other => SolverError::Transport {
                reason: format!("solver reported unknown error kind '{other}': {reason}"),
            },
        }
    }

    pub(crate) fn transport(reason: impl Into<String>) -> SolverError {
        SolverError::Transport {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> SolverError {
        SolverError::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_map_to_variants() {
        let err = SolverError::from_response("DepsolveError", "nothing provides foo".into(), "fp");
        assert!(matches!(err, SolverError::Depsolve { .. }));
        assert!(err.to_string().contains("nothing provides foo"));
        assert!(err.to_string().contains("fp"));

        let err = SolverError::from_response("MarkingErrors", "no package bar".into(), "fp");
        assert!(matches!(err, SolverError::Marking { .. }));

        let err = SolverError::from_response("RepoError", "metadata fetch failed".into(), "fp");
        assert!(matches!(err, SolverError::Repo { .. }));
    }

    #[test]
    fn unknown_kind_degrades_to_transport() {
        let err = SolverError::from_response("FutureError", "??".into(), "fp");
        assert!(matches!(err, SolverError::Transport { .. }));
        assert!(err.to_string().contains("FutureError"));
    }
}
