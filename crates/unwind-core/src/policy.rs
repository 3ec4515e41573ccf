//! Disposal policy applied by a teardown pass.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::Retention;

/// The exit path a scope is torn down on.
///
/// All three share one pass over the entries; they differ only in which
/// entries that pass releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Teardown {
    /// Release temporaries, hand kept entries back to the caller.
    Success,
    /// The function succeeded but has no result to return: release everything.
    DiscardAllOnSuccess,
    /// Failure path: there is no result to preserve, release everything.
    Error,
}

impl Teardown {
    /// Whether every entry goes, regardless of its retention.
    pub const fn force_all(self) -> bool {
        !matches!(self, Teardown::Success)
    }

    pub const fn must_dispose(self, retention: Retention) -> bool {
        self.force_all() || !retention.keeps_on_success()
    }
}

impl fmt::Display for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Teardown::Success => "success",
            Teardown::DiscardAllOnSuccess => "discard-all-on-success",
            Teardown::Error => "error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_keeps_results() {
        assert!(Teardown::Success.must_dispose(Retention::Always));
        assert!(!Teardown::Success.must_dispose(Retention::KeepOnSuccess));
    }

    #[test]
    fn test_forced_paths_release_everything() {
        for policy in [Teardown::Error, Teardown::DiscardAllOnSuccess] {
            assert!(policy.force_all());
            assert!(policy.must_dispose(Retention::Always));
            assert!(policy.must_dispose(Retention::KeepOnSuccess));
        }
        assert!(!Teardown::Success.force_all());
    }
}
