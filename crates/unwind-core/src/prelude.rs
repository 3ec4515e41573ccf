//! Convenient re-exports for downstream crates.

pub use crate::config::{ScopeConfig, TraceFormat};
pub use crate::dispose::Disposer;
pub use crate::error::{Error, Result};
pub use crate::event::{EventKind, Locator, Retention, Site, TraceEvent};
pub use crate::id::{EntryId, ScopeId};
pub use crate::policy::Teardown;
