#![forbid(unsafe_code)]
//! unwind-core: shared contracts for scope-bound resource management.
//!
//! This crate holds the *interfaces* and plain data the manager in
//! `unwind-scope` is built on: the disposer contract, the disposal policy,
//! identifiers, trace events and configuration. No I/O lives here.

pub mod config;
pub mod dispose;
pub mod error;
pub mod event;
pub mod id;
pub mod policy;
pub mod prelude;

pub use config::{ScopeConfig, TraceFormat};
pub use dispose::Disposer;
pub use error::{Error, Result};
pub use event::{EventKind, Locator, Retention, Site, TraceEvent};
pub use id::{EntryId, ScopeId};
pub use policy::Teardown;
