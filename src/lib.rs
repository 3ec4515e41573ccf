#![forbid(unsafe_code)]
//! unwind: scope-bound resource management with success/error disposal
//! policies.
//!
//! Facade over the workspace crates: `unwind-core` holds the disposer
//! contract, disposal policy, trace events and config; `unwind-scope` holds
//! the manager itself, indirect slots and the trace sink.

pub use unwind_core::{
    Disposer, EntryId, Error, Locator, Result, Retention, ScopeConfig, ScopeId, Site, Teardown,
    TraceEvent, TraceFormat,
};
pub use unwind_scope::{Handle, Kept, Scope, Slot, TraceBuffer, TraceSink};
