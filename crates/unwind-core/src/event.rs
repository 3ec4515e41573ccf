//! Trace events emitted by scopes on registration and disposal.
//!
//! Events are purely diagnostic. Nothing in a teardown pass reads them back.

use serde::Serialize;
use std::fmt;
use std::panic::Location;

use crate::error::Result;
use crate::id::{EntryId, ScopeId};

/// How a tracked resource is found at teardown time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    /// The scope owns the resource itself.
    Direct,
    /// The scope holds a shared slot and disposes whatever it contains at teardown.
    Indirect,
}

impl Locator {
    /// Single-letter tag used in text traces.
    pub const fn tag(self) -> char {
        match self {
            Locator::Direct => 'M',
            Locator::Indirect => 'P',
        }
    }
}

/// Whether an entry survives a successful teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Temporary: released on every exit path.
    Always,
    /// Result: handed back on success, released on failure.
    KeepOnSuccess,
}

impl Retention {
    pub const fn keeps_on_success(self) -> bool {
        matches!(self, Retention::KeepOnSuccess)
    }

    pub const fn tag(self) -> char {
        match self {
            Retention::Always => 'd',
            Retention::KeepOnSuccess => 'k',
        }
    }
}

/// Source location a resource was registered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Site {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl Site {
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&'static Location<'static>> for Site {
    fn from(loc: &'static Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
            column: loc.column(),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Register,
    Dispose,
    /// An indirect slot was registered a second time on the same scope.
    Duplicate,
}

impl EventKind {
    const fn sigil(self) -> char {
        match self {
            EventKind::Register => '+',
            EventKind::Dispose => '-',
            EventKind::Duplicate => '#',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub kind: EventKind,
    pub scope: ScopeId,
    pub entry: EntryId,
    /// Resource address for direct entries, slot address for indirect ones.
    pub address: usize,
    pub locator: Locator,
    pub retention: Retention,
    pub site: Site,
    /// Only set on dispose events: `false` means the entry was passed over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposed: Option<bool>,
}

impl TraceEvent {
    pub fn register(
        scope: ScopeId,
        entry: EntryId,
        address: usize,
        locator: Locator,
        retention: Retention,
        site: Site,
    ) -> Self {
        Self {
            kind: EventKind::Register,
            scope,
            entry,
            address,
            locator,
            retention,
            site,
            disposed: None,
        }
    }

    /// Re-tag a registration event as a disposal outcome.
    pub fn dispose(mut self, disposed: bool) -> Self {
        self.kind = EventKind::Dispose;
        self.disposed = Some(disposed);
        self
    }

    /// Re-tag a registration event as a duplicate of an existing entry.
    pub fn duplicate(mut self) -> Self {
        self.kind = EventKind::Duplicate;
        self.disposed = None;
        self
    }

    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for TraceEvent {
    /// `+0x55d0c2 M d [src/load.rs:42]`, with ` disposed` or ` skipped`
    /// appended on dispose events.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:#x} {} {} [{}]",
            self.kind.sigil(),
            self.address,
            self.locator.tag(),
            self.retention.tag(),
            self.site
        )?;
        match self.disposed {
            Some(true) => f.write_str(" disposed"),
            Some(false) => f.write_str(" skipped"),
            None => Ok(()),
        }
    }
}
