//! Scope configuration that downstream crates can serialize/deserialize.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Environment variable naming the trace file. Unset means tracing is off.
pub const TRACE_PATH_VAR: &str = "UNWIND_TRACE";
/// Environment variable selecting the trace line format (`text` or `json`).
pub const TRACE_FORMAT_VAR: &str = "UNWIND_TRACE_FORMAT";

static GLOBAL: Lazy<ScopeConfig> = Lazy::new(ScopeConfig::from_env);

/// How trace events are rendered, one event per line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// `+0x55d0c2 M d [src/load.rs:42]`
    #[default]
    Text,
    /// One `serde_json` object per line.
    Json,
}

impl FromStr for TraceFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(TraceFormat::Text),
            "json" => Ok(TraceFormat::Json),
            other => Err(Error::Config(format!("unknown trace format '{other}'"))),
        }
    }
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceFormat::Text => f.write_str("text"),
            TraceFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Append-only trace file. `None` disables the trace sink.
    pub trace_path: Option<PathBuf>,

    /// Line format used when `trace_path` is set.
    #[serde(default)]
    pub trace_format: TraceFormat,
}

impl ScopeConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `UNWIND_TRACE`: path of the trace file
    /// - `UNWIND_TRACE_FORMAT`: `text` or `json`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ScopeConfig::from_env`], reading variables through `lookup`.
    /// Unparsable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(s) = lookup(TRACE_PATH_VAR) {
            if !s.trim().is_empty() {
                cfg.trace_path = Some(PathBuf::from(s));
            }
        }

        if let Some(s) = lookup(TRACE_FORMAT_VAR) {
            if let Ok(v) = s.parse::<TraceFormat>() {
                cfg.trace_format = v;
            }
        }

        cfg
    }

    /// Process-wide default, read from the environment on first use.
    pub fn global() -> &'static ScopeConfig {
        &GLOBAL
    }

    pub fn tracing_enabled(&self) -> bool {
        self.trace_path.is_some()
    }

    pub fn with_trace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_path = Some(path.into());
        self
    }

    pub fn with_trace_format(mut self, format: TraceFormat) -> Self {
        self.trace_format = format;
        self
    }
}
