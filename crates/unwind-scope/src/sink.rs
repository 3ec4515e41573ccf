//! Trace sink: optional, append-only log of registration and disposal events.
//!
//! A sink is explicit state owned by a scope and shared with its children.
//! A disabled sink costs one `Option` check per event. Write failures are
//! swallowed: tracing must never change what gets disposed.

use std::cell::RefCell;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::rc::Rc;

use unwind_core::{Error, Result, ScopeConfig, TraceEvent, TraceFormat};

struct SinkInner {
    out: Box<dyn Write>,
    format: TraceFormat,
}

#[derive(Clone, Default)]
pub struct TraceSink {
    inner: Option<Rc<RefCell<SinkInner>>>,
}

impl TraceSink {
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Open `path` in append mode, creating it if needed.
    ///
    /// Output is line-buffered: each event reaches the file as one complete
    /// line as soon as it is emitted.
    pub fn open(path: &Path, format: TraceFormat) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::TraceOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_writer(LineWriter::new(file), format))
    }

    pub fn from_config(cfg: &ScopeConfig) -> Result<Self> {
        match &cfg.trace_path {
            Some(path) => Self::open(path, cfg.trace_format),
            None => Ok(Self::disabled()),
        }
    }

    pub fn from_writer(out: impl Write + 'static, format: TraceFormat) -> Self {
        Self {
            inner: Some(Rc::new(RefCell::new(SinkInner {
                out: Box::new(out),
                format,
            }))),
        }
    }

    /// In-memory sink plus a handle to read back what was written.
    pub fn memory(format: TraceFormat) -> (Self, TraceBuffer) {
        let buf = TraceBuffer::default();
        (Self::from_writer(buf.clone(), format), buf)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub(crate) fn emit(&self, event: &TraceEvent) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            kind = ?event.kind,
            scope = event.scope.get(),
            entry = event.entry.get(),
            address = event.address,
            locator = ?event.locator,
            retention = ?event.retention,
            site = %event.site,
            disposed = ?event.disposed,
            "unwind event"
        );

        let Some(inner) = &self.inner else {
            return;
        };
        let Ok(mut inner) = inner.try_borrow_mut() else {
            return;
        };
        let line = match inner.format {
            TraceFormat::Text => event.to_string(),
            TraceFormat::Json => match event.to_json_line() {
                Ok(line) => line,
                Err(_) => return,
            },
        };
        let _ = writeln!(inner.out, "{line}");
    }
}

impl fmt::Debug for TraceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => match inner.try_borrow() {
                Ok(inner) => write!(f, "TraceSink({})", inner.format),
                Err(_) => f.write_str("TraceSink(<busy>)"),
            },
            None => f.write_str("TraceSink(disabled)"),
        }
    }
}

/// Shared byte buffer backing [`TraceSink::memory`].
#[derive(Clone, Default)]
pub struct TraceBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl TraceBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    pub fn clear(&self) {
        self.bytes.borrow_mut().clear();
    }
}

impl Write for TraceBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
