//! The resource manager.
//!
//! A `Scope` is created at the top of a function, every fallible allocation
//! is registered with it right away, and exactly one teardown runs on the way
//! out. Teardown walks the entries newest-first and applies a [`Teardown`]
//! policy. Dropping a scope that was never torn down (early `?` return,
//! panic) takes the error path, so nothing registered can leak.

use std::fmt;

use unwind_core::{
    Disposer, EntryId, Error, Locator, Result, Retention, ScopeConfig, ScopeId, Site, Teardown,
    TraceEvent,
};

use crate::entry::{Direct, Entry, Indirect, Tracked};
use crate::kept::{Handle, Kept};
use crate::sink::TraceSink;
use crate::slot::Slot;

pub struct Scope {
    id: ScopeId,
    entries: Vec<Entry>,
    /// Results held back by a success pass until it completes.
    retained: Vec<Entry>,
    sink: TraceSink,
}

impl Scope {
    /// New scope tracing to the sink named by [`ScopeConfig::global`].
    ///
    /// A trace file that cannot be opened disables tracing for this scope
    /// rather than failing; use [`Scope::with_config`] to see the error.
    pub fn new() -> Self {
        let sink = match TraceSink::from_config(ScopeConfig::global()) {
            Ok(sink) => sink,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "unwind trace sink disabled");
                TraceSink::disabled()
            }
        };
        Self::with_sink(sink)
    }

    pub fn with_config(cfg: &ScopeConfig) -> Result<Self> {
        Ok(Self::with_sink(TraceSink::from_config(cfg)?))
    }

    pub fn with_sink(sink: TraceSink) -> Self {
        Self {
            id: ScopeId::next(),
            entries: Vec::new(),
            retained: Vec::new(),
            sink,
        }
    }

    /// Fresh scope sharing this scope's trace sink.
    ///
    /// Loops that allocate per iteration should open a child at the top of
    /// the body and tear it down at the bottom, so memory stays bounded by
    /// one iteration's temporaries.
    pub fn child(&self) -> Self {
        Self::with_sink(self.sink.clone())
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_tracing(&self) -> bool {
        self.sink.is_enabled()
    }

    /// Reserve room for `additional` registrations up front.
    ///
    /// Registration itself never fails; this is the one place an allocation
    /// failure of the entry list is reported instead of aborting.
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        self.entries
            .try_reserve(additional)
            .map_err(|_| Error::Reserve {
                additional,
                tracked: self.entries.len(),
            })
    }

    // ----- registration -----

    /// Track a temporary: disposed on every exit path.
    #[track_caller]
    pub fn add_always<T, D>(&mut self, value: T, disposer: D) -> Handle<T>
    where
        T: 'static,
        D: Disposer<T> + 'static,
    {
        self.add_direct(value, disposer, Retention::Always, Site::caller())
    }

    /// Track a result: handed back by [`Scope::teardown_on_success`],
    /// disposed on any other teardown.
    #[track_caller]
    pub fn add_keep_on_success<T, D>(&mut self, value: T, disposer: D) -> Handle<T>
    where
        T: 'static,
        D: Disposer<T> + 'static,
    {
        self.add_direct(value, disposer, Retention::KeepOnSuccess, Site::caller())
    }

    /// Track whatever `slot` holds at teardown time, on every exit path.
    ///
    /// # Panics
    /// Panics if `slot` is already tracked by this scope.
    #[track_caller]
    pub fn add_always_indirect<T, D>(&mut self, slot: &Slot<T>, disposer: D) -> EntryId
    where
        T: 'static,
        D: Disposer<T> + 'static,
    {
        self.add_indirect(slot, disposer, Retention::Always, Site::caller())
    }

    /// Track whatever `slot` holds at teardown time; on success the content
    /// stays in the slot for the caller.
    ///
    /// # Panics
    /// Panics if `slot` is already tracked by this scope.
    #[track_caller]
    pub fn add_keep_on_success_indirect<T, D>(&mut self, slot: &Slot<T>, disposer: D) -> EntryId
    where
        T: 'static,
        D: Disposer<T> + 'static,
    {
        self.add_indirect(slot, disposer, Retention::KeepOnSuccess, Site::caller())
    }

    /// Track a temporary released by plain `drop`.
    #[track_caller]
    pub fn adopt<T: 'static>(&mut self, value: T) -> Handle<T> {
        self.add_direct(value, drop::<T>, Retention::Always, Site::caller())
    }

    /// Run `action` on every exit path, in LIFO order with everything else.
    #[track_caller]
    pub fn defer<F>(&mut self, action: F) -> EntryId
    where
        F: FnOnce() + 'static,
    {
        self.add_direct((), move |()| action(), Retention::Always, Site::caller())
            .entry()
    }

    fn add_direct<T, D>(
        &mut self,
        value: T,
        disposer: D,
        retention: Retention,
        site: Site,
    ) -> Handle<T>
    where
        T: 'static,
        D: Disposer<T> + 'static,
    {
        let body = Box::new(Direct::new(value, disposer));
        let entry = self.register(body, Locator::Direct, retention, site);
        Handle::new(self.id, entry)
    }

    fn add_indirect<T, D>(
        &mut self,
        slot: &Slot<T>,
        disposer: D,
        retention: Retention,
        site: Site,
    ) -> EntryId
    where
        T: 'static,
        D: Disposer<T> + 'static,
    {
        let address = slot.address();
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.body.slot_address() == Some(address))
        {
            let event = TraceEvent::register(
                self.id,
                existing.id,
                address,
                Locator::Indirect,
                existing.retention,
                site,
            )
            .duplicate();
            self.sink.emit(&event);
            panic!(
                "slot {address:#x} registered at {site} is already tracked by {} (entry {}, registered at {})",
                self.id,
                existing.id.get(),
                existing.site
            );
        }

        let body = Box::new(Indirect::new(slot.clone(), disposer));
        self.register(body, Locator::Indirect, retention, site)
    }

    /// Single funnel for all registration flavors.
    fn register(
        &mut self,
        body: Box<dyn Tracked>,
        locator: Locator,
        retention: Retention,
        site: Site,
    ) -> EntryId {
        let id = EntryId::new(self.entries.len() as u64);
        self.sink.emit(&TraceEvent::register(
            self.id,
            id,
            body.address(),
            locator,
            retention,
            site,
        ));
        self.entries.push(Entry {
            id,
            locator,
            retention,
            site,
            body,
        });
        id
    }

    // ----- access -----

    /// Borrow a tracked direct resource.
    pub fn get<T: 'static>(&self, handle: &Handle<T>) -> Option<&T> {
        if handle.scope() != self.id {
            return None;
        }
        self.entries
            .get(handle.entry().get() as usize)?
            .body
            .as_any()
            .downcast_ref::<Direct<T>>()?
            .value()
    }

    pub fn get_mut<T: 'static>(&mut self, handle: &Handle<T>) -> Option<&mut T> {
        if handle.scope() != self.id {
            return None;
        }
        self.entries
            .get_mut(handle.entry().get() as usize)?
            .body
            .as_any_mut()
            .downcast_mut::<Direct<T>>()?
            .value_mut()
    }

    // ----- teardown -----
    //
    // An indirect entry whose slot is still borrowed when teardown reaches
    // it is reported as skipped; its content stays with the caller.
    //
    // A panicking disposer propagates out of the teardown call. Entries it
    // had not reached yet are released on the error path when the scope is
    // dropped during unwinding.

    /// Success path: release temporaries, hand results back.
    pub fn teardown_on_success(mut self) -> Kept {
        self.unwind(Teardown::Success)
    }

    /// Failure path: release everything, results included.
    pub fn teardown_on_error(mut self) {
        self.unwind(Teardown::Error);
    }

    /// Success without a result (e.g. a search that matched nothing):
    /// release everything, results included.
    pub fn teardown_discard_all_on_success(mut self) {
        self.unwind(Teardown::DiscardAllOnSuccess);
    }

    /// Tear down with an explicit policy. The returned bag is empty unless
    /// `policy` is [`Teardown::Success`].
    pub fn teardown(mut self, policy: Teardown) -> Kept {
        self.unwind(policy)
    }

    /// Pick the teardown from the function's outcome: `Ok` releases
    /// temporaries and returns the kept results next to the value, `Err`
    /// releases everything and passes the error through.
    pub fn finish<R, E>(
        self,
        outcome: std::result::Result<R, E>,
    ) -> std::result::Result<(R, Kept), E> {
        match outcome {
            Ok(value) => Ok((value, self.teardown_on_success())),
            Err(e) => {
                self.teardown_on_error();
                Err(e)
            }
        }
    }

    /// Entries leave `self.entries` one at a time, so a disposer that
    /// panics leaves the older entries in place for `Drop` to release.
    fn unwind(&mut self, policy: Teardown) -> Kept {
        let mut kept = Kept::new(self.id);
        let _total = self.entries.len();
        let mut _released = 0usize;

        while let Some(mut entry) = self.entries.pop() {
            let event = TraceEvent::register(
                self.id,
                entry.id,
                entry.body.address(),
                entry.locator,
                entry.retention,
                entry.site,
            );
            if policy.must_dispose(entry.retention) {
                let disposed = entry.body.dispose();
                if disposed {
                    _released += 1;
                }
                self.sink.emit(&event.dispose(disposed));
            } else {
                self.sink.emit(&event.dispose(false));
                self.retained.push(entry);
            }
        }

        for Entry { id, body, .. } in self.retained.drain(..) {
            if let Some(value) = body.into_kept() {
                kept.insert(id, value);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            scope = self.id.get(),
            %policy,
            total = _total,
            released = _released,
            kept = kept.len(),
            "scope torn down"
        );

        kept
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        // Results a panicking success pass already set aside are newer than
        // anything still pending.
        self.entries.extend(self.retained.drain(..).rev());
        if !self.entries.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                scope = self.id.get(),
                entries = self.entries.len(),
                "scope dropped with live entries, taking the error path"
            );
            self.unwind(Teardown::Error);
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("entries", &self.entries.len())
            .field("sink", &self.sink)
            .finish()
    }
}
