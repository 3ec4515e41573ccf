//! Tracked entries: one record per resource under a scope's responsibility.

use std::any::Any;

use unwind_core::{Disposer, EntryId, Locator, Retention, Site};

use crate::slot::Slot;

type BoxedDisposer<T> = Box<dyn FnOnce(T)>;

/// Type-erased view of an entry body, whatever resource type it carries.
pub(crate) trait Tracked {
    /// Resource address (direct) or slot address (indirect); 0 once a direct
    /// entry has been released.
    fn address(&self) -> usize;

    /// Slot address, for duplicate detection. `None` for direct entries.
    fn slot_address(&self) -> Option<usize>;

    /// Run the disposer on the current resource, if there still is one.
    /// Returns whether the disposer ran. Calling it again is a no-op.
    fn dispose(&mut self) -> bool;

    /// Hand the resource back after a successful teardown. Indirect entries
    /// return `None`: their resource already lives in the caller's slot.
    fn into_kept(self: Box<Self>) -> Option<Box<dyn Any>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The scope owns the resource.
pub(crate) struct Direct<T> {
    value: Option<T>,
    disposer: Option<BoxedDisposer<T>>,
}

impl<T: 'static> Direct<T> {
    pub(crate) fn new<D>(value: T, disposer: D) -> Self
    where
        D: Disposer<T> + 'static,
    {
        Self {
            value: Some(value),
            disposer: Some(Box::new(move |v: T| disposer.dispose(v))),
        }
    }

    pub(crate) fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }
}

impl<T: 'static> Tracked for Direct<T> {
    fn address(&self) -> usize {
        self.value
            .as_ref()
            .map_or(0, |v| v as *const T as *const () as usize)
    }

    fn slot_address(&self) -> Option<usize> {
        None
    }

    fn dispose(&mut self) -> bool {
        let Some(disposer) = self.disposer.take() else {
            return false;
        };
        match self.value.take() {
            Some(value) => {
                disposer(value);
                true
            }
            None => false,
        }
    }

    fn into_kept(self: Box<Self>) -> Option<Box<dyn Any>> {
        self.value.map(|v| Box::new(v) as Box<dyn Any>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The scope holds a clone of the caller's slot.
pub(crate) struct Indirect<T> {
    slot: Slot<T>,
    disposer: Option<BoxedDisposer<T>>,
}

impl<T: 'static> Indirect<T> {
    pub(crate) fn new<D>(slot: Slot<T>, disposer: D) -> Self
    where
        D: Disposer<T> + 'static,
    {
        Self {
            slot,
            disposer: Some(Box::new(move |v: T| disposer.dispose(v))),
        }
    }
}

impl<T: 'static> Tracked for Indirect<T> {
    fn address(&self) -> usize {
        self.slot.address()
    }

    fn slot_address(&self) -> Option<usize> {
        Some(self.slot.address())
    }

    fn dispose(&mut self) -> bool {
        let Some(disposer) = self.disposer.take() else {
            return false;
        };
        match self.slot.try_take() {
            Some(Some(value)) => {
                disposer(value);
                true
            }
            // Empty, or still borrowed by the caller: nothing to release.
            _ => {
                self.disposer = Some(disposer);
                false
            }
        }
    }

    fn into_kept(self: Box<Self>) -> Option<Box<dyn Any>> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) struct Entry {
    pub(crate) id: EntryId,
    pub(crate) locator: Locator,
    pub(crate) retention: Retention,
    pub(crate) site: Site,
    pub(crate) body: Box<dyn Tracked>,
}
