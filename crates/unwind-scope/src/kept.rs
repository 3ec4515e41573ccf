//! Results handed back by a successful teardown.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use unwind_core::{EntryId, ScopeId};

/// Typed reference to a direct entry of one scope.
///
/// Borrow the resource through [`Scope::get`](crate::Scope::get) while the
/// scope is live, or move it out of [`Kept`] after a successful teardown.
pub struct Handle<T> {
    scope: ScopeId,
    entry: EntryId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(scope: ScopeId, entry: EntryId) -> Self {
        Self {
            scope,
            entry,
            _marker: PhantomData,
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("scope", &self.scope)
            .field("entry", &self.entry)
            .finish()
    }
}

/// Keep-on-success direct resources that survived a successful teardown.
///
/// The caller owns them now. Anything not taken is dropped with the bag,
/// without running the disposer it was registered with.
pub struct Kept {
    scope: ScopeId,
    values: HashMap<EntryId, Box<dyn Any>>,
}

impl Kept {
    pub(crate) fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            values: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, entry: EntryId, value: Box<dyn Any>) {
        self.values.insert(entry, value);
    }

    /// Move a kept resource out. `None` if the handle belongs to another
    /// scope, was not kept, or was already taken.
    pub fn take<T: 'static>(&mut self, handle: Handle<T>) -> Option<T> {
        if handle.scope != self.scope {
            return None;
        }
        let value = self.values.remove(&handle.entry)?;
        value.downcast::<T>().ok().map(|b| *b)
    }

    pub fn contains<T>(&self, handle: Handle<T>) -> bool {
        handle.scope == self.scope && self.values.contains_key(&handle.entry)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Kept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kept")
            .field("scope", &self.scope)
            .field("len", &self.values.len())
            .finish()
    }
}
