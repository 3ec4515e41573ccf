//! Indirect locator: a shared, replaceable cell.
//!
//! A `Slot<T>` stands in for "a variable that holds the resource". The caller
//! keeps one clone and may swap, grow or empty the contents at any time; the
//! scope holds another clone and disposes whatever the slot contains when it
//! is torn down, leaving it empty.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

pub struct Slot<T> {
    cell: Rc<RefCell<Option<T>>>,
}

impl<T> Slot<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(Some(value))),
        }
    }

    pub fn empty() -> Self {
        Self {
            cell: Rc::new(RefCell::new(None)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cell.borrow().is_none()
    }

    /// Store `value`, returning the previous content to the caller.
    pub fn replace(&self, value: T) -> Option<T> {
        self.cell.borrow_mut().replace(value)
    }

    /// Move the current content (if any) through `f` and store the result.
    ///
    /// This is the grow-and-move step: the value the slot held before the
    /// call is gone, and teardown sees only what `f` produced.
    pub fn relocate(&self, f: impl FnOnce(Option<T>) -> T) {
        let mut cell = self.cell.borrow_mut();
        let next = f(cell.take());
        *cell = Some(next);
    }

    /// # Panics
    /// Panics if the slot is borrowed.
    pub fn take(&self) -> Option<T> {
        self.cell.borrow_mut().take()
    }

    /// Like [`Slot::take`], but `None` while a borrow is outstanding.
    pub(crate) fn try_take(&self) -> Option<Option<T>> {
        self.cell.try_borrow_mut().ok().map(|mut cell| cell.take())
    }

    /// # Panics
    /// Panics if the slot is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, Option<T>> {
        self.cell.borrow()
    }

    /// # Panics
    /// Panics if the slot is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Option<T>> {
        self.cell.borrow_mut()
    }

    /// Whether both handles refer to the same slot.
    pub fn ptr_eq(&self, other: &Slot<T>) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Address of the shared cell. Stable for the slot's whole life.
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.cell) as *const () as usize
    }
}

impl<T: Clone> Slot<T> {
    pub fn get(&self) -> Option<T> {
        self.cell.borrow().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(v) => f.debug_tuple("Slot").field(&*v).finish(),
            Err(_) => f.write_str("Slot(<borrowed>)"),
        }
    }
}
