//! The disposer contract.
//!
//! A disposer releases exactly one resource, exactly once. Consuming `self`
//! and the resource makes both halves of that promise a type-level fact.

/// Releases one resource.
///
/// Every `FnOnce(T)` is a disposer, so `std::mem::drop`, a collaborator's
/// consuming `close`/`finish` method, or a closure all work directly:
///
/// ```
/// use unwind_core::Disposer;
///
/// fn release<T, D: Disposer<T>>(value: T, disposer: D) {
///     disposer.dispose(value);
/// }
///
/// release(vec![1u8, 2, 3], drop);
/// release(String::from("tmp"), |s: String| assert_eq!(s, "tmp"));
/// ```
pub trait Disposer<T> {
    fn dispose(self, resource: T);
}

impl<T, F> Disposer<T> for F
where
    F: FnOnce(T),
{
    fn dispose(self, resource: T) {
        self(resource)
    }
}
