#![forbid(unsafe_code)]
//! unwind-scope: scope-bound resource manager.
//!
//! This crate provides the concrete manager for the contracts defined in
//! `unwind-core`. A function opens a [`Scope`], registers every resource it
//! allocates together with a disposer, and ends with exactly one teardown:
//!
//! ```
//! use unwind_scope::Scope;
//!
//! fn load(lines: &[&str]) -> Result<Vec<String>, String> {
//!     let mut scope = Scope::new();
//!     let scratch = scope.adopt(String::new());
//!     let words = scope.add_keep_on_success(Vec::<String>::new(), drop);
//!
//!     for line in lines {
//!         if line.is_empty() {
//!             scope.teardown_on_error();
//!             return Err("empty line".into());
//!         }
//!         let buf = scope.get_mut(&scratch).unwrap();
//!         buf.clear();
//!         buf.push_str(line.trim());
//!         let word = buf.clone();
//!         scope.get_mut(&words).unwrap().push(word);
//!     }
//!
//!     let mut kept = scope.teardown_on_success();
//!     Ok(kept.take(words).unwrap())
//! }
//!
//! assert_eq!(load(&[" a", "b "]).unwrap(), vec!["a", "b"]);
//! assert!(load(&["a", ""]).is_err());
//! ```
//!
//! A scope belongs to one activation on one thread:
//!
//! ```compile_fail
//! fn assert_send<T: Send>() {}
//! assert_send::<unwind_scope::Scope>();
//! ```

mod entry;
pub mod kept;
pub mod scope;
pub mod sink;
pub mod slot;

pub use kept::{Handle, Kept};
pub use scope::Scope;
pub use sink::{TraceBuffer, TraceSink};
pub use slot::Slot;
