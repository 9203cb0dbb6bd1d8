//! Ownership-managing pointers with explicit lifetime bookkeeping.
//!
//! - [`SharedPtr`] / [`WeakPtr`]: shared ownership through an out-of-line
//!   control block counting strong and weak references, with aliasing,
//!   single-allocation construction ([`make_shared`]) and self-observation
//!   ([`EnableSharedFromThis`]).
//! - [`UniquePtr`]: single ownership with a pluggable [`Deleter`] that costs
//!   no space when it is stateless.
//! - [`IntrusivePtr`]: shared ownership with the count stored inside the
//!   pointee ([`RefCounted`]).
//!
//! Counts are plain integers. None of the shared pointer types are `Send`
//! or `Sync`; sharing them across threads needs external synchronization.
//!
//! ```
//! use smart_ptrs::{make_shared, WeakPtr};
//!
//! let mut a = make_shared(42);
//! let mut b = a.clone();
//! let w = WeakPtr::from(&a);
//! a.reset();
//! assert_eq!(b.use_count(), 1);
//! assert!(!w.expired());
//! b.reset();
//! assert!(w.expired());
//! ```

pub mod error;
pub mod intrusive;
pub mod policy;
pub mod shared;
pub mod unique;

pub use error::ExpiredError;
pub use intrusive::{make_intrusive, EmbeddedCounter, IntrusivePtr, RefCounted};
pub use policy::{Counter, DefaultDelete, Deleter, Destroy, SimpleCounter};
pub use shared::{
    make_shared, make_shared_enabled, EnableSharedFromThis, SharedPtr, WeakPtr, WeakThis,
};
pub use unique::{make_unique, CompressedPair, UniquePtr};
