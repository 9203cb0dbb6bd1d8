//! Reference counting with the count stored in the pointee.

mod intrusive_ptr;
mod ref_counted;

pub use intrusive_ptr::{make_intrusive, IntrusivePtr};
pub use ref_counted::{EmbeddedCounter, RefCounted};
