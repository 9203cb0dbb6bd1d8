//! Shared ownership with weak observers.
//!
//! A [`SharedPtr`] owns one strong reference on a control block; a
//! [`WeakPtr`] owns one weak reference on the same block. The object dies
//! when the last strong reference goes away, the block when the last
//! reference of either kind does.

mod control_block;
mod from_this;
mod shared_ptr;
mod weak_ptr;

pub use from_this::{make_shared_enabled, EnableSharedFromThis, WeakThis};
pub use shared_ptr::{make_shared, SharedPtr};
pub use weak_ptr::WeakPtr;
