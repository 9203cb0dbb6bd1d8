use std::ptr::NonNull;

use crate::policy::{Counter, Destroy};

/// An object that stores its own reference count.
///
/// # Safety
///
/// `dec_ref` must destroy the object exactly when the count it maintains
/// drops to zero, and never earlier.
pub unsafe trait RefCounted {
    fn inc_ref(&self);

    /// Drops one reference, destroying the object when it was the last.
    ///
    /// # Safety
    ///
    /// `this` must point to a live object and the caller must give up a
    /// reference it obtained through `inc_ref`.
    unsafe fn dec_ref(this: NonNull<Self>);

    fn ref_count(&self) -> usize;
}

/// The ready-made way to be [`RefCounted`]: embed a [`Counter`] and name
/// the policy that destroys the object.
///
/// ```
/// use smart_ptrs::{make_intrusive, DefaultDelete, EmbeddedCounter, SimpleCounter};
///
/// struct Node {
///     refs: SimpleCounter,
///     value: i32,
/// }
///
/// impl EmbeddedCounter for Node {
///     type Counter = SimpleCounter;
///     type Destroy = DefaultDelete;
///
///     fn counter(&self) -> &SimpleCounter {
///         &self.refs
///     }
/// }
///
/// let node = make_intrusive(Node { refs: SimpleCounter::new(), value: 1 });
/// let other = node.clone();
/// assert_eq!(other.use_count(), 2);
/// assert_eq!(other.value, 1);
/// ```
pub trait EmbeddedCounter {
    type Counter: Counter;
    type Destroy: Destroy<Self>;

    fn counter(&self) -> &Self::Counter;
}

unsafe impl<T: EmbeddedCounter + ?Sized> RefCounted for T {
    fn inc_ref(&self) {
        Counter::inc_ref(self.counter());
    }

    unsafe fn dec_ref(this: NonNull<Self>) {
        if Counter::dec_ref(this.as_ref().counter()) == 0 {
            log::trace!("destroying intrusively counted object at {:p}", this);
            <T::Destroy as Destroy<T>>::destroy(this);
        }
    }

    fn ref_count(&self) -> usize {
        Counter::ref_count(self.counter())
    }
}
