use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use super::control_block::BlockRef;
use super::SharedPtr;
use crate::error::ExpiredError;

/// A non-owning observer of an object managed by `SharedPtr`.
///
/// A `WeakPtr` keeps the control block allocated but never the object:
/// once the last `SharedPtr` is gone the object is destroyed and every
/// `WeakPtr` to it reports expired.
pub struct WeakPtr<T: ?Sized> {
    block: Option<BlockRef>,
    ptr: Option<NonNull<T>>,
    _marker: PhantomData<T>,
}

impl<T: ?Sized> WeakPtr<T> {
    /// An empty weak pointer. It is always expired.
    pub const fn new() -> Self {
        Self {
            block: None,
            ptr: None,
            _marker: PhantomData,
        }
    }

    fn observe(block: Option<BlockRef>, ptr: Option<NonNull<T>>) -> Self {
        if let Some(block) = block {
            block.get().add_weak();
        }
        Self {
            block,
            ptr,
            _marker: PhantomData,
        }
    }

    /// Strong count of the observed block, 0 when empty or expired.
    pub fn use_count(&self) -> usize {
        self.block.map_or(0, |block| block.get().strong_count())
    }

    pub fn weak_count(&self) -> usize {
        self.block.map_or(0, |block| block.get().weak_count())
    }

    pub fn expired(&self) -> bool {
        self.block.map_or(true, |block| block.get().is_strong_empty())
    }

    /// Promotes to a `SharedPtr`, or returns an empty one if the object is
    /// already gone.
    pub fn lock(&self) -> SharedPtr<T> {
        self.upgrade().unwrap_or_default()
    }

    /// Promotes to a `SharedPtr`, failing if the object is already gone.
    pub fn upgrade(&self) -> Result<SharedPtr<T>, ExpiredError> {
        match (self.block, self.ptr) {
            (Some(block), Some(ptr)) if !block.get().is_strong_empty() => {
                block.get().add_strong();
                Ok(SharedPtr::from_parts(block, ptr))
            }
            _ => Err(ExpiredError),
        }
    }

    /// Stops observing and becomes empty.
    pub fn reset(&mut self) {
        drop(mem::take(self));
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Whether both pointers observe the same control block.
    pub fn ptr_eq<U: ?Sized>(&self, other: &WeakPtr<U>) -> bool {
        self.block.map(BlockRef::addr) == other.block.map(BlockRef::addr)
    }
}

impl<T: ?Sized> From<&SharedPtr<T>> for WeakPtr<T> {
    fn from(shared: &SharedPtr<T>) -> Self {
        Self::observe(shared.block, shared.ptr)
    }
}

impl<T: ?Sized> Drop for WeakPtr<T> {
    fn drop(&mut self) {
        self.ptr = None;
        if let Some(block) = self.block.take() {
            // Safety: we owned this weak reference and forget it here.
            unsafe { block.release_weak() }
        }
    }
}

impl<T: ?Sized> Clone for WeakPtr<T> {
    fn clone(&self) -> Self {
        Self::observe(self.block, self.ptr)
    }
}

impl<T: ?Sized> Default for WeakPtr<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for WeakPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(WeakPtr)")
    }
}
