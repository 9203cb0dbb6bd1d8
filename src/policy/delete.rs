use std::ptr::NonNull;

/// A destruction policy carried by value alongside the pointer it cleans up.
///
/// `UniquePtr` and detached control blocks call `delete` exactly once per
/// owned address. Closures taking `NonNull<T>` are deleters too.
///
/// Releasing an arbitrary address is unsafe, even through a stateless
/// deleter:
///
/// ```compile_fail,E0133
/// use smart_ptrs::{DefaultDelete, Deleter};
/// use std::ptr::NonNull;
///
/// let mut owned = Box::new(1);
/// DefaultDelete.delete(NonNull::from(&mut *owned));
/// ```
pub trait Deleter<T: ?Sized> {
    /// Releases the object at `ptr`.
    ///
    /// # Safety
    ///
    /// The caller must own the object at `ptr`, it must have been allocated
    /// the way this deleter expects, and it must not be used afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}

/// A stateless destruction policy selected by type, used by intrusively
/// counted objects to release themselves.
///
/// # Safety
///
/// `destroy` must be a valid way to dispose of an object allocated through
/// `Box<T>`, since `make_intrusive` and `IntrusivePtr::from_box` allocate
/// that way. Leaking counts as valid.
pub unsafe trait Destroy<T: ?Sized> {
    /// # Safety
    ///
    /// `object` must be live and must not be used again after this call.
    unsafe fn destroy(object: NonNull<T>);
}

/// Releases the pointee as the `Box` it was allocated as.
///
/// Slices go through the same path, so `UniquePtr<[T]>` frees the whole
/// array with no separate array policy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

unsafe impl<T: ?Sized> Destroy<T> for DefaultDelete {
    unsafe fn destroy(object: NonNull<T>) {
        drop(Box::from_raw(object.as_ptr()));
    }
}
