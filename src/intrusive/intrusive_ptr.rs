use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::NonNull;

use super::RefCounted;

/// A pointer whose reference count lives inside the pointee.
///
/// Every non-null `IntrusivePtr` accounts for one reference on the object;
/// the object destroys itself when the last one is released.
pub struct IntrusivePtr<T: RefCounted + ?Sized> {
    ptr: Option<NonNull<T>>,
    _marker: PhantomData<T>,
}

/// Boxes `value` and takes the first reference to it.
pub fn make_intrusive<T: RefCounted>(value: T) -> IntrusivePtr<T> {
    IntrusivePtr::from_box(Box::new(value))
}

impl<T: RefCounted + ?Sized> IntrusivePtr<T> {
    pub const fn null() -> Self {
        Self {
            ptr: None,
            _marker: PhantomData,
        }
    }

    pub fn from_box(value: Box<T>) -> Self {
        // Safety: a fresh Box is live, and RefCounted's destroy policy
        // accepts Box allocations.
        unsafe { Self::from_raw(NonNull::from(Box::leak(value))) }
    }

    /// Takes a new reference to the object at `ptr`.
    ///
    /// The object may already be referenced by other `IntrusivePtr`s.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object allocated the way its destroy
    /// policy expects.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        ptr.as_ref().inc_ref();
        Self {
            ptr: Some(ptr),
            _marker: PhantomData,
        }
    }

    /// Moves the reference out, leaving this pointer null.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Releases the held reference and becomes null.
    pub fn reset(&mut self) {
        drop(self.take());
    }

    /// Releases the held reference and takes the first one to `value`.
    pub fn reset_with(&mut self, value: Box<T>) {
        *self = Self::from_box(value);
    }

    /// Points at `ptr` instead, taking the new reference before releasing
    /// the old one so that re-pointing at the same object is harmless.
    ///
    /// # Safety
    ///
    /// Same requirements as [`IntrusivePtr::from_raw`] for a non-null `ptr`.
    pub unsafe fn reset_raw(&mut self, ptr: Option<NonNull<T>>) {
        if let Some(ptr) = ptr {
            ptr.as_ref().inc_ref();
        }
        if let Some(old) = mem::replace(&mut self.ptr, ptr) {
            T::dec_ref(old);
        }
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    pub fn get(&self) -> Option<&T> {
        // Safety: our reference keeps the object alive.
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// The pointee's reference count, 0 when null.
    pub fn use_count(&self) -> usize {
        self.get().map_or(0, T::ref_count)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr.map(|p| p.as_ptr() as *const ()) == other.ptr.map(|p| p.as_ptr() as *const ())
    }
}

impl<T: RefCounted + ?Sized> Drop for IntrusivePtr<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // Safety: we owned this reference and forget it here.
            unsafe { T::dec_ref(ptr) }
        }
    }
}

impl<T: RefCounted + ?Sized> Clone for IntrusivePtr<T> {
    fn clone(&self) -> Self {
        match self.ptr {
            // Safety: the object is alive while we reference it.
            Some(ptr) => unsafe { Self::from_raw(ptr) },
            None => Self::null(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        // Safety: the source keeps its object alive and was allocated the
        // way its policy expects.
        unsafe { self.reset_raw(source.ptr) }
    }
}

impl<T: RefCounted + ?Sized> Default for IntrusivePtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: RefCounted + ?Sized> From<Box<T>> for IntrusivePtr<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: RefCounted + ?Sized> Deref for IntrusivePtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced a null IntrusivePtr"),
        }
    }
}

impl<T: RefCounted + ?Sized> PartialEq for IntrusivePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: RefCounted + ?Sized> Eq for IntrusivePtr<T> {}

impl<T: RefCounted + ?Sized + fmt::Debug> fmt::Debug for IntrusivePtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("IntrusivePtr").field(&value).finish(),
            None => f.write_str("IntrusivePtr(null)"),
        }
    }
}
