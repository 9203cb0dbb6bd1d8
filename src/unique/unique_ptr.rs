use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use super::CompressedPair;
use crate::policy::{DefaultDelete, Deleter};

/// A single-owner pointer with a pluggable destruction policy.
///
/// The deleter runs exactly once for every non-null address the pointer
/// held, either on `reset`, on `replace`, or when the pointer is dropped.
/// A stateless deleter adds nothing to the size of the pointer.
pub struct UniquePtr<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    pair: CompressedPair<Option<NonNull<T>>, D>,
    _marker: PhantomData<T>,
}

unsafe impl<T: ?Sized + Send, D: Deleter<T> + Send> Send for UniquePtr<T, D> {}

unsafe impl<T: ?Sized + Sync, D: Deleter<T> + Sync> Sync for UniquePtr<T, D> {}

/// Boxes `value` and hands it to a new `UniquePtr`.
pub fn make_unique<T>(value: T) -> UniquePtr<T> {
    UniquePtr::new(Box::new(value))
}

impl<T: ?Sized> UniquePtr<T> {
    pub fn new(value: Box<T>) -> Self {
        Self {
            pair: CompressedPair::new(Some(NonNull::from(Box::leak(value))), DefaultDelete),
            _marker: PhantomData,
        }
    }

    /// Deletes the current pointee, if any, and takes ownership of `value`.
    pub fn replace(&mut self, value: Box<T>) {
        // Safety: the pointer comes straight from a Box, which is what
        // DefaultDelete expects.
        unsafe { self.reset_raw(Some(NonNull::from(Box::leak(value)))) }
    }

    /// Gives up ownership as a `Box`. Returns `None` for a null pointer.
    pub fn into_box(mut self) -> Option<Box<T>> {
        // Safety: with DefaultDelete every held pointer came from a Box.
        self.release().map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }
}

impl<T: ?Sized, D: Deleter<T>> UniquePtr<T, D> {
    pub fn null() -> Self
    where
        D: Default,
    {
        Self::from_parts(None, D::default())
    }

    /// Takes ownership of `ptr`, releasing it later with a default deleter.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes for as long as this pointer
    /// owns it, must not be owned by anything else, and must be something
    /// `D` knows how to release.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self
    where
        D: Default,
    {
        Self::from_parts(Some(ptr), D::default())
    }

    /// Takes ownership of `ptr`, releasing it later with `deleter`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`UniquePtr::from_raw`], with `deleter` being
    /// the policy that must know how to release `ptr`.
    pub unsafe fn with_deleter(ptr: Option<NonNull<T>>, deleter: D) -> Self {
        Self::from_parts(ptr, deleter)
    }

    fn from_parts(ptr: Option<NonNull<T>>, deleter: D) -> Self {
        Self {
            pair: CompressedPair::new(ptr, deleter),
            _marker: PhantomData,
        }
    }

    fn into_parts(self) -> (Option<NonNull<T>>, D) {
        let this = ManuallyDrop::new(self);
        let ptr = *this.pair.first();
        // Safety: `this` is never dropped, so the deleter is moved out
        // exactly once.
        let deleter = unsafe { ptr::read(this.pair.second()) };
        (ptr, deleter)
    }

    /// Moves ownership out, leaving this pointer null.
    pub fn take(&mut self) -> Self
    where
        D: Default,
    {
        mem::replace(self, Self::null())
    }

    /// Converts the deleter while keeping ownership of the same address.
    pub fn map_deleter<E, F>(self, f: F) -> UniquePtr<T, E>
    where
        E: Deleter<T>,
        F: FnOnce(D) -> E,
    {
        let (ptr, deleter) = self.into_parts();
        UniquePtr::from_parts(ptr, f(deleter))
    }

    /// Relinquishes ownership without running the deleter.
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.pair.first_mut().take()
    }

    /// Runs the deleter on the current address and becomes null.
    pub fn reset(&mut self) {
        // Safety: null is always a valid replacement.
        unsafe { self.reset_raw(None) }
    }

    /// Adopts `ptr`, then runs the deleter on the previous address.
    ///
    /// The old address is cleared before the deleter sees it, so a deleter
    /// that reaches back into this pointer observes the new state.
    ///
    /// # Safety
    ///
    /// Same requirements as [`UniquePtr::from_raw`] for a non-null `ptr`.
    pub unsafe fn reset_raw(&mut self, ptr: Option<NonNull<T>>) {
        let old = mem::replace(self.pair.first_mut(), ptr);
        if let Some(old) = old {
            // Safety: we owned `old` and have just given it up.
            self.pair.second_mut().delete(old);
        }
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        *self.pair.first()
    }

    pub fn is_null(&self) -> bool {
        self.pair.first().is_none()
    }

    pub fn get(&self) -> Option<&T> {
        // Safety: a held pointer is valid for as long as we own it.
        self.as_ptr().map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        // Safety: we are the only owner and hold `&mut self`.
        self.as_ptr().map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    pub fn deleter(&self) -> &D {
        self.pair.second()
    }

    pub fn deleter_mut(&mut self) -> &mut D {
        self.pair.second_mut()
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for UniquePtr<T, D> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, D: Deleter<T> + Default> Default for UniquePtr<T, D> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> From<Box<T>> for UniquePtr<T> {
    fn from(value: Box<T>) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for UniquePtr<T, D> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced a null UniquePtr"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for UniquePtr<T, D> {
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => panic!("dereferenced a null UniquePtr"),
        }
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for UniquePtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("UniquePtr").field(&value).finish(),
            None => f.write_str("UniquePtr(null)"),
        }
    }
}
