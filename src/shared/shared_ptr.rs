use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::NonNull;

use super::control_block::{BlockRef, DetachedBlock, FusedBlock};
use super::WeakPtr;
use crate::error::ExpiredError;
use crate::policy::Deleter;
use crate::unique::UniquePtr;

/// A shared-ownership pointer.
///
/// Every non-empty `SharedPtr` holds one strong reference on a control
/// block and a pointee address. The address usually is the object the
/// block owns, but an aliasing pointer may point at a part of it instead.
///
/// Counts are plain integers: `SharedPtr` is neither `Send` nor `Sync`.
pub struct SharedPtr<T: ?Sized> {
    pub(super) block: Option<BlockRef>,
    pub(super) ptr: Option<NonNull<T>>,
    _marker: PhantomData<T>,
}

/// Allocates `value` and its control block together.
///
/// The weak slot of an [`EnableSharedFromThis`](super::EnableSharedFromThis)
/// type is left empty; use [`make_shared_enabled`](super::make_shared_enabled)
/// for those.
pub fn make_shared<T: 'static>(value: T) -> SharedPtr<T> {
    SharedPtr::new(value)
}

impl<T: ?Sized> SharedPtr<T> {
    pub const fn null() -> Self {
        Self {
            block: None,
            ptr: None,
            _marker: PhantomData,
        }
    }

    /// Adopts a block and address for which the caller already owns a
    /// strong reference.
    pub(super) fn from_parts(block: BlockRef, ptr: NonNull<T>) -> Self {
        Self {
            block: Some(block),
            ptr: Some(ptr),
            _marker: PhantomData,
        }
    }

    /// Takes ownership of a boxed object, giving it its own control block.
    ///
    /// Does not fill the weak slot of a self-observing type; see
    /// [`SharedPtr::from_box_enabled`].
    pub fn from_box(value: Box<T>) -> Self
    where
        T: 'static,
    {
        Self::from_unique(UniquePtr::new(value))
    }

    /// Takes ownership of an object allocated with `Box`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `Box::into_raw` and must not be owned by
    /// anything else.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self
    where
        T: 'static,
    {
        Self::from_unique(UniquePtr::<T>::from_raw(ptr))
    }

    /// Moves a uniquely owned object, deleter included, under shared
    /// ownership. A null `UniquePtr` gives an empty `SharedPtr`.
    pub fn from_unique<D>(object: UniquePtr<T, D>) -> Self
    where
        T: 'static,
        D: Deleter<T> + 'static,
    {
        match object.as_ptr() {
            Some(ptr) => {
                let (block, _) = BlockRef::allocate(DetachedBlock::new(object));
                Self::from_parts(block, ptr)
            }
            None => Self::null(),
        }
    }

    /// Shares the control block of `owner` while pointing at `ptr`.
    ///
    /// An empty `owner` gives an empty pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for as long as the object owned by `owner`'s
    /// control block is alive, typically because it points into it.
    pub unsafe fn aliasing<U: ?Sized>(owner: &SharedPtr<U>, ptr: NonNull<T>) -> Self {
        match owner.block {
            Some(block) => {
                block.get().add_strong();
                Self::from_parts(block, ptr)
            }
            None => Self::null(),
        }
    }

    /// Points at a part of `owner`'s object, keeping the whole object alive.
    ///
    /// `f` is a plain function so that it can only return data reachable
    /// from its argument or with a `'static` lifetime.
    pub fn project<U: ?Sized>(owner: &SharedPtr<U>, f: fn(&U) -> &T) -> Self {
        match owner.get() {
            // Safety: the projected reference lives inside the owner's
            // object, which our strong reference keeps alive.
            Some(value) => unsafe { Self::aliasing(owner, NonNull::from(f(value))) },
            None => Self::null(),
        }
    }

    /// Moves the reference out, leaving this pointer empty.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Gives up the held reference and becomes empty.
    pub fn reset(&mut self) {
        drop(self.take());
    }

    /// Gives up the held reference and takes ownership of `value` instead.
    pub fn reset_with(&mut self, value: Box<T>)
    where
        T: 'static,
    {
        *self = Self::from_box(value);
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    pub fn downgrade(&self) -> WeakPtr<T> {
        WeakPtr::from(self)
    }

    pub fn get(&self) -> Option<&T> {
        // Safety: our strong reference keeps the object alive.
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Returns a mutable reference if no other `SharedPtr` or `WeakPtr`
    /// shares the control block.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let block = self.block?;
        if block.get().strong_count() != 1 || block.get().weak_count() != 0 {
            return None;
        }
        // Safety: Nothing else can access the data, since there's only one
        // SharedPtr, to which we have exclusive access, and no WeakPtrs.
        self.ptr.map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// Number of `SharedPtr`s sharing the control block, 0 when empty.
    pub fn use_count(&self) -> usize {
        self.block.map_or(0, |block| block.get().strong_count())
    }

    pub fn weak_count(&self) -> usize {
        self.block.map_or(0, |block| block.get().weak_count())
    }

    /// Whether both pointers share ownership of the same object.
    pub fn ptr_eq<U: ?Sized>(&self, other: &SharedPtr<U>) -> bool {
        self.block.map(BlockRef::addr) == other.block.map(BlockRef::addr)
    }
}

impl<T: 'static> SharedPtr<T> {
    /// Allocates `value` inside its control block.
    pub fn new(value: T) -> Self {
        let (block, fused) = BlockRef::allocate(FusedBlock::new(value));
        // Safety: the block was just allocated and is not shared yet.
        let ptr = unsafe { fused.as_ref().value_ptr() };
        Self::from_parts(block, ptr)
    }
}

impl<T: ?Sized> Drop for SharedPtr<T> {
    fn drop(&mut self) {
        self.ptr = None;
        if let Some(block) = self.block.take() {
            // Safety: we owned this strong reference and forget it here.
            unsafe { block.release_strong() }
        }
    }
}

impl<T: ?Sized> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        match (self.block, self.ptr) {
            (Some(block), Some(ptr)) => {
                block.get().add_strong();
                Self::from_parts(block, ptr)
            }
            _ => Self::null(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.ptr_eq(source) && self.ptr == source.ptr {
            return;
        }
        *self = source.clone();
    }
}

impl<T: ?Sized> Default for SharedPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized + 'static> From<Box<T>> for SharedPtr<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized> TryFrom<&WeakPtr<T>> for SharedPtr<T> {
    type Error = ExpiredError;

    fn try_from(weak: &WeakPtr<T>) -> Result<Self, ExpiredError> {
        weak.upgrade()
    }
}

impl<T: ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty SharedPtr"),
        }
    }
}

impl<T: ?Sized, U: ?Sized> PartialEq<SharedPtr<U>> for SharedPtr<T> {
    fn eq(&self, other: &SharedPtr<U>) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: ?Sized> Eq for SharedPtr<T> {}

impl<T: ?Sized> Hash for SharedPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.block.map(BlockRef::addr).hash(state);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f
                .debug_struct("SharedPtr")
                .field("value", &value)
                .field("use_count", &self.use_count())
                .finish(),
            None => f.write_str("SharedPtr(null)"),
        }
    }
}
