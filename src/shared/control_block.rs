use std::cell::{Cell, UnsafeCell};
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use crate::policy::{decrement, increment, Deleter};
use crate::unique::UniquePtr;

pub(crate) struct Counts {
    /// Number of `SharedPtr`s.
    strong: Cell<usize>,
    /// Number of `WeakPtr`s, plus one if there are any `SharedPtr`s.
    weak: Cell<usize>,
}

impl Counts {
    /// Counts for a block born with one strong reference.
    fn new() -> Self {
        Self {
            strong: Cell::new(1),
            weak: Cell::new(1),
        }
    }
}

/// Bookkeeping shared by every `SharedPtr` and `WeakPtr` of one object.
///
/// The two implementations differ in where the object lives and therefore in
/// how it is destroyed; the counting protocol is the same for both.
pub(crate) trait ControlBlock {
    fn counts(&self) -> &Counts;

    /// Destroys the object.
    ///
    /// # Safety
    ///
    /// Called once, after the strong count has reached zero.
    unsafe fn destroy_object(&self);

    fn add_strong(&self) {
        increment(&self.counts().strong);
    }

    /// Drops one strong reference, destroying the object at the 1 -> 0
    /// transition. Returns `true` in that case.
    ///
    /// # Safety
    ///
    /// The caller must own the strong reference it gives up.
    unsafe fn dec_strong(&self) -> bool {
        if decrement(&self.counts().strong) != 0 {
            return false;
        }
        self.destroy_object();
        true
    }

    fn add_weak(&self) {
        increment(&self.counts().weak);
    }

    /// Drops one weak reference. Returns `true` when nothing references the
    /// block anymore and it may be freed.
    ///
    /// # Safety
    ///
    /// The caller must own the weak reference it gives up.
    unsafe fn dec_weak(&self) -> bool {
        decrement(&self.counts().weak) == 0
    }

    fn strong_count(&self) -> usize {
        self.counts().strong.get()
    }

    /// Number of `WeakPtr`s, not counting the one held on behalf of the
    /// strong references.
    ///
    /// While the object is being destroyed the strong count is already zero
    /// but the implicit reference is still held, so a pointee's `Drop`
    /// observes one more than the number of `WeakPtr`s.
    fn weak_count(&self) -> usize {
        let implicit = usize::from(!self.is_strong_empty());
        self.counts().weak.get() - implicit
    }

    fn is_strong_empty(&self) -> bool {
        self.strong_count() == 0
    }

    fn is_empty(&self) -> bool {
        self.is_strong_empty() && self.counts().weak.get() == 0
    }
}

/// A block owning a separately allocated object through a `UniquePtr`.
pub(crate) struct DetachedBlock<T: ?Sized, D: Deleter<T>> {
    counts: Counts,
    object: Cell<Option<UniquePtr<T, D>>>,
}

impl<T: ?Sized, D: Deleter<T>> DetachedBlock<T, D> {
    pub(crate) fn new(object: UniquePtr<T, D>) -> Self {
        Self {
            counts: Counts::new(),
            object: Cell::new(Some(object)),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> ControlBlock for DetachedBlock<T, D> {
    fn counts(&self) -> &Counts {
        &self.counts
    }

    unsafe fn destroy_object(&self) {
        // Taking the pointer out first makes a second call a no-op.
        if let Some(object) = self.object.take() {
            log::trace!("destroying detached object at {:p}", self);
            drop(object);
        }
    }
}

/// A block storing the object inline, so one allocation covers both.
pub(crate) struct FusedBlock<T> {
    counts: Counts,
    /// The object. Dropped in place once only weak references are left.
    value: UnsafeCell<ManuallyDrop<T>>,
}

impl<T> FusedBlock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            counts: Counts::new(),
            value: UnsafeCell::new(ManuallyDrop::new(value)),
        }
    }

    pub(crate) fn value_ptr(&self) -> NonNull<T> {
        // Safety: UnsafeCell::get never returns null, and ManuallyDrop<T> is
        // laid out exactly like T.
        unsafe { NonNull::new_unchecked(self.value.get().cast::<T>()) }
    }
}

impl<T> ControlBlock for FusedBlock<T> {
    fn counts(&self) -> &Counts {
        &self.counts
    }

    unsafe fn destroy_object(&self) {
        log::trace!("destroying fused object at {:p}", self);
        // Safety: The strong count is zero, so nothing will access the
        // value anymore. Freeing the block later does not drop it again.
        ManuallyDrop::drop(&mut *self.value.get());
    }
}

/// A type-erased handle to a heap-allocated control block.
///
/// Copying a `BlockRef` does not touch the counts; the pointer types pair
/// every copy they keep with an increment.
#[derive(Clone, Copy)]
pub(crate) struct BlockRef(NonNull<dyn ControlBlock>);

impl BlockRef {
    /// Moves `block` to the heap. The typed pointer lets the caller reach
    /// into the block before its type is erased.
    pub(crate) fn allocate<B: ControlBlock + 'static>(block: B) -> (Self, NonNull<B>) {
        let typed = NonNull::from(Box::leak(Box::new(block)));
        log::trace!("allocated control block at {:p}", typed);
        (BlockRef(typed), typed)
    }

    pub(crate) fn get(&self) -> &dyn ControlBlock {
        // Safety: a BlockRef is only held alongside a strong or weak
        // reference, which keeps the allocation alive.
        unsafe { self.0.as_ref() }
    }

    /// Address of the block, used as the identity of the shared object.
    pub(crate) fn addr(self) -> *const () {
        self.0.as_ptr() as *const ()
    }

    /// Gives up one strong reference.
    ///
    /// # Safety
    ///
    /// The caller must own the reference and must not use `self` afterwards.
    pub(crate) unsafe fn release_strong(self) {
        if self.get().dec_strong() {
            // Now that there are no strong references left, drop the
            // implicit weak reference that represented all of them.
            self.release_weak();
        }
    }

    /// Gives up one weak reference, freeing the block if it was the last
    /// reference of any kind.
    ///
    /// # Safety
    ///
    /// The caller must own the reference and must not use `self` afterwards.
    pub(crate) unsafe fn release_weak(self) {
        if self.get().dec_weak() {
            debug_assert!(self.get().is_empty());
            log::trace!("freeing control block at {:p}", self.0);
            drop(Box::from_raw(self.0.as_ptr()));
        }
    }
}
