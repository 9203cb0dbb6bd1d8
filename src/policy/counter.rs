use std::cell::Cell;

/// Storage for a non-atomic reference count.
///
/// Implementations are single-threaded; nothing here synchronizes.
///
/// # Safety
///
/// `dec_ref` and `ref_count` must report the count faithfully: objects are
/// destroyed as soon as `dec_ref` returns zero.
pub unsafe trait Counter {
    /// Increments the count and returns the new value.
    fn inc_ref(&self) -> usize;

    /// Decrements the count and returns the new value.
    ///
    /// # Safety
    ///
    /// The caller must give up a reference it obtained through `inc_ref`.
    unsafe fn dec_ref(&self) -> usize;

    fn ref_count(&self) -> usize;
}

/// A plain `Cell<usize>` counter.
///
/// Cloning yields a counter starting at zero: a copied pointee is a new
/// object and owes nothing to the references of the original.
#[derive(Debug, Default)]
pub struct SimpleCounter {
    count: Cell<usize>,
}

impl SimpleCounter {
    pub const fn new() -> Self {
        Self {
            count: Cell::new(0),
        }
    }
}

impl Clone for SimpleCounter {
    fn clone(&self) -> Self {
        Self::new()
    }
}

unsafe impl Counter for SimpleCounter {
    fn inc_ref(&self) -> usize {
        increment(&self.count)
    }

    unsafe fn dec_ref(&self) -> usize {
        decrement(&self.count)
    }

    fn ref_count(&self) -> usize {
        self.count.get()
    }
}

/// Increments `count`, aborting if it grows past `usize::MAX / 2`.
pub(crate) fn increment(count: &Cell<usize>) -> usize {
    let n = count.get();
    if n > usize::MAX / 2 {
        log::error!("reference count overflow ({n}), aborting");
        std::process::abort();
    }
    count.set(n + 1);
    n + 1
}

/// Decrements `count` and returns the new value.
///
/// Going below zero means increments and decrements were not paired.
pub(crate) fn decrement(count: &Cell<usize>) -> usize {
    let n = count.get();
    if cfg!(any(debug_assertions, feature = "debug")) && n == 0 {
        panic!("reference count decremented below zero");
    }
    let n = n.wrapping_sub(1);
    count.set(n);
    n
}
