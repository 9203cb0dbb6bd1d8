use std::cell::OnceCell;
use std::fmt;

use super::{SharedPtr, WeakPtr};
use crate::error::ExpiredError;

/// The weak back-reference an object keeps to itself.
///
/// Embed one in a type and implement [`EnableSharedFromThis`] to let the
/// object hand out `SharedPtr`s to itself. The slot is filled by
/// [`make_shared_enabled`] or [`SharedPtr::from_box_enabled`]; nothing
/// outside this crate can write to it.
pub struct WeakThis<T: ?Sized> {
    slot: OnceCell<WeakPtr<T>>,
}

impl<T: ?Sized> WeakThis<T> {
    pub const fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    /// Records the control block that manages the object. Only the first
    /// call has an effect.
    pub(crate) fn install(&self, weak: WeakPtr<T>) {
        if self.slot.set(weak).is_err() {
            log::warn!("object is already managed by a SharedPtr, ignoring second owner");
        }
    }

    fn get(&self) -> Option<&WeakPtr<T>> {
        self.slot.get()
    }
}

impl<T: ?Sized> Default for WeakThis<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A copy of an object is a different object: it starts unmanaged.
impl<T: ?Sized> Clone for WeakThis<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for WeakThis<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakThis")
            .field("managed", &self.get().is_some())
            .finish()
    }
}

/// Lets an object obtain shared and weak pointers to itself.
///
/// Only [`make_shared_enabled`] and [`SharedPtr::from_box_enabled`] fill
/// the object's [`WeakThis`] slot. An object managed through `make_shared`
/// or `SharedPtr::from_box` behaves as if it were unmanaged.
///
/// # Example
///
/// ```
/// use smart_ptrs::{make_shared_enabled, EnableSharedFromThis, WeakThis};
///
/// struct Node {
///     this: WeakThis<Node>,
/// }
///
/// impl EnableSharedFromThis for Node {
///     fn weak_this(&self) -> &WeakThis<Node> {
///         &self.this
///     }
/// }
///
/// let node = make_shared_enabled(Node { this: WeakThis::new() });
/// let again = node.shared_from_this().unwrap();
/// assert!(node == again);
/// assert_eq!(node.use_count(), 2);
/// ```
pub trait EnableSharedFromThis: 'static {
    fn weak_this(&self) -> &WeakThis<Self>;

    /// A new strong reference to this object.
    ///
    /// Fails with [`ExpiredError`] if the weak slot was never filled, as for
    /// an object on the stack or one wrapped by `make_shared`, or if the
    /// object is being destroyed.
    fn shared_from_this(&self) -> Result<SharedPtr<Self>, ExpiredError> {
        self.weak_this().get().ok_or(ExpiredError)?.upgrade()
    }

    /// A weak reference to this object, empty if the weak slot was never
    /// filled.
    fn weak_from_this(&self) -> WeakPtr<Self> {
        self.weak_this().get().cloned().unwrap_or_default()
    }
}

/// Allocates `value` with its control block and wires up its weak slot.
pub fn make_shared_enabled<T: EnableSharedFromThis>(value: T) -> SharedPtr<T> {
    SharedPtr::new_enabled(value)
}

impl<T: EnableSharedFromThis + ?Sized> SharedPtr<T> {
    pub fn new_enabled(value: T) -> Self
    where
        T: Sized,
    {
        let this = Self::new(value);
        this.enable_shared_from_this();
        this
    }

    pub fn from_box_enabled(value: Box<T>) -> Self {
        let this = Self::from_box(value);
        this.enable_shared_from_this();
        this
    }

    fn enable_shared_from_this(&self) {
        if let Some(value) = self.get() {
            value.weak_this().install(self.downgrade());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Widget {
        id: u32,
        drops: Rc<Cell<usize>>,
        this: WeakThis<Widget>,
    }

    impl Widget {
        fn new(id: u32, drops: &Rc<Cell<usize>>) -> Self {
            Self {
                id,
                drops: drops.clone(),
                this: WeakThis::new(),
            }
        }
    }

    impl Drop for Widget {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    impl EnableSharedFromThis for Widget {
        fn weak_this(&self) -> &WeakThis<Widget> {
            &self.this
        }
    }

    #[test]
    fn test_shared_from_this_fused() {
        let drops = Rc::new(Cell::new(0));
        let x = make_shared_enabled(Widget::new(1, &drops));
        assert_eq!(x.use_count(), 1);
        assert_eq!(x.weak_count(), 1);

        let y = x.shared_from_this().unwrap();
        assert!(x == y);
        assert_eq!(x.use_count(), 2);
        assert_eq!(y.id, 1);

        drop(x);
        drop(y);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_shared_from_this_detached() {
        let drops = Rc::new(Cell::new(0));
        let x = SharedPtr::from_box_enabled(Box::new(Widget::new(2, &drops)));
        let w = x.weak_from_this();
        assert!(w.ptr_eq(&x.downgrade()));
        assert_eq!(x.weak_count(), 2);
        drop(x);
        assert_eq!(drops.get(), 1);
        assert!(w.expired());
    }

    #[test]
    fn test_unmanaged_object() {
        let drops = Rc::new(Cell::new(0));
        let local = Widget::new(3, &drops);
        assert_eq!(local.shared_from_this().unwrap_err(), ExpiredError);
        assert!(local.weak_from_this().expired());
    }

    #[test]
    fn test_clone_of_managed_object_is_unmanaged() {
        let this: WeakThis<i32> = WeakThis::new();
        let shared = SharedPtr::new(5);
        this.install(shared.downgrade());
        assert!(this.get().is_some());
        assert!(this.clone().get().is_none());

        // The second owner is ignored.
        let other = SharedPtr::new(6);
        this.install(other.downgrade());
        assert_eq!(*this.get().unwrap().lock(), 5);
    }

    #[test]
    fn test_plain_make_shared_leaves_slot_empty() {
        let drops = Rc::new(Cell::new(0));
        let x = crate::shared::make_shared(Widget::new(5, &drops));
        assert_eq!(x.shared_from_this().unwrap_err(), ExpiredError);
        assert!(x.weak_from_this().expired());
        assert_eq!(x.weak_count(), 0);

        let y = SharedPtr::from_box(Box::new(Widget::new(6, &drops)));
        assert_eq!(y.shared_from_this().unwrap_err(), ExpiredError);
    }

    struct WeakCountOnDrop {
        this: WeakThis<WeakCountOnDrop>,
        seen: Rc<Cell<usize>>,
    }

    impl EnableSharedFromThis for WeakCountOnDrop {
        fn weak_this(&self) -> &WeakThis<WeakCountOnDrop> {
            &self.this
        }
    }

    impl Drop for WeakCountOnDrop {
        fn drop(&mut self) {
            self.seen.set(self.this.get().map_or(0, WeakPtr::weak_count));
        }
    }

    #[test]
    fn test_weak_count_inside_drop_includes_implicit_reference() {
        let seen = Rc::new(Cell::new(0));
        let x = make_shared_enabled(WeakCountOnDrop {
            this: WeakThis::new(),
            seen: seen.clone(),
        });
        assert_eq!(x.weak_count(), 1);
        drop(x);
        // The slot's own WeakPtr plus the implicit reference.
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_last_reference_from_inside() {
        let drops = Rc::new(Cell::new(0));
        let x = make_shared_enabled(Widget::new(4, &drops));
        let y = x.shared_from_this().unwrap();
        drop(x);
        // The object's own weak slot is released while its control block
        // is being torn down.
        drop(y);
        assert_eq!(drops.get(), 1);
    }
}
