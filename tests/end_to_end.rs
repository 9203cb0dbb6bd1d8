use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smart_ptrs::{
    make_intrusive, make_shared, make_shared_enabled, make_unique, DefaultDelete, Deleter,
    EmbeddedCounter, EnableSharedFromThis, IntrusivePtr, SharedPtr, SimpleCounter, UniquePtr,
    WeakPtr, WeakThis,
};

struct Widget {
    value: i32,
}

#[test]
fn test_widget_lifecycle() {
    let mut a = make_shared(Widget { value: 42 });
    let mut b = a.clone();
    let w = WeakPtr::from(&a);
    a.reset();
    assert_eq!(b.use_count(), 1);
    assert!(!w.expired());
    assert_eq!(w.lock().value, 42);
    b.reset();
    assert!(w.expired());
    assert!(w.lock().is_null());
}

struct Tracked {
    id: usize,
    drops: Rc<Cell<usize>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

struct World {
    owners: Vec<SharedPtr<Tracked>>,
    weaks: Vec<(usize, WeakPtr<Tracked>)>,
    drops: Vec<Rc<Cell<usize>>>,
}

impl World {
    fn live_owners(&self, id: usize) -> usize {
        self.owners
            .iter()
            .filter(|o| o.get().map_or(false, |t| t.id == id))
            .count()
    }

    fn check(&self) {
        for owner in self.owners.iter().filter(|o| !o.is_null()) {
            let sharing = self
                .owners
                .iter()
                .filter(|o| !o.is_null() && o.ptr_eq(owner))
                .count();
            assert_eq!(owner.use_count(), sharing);
        }
        for (id, drops) in self.drops.iter().enumerate() {
            let live = self.live_owners(id);
            assert_eq!(drops.get(), usize::from(live == 0), "object {id}");
        }
        for (id, weak) in &self.weaks {
            let live = self.live_owners(*id);
            assert_eq!(weak.expired(), live == 0);
            assert_eq!(weak.use_count(), live);
        }
    }

    fn create(&mut self, rng: &mut StdRng) {
        let drops = Rc::new(Cell::new(0));
        let tracked = Tracked {
            id: self.drops.len(),
            drops: drops.clone(),
        };
        self.drops.push(drops);
        let owner = if rng.gen_bool(0.5) {
            make_shared(tracked)
        } else {
            SharedPtr::from_box(Box::new(tracked))
        };
        self.owners.push(owner);
    }
}

#[test]
fn test_random_ownership_sequences() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = World {
            owners: Vec::new(),
            weaks: Vec::new(),
            drops: Vec::new(),
        };

        for _ in 0..300 {
            if world.owners.is_empty() {
                world.create(&mut rng);
                continue;
            }
            let i = rng.gen_range(0..world.owners.len());
            match rng.gen_range(0..9) {
                0 => world.create(&mut rng),
                1 => {
                    let copy = world.owners[i].clone();
                    world.owners.push(copy);
                }
                2 => {
                    let moved = world.owners[i].take();
                    world.owners.push(moved);
                }
                3 => world.owners[i].reset(),
                4 => {
                    if let Some(id) = world.owners[i].get().map(|t| t.id) {
                        let weak = world.owners[i].downgrade();
                        world.weaks.push((id, weak));
                    }
                }
                5 => {
                    if !world.weaks.is_empty() {
                        let j = rng.gen_range(0..world.weaks.len());
                        let locked = world.weaks[j].1.lock();
                        assert_eq!(locked.is_null(), world.weaks[j].1.expired());
                        world.owners.push(locked);
                    }
                }
                6 => {
                    let j = rng.gen_range(0..world.owners.len());
                    let source = world.owners[j].clone();
                    world.owners[i].clone_from(&source);
                }
                7 => {
                    if !world.weaks.is_empty() {
                        let j = rng.gen_range(0..world.weaks.len());
                        world.weaks.swap_remove(j);
                    }
                }
                _ => {
                    world.owners.swap_remove(i);
                }
            }
            world.check();
        }

        world.owners.clear();
        assert!(world.weaks.iter().all(|(_, w)| w.expired()));
        world.weaks.clear();
        assert!(world.drops.iter().all(|d| d.get() == 1));
    }
}

struct TreeNode {
    name: String,
    parent: RefCell<WeakPtr<TreeNode>>,
    children: RefCell<Vec<SharedPtr<TreeNode>>>,
    this: WeakThis<TreeNode>,
    drops: Rc<Cell<usize>>,
}

impl TreeNode {
    fn new(name: &str, drops: &Rc<Cell<usize>>) -> SharedPtr<TreeNode> {
        make_shared_enabled(TreeNode {
            name: name.to_string(),
            parent: RefCell::new(WeakPtr::new()),
            children: RefCell::new(Vec::new()),
            this: WeakThis::new(),
            drops: drops.clone(),
        })
    }

    fn add_child(&self, child: SharedPtr<TreeNode>) {
        *child.parent.borrow_mut() = self.weak_from_this();
        self.children.borrow_mut().push(child);
    }

    fn path(&self) -> String {
        match self.parent.borrow().lock().get() {
            Some(parent) => format!("{}/{}", parent.path(), self.name),
            None => self.name.clone(),
        }
    }
}

impl EnableSharedFromThis for TreeNode {
    fn weak_this(&self) -> &WeakThis<TreeNode> {
        &self.this
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn test_tree_with_parent_back_references() {
    let drops = Rc::new(Cell::new(0));
    let root = TreeNode::new("root", &drops);
    let child = TreeNode::new("child", &drops);
    let leaf = TreeNode::new("leaf", &drops);
    child.add_child(leaf.clone());
    root.add_child(child.clone());

    assert_eq!(leaf.path(), "root/child/leaf");
    assert_eq!(child.use_count(), 2);

    drop(child);
    let leaf_parent = leaf.parent.borrow().lock();
    assert_eq!(leaf_parent.name, "child");
    drop(leaf_parent);

    drop(root);
    assert_eq!(drops.get(), 2);
    assert_eq!(leaf.path(), "leaf");
    assert!(leaf.parent.borrow().expired());

    drop(leaf);
    assert_eq!(drops.get(), 3);
}

#[test]
fn test_member_alias_outlives_owner() {
    let drops = Rc::new(Cell::new(0));
    let node = TreeNode::new("owner", &drops);
    let name = SharedPtr::project(&node, |n: &TreeNode| &n.name);
    drop(node);
    assert_eq!(drops.get(), 0);
    assert_eq!(name.as_str(), "owner");
    drop(name);
    assert_eq!(drops.get(), 1);
}

fn counted_vec(
    drops: &Rc<Cell<usize>>,
) -> UniquePtr<Vec<i32>, impl FnMut(NonNull<Vec<i32>>)> {
    let sink = drops.clone();
    let raw = NonNull::from(Box::leak(Box::new(Vec::new())));
    // Safety: `raw` comes from a Box and the deleter frees it as one.
    unsafe {
        UniquePtr::with_deleter(Some(raw), move |p: NonNull<Vec<i32>>| {
            drop(Box::from_raw(p.as_ptr()));
            sink.set(sink.get() + 1);
        })
    }
}

fn check(fail: bool) -> Result<(), String> {
    if fail {
        Err(String::from("check failed"))
    } else {
        Ok(())
    }
}

fn fill<D: Deleter<Vec<i32>>>(
    mut ptr: UniquePtr<Vec<i32>, D>,
    early: bool,
    fail: bool,
) -> Result<usize, String> {
    ptr.push(1);
    if early {
        return Err(String::from("early exit"));
    }
    check(fail)?;
    ptr.push(2);
    Ok(ptr.len())
}

#[test]
fn test_unique_released_on_every_exit_path() {
    let drops = Rc::new(Cell::new(0));
    assert_eq!(fill(counted_vec(&drops), false, false), Ok(2));
    assert_eq!(drops.get(), 1);

    assert_eq!(
        fill(counted_vec(&drops), true, false),
        Err(String::from("early exit"))
    );
    assert_eq!(drops.get(), 2);

    assert_eq!(
        fill(counted_vec(&drops), false, true),
        Err(String::from("check failed"))
    );
    assert_eq!(drops.get(), 3);

    assert_eq!(fill(make_unique(Vec::new()), false, false), Ok(2));
}

#[test]
fn test_unique_released_when_unwinding() {
    let drops = Rc::new(Cell::new(0));
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut ptr = counted_vec(&drops);
        ptr.push(1);
        if ptr.len() == 1 {
            panic!("unwinding with a live UniquePtr");
        }
    }));
    assert!(result.is_err());
    assert_eq!(drops.get(), 1);
}

struct Handle {
    refs: SimpleCounter,
    payload: Vec<u8>,
}

impl EmbeddedCounter for Handle {
    type Counter = SimpleCounter;
    type Destroy = DefaultDelete;

    fn counter(&self) -> &SimpleCounter {
        &self.refs
    }
}

#[test]
fn test_intrusive_shared_between_owners() {
    let handle = make_intrusive(Handle {
        refs: SimpleCounter::new(),
        payload: vec![1, 2, 3],
    });
    let owners: Vec<IntrusivePtr<Handle>> = (0..5).map(|_| handle.clone()).collect();
    assert_eq!(handle.use_count(), 6);
    drop(owners);
    assert_eq!(handle.use_count(), 1);
    assert_eq!(handle.payload.len(), 3);
}
