use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type SubId = usize;

/// Observable value cell. Clones share the same value.
pub struct Signal<T: 'static>(Rc<Inner<T>>);

struct Inner<T> {
    value: RefCell<Rc<T>>,
    subs: RefCell<Vec<Option<Rc<dyn Fn(&T)>>>>,
    version: Cell<u64>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(Inner {
            value: RefCell::new(Rc::new(value)),
            subs: RefCell::new(Vec::new()),
            version: Cell::new(0),
        }))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        T::clone(&self.0.value.borrow())
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.value.borrow())
    }

    pub fn set(&self, v: T) {
        *self.0.value.borrow_mut() = Rc::new(v);
        self.notify();
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F)
    where
        T: Clone,
    {
        f(Rc::make_mut(&mut self.0.value.borrow_mut()));
        self.notify();
    }

    /// Number of writes so far.
    pub fn version(&self) -> u64 {
        self.0.version.get()
    }

    /// Subscribers see the value that was written and may read or write the
    /// signal themselves.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        let mut subs = self.0.subs.borrow_mut();
        subs.push(Some(Rc::new(f)));
        subs.len() - 1
    }

    pub fn unsubscribe(&self, id: SubId) {
        if let Some(slot) = self.0.subs.borrow_mut().get_mut(id) {
            *slot = None;
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn notify(&self) {
        self.0.version.set(self.0.version.get() + 1);
        // Snapshot so a subscriber can subscribe/unsubscribe without a double borrow.
        let subs: Vec<Rc<dyn Fn(&T)>> = self.0.subs.borrow().iter().flatten().cloned().collect();
        if subs.is_empty() {
            return;
        }
        let value = self.0.value.borrow().clone();
        for s in subs {
            s(&value);
        }
    }
}

pub fn signal<T>(t: T) -> Signal<T> {
    Signal::new(t)
}
