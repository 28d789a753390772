use std::cell::RefCell;
use std::rc::Rc;

use crate::remember;

/// Holder for a value that changes every pass but is read later by
/// long-lived closures (timers, tasks). Reading through the holder instead of
/// capturing the value avoids acting on a stale copy.
pub struct Latest<T>(Rc<RefCell<T>>);

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Latest<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }
}

/// Returns the same holder on every pass, refreshed with `value`.
pub fn use_latest<T: 'static>(value: T) -> Latest<T> {
    let slot = remember(|| RefCell::new(None::<Latest<T>>));
    let mut slot = slot.borrow_mut();
    match slot.as_ref() {
        Some(latest) => {
            latest.set(value);
            latest.clone()
        }
        None => {
            let latest = Latest::new(value);
            *slot = Some(latest.clone());
            latest
        }
    }
}
