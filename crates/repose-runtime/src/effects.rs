use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{after_composition, current_scope, remember};

#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    pub fn noop() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_spent(&self) -> bool {
        self.0.borrow().is_none()
    }
}

/// Runs `f()` immediately and returns its `Dispose`.
pub fn effect<F>(f: F) -> Dispose
where
    F: FnOnce() -> Dispose + 'static,
{
    let d = f();

    // auto-register cleanup in the current scope if one exists
    if let Some(scope) = crate::scope::current_scope() {
        let d2 = d.clone();
        scope.add_disposer(move || d2.run());
    }

    d
}

/// Helper to register cleanup inside effect.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}

/// Dependency-array effect: `effect` runs after the current pass settles
/// whenever `keys` differ from the keys seen on the previous pass. The first
/// pass always counts as a change.
pub fn use_effect<K: PartialEq + 'static>(keys: K, effect: impl FnOnce() + 'static) {
    let last_keys = remember(|| RefCell::new(None::<K>));

    let changed = last_keys.borrow().as_ref() != Some(&keys);
    if changed {
        *last_keys.borrow_mut() = Some(keys);
        after_composition(effect);
    }
}

/// Runs once, after the first pass of the owning composition.
pub fn use_mount(effect: impl FnOnce() + 'static) {
    use_effect((), effect);
}

/// Runs when the owning scope is disposed. The closure from the most recent
/// pass is the one that runs.
pub fn use_unmount(f: impl FnOnce() + 'static) {
    let latest = remember(|| RefCell::new(None::<Box<dyn FnOnce()>>));
    let installed = remember(|| Cell::new(false));

    *latest.borrow_mut() = Some(Box::new(f));

    if !installed.replace(true) {
        match current_scope() {
            Some(scope) => scope.add_disposer(move || {
                let f = latest.borrow_mut().take();
                if let Some(f) = f {
                    f();
                }
            }),
            None => log::warn!("use_unmount called outside a scope; it will never run"),
        }
    }
}

/// Cleanup on key change or unmount.
pub fn disposable_effect<K: PartialEq + 'static>(
    keys: K,
    effect: impl FnOnce() -> Dispose + 'static,
) {
    let cleanup_slot = remember(|| RefCell::new(None::<Dispose>));

    use_unmount({
        let cleanup_slot = cleanup_slot.clone();
        move || {
            let d = cleanup_slot.borrow_mut().take();
            if let Some(d) = d {
                d.run();
            }
        }
    });

    use_effect(keys, move || {
        let previous = cleanup_slot.borrow_mut().take();
        if let Some(d) = previous {
            d.run();
        }
        let d = effect();
        *cleanup_slot.borrow_mut() = Some(d);
    });
}
