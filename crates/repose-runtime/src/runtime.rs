use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::scope::Scope;

thread_local! {
    static COMPOSERS: RefCell<Vec<Rc<Composer>>> = const { RefCell::new(Vec::new()) };
}

/// Slot storage for one component instance.
#[derive(Default)]
struct Composer {
    slots: RefCell<Vec<Box<dyn Any>>>,
    cursor: Cell<usize>,
    keyed_slots: RefCell<HashMap<String, Box<dyn Any>>>,
    effects: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    scope: Scope,
    passes: Cell<u64>,
}

/// Placeholder for a slot whose `init` is still running.
struct Vacant;

/// One component identity. Every `compose` call is a pass over the same slots,
/// so `remember`ed values survive across passes until the composition is
/// disposed (or dropped).
#[derive(Clone, Default)]
pub struct Composition {
    composer: Rc<Composer>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one composition pass, then the effects queued during it.
    pub fn compose<R>(&self, content: impl FnOnce() -> R) -> R {
        struct Pop;
        impl Drop for Pop {
            fn drop(&mut self) {
                COMPOSERS.with(|st| {
                    st.borrow_mut().pop();
                });
            }
        }

        let composer = &self.composer;
        composer.cursor.set(0);

        let out = {
            COMPOSERS.with(|st| st.borrow_mut().push(composer.clone()));
            let _pop = Pop;
            composer.scope.run(content)
        };

        composer.scope.run(|| {
            loop {
                let next = composer.effects.borrow_mut().pop_front();
                match next {
                    Some(effect) => effect(),
                    None => break,
                }
            }
        });

        composer.passes.set(composer.passes.get() + 1);
        out
    }

    pub fn scope(&self) -> &Scope {
        &self.composer.scope
    }

    /// Completed passes so far.
    pub fn passes(&self) -> u64 {
        self.composer.passes.get()
    }

    /// Unmount: runs every disposer registered during composition and drops
    /// the remembered slots.
    pub fn dispose(&self) {
        self.composer.scope.dispose();
        self.composer.effects.borrow_mut().clear();
        let slots = std::mem::take(&mut *self.composer.slots.borrow_mut());
        let keyed = std::mem::take(&mut *self.composer.keyed_slots.borrow_mut());
        drop(slots);
        drop(keyed);
    }

    pub fn is_disposed(&self) -> bool {
        self.composer.scope.is_disposed()
    }
}

fn current_composer() -> Option<Rc<Composer>> {
    COMPOSERS.with(|st| st.borrow().last().cloned())
}

pub fn is_composing() -> bool {
    current_composer().is_some()
}

/// Queue `effect` to run once the current pass settles. Outside composition
/// it runs immediately.
pub fn after_composition(effect: impl FnOnce() + 'static) {
    match current_composer() {
        Some(c) => c.effects.borrow_mut().push_back(Box::new(effect)),
        None => effect(),
    }
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let Some(c) = current_composer() else {
        log::warn!("remember called outside composition; value will not persist");
        return Rc::new(init());
    };

    let cursor = c.cursor.get();
    c.cursor.set(cursor + 1);

    {
        let mut slots = c.slots.borrow_mut();
        if cursor >= slots.len() {
            // Reserve the slot before `init` so nested remembers line up.
            slots.push(Box::new(Vacant));
        } else if let Some(rc) = slots[cursor].downcast_ref::<Rc<T>>() {
            return rc.clone();
        } else if !slots[cursor].is::<Vacant>() {
            log::warn!(
                "remember: slot {} type changed; replacing. \
                 If this is due to conditional composition, prefer remember_with_key.",
                cursor
            );
        }
    }

    let rc: Rc<T> = Rc::new(init());
    c.slots.borrow_mut()[cursor] = Box::new(rc.clone());
    rc
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let Some(c) = current_composer() else {
        log::warn!("remember_with_key('{key}') called outside composition");
        return Rc::new(init());
    };

    if let Some(existing) = c.keyed_slots.borrow().get(&key) {
        if let Some(rc) = existing.downcast_ref::<Rc<T>>() {
            return rc.clone();
        }
        log::warn!(
            "remember_with_key: key '{}' reused with a different type; replacing.",
            key
        );
    }

    let rc: Rc<T> = Rc::new(init());
    c.keyed_slots.borrow_mut().insert(key, Box::new(rc.clone()));
    rc
}

pub fn remember_state<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember(|| RefCell::new(init()))
}

pub fn remember_state_with_key<T: 'static>(
    key: impl Into<String>,
    init: impl FnOnce() -> T,
) -> Rc<RefCell<T>> {
    remember_with_key(key, || RefCell::new(init()))
}
