use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::Dispose;

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

/// Owner of cleanups for one component (or one navigation entry, one test...).
///
/// Disposers run once, children first, either on `dispose()` or when the last
/// handle is dropped.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
    children: RefCell<Vec<Scope>>,
    disposed: Cell<bool>,
}

impl ScopeInner {
    fn run_disposers(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.dispose();
        }

        // Disposers may register more disposers; drain until quiet.
        loop {
            let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
            if disposers.is_empty() {
                break;
            }
            for disposer in disposers {
                disposer();
            }
        }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Restore(Option<Weak<ScopeInner>>);
        impl Drop for Restore {
            fn drop(&mut self) {
                let prev = self.0.take();
                CURRENT_SCOPE.with(|current| *current.borrow_mut() = prev);
            }
        }

        let prev = CURRENT_SCOPE.with(|current| {
            current
                .borrow_mut()
                .replace(Rc::downgrade(&self.inner))
        });
        let _restore = Restore(prev);
        f()
    }

    /// Registering on an already disposed scope runs the disposer immediately.
    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            disposer();
            return;
        }
        self.inner.disposers.borrow_mut().push(Box::new(disposer));
    }

    pub fn child(&self) -> Scope {
        let child = Scope::new();
        self.inner.children.borrow_mut().push(child.clone());
        child
    }

    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.run_disposers();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

pub fn current_scope() -> Option<Scope> {
    CURRENT_SCOPE.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade().map(|inner| Scope { inner }))
    })
}

/// Runs `f` now and ties the returned cleanup to the current scope.
pub fn scoped_effect<F>(f: F)
where
    F: FnOnce() -> Dispose,
{
    let cleanup = f();
    match current_scope() {
        Some(scope) => scope.add_disposer(move || cleanup.run()),
        None => log::warn!("scoped_effect called outside a scope; cleanup will never run"),
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !self.disposed.replace(true) {
            self.run_disposers();
        }
    }
}
