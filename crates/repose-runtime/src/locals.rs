//! # Composition locals
//!
//! A value provided with `provide_local` is readable by everything composed
//! inside the closure, and by nothing outside it:
//!
//! ```rust
//! use repose_runtime::*;
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct ApiBase(&'static str);
//!
//! provide_local(ApiBase("https://example.invalid"), || {
//!     assert_eq!(use_local::<ApiBase>(), Some(ApiBase("https://example.invalid")));
//! });
//! assert_eq!(use_local::<ApiBase>(), None);
//! ```
//!
//! Locals are keyed by type; wrap a value in a newtype to keep two locals of
//! the same underlying type apart.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static LOCALS_STACK: RefCell<Vec<HashMap<TypeId, Box<dyn Any>>>> = const { RefCell::new(Vec::new()) };
}

fn with_locals_frame<R>(f: impl FnOnce() -> R) -> R {
    // Non-panicking frame guard (ensures pop on unwind)
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            LOCALS_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    LOCALS_STACK.with(|st| st.borrow_mut().push(HashMap::new()));
    let _guard = Guard;
    f()
}

fn set_local_boxed(t: TypeId, v: Box<dyn Any>) {
    LOCALS_STACK.with(|st| {
        if let Some(top) = st.borrow_mut().last_mut() {
            top.insert(t, v);
        }
    });
}

/// Makes `value` visible to `use_local::<T>()` for the duration of `f`.
pub fn provide_local<T: Clone + 'static, R>(value: T, f: impl FnOnce() -> R) -> R {
    with_locals_frame(|| {
        set_local_boxed(TypeId::of::<T>(), Box::new(value));
        f()
    })
}

/// Nearest provided `T`, if any.
pub fn use_local<T: Clone + 'static>() -> Option<T> {
    LOCALS_STACK.with(|st| {
        for frame in st.borrow().iter().rev() {
            if let Some(v) = frame.get(&TypeId::of::<T>())
                && let Some(t) = v.downcast_ref::<T>()
            {
                return Some(t.clone());
            }
        }
        None
    })
}

pub fn use_local_or_default<T: Clone + Default + 'static>() -> T {
    use_local::<T>().unwrap_or_default()
}
