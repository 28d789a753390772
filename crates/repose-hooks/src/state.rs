use std::cell::RefCell;
use std::rc::Rc;

use repose_runtime::{Signal, remember, remember_state, signal};

use crate::store::{Action, AnyDispatch, Middleware};

pub type Dispatch<A> = Rc<dyn Fn(A)>;
pub type SetValueFn<T> = Rc<dyn Fn(T)>;
pub type GetValueFn<T> = Rc<dyn Fn() -> T>;

/// A reactive cell owned by the calling component.
pub fn use_state<T: 'static>(init: impl FnOnce() -> T) -> Signal<T> {
    (*remember(|| signal(init()))).clone()
}

/// Value plus setter plus a getter that always reads the live value, for
/// closures that outlive the pass they were created in.
pub fn use_get_state<T: Clone + 'static>(default: T) -> (T, SetValueFn<T>, GetValueFn<T>) {
    let state = use_state(|| default);
    let set = {
        let state = state.clone();
        Rc::new(move |v| state.set(v)) as SetValueFn<T>
    };
    let get = {
        let state = state.clone();
        Rc::new(move || state.get()) as GetValueFn<T>
    };
    (state.get(), set, get)
}

/// Mutable box that survives passes. Writing it does not notify anyone.
pub fn use_ref<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember_state(init)
}

/// The value `present` had before it last changed, `None` until it changes.
pub fn use_previous<T: Clone + PartialEq + 'static>(present: T) -> Option<T> {
    let slot = remember_state(|| (None::<T>, None::<T>));
    let mut slot = slot.borrow_mut();
    let (previous, current) = &mut *slot;
    if current.as_ref() != Some(&present) {
        *previous = current.replace(present);
    }
    previous.clone()
}

/// Reducer-backed state. Dispatched actions pass through `middlewares`, the
/// first one outermost, before reaching the reducer.
pub fn use_reducer<S, A>(
    reducer: impl Fn(&S, A) -> S + 'static,
    initial: S,
    middlewares: &[Middleware],
) -> (S, Dispatch<A>)
where
    S: Clone + 'static,
    A: Clone + 'static,
{
    let state = use_state(|| initial);
    let dispatch = reducer_dispatch(&state, reducer, middlewares);
    (state.get(), dispatch)
}

pub(crate) fn reducer_dispatch<S, A>(
    state: &Signal<S>,
    reducer: impl Fn(&S, A) -> S + 'static,
    middlewares: &[Middleware],
) -> Dispatch<A>
where
    S: 'static,
    A: Clone + 'static,
{
    let state = state.clone();
    let base: AnyDispatch = Rc::new(move |action: Action| match action.downcast::<A>() {
        Some(a) => {
            let next = state.with(|s| reducer(s, a));
            state.set(next);
        }
        None => log::warn!("reducer dropped an action of an unexpected type"),
    });
    let chain = middlewares.iter().rev().fold(base, |next, mw| mw(next));
    Rc::new(move |a: A| chain(Action::new(a)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repose_runtime::Composition;

    #[test]
    fn use_get_state_getter_sees_later_writes() {
        let comp = Composition::new();
        let (value, set, get) = comp.compose(|| use_get_state(1));
        assert_eq!(value, 1);
        set(5);
        assert_eq!(get(), 5);
        let (value, _, _) = comp.compose(|| use_get_state(1));
        assert_eq!(value, 5);
    }

    #[test]
    fn use_previous_tracks_changes() {
        let comp = Composition::new();
        let seen: Vec<_> = [1, 1, 2, 2, 3]
            .into_iter()
            .map(|v| comp.compose(|| use_previous(v)))
            .collect();
        assert_eq!(seen, vec![None, None, Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn use_ref_survives_passes() {
        let comp = Composition::new();
        comp.compose(|| *use_ref(|| 0).borrow_mut() += 2);
        let v = comp.compose(|| *use_ref(|| 0).borrow());
        assert_eq!(v, 2);
    }

    #[test]
    fn reducer_runs_through_middleware() {
        let comp = Composition::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let tag = |name: &'static str, log: Rc<RefCell<Vec<&'static str>>>| -> Middleware {
            Rc::new(move |next: AnyDispatch| -> AnyDispatch {
                let log = log.clone();
                Rc::new(move |action: Action| {
                    log.borrow_mut().push(name);
                    next(action)
                })
            })
        };
        let mws = [tag("outer", log.clone()), tag("inner", log.clone())];

        let (_, dispatch) = comp.compose(|| use_reducer(|s: &i32, a: i32| s + a, 0, &mws));
        dispatch(3);
        dispatch(4);
        let (sum, _) = comp.compose(|| use_reducer(|s: &i32, a: i32| s + a, 0, &mws));
        assert_eq!(sum, 7);
        assert_eq!(*log.borrow(), vec!["outer", "inner", "outer", "inner"]);
    }
}
