//! App-wide reducer store.
//!
//! A [`Store`] lists reducer records. [`redux_provider`] instantiates one
//! reducer cell per record for the component that calls it and exposes them
//! to everything composed inside. Descendants look states and dispatchers up
//! by type or by alias:
//!
//! ```rust
//! use repose_hooks::store::{Store, redux_provider, use_dispatch, use_selector};
//! use repose_runtime::Composition;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Count(i32);
//! #[derive(Clone)]
//! enum CountAction { Add(i32) }
//!
//! let store = Store::new().record(Count(0), |c: &Count, a: CountAction| match a {
//!     CountAction::Add(n) => Count(c.0 + n),
//! });
//! let comp = Composition::new();
//! let dispatch = comp
//!     .compose(|| redux_provider(&store, use_dispatch::<CountAction>))
//!     .unwrap();
//! dispatch(CountAction::Add(2));
//! let count = comp.compose(|| redux_provider(&store, use_selector::<Count>));
//! assert_eq!(count, Ok(Count(2)));
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use repose_runtime::{Signal, TaskScope, provide_local, remember, use_local, use_unmount};

use crate::error::HookError;
use crate::state::{Dispatch, reducer_dispatch, use_state};

/// A type-erased action on its way through the middleware chain.
#[derive(Clone)]
pub struct Action {
    type_name: &'static str,
    payload: Rc<dyn Any>,
}

impl Action {
    pub fn new<A: 'static>(action: A) -> Self {
        Self {
            type_name: type_name::<A>(),
            payload: Rc::new(action),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<A: 'static>(&self) -> bool {
        self.payload.is::<A>()
    }

    pub fn downcast_ref<A: 'static>(&self) -> Option<&A> {
        self.payload.downcast_ref::<A>()
    }

    pub fn downcast<A: Clone + 'static>(self) -> Option<A> {
        Rc::downcast::<A>(self.payload).ok().map(Rc::unwrap_or_clone)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action").field(&self.type_name).finish()
    }
}

pub type AnyDispatch = Rc<dyn Fn(Action)>;

/// Wraps the next dispatcher in the chain.
pub type Middleware = Rc<dyn Fn(AnyDispatch) -> AnyDispatch>;

/// Dispatches the action an async block produces once it completes.
pub type DispatchAsync<A> = Rc<dyn Fn(LocalBoxFuture<'static, A>)>;

/// Logs every action at debug level before passing it on.
pub fn logger_middleware() -> Middleware {
    Rc::new(|next: AnyDispatch| -> AnyDispatch {
        Rc::new(move |action: Action| {
            log::debug!("dispatch {}", action.type_name());
            next(action);
        })
    })
}

#[derive(Clone)]
struct Installed {
    state_type: TypeId,
    state_name: &'static str,
    action_type: TypeId,
    action_name: &'static str,
    /// `Signal<S>`
    state: Rc<dyn Any>,
    /// `Dispatch<A>`
    dispatch: Rc<dyn Any>,
}

struct Record {
    alias: String,
    install: Rc<dyn Fn(&[Middleware]) -> Installed>,
}

#[derive(Default)]
pub struct Store {
    records: Vec<Record>,
    middlewares: Vec<Middleware>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reducer under the state type's name.
    pub fn record<S, A>(self, initial: S, reducer: impl Fn(&S, A) -> S + 'static) -> Self
    where
        S: Clone + 'static,
        A: Clone + 'static,
    {
        self.record_with_alias(type_name::<S>(), initial, reducer)
    }

    pub fn record_with_alias<S, A>(
        mut self,
        alias: impl Into<String>,
        initial: S,
        reducer: impl Fn(&S, A) -> S + 'static,
    ) -> Self
    where
        S: Clone + 'static,
        A: Clone + 'static,
    {
        let alias = alias.into();
        if self.records.iter().any(|r| r.alias == alias) {
            log::warn!("store alias `{alias}` registered twice; the later record wins");
        }
        let reducer = Rc::new(reducer);
        let install = move |middlewares: &[Middleware]| {
            let state: Signal<S> = use_state(|| initial.clone());
            let reducer = reducer.clone();
            let dispatch: Dispatch<A> = reducer_dispatch(&state, move |s: &S, a: A| reducer(s, a), middlewares);
            Installed {
                state_type: TypeId::of::<S>(),
                state_name: type_name::<S>(),
                action_type: TypeId::of::<A>(),
                action_name: type_name::<A>(),
                state: Rc::new(state),
                dispatch: Rc::new(dispatch),
            }
        };
        self.records.push(Record {
            alias,
            install: Rc::new(install),
        });
        self
    }

    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }
}

#[derive(Default)]
struct RegistryInner {
    states: HashMap<TypeId, Installed>,
    dispatches: HashMap<TypeId, Installed>,
    aliases: HashMap<String, Installed>,
}

#[derive(Clone)]
struct Registry(Rc<RegistryInner>);

/// Instantiates the store's reducers for the calling component and makes
/// them visible to `content`.
pub fn redux_provider<R>(store: &Store, content: impl FnOnce() -> R) -> R {
    let mut inner = RegistryInner::default();
    for record in &store.records {
        let installed = (record.install)(&store.middlewares);
        inner.states.insert(installed.state_type, installed.clone());
        inner.dispatches.insert(installed.action_type, installed.clone());
        inner.aliases.insert(record.alias.clone(), installed);
    }
    provide_local(Registry(Rc::new(inner)), content)
}

fn registry() -> Result<Registry, HookError> {
    use_local::<Registry>().ok_or(HookError::MissingProvider)
}

fn alias_entry(alias: &str) -> Result<Installed, HookError> {
    registry()?
        .0
        .aliases
        .get(alias)
        .cloned()
        .ok_or_else(|| HookError::UnknownAlias(alias.to_string()))
}

/// Current value of the store state of type `S`.
pub fn use_selector<S: Clone + 'static>() -> Result<S, HookError> {
    let registry = registry()?;
    registry
        .0
        .states
        .get(&TypeId::of::<S>())
        .and_then(|e| e.state.downcast_ref::<Signal<S>>())
        .map(Signal::get)
        .ok_or(HookError::UnregisteredState(type_name::<S>()))
}

pub fn use_selector_alias<S: Clone + 'static>(alias: &str) -> Result<S, HookError> {
    let entry = alias_entry(alias)?;
    entry
        .state
        .downcast_ref::<Signal<S>>()
        .map(Signal::get)
        .ok_or_else(|| HookError::AliasTypeMismatch {
            alias: alias.to_string(),
            requested: type_name::<S>(),
            actual: entry.state_name,
        })
}

/// Dispatcher of the reducer that accepts actions of type `A`.
pub fn use_dispatch<A: 'static>() -> Result<Dispatch<A>, HookError> {
    let registry = registry()?;
    registry
        .0
        .dispatches
        .get(&TypeId::of::<A>())
        .and_then(|e| e.dispatch.downcast_ref::<Dispatch<A>>())
        .cloned()
        .ok_or(HookError::UnregisteredAction(type_name::<A>()))
}

pub fn use_dispatch_alias<A: 'static>(alias: &str) -> Result<Dispatch<A>, HookError> {
    let entry = alias_entry(alias)?;
    entry
        .dispatch
        .downcast_ref::<Dispatch<A>>()
        .cloned()
        .ok_or_else(|| HookError::AliasTypeMismatch {
            alias: alias.to_string(),
            requested: type_name::<A>(),
            actual: entry.action_name,
        })
}

/// Like [`use_dispatch`] (or [`use_dispatch_alias`] when `alias` is given),
/// but takes a future of the action. Pending futures are dropped on unmount.
pub fn use_dispatch_async<A: 'static>(alias: Option<&str>) -> Result<DispatchAsync<A>, HookError> {
    let tasks = remember(TaskScope::new);
    let owned = (*tasks).clone();
    use_unmount(move || {
        owned.cancel_all();
    });

    let dispatch = match alias {
        Some(alias) => use_dispatch_alias::<A>(alias)?,
        None => use_dispatch::<A>()?,
    };
    let tasks = (*tasks).clone();
    Ok(Rc::new(move |action: LocalBoxFuture<'static, A>| {
        let dispatch = dispatch.clone();
        if let Err(e) = tasks.spawn(async move { dispatch(action.await) }) {
            log::warn!("async dispatch could not be spawned: {e}");
        }
    }))
}
