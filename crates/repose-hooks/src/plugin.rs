//! Plugin hooks and the ordered chain that drives them.
//!
//! A plugin is a bundle of optional stage callbacks. The engine calls each
//! stage on every plugin in registration order:
//!
//! * `on_init` folds over the initial [`FetchState`]
//! * `on_before` may veto the run ([`Before::Stop`]) or settle it without
//!   calling the work function ([`Before::Return`]); the first plugin that
//!   does either wins and later plugins are not consulted
//! * `on_request` may wrap or replace the pending work
//! * `on_success`, `on_error`, `on_finally`, `on_cancel` and `on_mutate` are
//!   notifications

use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use smallvec::SmallVec;

use crate::error::RequestError;
use crate::fetch::FetchHandle;
use crate::fetch_state::FetchState;
use crate::options::RequestOptions;

/// In-flight work as seen by `on_request` plugins.
pub type RequestFuture<R> = LocalBoxFuture<'static, Result<R, RequestError>>;

/// The user's async work function.
pub type Service<P, R> = Rc<dyn Fn(P) -> LocalBoxFuture<'static, anyhow::Result<R>>>;

/// Builds a plugin once the engine exists, so the plugin can keep a weak
/// handle back to it.
pub type PluginFactory<P, R> = Box<dyn FnOnce(&FetchHandle<P, R>) -> PluginHooks<P, R>>;

/// Wraps an async closure as a [`Service`].
pub fn service<P, R, F, Fut>(f: F) -> Service<P, R>
where
    F: Fn(P) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<R>> + 'static,
{
    Rc::new(move |params| f(params).boxed_local())
}

/// Boxes a plugin constructor as a [`PluginFactory`].
pub fn factory<P, R>(
    f: impl FnOnce(&FetchHandle<P, R>) -> PluginHooks<P, R> + 'static,
) -> PluginFactory<P, R> {
    Box::new(f)
}

/// Verdict of the `on_before` stage.
pub enum Before<R> {
    Continue,
    /// Abort the run. State is left untouched and no later stage runs.
    Stop,
    /// Settle the run with this outcome instead of calling the work function.
    Return(Result<R, RequestError>),
}

impl<R> Before<R> {
    pub fn is_continue(&self) -> bool {
        matches!(self, Before::Continue)
    }
}

type InitFn<P, R> = Rc<dyn Fn(FetchState<P, R>, &RequestOptions<P, R>) -> FetchState<P, R>>;
type BeforeFn<P, R> = Rc<dyn Fn(&P) -> Before<R>>;
type RequestFn<P, R> = Rc<dyn Fn(&P, RequestFuture<R>) -> RequestFuture<R>>;
type SuccessFn<P, R> = Rc<dyn Fn(&R, &P)>;
type ErrorFn<P> = Rc<dyn Fn(&RequestError, &P)>;
type FinallyFn<P, R> = Rc<dyn Fn(&P, Option<&R>, Option<&RequestError>)>;

pub struct PluginHooks<P, R> {
    name: &'static str,
    on_init: Option<InitFn<P, R>>,
    on_before: Option<BeforeFn<P, R>>,
    on_request: Option<RequestFn<P, R>>,
    on_success: Option<SuccessFn<P, R>>,
    on_error: Option<ErrorFn<P>>,
    on_finally: Option<FinallyFn<P, R>>,
    on_cancel: Option<Rc<dyn Fn()>>,
    on_mutate: Option<Rc<dyn Fn(&R)>>,
}

impl<P, R> Clone for PluginHooks<P, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            on_init: self.on_init.clone(),
            on_before: self.on_before.clone(),
            on_request: self.on_request.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_finally: self.on_finally.clone(),
            on_cancel: self.on_cancel.clone(),
            on_mutate: self.on_mutate.clone(),
        }
    }
}

impl<P, R> PluginHooks<P, R> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            on_init: None,
            on_before: None,
            on_request: None,
            on_success: None,
            on_error: None,
            on_finally: None,
            on_cancel: None,
            on_mutate: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn on_init(
        mut self,
        f: impl Fn(FetchState<P, R>, &RequestOptions<P, R>) -> FetchState<P, R> + 'static,
    ) -> Self {
        self.on_init = Some(Rc::new(f));
        self
    }

    pub fn on_before(mut self, f: impl Fn(&P) -> Before<R> + 'static) -> Self {
        self.on_before = Some(Rc::new(f));
        self
    }

    pub fn on_request(mut self, f: impl Fn(&P, RequestFuture<R>) -> RequestFuture<R> + 'static) -> Self {
        self.on_request = Some(Rc::new(f));
        self
    }

    pub fn on_success(mut self, f: impl Fn(&R, &P) + 'static) -> Self {
        self.on_success = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&RequestError, &P) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    pub fn on_finally(mut self, f: impl Fn(&P, Option<&R>, Option<&RequestError>) + 'static) -> Self {
        self.on_finally = Some(Rc::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl Fn() + 'static) -> Self {
        self.on_cancel = Some(Rc::new(f));
        self
    }

    pub fn on_mutate(mut self, f: impl Fn(&R) + 'static) -> Self {
        self.on_mutate = Some(Rc::new(f));
        self
    }
}

/// Plugins in registration order. Fixed once the engine is built.
pub struct PluginChain<P, R> {
    plugins: SmallVec<[PluginHooks<P, R>; 8]>,
}

impl<P, R> PluginChain<P, R> {
    pub fn new(plugins: impl IntoIterator<Item = PluginHooks<P, R>>) -> Self {
        Self {
            plugins: plugins.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.name)
    }

    pub fn run_init(&self, initial: FetchState<P, R>, options: &RequestOptions<P, R>) -> FetchState<P, R> {
        self.plugins
            .iter()
            .filter_map(|p| p.on_init.as_ref())
            .fold(initial, |state, f| f(state, options))
    }

    pub fn run_before(&self, params: &P) -> Before<R> {
        for plugin in &self.plugins {
            let Some(f) = &plugin.on_before else {
                continue;
            };
            match f(params) {
                Before::Continue => {}
                verdict => {
                    log::trace!("plugin `{}` short-circuited the run", plugin.name);
                    return verdict;
                }
            }
        }
        Before::Continue
    }

    pub fn run_request(&self, params: &P, request: RequestFuture<R>) -> RequestFuture<R> {
        self.plugins
            .iter()
            .filter_map(|p| p.on_request.as_ref())
            .fold(request, |fut, f| f(params, fut))
    }

    pub fn run_success(&self, data: &R, params: &P) {
        for f in self.plugins.iter().filter_map(|p| p.on_success.as_ref()) {
            f(data, params);
        }
    }

    pub fn run_error(&self, error: &RequestError, params: &P) {
        for f in self.plugins.iter().filter_map(|p| p.on_error.as_ref()) {
            f(error, params);
        }
    }

    pub fn run_finally(&self, params: &P, data: Option<&R>, error: Option<&RequestError>) {
        for f in self.plugins.iter().filter_map(|p| p.on_finally.as_ref()) {
            f(params, data, error);
        }
    }

    pub fn run_cancel(&self) {
        for f in self.plugins.iter().filter_map(|p| p.on_cancel.as_ref()) {
            f();
        }
    }

    pub fn run_mutate(&self, data: &R) {
        for f in self.plugins.iter().filter_map(|p| p.on_mutate.as_ref()) {
            f(data);
        }
    }
}
