//! The request engine.
//!
//! [`Fetch`] owns the lifecycle state of one logical request and runs the
//! user's [`Service`] through a fixed [`PluginChain`]. A run goes through
//! these steps:
//!
//! 1. `on_before` on every plugin. A veto ends the run here with state
//!    untouched.
//! 2. The user's `on_before` callback, then the state moves to `Loading`
//!    with the new params.
//! 3. The service is called and the future is passed through `on_request`.
//! 4. On settlement the state moves to `Success` or `Error`, then
//!    `on_success`/`on_error` and `on_finally` run, plugins before the
//!    user's callbacks.
//!
//! Overlapping runs are not serialized: whichever settles last determines
//! the final state. Cancelled runs never write state, and cancelling puts
//! a `Loading` state back to what the last settlement left.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use repose_runtime::{Latest, Signal, TaskScope};
use slotmap::{SlotMap, new_key_type};

use crate::error::RequestError;
use crate::fetch_state::{FetchState, Phase};
use crate::options::RequestOptions;
use crate::plugin::{Before, PluginChain, PluginFactory, RequestFuture, Service};

new_key_type! {
    struct RunKey;
}

struct FetchInner<P: 'static, R: 'static> {
    state: Signal<FetchState<P, R>>,
    service: Latest<Service<P, R>>,
    options: Latest<RequestOptions<P, R>>,
    chain: PluginChain<P, R>,
    tasks: TaskScope,
    /// Cancellation flags of runs that passed `on_before` and have not settled.
    runs: RefCell<SlotMap<RunKey, Rc<Cell<bool>>>>,
    /// State as of the last settlement or mutation; restored by `cancel`.
    settled: RefCell<FetchState<P, R>>,
    started: Cell<u64>,
    disposed: Cell<bool>,
}

/// Request engine. Cloning shares the same engine.
pub struct Fetch<P: 'static, R: 'static> {
    inner: Rc<FetchInner<P, R>>,
}

impl<P, R> Clone for Fetch<P, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Clone + 'static, R: Clone + 'static> Fetch<P, R> {
    pub fn new(service: Service<P, R>, options: RequestOptions<P, R>) -> Self {
        Self::with_plugins(service, options, Vec::new())
    }

    /// Builds the engine and its plugins. Plugin order is the order of
    /// `plugins` and never changes afterwards.
    pub fn with_plugins(
        service: Service<P, R>,
        options: RequestOptions<P, R>,
        plugins: Vec<PluginFactory<P, R>>,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<FetchInner<P, R>>| {
            let handle = FetchHandle { inner: weak.clone() };
            let chain = PluginChain::new(plugins.into_iter().map(|factory| factory(&handle)));
            let initial = chain.run_init(FetchState::default(), &options);
            log::debug!(
                "request engine created with plugins [{}]",
                chain.names().collect::<Vec<_>>().join(", ")
            );
            let settled = if initial.is_loading() {
                initial.clone().with_phase(Phase::Idle)
            } else {
                initial.clone()
            };
            FetchInner {
                state: Signal::new(initial),
                service: Latest::new(service),
                options: Latest::new(options),
                chain,
                tasks: TaskScope::new(),
                runs: RefCell::new(SlotMap::with_key()),
                settled: RefCell::new(settled),
                started: Cell::new(0),
                disposed: Cell::new(false),
            }
        });
        Self { inner }
    }

    pub fn handle(&self) -> FetchHandle<P, R> {
        FetchHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn state(&self) -> FetchState<P, R> {
        self.inner.state.get()
    }

    /// The state cell itself, for subscribing to changes.
    pub fn signal(&self) -> Signal<FetchState<P, R>> {
        self.inner.state.clone()
    }

    pub fn data(&self) -> Option<R> {
        self.inner.state.with(|s| s.data().cloned())
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.with(|s| s.is_loading())
    }

    pub fn options(&self) -> RequestOptions<P, R> {
        self.inner.options.get()
    }

    /// Runs that passed the before stage since the engine was created.
    pub fn started_runs(&self) -> u64 {
        self.inner.started.get()
    }

    /// Runs that passed the before stage and have not settled.
    pub fn in_flight(&self) -> usize {
        self.inner.runs.borrow().len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Swaps in the latest service and options without rebuilding plugins.
    pub fn sync(&self, service: Service<P, R>, options: RequestOptions<P, R>) {
        self.inner.service.set(service);
        self.inner.options.set(options);
    }

    /// Starts a run in the background.
    pub fn run(&self, params: P) {
        self.inner.run(params);
    }

    /// Starts a run and returns a future resolving to the state right after
    /// it settles. The before stage happens immediately, not on first poll.
    pub fn run_async(&self, params: P) -> LocalBoxFuture<'static, FetchState<P, R>> {
        FetchInner::run_async(&self.inner, params)
    }

    /// Runs again with the last params, or the default params if there has
    /// never been a run.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    pub fn refresh_async(&self) -> LocalBoxFuture<'static, FetchState<P, R>> {
        let params = self.inner.last_params();
        self.run_async(params)
    }

    /// Abandons in-flight runs and pending plugin work. A `Loading` state
    /// reverts to the last settled one.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Replaces the data as if a run had succeeded with it. Params are kept.
    pub fn mutate(&self, data: R) {
        self.inner.mutate(data);
    }

    pub fn mutate_with(&self, f: impl FnOnce(Option<&R>) -> R) {
        let next = self.inner.state.with(|s| f(s.data()));
        self.inner.mutate(next);
    }

    /// Cancels everything and turns every later call into a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl<P: Clone + 'static, R: Clone + 'static> FetchInner<P, R> {
    fn set_state(&self, f: impl FnOnce(&FetchState<P, R>) -> FetchState<P, R>) {
        let next = self.state.with(f);
        self.state.set(next);
    }

    fn set_settled(&self, f: impl FnOnce(&FetchState<P, R>) -> FetchState<P, R>) {
        self.set_state(f);
        *self.settled.borrow_mut() = self.state.get();
    }

    fn last_params(&self) -> P {
        self.state
            .with(|s| s.params().cloned())
            .unwrap_or_else(|| self.options.with(|o| o.default_params.clone()))
    }

    fn run(self: &Rc<Self>, params: P) {
        if self.disposed.get() {
            return;
        }
        let fut = Self::run_async(self, params);
        if let Err(e) = self.tasks.spawn(fut.map(|_| ())) {
            log::warn!("request run could not be spawned: {e}");
        }
    }

    fn run_async(this: &Rc<Self>, params: P) -> LocalBoxFuture<'static, FetchState<P, R>> {
        if this.disposed.get() {
            return future::ready(this.state.get()).boxed_local();
        }

        let verdict = this.chain.run_before(&params);
        if let Before::Stop = verdict {
            log::debug!("run vetoed");
            return future::ready(this.state.get()).boxed_local();
        }

        let options = this.options.get();
        if let Some(cb) = &options.on_before {
            cb(&params);
        }

        let token = Rc::new(Cell::new(false));
        let key = this.runs.borrow_mut().insert(token.clone());
        this.started.set(this.started.get() + 1);
        if options.delivery.updates_local() {
            this.set_state(|s| s.loading(params.clone()));
        }

        let request: RequestFuture<R> = match verdict {
            Before::Return(outcome) => future::ready(outcome).boxed_local(),
            _ => {
                let service = this.service.get();
                let work = service(params.clone())
                    .map(|r| r.map_err(RequestError::new))
                    .boxed_local();
                this.chain.run_request(&params, work)
            }
        };

        let this = this.clone();
        async move {
            let outcome = request.await;
            this.runs.borrow_mut().remove(key);
            if token.get() {
                log::trace!("dropping outcome of a cancelled run");
                return this.state.get();
            }
            this.settle(params, outcome)
        }
        .boxed_local()
    }

    fn settle(&self, params: P, outcome: Result<R, RequestError>) -> FetchState<P, R> {
        let options = self.options.get();
        let local = options.delivery.updates_local();

        match &outcome {
            Ok(data) => {
                if local {
                    self.set_settled(|s| s.succeeded(data.clone()));
                }
                if let Some(sink) = options.delivery.sink() {
                    sink(Ok(data.clone()));
                }
                self.chain.run_success(data, &params);
                if let Some(cb) = &options.on_success {
                    cb(data, &params);
                }
            }
            Err(error) => {
                log::debug!("request failed: {error}");
                if local {
                    self.set_settled(|s| s.failed(error.clone()));
                }
                if let Some(sink) = options.delivery.sink() {
                    sink(Err(error.clone()));
                }
                self.chain.run_error(error, &params);
                if let Some(cb) = &options.on_error {
                    cb(error, &params);
                }
            }
        }

        let (data, error) = (outcome.as_ref().ok(), outcome.as_ref().err());
        self.chain.run_finally(&params, data, error);
        if let Some(cb) = &options.on_finally {
            cb(&params, data, error);
        }
        self.state.get()
    }

    fn refresh(self: &Rc<Self>) {
        let params = self.last_params();
        self.run(params);
    }

    fn cancel(&self) {
        let runs: Vec<_> = self.runs.borrow_mut().drain().map(|(_, t)| t).collect();
        for token in &runs {
            token.set(true);
        }
        let aborted = self.tasks.cancel_all();
        if self.state.with(|s| s.is_loading()) {
            let settled = self.settled.borrow().clone();
            self.state.set(settled);
        }
        self.chain.run_cancel();
        log::debug!("cancelled {} run(s), aborted {aborted} task(s)", runs.len());
    }

    fn mutate(&self, data: R) {
        if self.disposed.get() {
            return;
        }
        self.set_settled(|s| s.succeeded(data.clone()));
        self.chain.run_mutate(&data);
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.cancel();
    }
}

/// Weak reference to an engine, held by plugins. Every call is a no-op once
/// the engine is gone.
pub struct FetchHandle<P: 'static, R: 'static> {
    inner: Weak<FetchInner<P, R>>,
}

impl<P, R> Clone for FetchHandle<P, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Clone + 'static, R: Clone + 'static> FetchHandle<P, R> {
    pub fn upgrade(&self) -> Option<Fetch<P, R>> {
        self.inner.upgrade().map(|inner| Fetch { inner })
    }

    pub fn run(&self, params: P) {
        if let Some(inner) = self.inner.upgrade() {
            inner.run(params);
        }
    }

    pub fn refresh(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.refresh();
        }
    }

    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel();
        }
    }

    pub fn mutate(&self, data: R) {
        if let Some(inner) = self.inner.upgrade() {
            inner.mutate(data);
        }
    }

    pub fn dispose(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dispose();
        }
    }

    pub fn state(&self) -> Option<FetchState<P, R>> {
        self.inner.upgrade().map(|inner| inner.state.get())
    }
}
