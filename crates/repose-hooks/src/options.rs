use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use smallvec::SmallVec;
use web_time::Duration;

use crate::error::RequestError;
use crate::rate_limit::RateLimitPolicy;
use crate::state::Dispatch;

/// Fingerprint of a list of dependency values. Two `Deps` are equal when
/// every value hashed to the same thing, in the same order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Deps(SmallVec<[u64; 4]>);

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Hash + ?Sized>(mut self, value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        self.0.push(hasher.finish());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `deps![a, b]` is `Deps::new().with(&a).with(&b)`.
#[macro_export]
macro_rules! deps {
    ($($value:expr),* $(,)?) => {
        $crate::options::Deps::new()$(.with(&$value))*
    };
}

pub type Sink<R> = Rc<dyn Fn(Result<R, RequestError>)>;

/// Where a settled outcome goes.
pub enum Delivery<R> {
    /// Only the engine's own state.
    Local,
    /// Only the sink; local state is never written, not even `Loading`.
    Dispatch(Sink<R>),
    /// Local state first, then the sink.
    Both(Sink<R>),
}

impl<R> Clone for Delivery<R> {
    fn clone(&self) -> Self {
        match self {
            Delivery::Local => Delivery::Local,
            Delivery::Dispatch(s) => Delivery::Dispatch(s.clone()),
            Delivery::Both(s) => Delivery::Both(s.clone()),
        }
    }
}

impl<R> Default for Delivery<R> {
    fn default() -> Self {
        Delivery::Local
    }
}

impl<R: 'static> Delivery<R> {
    /// Routes outcomes into a store dispatch, mapping each one to an action.
    pub fn dispatch<A: 'static>(
        dispatch: Dispatch<A>,
        map: impl Fn(Result<R, RequestError>) -> A + 'static,
    ) -> Self {
        Delivery::Dispatch(Rc::new(move |outcome| dispatch(map(outcome))))
    }

    /// Like [`Delivery::dispatch`] but local state is kept up to date too.
    pub fn both<A: 'static>(
        dispatch: Dispatch<A>,
        map: impl Fn(Result<R, RequestError>) -> A + 'static,
    ) -> Self {
        Delivery::Both(Rc::new(move |outcome| dispatch(map(outcome))))
    }

    pub fn updates_local(&self) -> bool {
        !matches!(self, Delivery::Dispatch(_))
    }

    pub fn sink(&self) -> Option<&Sink<R>> {
        match self {
            Delivery::Local => None,
            Delivery::Dispatch(s) | Delivery::Both(s) => Some(s),
        }
    }
}

type ParamsFn<P> = Rc<dyn Fn(&P)>;
type SuccessFn<P, R> = Rc<dyn Fn(&R, &P)>;
type ErrorFn<P> = Rc<dyn Fn(&RequestError, &P)>;
type FinallyFn<P, R> = Rc<dyn Fn(&P, Option<&R>, Option<&RequestError>)>;

/// Configuration for one request engine. Read fresh on every run, so a host
/// can pass new options each composition pass.
pub struct RequestOptions<P, R> {
    /// Never run automatically; only explicit `run`/`refresh` calls do work.
    pub manual: bool,
    /// While false every run is vetoed.
    pub ready: bool,
    pub default_params: P,
    /// A change re-runs the request (unless `manual`).
    pub refresh_deps: Deps,
    /// Replaces the default refresh when `refresh_deps` change.
    pub refresh_deps_action: Option<Rc<dyn Fn()>>,
    pub debounce: Option<RateLimitPolicy>,
    pub throttle: Option<RateLimitPolicy>,
    /// Re-run this long after each settlement.
    pub polling_interval: Option<Duration>,
    /// Stop polling after this many consecutive errors. `None` never stops.
    pub polling_error_retry_count: Option<u32>,
    /// Extra attempts after a failure. Zero disables retrying.
    pub retry_count: u32,
    /// Fixed delay between attempts. `None` backs off exponentially.
    pub retry_interval: Option<Duration>,
    pub cache_key: Option<String>,
    /// Cached data younger than this is served without calling the service.
    pub stale_time: Duration,
    /// Cached data older than this is discarded.
    pub cache_time: Duration,
    pub on_before: Option<ParamsFn<P>>,
    pub on_success: Option<SuccessFn<P, R>>,
    pub on_error: Option<ErrorFn<P>>,
    pub on_finally: Option<FinallyFn<P, R>>,
    pub delivery: Delivery<R>,
}

pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);

impl<P: Clone, R> Clone for RequestOptions<P, R> {
    fn clone(&self) -> Self {
        Self {
            manual: self.manual,
            ready: self.ready,
            default_params: self.default_params.clone(),
            refresh_deps: self.refresh_deps.clone(),
            refresh_deps_action: self.refresh_deps_action.clone(),
            debounce: self.debounce,
            throttle: self.throttle,
            polling_interval: self.polling_interval,
            polling_error_retry_count: self.polling_error_retry_count,
            retry_count: self.retry_count,
            retry_interval: self.retry_interval,
            cache_key: self.cache_key.clone(),
            stale_time: self.stale_time,
            cache_time: self.cache_time,
            on_before: self.on_before.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_finally: self.on_finally.clone(),
            delivery: self.delivery.clone(),
        }
    }
}

impl<P: Default, R> Default for RequestOptions<P, R> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P, R> RequestOptions<P, R> {
    pub fn new(default_params: P) -> Self {
        Self {
            manual: false,
            ready: true,
            default_params,
            refresh_deps: Deps::new(),
            refresh_deps_action: None,
            debounce: None,
            throttle: None,
            polling_interval: None,
            polling_error_retry_count: None,
            retry_count: 0,
            retry_interval: None,
            cache_key: None,
            stale_time: Duration::ZERO,
            cache_time: DEFAULT_CACHE_TIME,
            on_before: None,
            on_success: None,
            on_error: None,
            on_finally: None,
            delivery: Delivery::Local,
        }
    }

    pub fn manual(mut self, manual: bool) -> Self {
        self.manual = manual;
        self
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn refresh_deps(mut self, deps: Deps) -> Self {
        self.refresh_deps = deps;
        self
    }

    pub fn refresh_deps_action(mut self, action: impl Fn() + 'static) -> Self {
        self.refresh_deps_action = Some(Rc::new(action));
        self
    }

    pub fn debounce(mut self, policy: RateLimitPolicy) -> Self {
        self.debounce = Some(policy);
        self
    }

    pub fn throttle(mut self, policy: RateLimitPolicy) -> Self {
        self.throttle = Some(policy);
        self
    }

    pub fn polling(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }

    pub fn polling_error_retry_count(mut self, count: u32) -> Self {
        self.polling_error_retry_count = Some(count);
        self
    }

    pub fn retry(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    pub fn cache(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn stale_time(mut self, stale: Duration) -> Self {
        self.stale_time = stale;
        self
    }

    pub fn cache_time(mut self, time: Duration) -> Self {
        self.cache_time = time;
        self
    }

    pub fn on_before(mut self, f: impl Fn(&P) + 'static) -> Self {
        self.on_before = Some(Rc::new(f));
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

    pub fn delivery(mut self, delivery: Delivery<R>) -> Self {
        self.delivery = delivery;
        self
    }
}
