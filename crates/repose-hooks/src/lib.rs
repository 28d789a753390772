//! # Repose hooks
//!
//! Declarative access to state, derived values and async side effects for
//! components built on `repose-runtime`.
//!
//! The two load-bearing pieces:
//!
//! - [`rate_limit::RateLimiter`]: throttle and debounce with leading and
//!   trailing edges and cancellation.
//! - [`fetch::Fetch`]: a request engine that moves one async operation
//!   through `Idle -> Loading -> Success | Error` and lets plugins veto,
//!   short-circuit or observe every run.
//!
//! Everything else is built on those two: [`use_request`] binds an engine
//! with the built-in [`plugins`] to a component, the `use_throttle*` and
//! `use_debounce*` hooks expose the limiter directly, and [`store`] is a
//! small reducer store that request outcomes can be dispatched into.
//!
//! ## Requests
//!
//! ```rust
//! use repose_hooks::prelude::*;
//! use web_time::Duration;
//!
//! let clock = ManualClock::install();
//! let comp = Composition::new();
//! let search = service(|q: String| async move {
//!     sleep(Duration::from_millis(20)).await;
//!     Ok(format!("results for {q}"))
//! });
//!
//! let fetch = comp.compose(|| use_request(search, RequestOptions::new("rust".to_string())));
//! assert!(fetch.is_loading());
//!
//! clock.advance(Duration::from_millis(20));
//! assert_eq!(fetch.data().as_deref(), Some("results for rust"));
//! ```

pub mod debounce;
pub mod error;
pub mod fetch;
pub mod fetch_state;
pub mod options;
pub mod plugin;
pub mod plugins;
pub mod prelude;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod tests;
pub mod throttle;
pub mod use_request;

pub use debounce::{use_debounce, use_debounce_effect, use_debounce_fn};
pub use error::{HookError, RequestError};
pub use fetch::{Fetch, FetchHandle};
pub use fetch_state::{FetchState, Phase};
pub use options::{Delivery, Deps, RequestOptions};
pub use plugin::{Before, PluginChain, PluginFactory, PluginHooks, RequestFuture, Service, service};
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use state::{Dispatch, GetValueFn, SetValueFn, use_get_state, use_previous, use_reducer, use_ref, use_state};
pub use store::{
    Action, AnyDispatch, DispatchAsync, Middleware, Store, logger_middleware, redux_provider,
    use_dispatch, use_dispatch_alias, use_dispatch_async, use_selector, use_selector_alias,
};
pub use throttle::{use_throttle, use_throttle_effect, use_throttle_fn};
pub use use_request::{use_request, use_request_with_plugins};
