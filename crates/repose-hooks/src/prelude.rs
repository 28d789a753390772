pub use crate::deps;
pub use crate::{
    Before, Delivery, Deps, Dispatch, Fetch, FetchState, HookError, Phase, PluginHooks,
    RateLimitPolicy, RateLimiter, RequestError, RequestOptions, Store, logger_middleware,
    redux_provider, service, use_debounce, use_debounce_effect, use_debounce_fn,
    use_dispatch, use_dispatch_alias, use_dispatch_async, use_get_state, use_previous,
    use_reducer, use_ref, use_request, use_request_with_plugins, use_selector,
    use_selector_alias, use_state, use_throttle, use_throttle_effect, use_throttle_fn,
};

pub use repose_runtime::prelude::*;
