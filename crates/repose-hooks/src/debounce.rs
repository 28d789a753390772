use std::future::Future;

use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::throttle::{use_rate_limited_effect, use_rate_limited_fn, use_rate_limited_value};

/// Debounced wrapper around `f`: a burst of calls collapses into one call
/// with the last argument, `wait` after the burst ends.
pub fn use_debounce_fn<P: 'static>(policy: RateLimitPolicy, f: impl Fn(P) + 'static) -> RateLimiter<P> {
    use_rate_limited_fn(policy, f)
}

/// `value` once it has stopped changing for `wait`.
pub fn use_debounce<T: Clone + PartialEq + 'static>(policy: RateLimitPolicy, value: T) -> T {
    use_rate_limited_value(policy, value)
}

pub fn use_debounce_effect<K, F, Fut>(policy: RateLimitPolicy, keys: K, block: F)
where
    K: PartialEq + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    use_rate_limited_effect(policy, keys, block)
}
