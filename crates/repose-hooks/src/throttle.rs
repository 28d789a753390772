//! Component-level hooks over [`RateLimiter`]. The debounce variants in
//! [`crate::debounce`] share this machinery with a different policy.

use std::future::Future;

use repose_runtime::{Signal, TaskScope, remember, signal, use_effect, use_unmount};

use crate::rate_limit::{RateLimitPolicy, RateLimiter};

/// Limiter owned by the calling component. The wrapped closure and the
/// policy are refreshed every pass; unmounting cancels pending executions.
pub(crate) fn use_rate_limited_fn<P: 'static>(
    policy: RateLimitPolicy,
    f: impl Fn(P) + 'static,
) -> RateLimiter<P> {
    let limiter = remember(|| RateLimiter::new(policy, |_: P| {}));
    limiter.set_fn(f);
    limiter.set_policy(policy);

    let owned = (*limiter).clone();
    use_unmount(move || {
        owned.cancel();
    });
    (*limiter).clone()
}

/// Latest value of `value`, updated at most once per window.
pub(crate) fn use_rate_limited_value<T: Clone + PartialEq + 'static>(
    policy: RateLimitPolicy,
    value: T,
) -> T {
    let state: Signal<T> = (*remember(|| signal(value.clone()))).clone();
    let limiter = use_rate_limited_fn(policy, {
        let state = state.clone();
        move |v: T| state.set(v)
    });
    use_effect(value.clone(), move || limiter.invoke(value));
    state.get()
}

/// Runs the async `block` through the limiter whenever `keys` change.
pub(crate) fn use_rate_limited_effect<K, F, Fut>(policy: RateLimitPolicy, keys: K, block: F)
where
    K: PartialEq + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let tasks = remember(TaskScope::new);
    let owned = (*tasks).clone();
    use_unmount(move || {
        owned.cancel_all();
    });

    let tasks = (*tasks).clone();
    let limiter = use_rate_limited_fn(policy, move |()| {
        if let Err(e) = tasks.spawn(block()) {
            log::warn!("limited effect could not be spawned: {e}");
        }
    });
    use_effect(keys, move || limiter.invoke(()));
}

/// Throttled wrapper around `f`: runs on the leading edge, then at most once
/// more at the end of the window with the latest argument.
pub fn use_throttle_fn<P: 'static>(policy: RateLimitPolicy, f: impl Fn(P) + 'static) -> RateLimiter<P> {
    use_rate_limited_fn(policy, f)
}

/// `value`, but changes propagate at most once per window.
pub fn use_throttle<T: Clone + PartialEq + 'static>(policy: RateLimitPolicy, value: T) -> T {
    use_rate_limited_value(policy, value)
}

pub fn use_throttle_effect<K, F, Fut>(policy: RateLimitPolicy, keys: K, block: F)
where
    K: PartialEq + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    use_rate_limited_effect(policy, keys, block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repose_runtime::{Composition, ManualClock};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use web_time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn throttle_fn_uses_latest_closure() {
        let clock = ManualClock::install();
        let comp = Composition::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let policy = RateLimitPolicy::throttle(ms(100));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            let limited = comp.compose(move || {
                use_throttle_fn(policy, move |n: u32| seen.borrow_mut().push((tag, n)))
            });
            limited.invoke(1);
            limited.invoke(2);
        }
        clock.advance(ms(100));
        assert_eq!(*seen.borrow(), vec![("first", 1), ("second", 2)]);
    }

    #[test]
    fn throttled_value_lags_behind() {
        let clock = ManualClock::install();
        let comp = Composition::new();
        let policy = RateLimitPolicy::throttle(ms(500));
        let render = |v: u32| comp.compose(move || use_throttle(policy, v));

        assert_eq!(render(1), 1);
        assert_eq!(render(2), 1);
        assert_eq!(render(3), 1);
        clock.advance(ms(500));
        assert_eq!(render(3), 3);
    }

    #[test]
    fn throttle_effect_coalesces_key_changes() {
        let clock = ManualClock::install();
        let comp = Composition::new();
        let runs = Rc::new(Cell::new(0));
        let policy = RateLimitPolicy::throttle(ms(200));
        for key in [1, 2, 3, 4] {
            let runs = runs.clone();
            comp.compose(move || {
                use_throttle_effect(policy, key, move || {
                    let runs = runs.clone();
                    async move { runs.set(runs.get() + 1) }
                })
            });
        }
        clock.advance(ms(1));
        assert_eq!(runs.get(), 1);
        clock.advance(ms(300));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn unmount_cancels_pending() {
        let clock = ManualClock::install();
        let comp = Composition::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let limited = comp.compose(move || {
            use_throttle_fn(RateLimitPolicy::throttle(ms(100)), move |()| h.set(h.get() + 1))
        });
        limited.invoke(());
        limited.invoke(());
        comp.dispose();
        clock.advance(ms(500));
        assert_eq!(hits.get(), 1);
    }
}
