use std::cell::Cell;
use std::rc::Rc;

use repose_runtime::{TimerHandle, schedule};
use web_time::Duration;

use crate::options::RequestOptions;
use crate::plugin::{Before, PluginFactory, PluginHooks};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt` (1-based): one second doubled per
/// attempt, capped at thirty seconds.
pub fn retry_backoff(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(1000u64.saturating_mul(factor)).min(MAX_BACKOFF)
}

/// Re-runs a failed request up to `retry_count` times with the same params.
///
/// A retry marks itself before re-entering `run` and the mark is only
/// consumed by this plugin's own `on_before`, so a retry that an earlier
/// plugin defers (debounce, throttle) still counts as one when it finally
/// runs.
#[derive(Default)]
pub struct RetryPlugin {
    retry_count: Rc<Cell<u32>>,
    retry_interval: Rc<Cell<Option<Duration>>>,
}

impl RetryPlugin {
    pub fn sync<P, R>(&self, options: &RequestOptions<P, R>) {
        self.retry_count.set(options.retry_count);
        self.retry_interval.set(options.retry_interval);
    }

    pub fn factory<P: Clone + 'static, R: Clone + 'static>(&self) -> PluginFactory<P, R> {
        let retry_count = self.retry_count.clone();
        let retry_interval = self.retry_interval.clone();
        Box::new(move |handle| {
            let attempts = Rc::new(Cell::new(0u32));
            let retrying = Rc::new(Cell::new(false));
            let timer: Rc<Cell<Option<TimerHandle>>> = Rc::default();

            PluginHooks::new("retry")
                .on_before({
                    let (attempts, retrying, timer) = (attempts.clone(), retrying.clone(), timer.clone());
                    move |_| {
                        if !retrying.replace(false) {
                            attempts.set(0);
                        }
                        if let Some(t) = timer.take() {
                            t.cancel();
                        }
                        Before::Continue
                    }
                })
                .on_success({
                    let attempts = attempts.clone();
                    move |_, _| attempts.set(0)
                })
                .on_error({
                    let (attempts, retrying, timer) = (attempts.clone(), retrying.clone(), timer.clone());
                    let handle = handle.clone();
                    move |_, params: &P| {
                        let attempt = attempts.get() + 1;
                        if attempt > retry_count.get() {
                            attempts.set(0);
                            return;
                        }
                        attempts.set(attempt);
                        let delay = retry_interval.get().unwrap_or_else(|| retry_backoff(attempt));
                        log::debug!("retry {attempt}/{} in {delay:?}", retry_count.get());
                        let (retrying, handle, params) = (retrying.clone(), handle.clone(), params.clone());
                        timer.set(Some(schedule(delay, move || {
                            retrying.set(true);
                            handle.run(params);
                        })));
                    }
                })
                .on_cancel(move || {
                    attempts.set(0);
                    retrying.set(false);
                    if let Some(t) = timer.take() {
                        t.cancel();
                    }
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetch;
    use crate::fetch_state::Phase;
    use crate::plugin::service;
    use repose_runtime::ManualClock;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(retry_backoff(1), Duration::from_secs(2));
        assert_eq!(retry_backoff(2), Duration::from_secs(4));
        assert_eq!(retry_backoff(5), Duration::from_secs(30));
        assert_eq!(retry_backoff(80), Duration::from_secs(30));
    }

    #[test]
    fn retries_then_gives_up() {
        let clock = ManualClock::install();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let svc = service(move |n: u32| {
            c.set(c.get() + 1);
            async move { Err::<u32, _>(anyhow::anyhow!("flaky {n}")) }
        });
        let options = RequestOptions::new(7)
            .retry(2)
            .retry_interval(Duration::from_millis(50));
        let plugin = RetryPlugin::default();
        plugin.sync(&options);
        let fetch = Fetch::with_plugins(svc, options, vec![plugin.factory()]);

        fetch.run(7);
        clock.advance(Duration::from_secs(10));
        assert_eq!(calls.get(), 3);
        assert_eq!(fetch.state().phase(), Phase::Error);
        assert_eq!(fetch.state().params(), Some(&7));
    }

    #[test]
    fn deferred_retries_still_count() {
        use crate::plugins::RateLimitedPlugin;
        use crate::rate_limit::RateLimitPolicy;

        let clock = ManualClock::install();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let svc = service(move |()| {
            c.set(c.get() + 1);
            async { Err::<u32, _>(anyhow::anyhow!("down")) }
        });
        let options = RequestOptions::new(())
            .debounce(RateLimitPolicy::debounce(Duration::from_millis(100)))
            .retry(2)
            .retry_interval(Duration::from_millis(50));
        let debounce = RateLimitedPlugin::debounce();
        let retry = RetryPlugin::default();
        debounce.sync(&options);
        retry.sync(&options);
        let fetch = Fetch::with_plugins(svc, options, vec![debounce.factory(), retry.factory()]);

        fetch.run(());
        clock.advance(Duration::from_secs(20));
        assert_eq!(calls.get(), 3);
        assert_eq!(fetch.state().phase(), Phase::Error);
    }

    #[test]
    fn succeeds_on_second_attempt() {
        let clock = ManualClock::install();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let svc = service(move |()| {
            c.set(c.get() + 1);
            let ok = c.get() > 1;
            async move {
                anyhow::ensure!(ok, "not yet");
                Ok("done")
            }
        });
        let plugin = RetryPlugin::default();
        let options = RequestOptions::new(()).retry(3);
        plugin.sync(&options);
        let fetch = Fetch::with_plugins(svc, options, vec![plugin.factory()]);

        fetch.run(());
        clock.advance(Duration::from_secs(1));
        assert_eq!(calls.get(), 1);
        clock.advance(Duration::from_secs(1));
        assert_eq!(calls.get(), 2);
        assert_eq!(fetch.data(), Some("done"));
    }
}
