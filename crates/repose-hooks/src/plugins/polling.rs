use std::cell::Cell;
use std::rc::Rc;

use repose_runtime::{TimerHandle, schedule};
use web_time::Duration;

use crate::options::RequestOptions;
use crate::plugin::{Before, PluginFactory, PluginHooks};

/// Re-runs the request `polling_interval` after each settlement.
///
/// Consecutive failures are counted; once they exceed
/// `polling_error_retry_count` polling stops until the next explicit run.
#[derive(Default)]
pub struct PollingPlugin {
    interval: Rc<Cell<Option<Duration>>>,
    error_retry_count: Rc<Cell<Option<u32>>>,
    timer: Rc<Cell<Option<TimerHandle>>>,
}

fn clear(timer: &Cell<Option<TimerHandle>>) {
    if let Some(t) = timer.take() {
        t.cancel();
    }
}

impl PollingPlugin {
    pub fn sync<P, R>(&self, options: &RequestOptions<P, R>) {
        self.error_retry_count.set(options.polling_error_retry_count);
        if self.interval.replace(options.polling_interval).is_some() && options.polling_interval.is_none() {
            clear(&self.timer);
        }
    }

    pub fn factory<P: Clone + 'static, R: Clone + 'static>(&self) -> PluginFactory<P, R> {
        let interval = self.interval.clone();
        let error_retry_count = self.error_retry_count.clone();
        let timer = self.timer.clone();
        Box::new(move |handle| {
            let errors = Rc::new(Cell::new(0u32));
            PluginHooks::new("polling")
                .on_before({
                    let timer = timer.clone();
                    move |_| {
                        clear(&timer);
                        Before::Continue
                    }
                })
                .on_success({
                    let errors = errors.clone();
                    move |_, _| errors.set(0)
                })
                .on_error({
                    let errors = errors.clone();
                    move |_, _| errors.set(errors.get() + 1)
                })
                .on_finally({
                    let timer = timer.clone();
                    let handle = handle.clone();
                    move |_, _, _| {
                        let Some(every) = interval.get() else {
                            return;
                        };
                        if let Some(max) = error_retry_count.get()
                            && errors.get() > max
                        {
                            log::debug!("polling stopped after {} consecutive errors", errors.get());
                            errors.set(0);
                            return;
                        }
                        let handle = handle.clone();
                        clear(&timer);
                        timer.set(Some(schedule(every, move || handle.refresh())));
                    }
                })
                .on_cancel(move || clear(&timer))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetch;
    use crate::plugin::service;
    use repose_runtime::ManualClock;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn polls_until_cancelled() {
        let clock = ManualClock::install();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let svc = service(move |()| {
            c.set(c.get() + 1);
            async { Ok::<_, anyhow::Error>(()) }
        });
        let options = RequestOptions::new(()).polling(ms(100));
        let plugin = PollingPlugin::default();
        plugin.sync(&options);
        let fetch = Fetch::with_plugins(svc, options, vec![plugin.factory()]);

        fetch.run(());
        clock.advance(ms(350));
        assert_eq!(calls.get(), 4);

        fetch.cancel();
        clock.advance(ms(1000));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn stops_after_too_many_errors() {
        let clock = ManualClock::install();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let svc = service(move |()| {
            c.set(c.get() + 1);
            async { Err::<(), _>(anyhow::anyhow!("down")) }
        });
        let options = RequestOptions::new(())
            .polling(ms(100))
            .polling_error_retry_count(2);
        let plugin = PollingPlugin::default();
        plugin.sync(&options);
        let fetch = Fetch::with_plugins(svc, options, vec![plugin.factory()]);

        fetch.run(());
        clock.advance(ms(5000));
        // the first failure plus two polled retries; the third error stops it
        assert_eq!(calls.get(), 3);
    }
}
