use std::cell::Cell;
use std::rc::Rc;

use crate::options::RequestOptions;
use crate::plugin::{Before, PluginFactory, PluginHooks};
use crate::rate_limit::{RateLimitPolicy, RateLimiter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Debounce,
    Throttle,
}

/// Routes runs through a [`RateLimiter`]. Every run is vetoed and handed to
/// the limiter instead; when the limiter releases one it is re-issued with a
/// one-shot pass so the second trip through `on_before` continues.
///
/// Inert while the matching option is `None`.
pub struct RateLimitedPlugin {
    kind: Kind,
    policy: Rc<Cell<Option<RateLimitPolicy>>>,
}

impl RateLimitedPlugin {
    pub fn debounce() -> Self {
        Self {
            kind: Kind::Debounce,
            policy: Rc::default(),
        }
    }

    pub fn throttle() -> Self {
        Self {
            kind: Kind::Throttle,
            policy: Rc::default(),
        }
    }

    pub fn sync<P, R>(&self, options: &RequestOptions<P, R>) {
        self.policy.set(match self.kind {
            Kind::Debounce => options.debounce,
            Kind::Throttle => options.throttle,
        });
    }

    pub fn factory<P: Clone + 'static, R: Clone + 'static>(&self) -> PluginFactory<P, R> {
        let policy = self.policy.clone();
        let name = match self.kind {
            Kind::Debounce => "debounce",
            Kind::Throttle => "throttle",
        };
        Box::new(move |handle| {
            let releasing = Rc::new(Cell::new(false));
            let limiter = RateLimiter::new(policy.get().unwrap_or_default(), {
                let releasing = releasing.clone();
                let handle = handle.clone();
                move |params: P| {
                    releasing.set(true);
                    handle.run(params);
                    releasing.set(false);
                }
            });

            PluginHooks::new(name)
                .on_before({
                    let limiter = limiter.clone();
                    move |params: &P| {
                        let Some(policy) = policy.get() else {
                            return Before::Continue;
                        };
                        if releasing.replace(false) {
                            return Before::Continue;
                        }
                        limiter.set_policy(policy);
                        limiter.invoke(params.clone());
                        Before::Stop
                    }
                })
                .on_cancel(move || {
                    let dropped = limiter.cancel();
                    if dropped > 0 {
                        log::trace!("{name}: dropped {dropped} pending run(s)");
                    }
                })
        })
    }
}
