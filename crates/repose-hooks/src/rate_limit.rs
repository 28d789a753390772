//! # Rate limiting
//!
//! [`RateLimiter`] wraps a one-argument function and decides, per call,
//! whether to run it now, defer it to the trailing edge of the current
//! window, or drop it. The same component serves throttling and debouncing;
//! only the [`RateLimitPolicy`] flags differ:
//!
//! | policy | leading | trailing | sliding |
//! |---|---|---|---|
//! | `throttle(wait)` | yes | yes | no |
//! | `debounce(wait)` | no | yes | yes |
//!
//! A deferred execution is a timer on the thread clock, tagged with the
//! window it belongs to. A newer call inside the same window cancels and
//! replaces it; one left over from an earlier window still fires.
//!
//! ```rust
//! use repose_hooks::rate_limit::{RateLimitPolicy, RateLimiter};
//! use repose_runtime::ManualClock;
//! use std::{cell::RefCell, rc::Rc};
//! use web_time::Duration;
//!
//! let clock = ManualClock::install();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let limiter = RateLimiter::new(RateLimitPolicy::throttle(Duration::from_secs(1)), {
//!     let seen = seen.clone();
//!     move |n: u32| seen.borrow_mut().push(n)
//! });
//!
//! limiter.invoke(1); // leading edge, runs now
//! limiter.invoke(2); // inside the window, deferred
//! limiter.invoke(3); // replaces the deferred call
//! assert_eq!(*seen.borrow(), vec![1]);
//!
//! clock.advance(Duration::from_secs(1));
//! assert_eq!(*seen.borrow(), vec![1, 3]);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use repose_runtime::{TimerHandle, now, schedule};
use smallvec::SmallVec;
use web_time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateLimitPolicy {
    /// Length of the window.
    pub wait: Duration,
    /// Run on the call that opens a window.
    pub leading: bool,
    /// Run once at the end of a window in which calls were suppressed, with
    /// the most recent call's argument.
    pub trailing: bool,
    /// Every call restarts the window (debounce) instead of only executions
    /// (throttle). With `leading == false`, each burst is deferred, not just
    /// the first call ever.
    pub sliding: bool,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::throttle(Duration::from_secs(1))
    }
}

impl RateLimitPolicy {
    pub fn throttle(wait: Duration) -> Self {
        Self {
            wait,
            leading: true,
            trailing: true,
            sliding: false,
        }
    }

    pub fn debounce(wait: Duration) -> Self {
        Self {
            wait,
            leading: false,
            trailing: true,
            sliding: true,
        }
    }

    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    pub fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn sliding(mut self, sliding: bool) -> Self {
        self.sliding = sliding;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Fire,
    Defer,
    Drop,
}

#[derive(Default)]
struct LimiterState {
    /// Calls seen so far; never reset.
    invocation_count: u64,
    /// Start of the current window: last execution, or the call that opened
    /// the window when that call was deferred.
    last_fire: Option<Instant>,
    last_call: Option<Instant>,
    /// Deferred executions keyed by the start of their window.
    pending: SmallVec<[(Option<Instant>, TimerHandle); 2]>,
}

impl LimiterState {
    fn cancel_pending(&mut self) -> usize {
        let mut cancelled = 0;
        for (_, handle) in self.pending.drain(..) {
            if handle.cancel() {
                cancelled += 1;
            }
        }
        cancelled
    }

    fn cancel_window(&mut self, window: Option<Instant>) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|(w, handle)| {
            if *w != window {
                return handle.is_pending();
            }
            if handle.cancel() {
                cancelled += 1;
            }
            false
        });
        cancelled
    }
}

struct Inner<P> {
    func: RefCell<Rc<dyn Fn(P)>>,
    policy: Cell<RateLimitPolicy>,
    state: RefCell<LimiterState>,
}

/// Throttle/debounce wrapper around `Fn(P)`. Clones share state.
pub struct RateLimiter<P: 'static> {
    inner: Rc<Inner<P>>,
}

impl<P> Clone for RateLimiter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: 'static> RateLimiter<P> {
    pub fn new(policy: RateLimitPolicy, f: impl Fn(P) + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                func: RefCell::new(Rc::new(f)),
                policy: Cell::new(policy),
                state: RefCell::new(LimiterState::default()),
            }),
        }
    }

    /// Replaces the wrapped function. Already deferred executions call the
    /// new one.
    pub fn set_fn(&self, f: impl Fn(P) + 'static) {
        *self.inner.func.borrow_mut() = Rc::new(f);
    }

    pub fn set_fn_rc(&self, f: Rc<dyn Fn(P)>) {
        *self.inner.func.borrow_mut() = f;
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.inner.policy.get()
    }

    pub fn set_policy(&self, policy: RateLimitPolicy) {
        self.inner.policy.set(policy);
    }

    pub fn invocation_count(&self) -> u64 {
        self.inner.state.borrow().invocation_count
    }

    pub fn pending_count(&self) -> usize {
        self.inner
            .state
            .borrow()
            .pending
            .iter()
            .filter(|(_, h)| h.is_pending())
            .count()
    }

    pub fn invoke(&self, params: P) {
        let policy = self.policy();
        let now = now();

        let (decision, window) = {
            let mut st = self.inner.state.borrow_mut();
            let anchor = if policy.sliding {
                st.last_fire.max(st.last_call)
            } else {
                st.last_fire
            };
            let window_expired = anchor.is_none_or(|t| now.saturating_duration_since(t) > policy.wait);

            let decision = if !policy.leading && !policy.trailing {
                Decision::Drop
            } else if window_expired {
                let defer_leading = !policy.leading && (policy.sliding || st.invocation_count == 0);
                // The window opens now even when this call is pushed to the
                // trailing slot.
                st.last_fire = Some(now);
                match (defer_leading, policy.trailing) {
                    (false, _) => Decision::Fire,
                    (true, true) => Decision::Defer,
                    (true, false) => Decision::Drop,
                }
            } else if policy.trailing {
                Decision::Defer
            } else {
                Decision::Drop
            };

            st.last_call = Some(now);
            st.invocation_count += 1;
            (decision, st.last_fire)
        };

        match decision {
            Decision::Fire => {
                log::trace!("rate limiter: leading edge fires");
                let f = self.inner.func.borrow().clone();
                f(params);
            }
            Decision::Defer => {
                let weak = Rc::downgrade(&self.inner);
                let replaced = self.inner.state.borrow_mut().cancel_window(window);
                let handle = schedule(policy.wait, move || Self::fire_trailing(&weak, params));
                self.inner.state.borrow_mut().pending.push((window, handle));
                log::trace!("rate limiter: deferred to trailing edge (replaced {replaced})");
            }
            Decision::Drop => {
                log::trace!("rate limiter: call dropped inside window");
            }
        }
    }

    fn fire_trailing(weak: &Weak<Inner<P>>, params: P) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        {
            let mut st = inner.state.borrow_mut();
            st.pending.retain(|(_, h)| h.is_pending());
            st.last_fire = Some(now());
        }
        log::trace!("rate limiter: trailing edge fires");
        let f = inner.func.borrow().clone();
        f(params);
    }

    /// Cancels every deferred execution; none of them will run.
    pub fn cancel(&self) -> usize {
        let cancelled = self.inner.state.borrow_mut().cancel_pending();
        if cancelled > 0 {
            log::trace!("rate limiter: cancelled {cancelled} pending");
        }
        cancelled
    }
}
