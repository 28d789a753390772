use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::Mutex;
use web_time::{Duration, Instant};

use crate::{pump, timer};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

thread_local! {
    static CLOCK: RefCell<Arc<dyn Clock>> = RefCell::new(Arc::new(SystemClock));
}

/// Install the clock used by timers on this thread. Platform keeps
/// `SystemClock`; tests install a `ManualClock`.
pub fn set_clock(clock: Arc<dyn Clock>) {
    CLOCK.with(|c| *c.borrow_mut() = clock);
}

pub fn now() -> Instant {
    CLOCK.with(|c| c.borrow().now())
}

/// A clock you drive by hand. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    t: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            t: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Creates a clock and installs it on the current thread.
    pub fn install() -> Self {
        let clock = Self::new();
        set_clock(Arc::new(clock.clone()));
        clock
    }

    pub fn set(&self, t: Instant) {
        *self.t.lock() = t;
    }

    /// Moves time forward by `by`, stopping at every timer deadline on the way
    /// so each callback observes its own deadline as `now()`. Ready tasks are
    /// pumped after each stop.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            pump();
            match timer::next_deadline() {
                Some(deadline) if deadline <= target => {
                    let mut t = self.t.lock();
                    if deadline > *t {
                        *t = deadline;
                    }
                }
                _ => break,
            }
        }
        self.set(target);
        pump();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.t.lock()
    }
}
