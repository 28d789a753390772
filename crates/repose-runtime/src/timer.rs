//! Delayed callbacks on the current thread, measured against [`crate::now`].

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

new_key_type! {
    pub struct TimerKey;
}

struct Timer {
    deadline: Instant,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct TimerQueue {
    timers: SlotMap<TimerKey, Timer>,
    next_seq: u64,
}

impl TimerQueue {
    fn take_due(&mut self, now: Instant) -> Option<Timer> {
        let key = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(k, _)| k)?;
        self.timers.remove(key)
    }
}

thread_local! {
    static TIMERS: RefCell<TimerQueue> = RefCell::new(TimerQueue::default());
}

/// Handle to a scheduled callback. Cancelling after the callback ran is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerHandle {
    key: TimerKey,
}

impl TimerHandle {
    /// Returns true if the callback was still pending; it will never run.
    pub fn cancel(&self) -> bool {
        TIMERS.with(|q| q.borrow_mut().timers.remove(self.key).is_some())
    }

    pub fn is_pending(&self) -> bool {
        TIMERS.with(|q| q.borrow().timers.contains_key(self.key))
    }
}

pub fn schedule(delay: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
    let deadline = crate::now() + delay;
    TIMERS.with(|q| {
        let mut q = q.borrow_mut();
        let seq = q.next_seq;
        q.next_seq += 1;
        let key = q.timers.insert(Timer {
            deadline,
            seq,
            callback: Box::new(callback),
        });
        TimerHandle { key }
    })
}

pub fn next_deadline() -> Option<Instant> {
    TIMERS.with(|q| q.borrow().timers.values().map(|t| t.deadline).min())
}

pub fn pending_timers() -> usize {
    TIMERS.with(|q| q.borrow().timers.len())
}

/// Fires every timer whose deadline has passed, earliest first. Callbacks run
/// with the queue unborrowed, so they may schedule or cancel timers.
pub(crate) fn fire_due() -> usize {
    let mut fired = 0;
    loop {
        let now = crate::now();
        let Some(timer) = TIMERS.with(|q| q.borrow_mut().take_due(now)) else {
            break;
        };
        (timer.callback)();
        fired += 1;
    }
    fired
}

struct SleepShared {
    fired: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

/// Future that resolves once `duration` has elapsed on the thread clock.
pub struct Sleep {
    duration: Duration,
    armed: Option<(TimerHandle, Rc<SleepShared>)>,
}

pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        duration,
        armed: None,
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let duration = self.duration;
        let (_, shared) = self.armed.get_or_insert_with(|| {
            let shared = Rc::new(SleepShared {
                fired: Cell::new(false),
                waker: RefCell::new(None),
            });
            let handle = schedule(duration, {
                let shared = shared.clone();
                move || {
                    shared.fired.set(true);
                    let waker = shared.waker.borrow_mut().take();
                    if let Some(w) = waker {
                        w.wake();
                    }
                }
            });
            (handle, shared)
        });

        if shared.fired.get() {
            return Poll::Ready(());
        }
        *shared.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some((handle, _)) = &self.armed {
            handle.cancel();
        }
    }
}
