//! Cooperative tasks on a thread-local executor.
//!
//! Nothing runs until the host calls [`pump`] (once per frame on a platform
//! runner, or through [`crate::ManualClock::advance`] in tests).

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{AbortHandle, Abortable};
use futures::task::LocalSpawnExt;
use slotmap::{SlotMap, new_key_type};

use crate::RuntimeError;
use crate::timer;

thread_local! {
    static POOL: RefCell<LocalPool> = RefCell::new(LocalPool::new());
    static SPAWNER: LocalSpawner = POOL.with(|p| p.borrow().spawner());
    static PUMPING: Cell<bool> = const { Cell::new(false) };
}

/// Handle to a spawned task.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    abort: AbortHandle,
    finished: Rc<Cell<bool>>,
}

impl TaskHandle {
    /// The task is dropped at its next suspension point and never resumes.
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }
}

pub fn spawn_local(fut: impl Future<Output = ()> + 'static) -> Result<TaskHandle, RuntimeError> {
    let (abort, registration) = AbortHandle::new_pair();
    let finished = Rc::new(Cell::new(false));
    let task = Abortable::new(fut, registration).map({
        let finished = finished.clone();
        move |_| finished.set(true)
    });
    SPAWNER.with(|s| s.spawn_local(task))?;
    Ok(TaskHandle { abort, finished })
}

new_key_type! {
    struct TaskKey;
}

/// Tasks owned by one component. `cancel_all` aborts everything still running.
#[derive(Clone, Default)]
pub struct TaskScope {
    tasks: Rc<RefCell<SlotMap<TaskKey, TaskHandle>>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(
        &self,
        fut: impl Future<Output = ()> + 'static,
    ) -> Result<TaskHandle, RuntimeError> {
        let (abort, registration) = AbortHandle::new_pair();
        let finished = Rc::new(Cell::new(false));
        let handle = TaskHandle {
            abort,
            finished: finished.clone(),
        };
        let key = self.tasks.borrow_mut().insert(handle.clone());

        let tasks: Weak<RefCell<SlotMap<TaskKey, TaskHandle>>> = Rc::downgrade(&self.tasks);
        let task = Abortable::new(fut, registration).map(move |_| {
            finished.set(true);
            if let Some(tasks) = tasks.upgrade() {
                tasks.borrow_mut().remove(key);
            }
        });

        if let Err(e) = SPAWNER.with(|s| s.spawn_local(task)) {
            self.tasks.borrow_mut().remove(key);
            return Err(e.into());
        }
        Ok(handle)
    }

    pub fn cancel_all(&self) -> usize {
        let drained: Vec<TaskHandle> = self.tasks.borrow_mut().drain().map(|(_, h)| h).collect();
        for h in &drained {
            h.abort();
        }
        drained.len()
    }

    /// Tasks spawned through this scope that have not completed.
    pub fn active(&self) -> usize {
        self.tasks.borrow().len()
    }
}

/// Fires due timers and runs ready tasks until neither makes progress.
/// Returns the number of timers fired.
///
/// Calling this from inside a task or timer callback is a no-op.
pub fn pump() -> usize {
    struct Reset;
    impl Drop for Reset {
        fn drop(&mut self) {
            PUMPING.with(|p| p.set(false));
        }
    }

    if PUMPING.with(|p| p.replace(true)) {
        log::warn!("pump() re-entered from a task or timer; ignoring");
        return 0;
    }
    let _reset = Reset;

    let mut fired = 0;
    loop {
        POOL.with(|p| p.borrow_mut().run_until_stalled());
        let n = timer::fire_due();
        if n == 0 {
            break;
        }
        fired += n;
    }
    fired
}
