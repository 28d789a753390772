pub use crate::clock::{Clock, ManualClock, SystemClock, now, set_clock};
pub use crate::effects::{
    Dispose, disposable_effect, effect, on_unmount, use_effect, use_mount, use_unmount,
};
pub use crate::error::RuntimeError;
pub use crate::locals::{provide_local, use_local, use_local_or_default};
pub use crate::runtime::{
    Composition, after_composition, remember, remember_state, remember_state_with_key,
    remember_with_key,
};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::signal::{Signal, signal};
pub use crate::state::{Latest, use_latest};
pub use crate::task::{TaskHandle, TaskScope, pump, spawn_local};
pub use crate::timer::{Sleep, TimerHandle, schedule, sleep};
