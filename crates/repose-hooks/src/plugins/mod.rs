//! Built-in plugins. [`crate::use_request`] installs them in this order:
//! debounce, polling, throttle, auto-run, cache, retry. Custom plugins come
//! after the built-ins.

mod auto_run;
mod cache;
mod polling;
mod rate_limited;
mod retry;

pub use auto_run::AutoRunPlugin;
pub use cache::{CachePlugin, clear_cache, get_cache, set_cache};
pub use polling::PollingPlugin;
pub use rate_limited::RateLimitedPlugin;
pub use retry::{RetryPlugin, retry_backoff};
