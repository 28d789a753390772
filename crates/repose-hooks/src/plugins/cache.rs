use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use repose_runtime::now;
use web_time::{Duration, Instant};

use crate::options::{DEFAULT_CACHE_TIME, RequestOptions};
use crate::plugin::{Before, PluginFactory, PluginHooks};

struct CacheEntry {
    data: Rc<dyn Any>,
    stored_at: Instant,
}

thread_local! {
    static CACHE: RefCell<HashMap<String, CacheEntry>> = RefCell::new(HashMap::new());
}

/// Cached data under `key` and when it was stored. Entries older than
/// `cache_time` are evicted on read; entries of another type are ignored.
pub fn get_cache<R: Clone + 'static>(key: &str, cache_time: Duration) -> Option<(R, Instant)> {
    CACHE.with(|c| {
        let mut cache = c.borrow_mut();
        let stored_at = cache.get(key)?.stored_at;
        if now().saturating_duration_since(stored_at) >= cache_time {
            cache.remove(key);
            return None;
        }
        let data = cache.get(key)?.data.downcast_ref::<R>()?.clone();
        Some((data, stored_at))
    })
}

pub fn set_cache<R: 'static>(key: impl Into<String>, data: R) {
    let entry = CacheEntry {
        data: Rc::new(data),
        stored_at: now(),
    };
    CACHE.with(|c| c.borrow_mut().insert(key.into(), entry));
}

/// Drops one entry, or everything when `key` is `None`.
pub fn clear_cache(key: Option<&str>) {
    CACHE.with(|c| match key {
        Some(k) => {
            c.borrow_mut().remove(k);
        }
        None => c.borrow_mut().clear(),
    });
}

/// Shares results between engines with the same `cache_key` on this thread.
///
/// Cached data is shown immediately on creation. While it is younger than
/// `stale_time` runs are answered from the cache without calling the service.
pub struct CachePlugin {
    key: Rc<RefCell<Option<String>>>,
    stale_time: Rc<Cell<Duration>>,
    cache_time: Rc<Cell<Duration>>,
}

impl Default for CachePlugin {
    fn default() -> Self {
        Self {
            key: Rc::default(),
            stale_time: Rc::default(),
            cache_time: Rc::new(Cell::new(DEFAULT_CACHE_TIME)),
        }
    }
}

impl CachePlugin {
    pub fn sync<P, R>(&self, options: &RequestOptions<P, R>) {
        self.key.replace(options.cache_key.clone());
        self.stale_time.set(options.stale_time);
        self.cache_time.set(options.cache_time);
    }

    pub fn factory<P: Clone + 'static, R: Clone + 'static>(&self) -> PluginFactory<P, R> {
        let key = self.key.clone();
        let stale_time = self.stale_time.clone();
        let cache_time = self.cache_time.clone();
        Box::new(move |_| {
            let from_cache = Rc::new(Cell::new(false));
            PluginHooks::new("cache")
                .on_init({
                    let key = key.clone();
                    let cache_time = cache_time.clone();
                    move |state, _| match key.borrow().as_deref().and_then(|k| get_cache::<R>(k, cache_time.get())) {
                        Some((data, _)) => state.with_data(data),
                        None => state,
                    }
                })
                .on_before({
                    let key = key.clone();
                    let from_cache = from_cache.clone();
                    move |_| {
                        let Some(k) = key.borrow().clone() else {
                            return Before::Continue;
                        };
                        match get_cache::<R>(&k, cache_time.get()) {
                            Some((data, at)) if now().saturating_duration_since(at) < stale_time.get() => {
                                log::trace!("serving `{k}` from cache");
                                from_cache.set(true);
                                Before::Return(Ok(data))
                            }
                            _ => Before::Continue,
                        }
                    }
                })
                .on_success({
                    let key = key.clone();
                    move |data: &R, _| {
                        if from_cache.replace(false) {
                            return;
                        }
                        if let Some(k) = key.borrow().as_deref() {
                            set_cache(k, data.clone());
                        }
                    }
                })
                .on_mutate(move |data: &R| {
                    if let Some(k) = key.borrow().as_deref() {
                        set_cache(k, data.clone());
                    }
                })
        })
    }
}
