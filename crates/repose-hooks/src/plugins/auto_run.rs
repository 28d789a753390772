use std::cell::Cell;
use std::rc::Rc;

use repose_runtime::use_effect;

use crate::fetch::Fetch;
use crate::fetch_state::Phase;
use crate::options::RequestOptions;
use crate::plugin::{Before, PluginFactory, PluginHooks};

/// Runs the request on mount and whenever `refresh_deps` change, and gates
/// every run on `ready`.
///
/// The initial phase is `Loading` when a run will start on mount and its
/// outcome lands in local state, `Idle` otherwise.
///
/// `has_auto_run` is cleared at the start of each pass so that within one
/// pass at most one of the two effects triggers a run.
#[derive(Default)]
pub struct AutoRunPlugin {
    ready: Rc<Cell<bool>>,
    has_auto_run: Rc<Cell<bool>>,
}

impl AutoRunPlugin {
    pub fn new(ready: bool) -> Self {
        Self {
            ready: Rc::new(Cell::new(ready)),
            has_auto_run: Rc::default(),
        }
    }

    pub fn factory<P: Clone + 'static, R: Clone + 'static>(&self) -> PluginFactory<P, R> {
        let ready = self.ready.clone();
        Box::new(move |_| {
            PluginHooks::new("auto_run")
                .on_init(|state, options: &RequestOptions<P, R>| {
                    if !options.manual && options.ready && options.delivery.updates_local() {
                        state.with_phase(Phase::Loading)
                    } else {
                        state.with_phase(Phase::Idle)
                    }
                })
                .on_before(move |_| {
                    if ready.get() {
                        Before::Continue
                    } else {
                        Before::Stop
                    }
                })
        })
    }

    /// Must be called once per composition pass, after the engine is synced
    /// with this pass's options.
    pub fn compose<P: Clone + 'static, R: Clone + 'static>(
        &self,
        fetch: &Fetch<P, R>,
        options: &RequestOptions<P, R>,
    ) {
        self.has_auto_run.set(false);
        self.ready.set(options.ready);

        let (manual, ready) = (options.manual, options.ready);

        use_effect(ready, {
            let has_auto_run = self.has_auto_run.clone();
            let handle = fetch.handle();
            let params = options.default_params.clone();
            move || {
                if !manual && ready {
                    has_auto_run.set(true);
                    handle.run(params);
                }
            }
        });

        use_effect(options.refresh_deps.clone(), {
            let has_auto_run = self.has_auto_run.clone();
            let handle = fetch.handle();
            let action = options.refresh_deps_action.clone();
            move || {
                if has_auto_run.get() || manual {
                    return;
                }
                has_auto_run.set(true);
                match action {
                    Some(action) => action(),
                    None => handle.refresh(),
                }
            }
        });
    }
}
