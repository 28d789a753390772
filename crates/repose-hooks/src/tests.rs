#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::RequestError;
    use crate::plugin::factory;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use web_time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Search service that records every query it receives.
    fn search(queries: &Rc<RefCell<Vec<String>>>) -> crate::Service<String, String> {
        let queries = queries.clone();
        service(move |q: String| {
            queries.borrow_mut().push(q.clone());
            async move {
                sleep(ms(40)).await;
                Ok(format!("results:{q}"))
            }
        })
    }

    #[test]
    fn test_debounced_search_only_sends_final_query() {
        let clock = ManualClock::install();
        let queries = Rc::new(RefCell::new(Vec::new()));
        let comp = Composition::new();
        let render = || {
            let svc = search(&queries);
            comp.compose(move || {
                let options = RequestOptions::new(String::new())
                    .manual(true)
                    .debounce(RateLimitPolicy::debounce(ms(300)));
                use_request(svc, options)
            })
        };

        for prefix in ["r", "ru", "rus", "rust"] {
            let fetch = render();
            fetch.run(prefix.to_string());
            clock.advance(ms(100));
        }
        let fetch = render();
        assert!(fetch.state().is_idle());
        clock.advance(ms(200));
        assert!(fetch.is_loading());
        clock.advance(ms(40));

        assert_eq!(*queries.borrow(), vec!["rust"]);
        assert_eq!(fetch.data().as_deref(), Some("results:rust"));
        assert_eq!(fetch.state().params().map(String::as_str), Some("rust"));
    }

    #[test]
    fn test_custom_plugin_vetoes_blank_queries() {
        let clock = ManualClock::install();
        let queries = Rc::new(RefCell::new(Vec::new()));
        let vetoed = Rc::new(Cell::new(0));
        let comp = Composition::new();
        let fetch = {
            let svc = search(&queries);
            let vetoed = vetoed.clone();
            comp.compose(move || {
                use_request_with_plugins(svc, RequestOptions::new(String::new()).manual(true), || {
                    let blank = factory(move |_| {
                        PluginHooks::new("non_blank").on_before(move |q: &String| {
                            if q.trim().is_empty() {
                                vetoed.set(vetoed.get() + 1);
                                Before::Stop
                            } else {
                                Before::Continue
                            }
                        })
                    });
                    vec![blank]
                })
            })
        };

        fetch.run("  ".to_string());
        clock.advance(ms(100));
        assert!(fetch.state().is_idle());
        assert_eq!(vetoed.get(), 1);

        fetch.run("ok".to_string());
        clock.advance(ms(100));
        assert_eq!(fetch.state().phase(), Phase::Success);
        assert_eq!(*queries.borrow(), vec!["ok"]);
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Profile {
        name: Option<String>,
        last_error: Option<String>,
    }

    #[derive(Clone)]
    enum ProfileAction {
        Loaded(String),
        Failed(String),
    }

    fn profile_store() -> Store {
        Store::new().record(Profile::default(), |p: &Profile, a: ProfileAction| match a {
            ProfileAction::Loaded(name) => Profile {
                name: Some(name),
                last_error: None,
            },
            ProfileAction::Failed(e) => Profile {
                last_error: Some(e),
                ..p.clone()
            },
        })
    }

    #[test]
    fn test_request_outcomes_dispatch_into_store() {
        let clock = ManualClock::install();
        let store = profile_store();
        let fail = Rc::new(Cell::new(false));
        let comp = Composition::new();
        let render = || {
            let fail = fail.clone();
            comp.compose(|| {
                redux_provider(&store, move || {
                    let dispatch = use_dispatch::<ProfileAction>().unwrap();
                    let svc = service(move |id: u32| {
                        let fail = fail.get();
                        async move {
                            anyhow::ensure!(!fail, "profile {id} unavailable");
                            Ok(format!("user-{id}"))
                        }
                    });
                    let options = RequestOptions::new(7).delivery(Delivery::dispatch(
                        dispatch,
                        |outcome: Result<String, RequestError>| match outcome {
                            Ok(name) => ProfileAction::Loaded(name),
                            Err(e) => ProfileAction::Failed(e.to_string()),
                        },
                    ));
                    let fetch = use_request(svc, options);
                    (fetch, use_selector::<Profile>().unwrap())
                })
            })
        };

        let (fetch, profile) = render();
        assert_eq!(profile, Profile::default());
        assert!(fetch.state().is_idle());

        clock.advance(ms(1));
        let (_, profile) = render();
        assert_eq!(profile.name.as_deref(), Some("user-7"));

        fail.set(true);
        fetch.refresh();
        clock.advance(ms(1));
        let (fetch, profile) = render();
        assert_eq!(profile.name.as_deref(), Some("user-7"));
        assert_eq!(profile.last_error.as_deref(), Some("profile 7 unavailable"));
        assert_eq!(fetch.state(), FetchState::default());
    }

    #[test]
    fn test_unmount_stops_polling_and_in_flight_work() {
        let clock = ManualClock::install();
        let queries = Rc::new(RefCell::new(Vec::new()));
        let comp = Composition::new();
        let fetch = {
            let svc = search(&queries);
            comp.compose(move || {
                use_request(svc, RequestOptions::new("tick".to_string()).polling(ms(1000)))
            })
        };

        clock.advance(ms(2100));
        assert_eq!(queries.borrow().len(), 3);
        assert_eq!(fetch.data().as_deref(), Some("results:tick"));

        // polls start at 0, 1040, 2080 and 3120, each taking 40ms
        clock.advance(ms(1030));
        assert!(fetch.is_loading());
        comp.dispose();
        clock.advance(ms(10_000));

        assert_eq!(queries.borrow().len(), 4);
        assert_eq!(fetch.state().phase(), Phase::Success);
        assert_eq!(fetch.data().as_deref(), Some("results:tick"));
        assert_eq!(repose_runtime::timer::pending_timers(), 0);
    }

    /// Always fails and counts its calls.
    fn failing(calls: &Rc<Cell<u32>>) -> crate::Service<(), u32> {
        let calls = calls.clone();
        service(move |()| {
            calls.set(calls.get() + 1);
            async { Err::<u32, _>(anyhow::anyhow!("offline")) }
        })
    }

    #[test]
    fn test_debounced_retries_respect_retry_count() {
        let clock = ManualClock::install();
        let calls = Rc::new(Cell::new(0));
        let comp = Composition::new();
        let fetch = {
            let svc = failing(&calls);
            comp.compose(move || {
                let options = RequestOptions::new(())
                    .manual(true)
                    .debounce(RateLimitPolicy::debounce(ms(100)))
                    .retry(2)
                    .retry_interval(ms(50));
                use_request(svc, options)
            })
        };

        fetch.run(());
        clock.advance(ms(20_000));
        assert_eq!(calls.get(), 3);
        assert_eq!(fetch.state().phase(), Phase::Error);
        assert_eq!(repose_runtime::timer::pending_timers(), 0);

        // a fresh run gets the full retry budget again
        fetch.run(());
        clock.advance(ms(20_000));
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn test_cache_answers_before_retry_and_keeps_data_on_failure() {
        let clock = ManualClock::install();
        crate::plugins::clear_cache(None);
        let calls = Rc::new(Cell::new(0));
        let fail = Rc::new(Cell::new(false));
        let svc = {
            let (calls, fail) = (calls.clone(), fail.clone());
            service(move |()| {
                calls.set(calls.get() + 1);
                let (n, fail) = (calls.get(), fail.get());
                async move {
                    anyhow::ensure!(!fail, "call {n} failed");
                    Ok(n)
                }
            })
        };
        let options = || {
            RequestOptions::new(())
                .cache("profile")
                .stale_time(ms(1000))
                .retry(1)
                .retry_interval(ms(50))
        };

        let comp = Composition::new();
        let fetch = {
            let svc = svc.clone();
            comp.compose(move || use_request(svc, options()))
        };
        clock.advance(ms(1));
        assert_eq!(fetch.data(), Some(1));

        // fresh entry: answered from the cache
        fetch.refresh();
        clock.advance(ms(1));
        assert_eq!(calls.get(), 1);
        assert_eq!(fetch.state().phase(), Phase::Success);

        // stale entry: the service is called, fails and is retried once
        clock.advance(ms(1500));
        fail.set(true);
        fetch.refresh();
        clock.advance(ms(200));
        assert_eq!(calls.get(), 3);
        let state = fetch.state();
        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(state.data(), Some(&1));

        fail.set(false);
        fetch.refresh();
        clock.advance(ms(1));
        assert_eq!(fetch.data(), Some(4));

        // a second component with the same key starts from the cached data
        let other = Composition::new();
        let mirror = {
            let svc = svc.clone();
            other.compose(move || use_request(svc, options()))
        };
        assert_eq!(mirror.data(), Some(4));
        clock.advance(ms(1));
        assert_eq!(mirror.state().phase(), Phase::Success);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_polling_is_paced_by_throttle() {
        let clock = ManualClock::install();
        let start = now();
        let at = Rc::new(RefCell::new(Vec::new()));
        let comp = Composition::new();
        let fetch = {
            let at = at.clone();
            let svc = service(move |()| {
                at.borrow_mut().push((now() - start).as_millis());
                async { Ok::<_, anyhow::Error>(()) }
            });
            comp.compose(move || {
                let options = RequestOptions::new(())
                    .polling(ms(100))
                    .throttle(RateLimitPolicy::throttle(ms(300)));
                use_request(svc, options)
            })
        };

        // each poll lands inside the throttle window and waits for its end
        clock.advance(ms(1250));
        assert_eq!(*at.borrow(), vec![0, 400, 800, 1200]);
        assert_eq!(fetch.state().phase(), Phase::Success);

        comp.dispose();
        clock.advance(ms(5000));
        assert_eq!(at.borrow().len(), 4);
        assert_eq!(repose_runtime::timer::pending_timers(), 0);
    }

    #[test]
    fn test_retry_keeps_stale_data_while_failing() {
        let clock = ManualClock::install();
        let calls = Rc::new(Cell::new(0));
        let comp = Composition::new();
        let svc = {
            let calls = calls.clone();
            service(move |()| {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    anyhow::ensure!(n == 1 || n >= 4, "attempt {n} failed");
                    Ok(n)
                }
            })
        };
        let fetch = comp.compose(move || {
            use_request(svc, RequestOptions::new(()).retry(3).retry_interval(ms(100)))
        });

        clock.advance(ms(1));
        assert_eq!(fetch.data(), Some(1));

        fetch.refresh();
        clock.advance(ms(1));
        let state = fetch.state();
        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(state.data(), Some(&1));

        clock.advance(ms(200));
        assert_eq!(calls.get(), 4);
        assert_eq!(fetch.data(), Some(4));
        assert_eq!(fetch.state().error(), None);
    }
}
