#[cfg(test)]
mod tests {
    use crate::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use web_time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_signal_basic() {
        let sig = signal(42);
        assert_eq!(sig.get(), 42);

        sig.set(100);
        assert_eq!(sig.get(), 100);

        sig.update(|v| *v += 1);
        assert_eq!(sig.get(), 101);
        assert_eq!(sig.version(), 2);
    }

    #[test]
    fn test_signal_subscriber_can_write() {
        let sig = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        sig.subscribe({
            let seen = seen.clone();
            let sig = sig.clone();
            move |v| {
                seen.borrow_mut().push(*v);
                if *v > 5 {
                    sig.set(5);
                }
            }
        });

        sig.set(9);
        assert_eq!(sig.get(), 5);
        assert_eq!(*seen.borrow(), vec![9, 5]);
        sig.update(|v| *v += 1);
        assert_eq!(sig.get(), 5);
        assert_eq!(*seen.borrow(), vec![9, 5, 6, 5]);
    }

    #[test]
    fn test_signal_subscriber_can_read() {
        let sig = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let id = sig.subscribe({
            let seen = seen.clone();
            let sig = sig.clone();
            move |v| seen.borrow_mut().push((*v, sig.get()))
        });

        sig.set(7);
        sig.unsubscribe(id);
        sig.set(8);
        assert_eq!(*seen.borrow(), vec![(7, 7)]);
    }

    #[test]
    fn test_remember_survives_passes() {
        let comp = Composition::new();
        let first = comp.compose(|| remember(|| Cell::new(1)));
        first.set(5);
        let second = comp.compose(|| remember(|| Cell::new(1)));
        assert_eq!(second.get(), 5);
        assert_eq!(comp.passes(), 2);
    }

    #[test]
    fn test_nested_remember_in_init_keeps_order() {
        let comp = Composition::new();
        let pass = || {
            let outer = remember(|| {
                let inner = remember(|| 10);
                *inner + 1
            });
            let next = remember(|| "next");
            (*outer, *next)
        };
        assert_eq!(comp.compose(pass), (11, "next"));
        assert_eq!(comp.compose(pass), (11, "next"));
    }

    #[test]
    fn test_compositions_are_independent() {
        let a = Composition::new();
        let b = Composition::new();
        a.compose(|| remember(|| Cell::new(0)).set(3));
        let from_b = b.compose(|| remember(|| Cell::new(0)).get());
        assert_eq!(from_b, 0);
    }

    #[test]
    fn test_key_based_remember() {
        let comp = Composition::new();
        comp.compose(|| {
            let val1 = remember_with_key("test", || 42);
            let val2 = remember_with_key("test", || 100);

            // Should return the same instance
            assert_eq!(*val1, 42);
            assert_eq!(*val2, 42); // Not 100, because key exists
        });
    }

    #[test]
    fn test_use_effect_runs_after_pass_on_key_change() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let comp = Composition::new();

        for key in ["a", "a", "b"] {
            let log = log.clone();
            comp.compose(move || {
                let inner = log.clone();
                use_effect(key, move || inner.borrow_mut().push(format!("effect {key}")));
                log.borrow_mut().push(format!("compose {key}"));
            });
        }

        assert_eq!(
            *log.borrow(),
            vec!["compose a", "effect a", "compose a", "compose b", "effect b"]
        );
    }

    #[test]
    fn test_use_mount_runs_once_and_unmount_on_dispose() {
        let mounted = Rc::new(Cell::new(0));
        let unmounted = Rc::new(Cell::new(0));
        let comp = Composition::new();

        for _ in 0..3 {
            let (m, u) = (mounted.clone(), unmounted.clone());
            comp.compose(move || {
                use_mount(move || m.set(m.get() + 1));
                use_unmount(move || u.set(u.get() + 1));
            });
        }
        assert_eq!(mounted.get(), 1);
        assert_eq!(unmounted.get(), 0);

        comp.dispose();
        assert_eq!(unmounted.get(), 1);
        assert!(comp.is_disposed());
    }

    #[test]
    fn test_disposable_effect_cleans_previous() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let comp = Composition::new();
        for key in [1, 2] {
            let log = log.clone();
            comp.compose(move || {
                disposable_effect(key, move || {
                    log.borrow_mut().push(format!("start {key}"));
                    on_unmount(move || log.borrow_mut().push(format!("stop {key}")))
                });
            });
        }
        comp.dispose();
        assert_eq!(*log.borrow(), vec!["start 1", "stop 1", "start 2", "stop 2"]);
    }

    #[test]
    fn test_scope_explicit_dispose() {
        let cleaned_up = Rc::new(Cell::new(false));

        let scope = Scope::new();
        let cleaned_up_clone = cleaned_up.clone();
        scope.add_disposer(move || cleaned_up_clone.set(true));

        assert!(!cleaned_up.get());
        scope.dispose();
        assert!(cleaned_up.get());
    }

    #[test]
    fn test_scope_runs_disposers_on_drop() {
        let cleaned_up = Rc::new(Cell::new(false));
        {
            let scope = Scope::new();
            let c = cleaned_up.clone();
            scope.add_disposer(move || c.set(true));
        }
        assert!(cleaned_up.get());
    }

    #[test]
    fn test_use_latest_refreshes_same_holder() {
        let comp = Composition::new();
        let first = comp.compose(|| use_latest(1));
        let second = comp.compose(|| use_latest(2));
        assert_eq!(first.get(), 2);
        assert_eq!(second.get(), 2);
    }

    #[test]
    fn test_locals_are_scoped() {
        #[derive(Clone, Debug, PartialEq)]
        struct Depth(u32);

        provide_local(Depth(1), || {
            assert_eq!(use_local::<Depth>(), Some(Depth(1)));
            provide_local(Depth(2), || assert_eq!(use_local::<Depth>(), Some(Depth(2))));
            assert_eq!(use_local::<Depth>(), Some(Depth(1)));
        });
        assert_eq!(use_local::<Depth>(), None);
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let clock = ManualClock::install();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (name, delay) in [("late", 300), ("early", 100), ("tie", 100)] {
            let order = order.clone();
            schedule(ms(delay), move || order.borrow_mut().push(name));
        }
        let cancelled = schedule(ms(200), {
            let order = order.clone();
            move || order.borrow_mut().push("cancelled")
        });
        assert!(cancelled.cancel());
        assert!(!cancelled.is_pending());

        clock.advance(ms(1000));
        assert_eq!(*order.borrow(), vec!["early", "tie", "late"]);
    }

    #[test]
    fn test_timer_observes_its_deadline() {
        let clock = ManualClock::install();
        let start = now();
        let seen = Rc::new(Cell::new(None));
        let s = seen.clone();
        schedule(ms(250), move || s.set(Some(now())));
        clock.advance(ms(1000));
        assert_eq!(seen.get(), Some(start + ms(250)));
        assert_eq!(now(), start + ms(1000));
    }

    #[test]
    fn test_sleep_inside_task() {
        let clock = ManualClock::install();
        let done = Rc::new(Cell::new(false));
        let d = done.clone();
        let handle = spawn_local(async move {
            sleep(ms(50)).await;
            d.set(true);
        })
        .unwrap();

        pump();
        assert!(!done.get());
        clock.advance(ms(50));
        assert!(done.get());
        assert!(handle.is_finished());
    }

    #[test]
    fn test_task_scope_cancel_all() {
        let clock = ManualClock::install();
        let tasks = TaskScope::new();
        let done = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let d = done.clone();
            tasks
                .spawn(async move {
                    sleep(ms(10)).await;
                    d.set(d.get() + 1);
                })
                .unwrap();
        }
        pump();
        assert_eq!(tasks.active(), 3);
        assert_eq!(tasks.cancel_all(), 3);
        clock.advance(ms(100));
        assert_eq!(done.get(), 0);
        assert_eq!(tasks.active(), 0);
        assert_eq!(timer::pending_timers(), 0);
    }
}
