use std::{cell::RefCell, rc::Rc};

use vouch::{Path, Ring, RunOutcome, Source, Validation, Value};

fn run_chain(build: impl FnOnce(&Ring) -> Ring) -> (Validation, Ring) {
    let mut tail = None;
    let validation = Validation::new(|seed| {
        tail = Some(build(seed));
    });
    (validation, tail.unwrap())
}

#[test]
fn test_pending_input_suspends_then_settles() {
    let mut resolver_slot = None;
    let mut tail = None;
    let validation = Validation::new(|v| {
        let (pending, resolver) = v.deferred();
        resolver_slot = Some(resolver);
        tail = Some(
            v.with(pending)
                .check_with("loaded", |d| !d.is_none()),
        );
    });
    let ring = tail.unwrap();

    assert!(!validation.settled());
    assert_eq!(validation.outcome(), RunOutcome::Pending);
    // optimistic verdict before the work lands
    assert_eq!(validation.ok(), Some(true));

    resolver_slot.unwrap().resolve(Value::Integer(1));
    assert!(validation.settled());
    assert_eq!(validation.outcome(), RunOutcome::Settled(true));
    assert_eq!(validation.badges(), ["loaded"]);
    assert_eq!(ring.value().unwrap(), Value::Integer(1));
}

#[test]
fn test_ops_queue_in_invocation_order_behind_a_suspension() {
    let trace: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let mut resolver_slot = None;
    let first = trace.clone();
    let second = trace.clone();
    let validation = Validation::new(|v| {
        let (pending, resolver) = v.deferred();
        resolver_slot = Some(resolver);
        v.with(pending)
            .then(move |d| {
                first.borrow_mut().push("first");
                d
            })
            .then(move |d| {
                second.borrow_mut().push("second");
                d
            });
    });

    assert!(trace.borrow().is_empty());
    resolver_slot.unwrap().resolve(Value::None);
    assert_eq!(*trace.borrow(), ["first", "second"]);
    assert!(validation.settled());
}

#[test]
fn test_each_with_pending_element_suspends_the_whole_map() {
    let resolver_slot: Rc<RefCell<Option<vouch::Resolver>>> = Rc::new(RefCell::new(None));
    let slot = resolver_slot.clone();
    let (validation, ring) = run_chain(move |v| {
        let (pending, resolver) = v.deferred();
        *slot.borrow_mut() = Some(resolver);
        v.with(Value::from(vec![Value::Integer(1), Value::Integer(2)]))
            .each(move |item, index, _| {
                if index == 0 {
                    vouch::Step::from(pending.clone())
                } else {
                    vouch::Step::from(item.clone())
                }
            })
    });

    assert!(!validation.settled());
    let resolver = resolver_slot.borrow_mut().take().unwrap();
    resolver.resolve(Value::Integer(10));
    assert!(validation.settled());
    assert_eq!(
        ring.value().unwrap(),
        Value::from(vec![Value::Integer(10), Value::Integer(2)])
    );
}

#[test]
fn test_after_waits_for_every_target() {
    let mut resolver_slot = None;
    let mut tail = None;
    let validation = Validation::new(|v| {
        let (pending, resolver) = v.deferred();
        resolver_slot = Some(resolver);
        tail = Some(v.with(Value::Integer(3)).after(vec![
            Source::wait(pending),
            Source::derive(|d| Value::Integer(d.as_int().unwrap() + 1)),
        ]));
    });
    let ring = tail.unwrap();

    assert!(!validation.settled());
    resolver_slot.unwrap().resolve(Value::from("late"));
    assert!(validation.settled());
    assert_eq!(
        ring.value().unwrap(),
        Value::from(vec![Value::from("late"), Value::Integer(4)])
    );
}

#[test]
fn test_rejection_faults_the_whole_run() {
    let mut resolver_slot = None;
    let validation = Validation::new(|v| {
        let (pending, resolver) = v.deferred();
        resolver_slot = Some(resolver);
        v.with(Value::None).earn("early");
        v.with(pending).earn("late");
    });

    // badges earned synchronously before the failure stay visible
    assert_eq!(validation.badges(), ["early"]);
    resolver_slot.unwrap().reject("backend unreachable");
    assert_eq!(
        validation.outcome(),
        RunOutcome::Faulted("backend unreachable".to_string())
    );
    assert_eq!(validation.ok(), None);
    assert_eq!(validation.badges(), ["early"]);
}

#[test]
fn test_dispose_rejects_immediately_and_is_idempotent() {
    let validation = Validation::new(|v| {
        let (pending, _resolver) = v.deferred();
        v.with(pending).earn("never");
    });
    assert!(!validation.settled());

    validation.dispose(None);
    assert_eq!(
        validation.outcome(),
        RunOutcome::Faulted("disposed".to_string())
    );
    validation.dispose(Some("again"));
    assert_eq!(
        validation.outcome(),
        RunOutcome::Faulted("disposed".to_string())
    );
}

#[test]
fn test_ops_after_settlement_are_inert() {
    let mut kept = None;
    let validation = Validation::new(|v| {
        kept = Some(v.with(Value::Integer(1)));
    });
    assert!(validation.settled());

    let ring = kept.unwrap();
    ring.earn("late").set(Path::root().key("late"));
    assert!(validation.badges().is_empty());
    assert_eq!(validation.stored(Path::root().key("late")), Value::None);
}

#[test]
fn test_on_settle_fires_at_fixed_point() {
    let seen: Rc<RefCell<Option<Result<bool, String>>>> = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    let mut resolver_slot = None;
    let validation = Validation::new(|v| {
        let (pending, resolver) = v.deferred();
        resolver_slot = Some(resolver);
        v.with(pending).must_with(|d| d.is_truthy());
    });
    validation.on_settle(move |result| {
        *sink.borrow_mut() = Some(result.clone());
    });

    assert!(seen.borrow().is_none());
    resolver_slot.unwrap().resolve(Value::Boolean(false));
    assert_eq!(*seen.borrow(), Some(Ok(false)));
}

#[test]
fn test_continuation_spawned_work_is_awaited_too() {
    // a then body that starts a second suspended chain: the run must not
    // settle until that chain's resolver also fires
    let late: Rc<RefCell<Option<vouch::Resolver>>> = Rc::new(RefCell::new(None));
    let late_slot = late.clone();
    let mut resolver_slot = None;
    let validation = Validation::new(|v| {
        let (pending, resolver) = v.deferred();
        resolver_slot = Some(resolver);
        let seed = v.clone();
        v.with(pending).then(move |d| {
            let (inner_pending, inner_resolver) = seed.deferred();
            *late_slot.borrow_mut() = Some(inner_resolver);
            seed.with(inner_pending).earn("inner");
            d
        });
    });

    resolver_slot.unwrap().resolve(Value::None);
    assert!(
        !validation.settled(),
        "work spawned inside a continuation must keep the run pending"
    );
    late.borrow_mut().take().unwrap().resolve(Value::None);
    assert!(validation.settled());
    assert_eq!(validation.badges(), ["inner"]);
}
