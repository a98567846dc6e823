use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use vouch::{Path, Validation, Value};

#[test]
fn test_unchanged_watches_replay_without_reexecuting_the_body() {
    let runs = Rc::new(Cell::new(0u32));

    let build = |runs: Rc<Cell<u32>>| {
        move |v: &vouch::Ring| {
            v.start("increment", [5i64])
                .then(move |n| {
                    runs.set(runs.get() + 1);
                    Value::Integer(n.as_int().unwrap() + 1)
                })
                .end();
        }
    };

    let mut validation = Validation::new(build(runs.clone()));
    assert_eq!(runs.get(), 1);

    for _ in 0..3 {
        validation = Validation::continue_from(validation, build(runs.clone()));
    }
    assert_eq!(runs.get(), 1, "the chain body must run exactly once");
    assert_eq!(validation.ok(), Some(true));
}

#[test]
fn test_replay_yields_the_cached_result_data() {
    let first = Validation::new(|v| {
        v.start("sum", [5i64])
            .then(|n| Value::Integer(n.as_int().unwrap() + 1))
            .end();
    });

    let mut tail = None;
    let second = Validation::continue_from(first, |v| {
        tail = Some(
            v.start("sum", [5i64])
                .then(|_| -> Value { panic!("body must not re-run") })
                .end(),
        );
    });
    assert_eq!(tail.unwrap().value().unwrap(), Value::Integer(6));
    assert_eq!(second.ok(), Some(true));
}

#[test]
fn test_replay_reproduces_badges_errors_and_store_writes() {
    let build = |v: &vouch::Ring| {
        v.start("profile", ["ada"])
            .check("named", true)
            .set(Path::root().key("profile").key("name"))
            .check_msg("verified", false, "not verified")
            .end();
    };

    let first = Validation::new(build);
    let first_badges = first.badges();
    let first_errors = first.errors();
    let first_store = first.stored(Path::root().key("profile").key("name"));
    assert_eq!(first.ok(), Some(false));

    let second = Validation::continue_from(first, build);
    assert_eq!(second.badges(), first_badges);
    assert_eq!(second.errors(), first_errors);
    assert_eq!(
        second.stored(Path::root().key("profile").key("name")),
        first_store
    );
    assert_eq!(second.ok(), Some(false), "replay reproduces invalidation");
}

#[test]
fn test_changed_watch_recomputes() {
    let runs = Rc::new(Cell::new(0u32));
    let build = |runs: Rc<Cell<u32>>, watch: i64| {
        move |v: &vouch::Ring| {
            v.start("increment", [watch])
                .then(move |n| {
                    runs.set(runs.get() + 1);
                    Value::Integer(n.as_int().unwrap() + 1)
                })
                .end();
        }
    };

    let first = Validation::new(build(runs.clone(), 5));
    let mut tail = None;
    let _second = Validation::continue_from(first, |v| {
        tail = Some(
            v.start("increment", [7i64])
                .then({
                    let runs = runs.clone();
                    move |n| {
                        runs.set(runs.get() + 1);
                        Value::Integer(n.as_int().unwrap() + 1)
                    }
                })
                .end(),
        );
    });

    assert_eq!(runs.get(), 2, "a changed watch must re-execute");
    assert_eq!(tail.unwrap().value().unwrap(), Value::Integer(8));
}

#[test]
fn test_watch_count_change_recomputes() {
    let runs = Rc::new(Cell::new(0u32));
    let counter = runs.clone();
    let first = Validation::new(|v| {
        v.start("count", [1i64])
            .then(move |d| {
                counter.set(counter.get() + 1);
                d
            })
            .end();
    });

    let counter = runs.clone();
    Validation::continue_from(first, |v| {
        v.start("count", [1i64, 1i64])
            .then(move |d| {
                counter.set(counter.get() + 1);
                d
            })
            .end();
    });
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_multiple_watches_become_the_opening_data() {
    let mut tail = None;
    Validation::new(|v| {
        tail = Some(v.start("pair", [2i64, 3i64]).end());
    });
    assert_eq!(
        tail.unwrap().value().unwrap(),
        Value::from(vec![Value::Integer(2), Value::Integer(3)])
    );
}

#[test]
fn test_suspended_chain_is_cached_once_ended() {
    let runs = Rc::new(Cell::new(0u32));
    let resolver_slot: Rc<RefCell<Option<vouch::Resolver>>> = Rc::new(RefCell::new(None));

    let counter = runs.clone();
    let slot = resolver_slot.clone();
    let first = Validation::new(|v| {
        let (pending, resolver) = v.deferred();
        *slot.borrow_mut() = Some(resolver);
        v.start("fetch", ["k"])
            .with(pending)
            .then(move |d| {
                counter.set(counter.get() + 1);
                d
            })
            .end();
    });
    assert!(!first.settled());
    resolver_slot.borrow_mut().take().unwrap().resolve(Value::Integer(99));
    assert!(first.settled());
    assert_eq!(runs.get(), 1);

    // replay of an asynchronous chain settles immediately
    let mut tail = None;
    let second = Validation::continue_from(first, |v| {
        tail = Some(v.start("fetch", ["k"]).end());
    });
    assert!(second.settled());
    assert_eq!(tail.unwrap().value().unwrap(), Value::Integer(99));
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_failed_chain_replays_its_failure() {
    let build = |v: &vouch::Ring| {
        v.start("strict", [1i64])
            .check_msg("limit", false, "over the limit")
            .end();
    };
    let first = Validation::new(build);
    assert_eq!(first.ok(), Some(false));

    let second = Validation::continue_from(first, build);
    assert_eq!(second.ok(), Some(false));
    assert_eq!(
        second.errors(),
        [("limit".to_string(), "over the limit".to_string())]
    );
}
