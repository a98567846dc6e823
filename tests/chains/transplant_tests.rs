use std::{cell::Cell, rc::Rc};

use vouch::{RunOutcome, Validation, Value};

#[test]
fn test_unended_chain_is_not_carried_forward() {
    let runs = Rc::new(Cell::new(0u32));

    let counter = runs.clone();
    let first = Validation::new(|v| {
        // started but never end()ed: the record stays open
        v.start("partial", [1i64]).then(move |d| {
            counter.set(counter.get() + 1);
            d
        });
    });
    assert_eq!(runs.get(), 1);

    let counter = runs.clone();
    let second = Validation::continue_from(first, |v| {
        v.start("partial", [1i64])
            .then(move |d| {
                counter.set(counter.get() + 1);
                d
            })
            .end();
    });
    assert_eq!(runs.get(), 2, "an unended chain must re-execute");
    assert_eq!(second.ok(), Some(true));
}

#[test]
fn test_closed_chain_survives_an_intermediate_run_that_skips_it() {
    let runs = Rc::new(Cell::new(0u32));
    let build = |runs: Rc<Cell<u32>>| {
        move |v: &vouch::Ring| {
            v.start("kept", [1i64])
                .then(move |d| {
                    runs.set(runs.get() + 1);
                    d
                })
                .end();
        }
    };

    let first = Validation::new(build(runs.clone()));
    // a run that never opens "kept" still carries its record forward
    let second = Validation::continue_from(first, |_| {});
    let _third = Validation::continue_from(second, build(runs.clone()));
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_replayed_chain_left_unended_is_dropped() {
    let runs = Rc::new(Cell::new(0u32));
    let body = |runs: Rc<Cell<u32>>| {
        move |d: Value| {
            runs.set(runs.get() + 1);
            d
        }
    };

    let first = Validation::new(|v| {
        v.start("flaky", [1i64]).then(body(runs.clone())).end();
    });
    // run two replays "flaky" but forgets to end it
    let second = Validation::continue_from(first, |v| {
        v.start("flaky", [1i64]).then(body(runs.clone()));
    });
    assert_eq!(runs.get(), 1, "run two replays from cache");

    // run three must re-execute: run two opened the name without ending it
    Validation::continue_from(second, |v| {
        v.start("flaky", [1i64]).then(body(runs.clone())).end();
    });
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_duplicate_start_faults_the_run() {
    let validation = Validation::new(|v| {
        v.start("dup", [1i64]).end();
        v.start("dup", [1i64]).end();
    });
    let RunOutcome::Faulted(reason) = validation.outcome() else {
        panic!("expected fault");
    };
    assert!(reason.contains("already started"), "got: {}", reason);
}

#[test]
fn test_end_outside_a_named_chain_faults_the_run() {
    let validation = Validation::new(|v| {
        v.with(Value::Integer(1)).end();
    });
    let RunOutcome::Faulted(reason) = validation.outcome() else {
        panic!("expected fault");
    };
    assert!(reason.contains("only legal"), "got: {}", reason);
}

#[test]
fn test_double_end_faults_the_run() {
    let validation = Validation::new(|v| {
        v.start("once", [1i64]).end().end();
    });
    let RunOutcome::Faulted(reason) = validation.outcome() else {
        panic!("expected fault");
    };
    assert!(reason.contains("already ended"), "got: {}", reason);
}

#[test]
fn test_start_inside_a_named_chain_faults_the_run() {
    let validation = Validation::new(|v| {
        let opened = v.start("outer", [1i64]);
        opened.start("inner", [2i64]);
    });
    let RunOutcome::Faulted(reason) = validation.outcome() else {
        panic!("expected fault");
    };
    assert!(reason.contains("inside chain 'outer'"), "got: {}", reason);
}

#[test]
fn test_faulted_run_carries_nothing_forward() {
    let runs = Rc::new(Cell::new(0u32));
    let counter = runs.clone();
    let first = Validation::new(|v| {
        v.start("chain", [1i64])
            .then(move |d| {
                counter.set(counter.get() + 1);
                d
            })
            .end();
        v.with(Value::Integer(1)).apply(|_| Value::None); // contract violation
    });
    assert!(matches!(first.outcome(), RunOutcome::Faulted(_)));

    let counter = runs.clone();
    let second = Validation::continue_from(first, |v| {
        v.start("chain", [1i64])
            .then(move |d| {
                counter.set(counter.get() + 1);
                d
            })
            .end();
    });
    // the first run closed "chain" before faulting, so it may replay;
    // what matters is the new run is healthy
    assert_eq!(second.ok(), Some(true));
    assert!(second.settled());
    assert!(runs.get() >= 1);
}
