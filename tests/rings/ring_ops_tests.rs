use vouch::{Path, Ring, RunOutcome, Source, Validation, Value};

/// Builds a validation around a single chain and hands back both the run
/// and the chain's final ring.
fn run_chain(build: impl FnOnce(&Ring) -> Ring) -> (Validation, Ring) {
    let mut tail = None;
    let validation = Validation::new(|seed| {
        tail = Some(build(seed));
    });
    (validation, tail.unwrap())
}

fn ints(values: &[i64]) -> Value {
    Value::from(values.iter().map(|v| Value::Integer(*v)).collect::<Vec<_>>())
}

#[test]
fn test_with_sets_data() {
    let (validation, ring) = run_chain(|v| v.with(Value::from("hello")));
    assert_eq!(ring.value().unwrap(), Value::from("hello"));
    assert_eq!(validation.ok(), Some(true));
}

#[test]
fn test_then_transforms_data() {
    let (_, ring) = run_chain(|v| {
        v.with(Value::Integer(20))
            .then(|n| Value::Integer(n.as_int().unwrap() + 1))
    });
    assert_eq!(ring.value().unwrap(), Value::Integer(21));
}

#[test]
fn test_then_flattens_another_chain() {
    let (_, ring) = run_chain(|v| {
        let other = v.with(Value::Integer(7));
        v.with(Value::Integer(1)).then(move |_| other)
    });
    assert_eq!(ring.value().unwrap(), Value::Integer(7));
}

#[test]
fn test_apply_spreads_array_data() {
    let (_, ring) = run_chain(|v| {
        v.with(ints(&[2, 3, 4])).apply(|args| {
            let sum: i64 = args.iter().filter_map(Value::as_int).sum();
            Value::Integer(sum)
        })
    });
    assert_eq!(ring.value().unwrap(), Value::Integer(9));
}

#[test]
fn test_apply_on_non_array_faults_the_run() {
    let (validation, _) = run_chain(|v| v.with(Value::Integer(1)).apply(|_| Value::None));
    let RunOutcome::Faulted(reason) = validation.outcome() else {
        panic!("expected faulted run, got {:?}", validation.outcome());
    };
    assert!(reason.contains("expected Array"), "got: {}", reason);
    assert_eq!(validation.ok(), None);
}

#[test]
fn test_each_maps_elements_with_index() {
    let (_, ring) = run_chain(|v| {
        v.with(ints(&[10, 20]))
            .each(|item, index, _| Value::Integer(item.as_int().unwrap() + index as i64))
    });
    assert_eq!(ring.value().unwrap(), ints(&[10, 21]));
}

#[test]
fn test_each_on_non_array_faults_the_run() {
    let (validation, _) = run_chain(|v| v.with(Value::from("x")).each(|item, _, _| item.clone()));
    assert!(matches!(validation.outcome(), RunOutcome::Faulted(_)));
}

#[test]
fn test_after_collects_positional_tuple() {
    let (_, ring) = run_chain(|v| {
        v.with(Value::Integer(5)).after(vec![
            Source::now(1i64),
            Source::derive(|data| Value::Integer(data.as_int().unwrap() * 2)),
        ])
    });
    assert_eq!(ring.value().unwrap(), ints(&[1, 10]));
}

#[test]
fn test_object_accepts_map_and_keeps_chain_running() {
    let (validation, ring) = run_chain(|v| {
        let map: serde_json::Value = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        v.object(Value::from_json(&map)).earn("shaped")
    });
    assert_eq!(validation.badges(), ["shaped"]);
    assert_eq!(validation.ok(), Some(true));
    assert!(ring.value().unwrap().as_map().is_some());
}

#[test]
fn test_array_rejects_map_invalidates_and_bypasses() {
    // the data is still set, the run is invalid, and the earn never runs
    let (validation, ring) = run_chain(|v| {
        let map: serde_json::Value = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        v.array(Value::from_json(&map)).earn("A")
    });
    assert_eq!(validation.ok(), Some(false));
    assert!(validation.badges().is_empty());
    assert!(validation.errors().is_empty());
    assert!(ring.value().unwrap().as_map().is_some());
}

#[test]
fn test_check_sequence_stops_at_first_failure() {
    let (validation, _) = run_chain(|v| {
        v.with(Value::None)
            .check("A", true)
            .check("B", false)
            .check("C", true)
    });
    assert_eq!(validation.badges(), ["A"]);
    assert_eq!(
        validation.errors(),
        [("B".to_string(), String::new())]
    );
    assert_eq!(validation.ok(), Some(false));
}

#[test]
fn test_branching_chains_share_a_ring() {
    let (validation, _) = run_chain(|v| {
        let base = v.with(Value::Integer(3));
        base.check_with("small", |n| n.as_int().unwrap() < 10);
        base.check_with("odd", |n| n.as_int().unwrap() % 2 == 1)
    });
    assert_eq!(validation.badges(), ["small", "odd"]);
}

#[test]
fn test_set_then_get_round_trips_through_store() {
    let (_, ring) = run_chain(|v| {
        v.with(Value::Integer(9))
            .set(Path::root().key("saved"))
            .with(Value::None)
            .get(Path::root().key("saved"))
    });
    assert_eq!(ring.value().unwrap(), Value::Integer(9));
}
