use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nexstage_core::reactor::{GateVerdict, ModuleOutcome, ReactorGate};
use nexstage_util::errors::NexstageError;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_last_module_in_reactor_order() {
    let gate = ReactorGate::new(names(&["api", "core", "app"]));
    assert!(gate.is_last("app"));
    assert!(!gate.is_last("api"));
    assert!(!gate.is_last("unknown"));
}

#[test]
fn test_last_participant_skips_non_participants() {
    let gate = ReactorGate::with_participants(
        names(&["api", "core", "docs"]),
        names(&["api", "core"]),
    );
    assert!(gate.is_last("core"));
    assert!(!gate.is_last("docs"));
}

#[test]
fn test_empty_reactor_has_no_last_module() {
    let gate = ReactorGate::new(Vec::new());
    assert!(!gate.is_last("anything"));
}

#[test]
fn test_sequential_build_proceeds_immediately() {
    let gate = ReactorGate::new(names(&["a", "b"]));
    gate.record("a", ModuleOutcome::Success).unwrap();
    gate.record("b", ModuleOutcome::Success).unwrap();
    let verdict = gate.await_others("b", Duration::from_millis(10)).unwrap();
    assert_eq!(verdict, GateVerdict::Proceed);
}

#[test]
fn test_earlier_failure_is_reported() {
    let gate = ReactorGate::new(names(&["a", "b", "c"]));
    gate.record("a", ModuleOutcome::Failure).unwrap();
    gate.record("b", ModuleOutcome::Success).unwrap();
    let verdict = gate.await_others("c", Duration::from_millis(10)).unwrap();
    assert_eq!(verdict, GateVerdict::EarlierFailures(names(&["a"])));
}

#[test]
fn test_failure_detection_can_be_disabled() {
    let gate = ReactorGate::new(names(&["a", "b"])).detect_build_failures(false);
    gate.record("a", ModuleOutcome::Failure).unwrap();
    let verdict = gate.await_others("b", Duration::from_millis(10)).unwrap();
    assert_eq!(verdict, GateVerdict::Proceed);
}

#[test]
fn test_waits_for_parallel_siblings() {
    let gate = Arc::new(ReactorGate::new(names(&["a", "b", "c"])));

    let workers: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|name| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                gate.record(name, ModuleOutcome::Success).unwrap();
            })
        })
        .collect();

    let verdict = gate.await_others("c", Duration::from_secs(10)).unwrap();
    assert_eq!(verdict, GateVerdict::Proceed);
    for w in workers {
        w.join().unwrap();
    }
}

#[test]
fn test_times_out_with_pending_module_names() {
    let gate = ReactorGate::new(names(&["a", "slow", "c"]));
    gate.record("a", ModuleOutcome::Success).unwrap();
    let err = gate.await_others("c", Duration::from_millis(50)).unwrap_err();
    match err {
        NexstageError::Reactor { message } => assert!(message.contains("slow"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_recording_unknown_module_fails() {
    let gate = ReactorGate::new(names(&["a"]));
    assert!(gate.record("b", ModuleOutcome::Success).is_err());
}
