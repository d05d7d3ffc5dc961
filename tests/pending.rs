#![cfg(feature = "json")]

use serde_json::{Value, json};
use txlog::{
    TransactionError, TransactionService, TransactionType, event::RecordingObserver,
    json::KeyField, transaction,
};

type Service = TransactionService<u32, Value>;

fn row(id: u32) -> Value {
    json!({ "id": id, "name": "A", "age": 30 })
}

#[test]
fn discarded_session_leaves_no_trace() {
    let mut service = Service::default();
    service
        .add(transaction!(UPDATE 1, json!({ "name": "B" })), Some(row(1)))
        .unwrap();
    let log: Vec<_> = service.transaction_log().cloned().collect();
    let state = service.state(&1).cloned();

    service.start_pending();
    service
        .add(transaction!(UPDATE 1, json!({ "age": 31 })), Some(row(1)))
        .unwrap();
    service.add(transaction!(DELETE 2), Some(row(2))).unwrap();
    service.end_pending(false);

    assert!(!service.is_pending());
    assert_eq!(service.transaction_log().cloned().collect::<Vec<_>>(), log);
    assert_eq!(service.state(&1).cloned(), state);
    assert!(service.state(&2).is_none());
}

#[test]
fn committed_session_matches_direct_adds() {
    let mut pending = Service::default();
    pending.start_pending();
    pending
        .add(transaction!(UPDATE 1, json!({ "name": "B" })), Some(row(1)))
        .unwrap();
    pending.end_pending(true);

    let mut direct = Service::default();
    direct
        .add(transaction!(UPDATE 1, json!({ "name": "B" })), Some(row(1)))
        .unwrap();

    assert_eq!(pending.state(&1), direct.state(&1));
    assert_eq!(
        pending.aggregated_state(true),
        direct.aggregated_state(true)
    );
}

#[test]
fn committed_session_is_one_undo_step() {
    let mut service = Service::default();
    service.add(transaction!(ADD 9, json!({ "id": 9 })), None).unwrap();

    service.start_pending();
    service
        .add(transaction!(UPDATE 1, json!({ "name": "B" })), Some(row(1)))
        .unwrap();
    service
        .add(transaction!(UPDATE 1, json!({ "age": 31 })), Some(row(1)))
        .unwrap();
    service.add(transaction!(DELETE 2), Some(row(2))).unwrap();
    service.end_pending(true);

    // one synthesized transaction per identity
    assert_eq!(
        service
            .transaction_log()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        ["ADD 9", "UPDATE 1", "DELETE 2"]
    );
    assert_eq!(
        service.aggregated_value(&1, true),
        Some(json!({ "id": 1, "name": "B", "age": 31 }))
    );

    assert!(service.undo());
    assert!(service.state(&1).is_none());
    assert!(service.state(&2).is_none());
    assert!(service.state(&9).is_some());

    assert!(service.redo());
    assert_eq!(service.state(&2).unwrap().kind, TransactionType::Delete);
}

#[test]
fn reads_during_a_session() {
    let mut service = Service::default();
    service
        .add(transaction!(UPDATE 1, json!({ "name": "B" })), Some(row(1)))
        .unwrap();

    service.start_pending();
    service
        .add(transaction!(UPDATE 1, json!({ "age": 31 })), Some(row(1)))
        .unwrap();

    // the outer state is untouched, the preview includes both layers
    assert_eq!(
        service.state(&1).unwrap().value,
        Some(json!({ "name": "B" }))
    );
    assert_eq!(
        service.pending_state(&1).unwrap().value,
        Some(json!({ "age": 31 }))
    );
    assert_eq!(
        service.aggregated_value(&1, true),
        Some(json!({ "id": 1, "name": "B", "age": 31 }))
    );
    assert_eq!(service.aggregated_state(true).len(), 1);
    assert_eq!(service.transaction_log().count(), 1);
}

#[test]
fn history_and_commit_are_blocked_while_pending() {
    let mut service = Service::default();
    service.add(transaction!(ADD 1, json!({ "id": 1 })), None).unwrap();
    service.undo();

    service.start_pending();
    assert!(!service.can_undo());
    assert!(!service.can_redo());
    assert!(!service.redo());
    assert_eq!(
        service.commit(&mut Vec::new(), KeyField("id")),
        Err(TransactionError::PendingSession)
    );

    service.end_pending(false);
    assert!(service.redo());
}

#[test]
fn starting_twice_keeps_the_session() {
    let mut service = Service::default();
    service.start_pending();
    service.add(transaction!(ADD 1, json!({ "id": 1 })), None).unwrap();
    service.start_pending();
    assert!(service.pending_state(&1).is_some());

    service.end_pending(true);
    service.end_pending(true);
    assert_eq!(service.transaction_log().count(), 1);
}

#[test]
fn cancelled_session_changes_produce_no_step() {
    let mut service = Service::default();
    let recorder = RecordingObserver::new();
    service.on_state_update(recorder.clone());

    service.start_pending();
    service.add(transaction!(ADD 1, json!({ "id": 1 })), None).unwrap();
    service.add(transaction!(DELETE 1), None).unwrap();
    service.end_pending(true);

    assert!(!service.can_undo());
    assert!(recorder.changes_seen().is_empty());
}

#[test]
fn only_session_end_is_observed() {
    let mut service = Service::default();
    let recorder = RecordingObserver::new();
    service.on_state_update(recorder.clone());

    service.start_pending();
    service
        .add(transaction!(UPDATE 1, json!({ "name": "B" })), Some(row(1)))
        .unwrap();
    service.add(transaction!(ADD 2, json!({ "id": 2 })), None).unwrap();
    assert!(recorder.changes_seen().is_empty());
    service.end_pending(true);

    insta::assert_snapshot!(recorder.changes_seen().join("\n"), @"end-pending: [UPDATE 1, ADD 2]");
}

#[test]
fn cancelled_session_changes_remove_outer_state() {
    let mut pending = Service::default();
    let mut direct = Service::default();
    for service in [&mut pending, &mut direct] {
        service
            .add(transaction!(UPDATE 1, json!({ "a": 5 })), Some(row(1)))
            .unwrap();
    }

    pending.start_pending();
    for service in [&mut pending, &mut direct] {
        service.add(transaction!(ADD 1, json!({ "id": 1 })), None).unwrap();
        service.add(transaction!(DELETE 1), None).unwrap();
    }
    assert_eq!(pending.aggregated_value(&1, true), None);
    pending.end_pending(true);

    assert!(direct.state(&1).is_none());
    assert!(pending.state(&1).is_none());
    assert!(pending.aggregated_state(true).is_empty());

    assert!(pending.undo());
    assert_eq!(
        pending.aggregated_value(&1, true),
        Some(json!({ "id": 1, "name": "A", "age": 30, "a": 5 }))
    );
}
