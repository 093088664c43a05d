use crate::events::EventKind;
use crate::types::AccountId;
use crate::{Error, EscrowEngine};

fn setup() -> (EscrowEngine, AccountId, AccountId) {
    let engine = EscrowEngine::new();
    (engine, "verifier".into(), "donor".into())
}

fn create_project(engine: &mut EscrowEngine, verifier: &AccountId, amounts: Vec<i128>) -> u64 {
    let descriptions = (0..amounts.len()).map(|i| format!("milestone {i}")).collect();
    engine
        .create_project(
            verifier,
            "ngo".into(),
            amounts,
            descriptions,
            "Test Project".into(),
            "Description".into(),
        )
        .unwrap()
}

#[test]
fn project_created_event_payload() {
    let (mut engine, verifier, _) = setup();
    let id = create_project(&mut engine, &verifier, vec![100, 200]);

    let event = engine.events().last().expect("no events recorded");
    assert_eq!(event.seq, 1);
    assert_eq!(
        event.kind,
        EventKind::ProjectCreated {
            project_id: id,
            creator: verifier,
            total_amount: 300,
        }
    );
}

#[test]
fn project_funded_event_payload() {
    let (mut engine, verifier, donor) = setup();
    let id = create_project(&mut engine, &verifier, vec![100, 200]);
    engine.contribute(&donor, id, 150).unwrap();

    let event = engine.events().last().unwrap();
    assert_eq!(
        event.kind,
        EventKind::ProjectFunded {
            project_id: id,
            contributor: donor,
            amount: 150,
        }
    );
}

#[test]
fn milestone_paid_event_carries_the_amount() {
    let (mut engine, verifier, donor) = setup();
    let id = create_project(&mut engine, &verifier, vec![100, 200]);
    engine.contribute(&donor, id, 300).unwrap();
    engine.verify_milestone(&verifier, id, 0).unwrap();
    engine.pay_milestone(&verifier, id, 0).unwrap();

    let event = engine.events().last().unwrap();
    assert_eq!(
        event.kind,
        EventKind::MilestonePaid {
            project_id: id,
            index: 0,
            amount: 100,
        }
    );
}

#[test]
fn completion_emits_completed_then_awarded() {
    let (mut engine, verifier, donor) = setup();
    let id = create_project(&mut engine, &verifier, vec![100]);
    engine.contribute(&donor, id, 100).unwrap();
    engine.verify_milestone(&verifier, id, 0).unwrap();
    engine.pay_milestone(&verifier, id, 0).unwrap();
    let certificate_id = engine
        .complete_project(&verifier, id, 500, "ipfs://img".into())
        .unwrap();

    let kinds: Vec<&'static str> = engine.events().map(|e| e.kind.as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            "project_created",
            "project_funded",
            "milestone_verified",
            "milestone_paid",
            "project_completed",
            "impact_token_awarded",
        ]
    );

    let awarded = engine.events().last().unwrap();
    assert_eq!(
        awarded.kind,
        EventKind::ImpactTokenAwarded {
            project_id: id,
            certificate_id,
            recipient: "ngo".into(),
        }
    );
}

#[test]
fn failed_operations_append_nothing() {
    let (mut engine, verifier, donor) = setup();
    let id = create_project(&mut engine, &verifier, vec![100]);
    let before = engine.last_event_seq();

    assert!(matches!(
        engine.contribute(&donor, id, 500),
        Err(Error::ContributionExceedsRemaining { .. })
    ));
    assert!(matches!(
        engine.pay_milestone(&verifier, id, 0),
        Err(Error::InvalidStateTransition { .. })
    ));
    assert_eq!(engine.last_event_seq(), before);
}

#[test]
fn per_project_filter_keeps_order() {
    let (mut engine, verifier, donor) = setup();
    let first = create_project(&mut engine, &verifier, vec![100]);
    let second = create_project(&mut engine, &verifier, vec![50]);
    engine.contribute(&donor, second, 25).unwrap();
    engine.contribute(&donor, first, 100).unwrap();
    engine.verify_milestone(&verifier, first, 0).unwrap();

    let seqs: Vec<u64> = engine.events_for_project(first).map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 4, 5]);
    for pair in seqs.windows(2) {
        assert!(pair[0] < pair[1]);
    }

    let second_kinds: Vec<&'static str> = engine
        .events_for_project(second)
        .map(|e| e.kind.as_str())
        .collect();
    assert_eq!(second_kinds, vec!["project_created", "project_funded"]);
}

#[test]
fn cursor_reads_drain_exactly_once() {
    let (mut engine, verifier, donor) = setup();
    let id = create_project(&mut engine, &verifier, vec![100]);

    let batch = engine.events_since(0);
    assert_eq!(batch.len(), 1);
    let cursor = batch.last().unwrap().seq;

    engine.contribute(&donor, id, 100).unwrap();
    engine.verify_milestone(&verifier, id, 0).unwrap();

    let batch = engine.events_since(cursor);
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].seq, cursor + 1);

    assert!(engine.events_since(engine.last_event_seq()).is_empty());
    // A cursor past the end is tolerated.
    assert!(engine.events_since(1_000).is_empty());
}

#[test]
fn event_payloads_serialize_for_observers() {
    let (mut engine, verifier, _) = setup();
    create_project(&mut engine, &verifier, vec![100]);

    let event = engine.events().next().unwrap();
    let json = serde_json::to_value(event).unwrap();
    assert_eq!(json["seq"], 1);
    assert_eq!(json["kind"]["type"], "project_created");
    assert_eq!(json["kind"]["creator"], "verifier");
}
