use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, TransactionTrait};
use tokio::sync::broadcast::error::TryRecvError;

use engine::{
    Actor, CreateTargetCmd, Engine, EngineError, EventBus, LedgerEvent, LedgerEventKind, Money,
    Percent, ProgressStatus, ReportProgressCmd, ReviewDecision, ShareFundCmd, SubmitProgressCmd,
    TargetPatch, TargetStatus, TargetView,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn connect() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn engine_with_db() -> Engine {
    Engine::builder()
        .database(connect().await)
        .build()
        .await
        .unwrap()
}

async fn engine_with_bus() -> (Engine, EventBus) {
    let bus = EventBus::default();
    let engine = Engine::builder()
        .database(connect().await)
        .publisher(Arc::new(bus.clone()))
        .build()
        .await
        .unwrap();
    (engine, bus)
}

fn admin() -> Actor {
    Actor::admin("boss")
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

async fn create_target(engine: &Engine, user: &str, amount: i64) -> TargetView {
    engine
        .create_target(&admin(), CreateTargetCmd::new(user, Money::units(amount), day(1)))
        .await
        .unwrap()
}

async fn approve(engine: &Engine, target_id: Uuid, amount: i64) -> TargetView {
    let entry = engine
        .submit_progress(
            &admin(),
            SubmitProgressCmd::new(target_id, Money::units(amount), day(5), "reporter"),
        )
        .await
        .unwrap();
    engine
        .review_progress(&admin(), entry.id, ReviewDecision::Approved)
        .await
        .unwrap()
        .target
}

/// Alice: target 1000 with 400 approved. Bob: target 500, nothing yet.
async fn alice_and_bob(engine: &Engine) -> (TargetView, TargetView) {
    let alice = create_target(engine, "alice", 1000).await;
    let alice = approve(engine, alice.target.id, 400).await;
    let bob = create_target(engine, "bob", 500).await;
    (alice, bob)
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<LedgerEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => names.push(event.name()),
            Err(TryRecvError::Empty) => return names,
            Err(err) => panic!("unexpected receive error: {err}"),
        }
    }
}

#[tokio::test]
async fn approved_progress_drives_net_amount() {
    let engine = engine_with_db().await;
    let created = create_target(&engine, "alice", 1000).await;
    assert_eq!(created.target.status, TargetStatus::Active);
    assert_eq!(created.view.net_amount, Money::ZERO);

    let view = approve(&engine, created.target.id, 400).await.view;
    assert_eq!(view.net_amount, Money::units(400));
    assert_eq!(view.progress_percentage, Percent::from_hundredths(40_00));
    assert_eq!(view.remaining_amount, Money::units(600));
    assert_eq!(view.progress_percentage.to_string(), "40.00");
}

#[tokio::test]
async fn pending_and_rejected_progress_do_not_count() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;

    let pending = engine
        .submit_progress(
            &admin(),
            SubmitProgressCmd::new(target.id, Money::units(300), day(2), "alice"),
        )
        .await
        .unwrap();
    assert_eq!(pending.status, ProgressStatus::Pending);
    assert_eq!(engine.target(target.id).await.unwrap().view.net_amount, Money::ZERO);

    let rejected = engine
        .review_progress(&admin(), pending.id, ReviewDecision::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.entry.status, ProgressStatus::Rejected);
    assert_eq!(rejected.entry.approved_by.as_deref(), Some("boss"));
    assert!(rejected.entry.approved_at.is_some());
    assert_eq!(rejected.target.view.total_progress, Money::ZERO);
}

#[tokio::test]
async fn decided_entries_cannot_be_reviewed_again() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;
    let entry = engine
        .submit_progress(
            &admin(),
            SubmitProgressCmd::new(target.id, Money::units(100), day(2), "alice"),
        )
        .await
        .unwrap();

    engine
        .review_progress(&admin(), entry.id, ReviewDecision::Approved)
        .await
        .unwrap();
    let err = engine
        .review_progress(&admin(), entry.id, ReviewDecision::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::State(_)));

    let entries = engine.list_progress(target.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, ProgressStatus::Approved);
}

#[tokio::test]
async fn progress_may_exceed_target() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 100).await.target;
    let view = approve(&engine, target.id, 250).await.view;

    assert_eq!(view.progress_percentage, Percent::from_hundredths(250_00));
    assert_eq!(view.remaining_amount, Money::ZERO);
}

#[tokio::test]
async fn sharing_moves_credit_between_users() {
    let engine = engine_with_db().await;
    alice_and_bob(&engine).await;

    let outcome = engine
        .share_fund(
            &Actor::employee("alice"),
            ShareFundCmd::new("alice", "bob", Money::units(150)).reason("helped close a deal"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.sender.view.shared_out, Money::units(150));
    assert_eq!(outcome.sender.view.net_amount, Money::units(250));
    assert_eq!(outcome.receiver.view.shared_in, Money::units(150));
    assert_eq!(outcome.receiver.view.net_amount, Money::units(150));
    assert_eq!(
        outcome.receiver.view.progress_percentage,
        Percent::from_hundredths(30_00)
    );
    assert_eq!(outcome.share.reason.as_deref(), Some("helped close a deal"));

    // read-after-write
    let alice = engine.balance("alice").await.unwrap();
    assert_eq!(alice.view, outcome.sender.view);
}

#[tokio::test]
async fn reversal_restores_both_balances() {
    let engine = engine_with_db().await;
    alice_and_bob(&engine).await;
    let alice_before = engine.balance("alice").await.unwrap().view;
    let bob_before = engine.balance("bob").await.unwrap().view;

    let share = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", Money::units(150)))
        .await
        .unwrap()
        .share;
    let reversed = engine
        .reverse_fund(&admin(), share.id, Some("entered twice"))
        .await
        .unwrap();

    assert_eq!(reversed.sender.view.net_amount, Money::units(400));
    assert_eq!(reversed.receiver.view.net_amount, Money::ZERO);
    assert_eq!(reversed.sender.view, alice_before);
    assert_eq!(reversed.receiver.view, bob_before);
    assert_eq!(reversed.share.reversed_by.as_deref(), Some("boss"));
    assert_eq!(reversed.share.reversal_reason.as_deref(), Some("entered twice"));
    assert!(reversed.share.reversed_at.is_some());
}

#[tokio::test]
async fn share_cannot_be_reversed_twice() {
    let engine = engine_with_db().await;
    alice_and_bob(&engine).await;
    let share = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", Money::units(50)))
        .await
        .unwrap()
        .share;

    engine.reverse_fund(&admin(), share.id, None).await.unwrap();
    let err = engine.reverse_fund(&admin(), share.id, None).await.unwrap_err();
    assert!(matches!(err, EngineError::State(_)));

    let listed = engine.list_fund_shares("alice", false).await.unwrap();
    assert!(listed.is_empty());
    let listed = engine.list_fund_shares("alice", true).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn share_over_available_balance_is_refused() {
    let engine = engine_with_db().await;
    alice_and_bob(&engine).await;
    engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", Money::units(150)))
        .await
        .unwrap();

    let err = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", Money::units(500)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientBalance {
            available: Money::units(100),
            requested: Money::units(500),
        }
    );
    assert_eq!(
        engine.balance("alice").await.unwrap().view.shared_out,
        Money::units(150)
    );
}

#[tokio::test]
async fn invalid_shares_are_rejected() {
    let engine = engine_with_db().await;
    alice_and_bob(&engine).await;

    let err = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "alice", Money::units(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", Money::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .share_fund(&admin(), ShareFundCmd::new("nobody", "bob", Money::units(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .share_fund(
            &Actor::employee("bob"),
            ShareFundCmd::new("alice", "bob", Money::units(10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn receiver_without_target_still_gets_the_share() {
    let engine = engine_with_db().await;
    alice_and_bob(&engine).await;

    let outcome = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "carol", Money::units(40)))
        .await
        .unwrap();
    assert!(outcome.receiver.target.is_none());
    assert_eq!(outcome.receiver.view.shared_in, Money::units(40));
    assert_eq!(outcome.receiver.view.progress_percentage, Percent::ZERO);

    let carol = create_target(&engine, "carol", 200).await;
    assert_eq!(carol.view.shared_in, Money::units(40));
    assert_eq!(carol.view.net_amount, Money::units(40));
}

#[tokio::test]
async fn concurrent_shares_never_overdraft() {
    let engine = Arc::new(engine_with_db().await);
    alice_and_bob(&engine).await;

    let handles: Vec<_> = ["bob", "carol", "dave", "erin"]
        .into_iter()
        .map(|to| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .share_fund(&admin(), ShareFundCmd::new("alice", to, Money::units(150)))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(EngineError::InsufficientBalance { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // 400 available before the first share, 100 after it.
    assert_eq!(succeeded, 1);
    let alice = engine.balance("alice").await.unwrap().view;
    assert_eq!(alice.shared_out, Money::units(150));
    assert_eq!(alice.net_amount, Money::units(250));
}

#[tokio::test]
async fn second_open_target_conflicts() {
    let engine = engine_with_db().await;
    create_target(&engine, "alice", 1000).await;

    let err = engine
        .create_target(&admin(), CreateTargetCmd::new("alice", Money::units(10), day(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert_eq!(engine.list_targets("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_target_frees_the_slot() {
    let engine = engine_with_db().await;
    let first = create_target(&engine, "alice", 1000).await.target;

    engine
        .edit_target(
            &admin(),
            first.id,
            TargetPatch::default().status(TargetStatus::Cancelled),
        )
        .await
        .unwrap();
    let second = engine
        .create_target(&admin(), CreateTargetCmd::new("alice", Money::units(500), day(10)))
        .await
        .unwrap();

    let current = engine.current_target("alice").await.unwrap().unwrap();
    assert_eq!(current.target.id, second.target.id);

    let err = engine
        .edit_target(
            &admin(),
            first.id,
            TargetPatch::default().status(TargetStatus::Active),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::State(_)));
}

#[tokio::test]
async fn extend_requires_reached_target() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;
    approve(&engine, target.id, 600).await;

    let err = engine
        .extend_target(&admin(), target.id, Money::units(500), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::State(_)));
}

#[tokio::test]
async fn extend_raises_amount_and_marks_extended() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;
    approve(&engine, target.id, 1000).await;

    let extended = engine
        .extend_target(&admin(), target.id, Money::units(500), Some(day(31)))
        .await
        .unwrap();
    assert_eq!(extended.target.status, TargetStatus::Extended);
    assert_eq!(extended.target.target_amount, Money::units(1500));
    assert_eq!(extended.target.period_end, Some(day(31)));
    assert_eq!(extended.view.progress_percentage, Percent::from_hundredths(66_67));

    let err = engine
        .extend_target(&admin(), target.id, Money::ZERO, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn employees_edit_only_their_own_notes_and_category() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;
    let alice = Actor::employee("alice");

    let edited = engine
        .edit_target(
            &alice,
            target.id,
            TargetPatch::default()
                .notes(Some("Q1 push".to_string()))
                .category(Some("Cross Sell".to_string())),
        )
        .await
        .unwrap();
    assert_eq!(edited.target.notes.as_deref(), Some("Q1 push"));
    assert_eq!(edited.target.category.as_deref(), Some("cross_sell"));

    let err = engine
        .edit_target(
            &alice,
            target.id,
            TargetPatch::default().target_amount(Money::units(10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .edit_target(
            &Actor::employee("bob"),
            target.id,
            TargetPatch::default().notes(None),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .create_target(&alice, CreateTargetCmd::new("alice", Money::units(10), day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn edit_rejects_inverted_period() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;

    let err = engine
        .edit_target(
            &admin(),
            target.id,
            TargetPatch::default().period_end(Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .edit_target(&admin(), target.id, TargetPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn delete_removes_progress_but_keeps_shares() {
    let engine = engine_with_db().await;
    let (alice, _bob) = alice_and_bob(&engine).await;
    engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", Money::units(100)))
        .await
        .unwrap();

    let err = engine
        .delete_target(&Actor::employee("alice"), alice.target.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_target(&admin(), alice.target.id).await.unwrap();

    let err = engine.target(alice.target.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    let err = engine.list_progress(alice.target.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let balance = engine.balance("alice").await.unwrap();
    assert!(balance.target.is_none());
    assert_eq!(balance.view.total_progress, Money::ZERO);
    assert_eq!(balance.view.shared_out, Money::units(100));
    assert_eq!(
        engine.balance("bob").await.unwrap().view.shared_in,
        Money::units(100)
    );
}

#[tokio::test]
async fn report_hook_records_approved_progress() {
    let (engine, bus) = engine_with_bus().await;

    let err = engine
        .record_report_progress(
            &admin(),
            ReportProgressCmd::new("alice", Money::units(10), day(3), "report-bot"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::State(_)));

    create_target(&engine, "alice", 1000).await;
    let mut rx = bus.subscribe();
    let outcome = engine
        .record_report_progress(
            &admin(),
            ReportProgressCmd::new("alice", Money::units(250), day(3), "report-bot")
                .category("Upsell"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.entry.status, ProgressStatus::Approved);
    assert_eq!(outcome.entry.approved_by.as_deref(), Some("report-bot"));
    assert_eq!(outcome.target.view.net_amount, Money::units(250));
    assert_eq!(
        drain(&mut rx),
        vec!["target_progress_created", "target_progress_updated"]
    );
}

#[tokio::test]
async fn events_follow_each_commit() {
    let (engine, bus) = engine_with_bus().await;
    let mut rx = bus.subscribe();

    let (alice, _bob) = alice_and_bob(&engine).await;
    assert_eq!(
        drain(&mut rx),
        vec![
            "target_created",
            "target_progress_created",
            "target_progress_updated",
            "target_created",
        ]
    );

    let share = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", Money::units(150)))
        .await
        .unwrap()
        .share;
    let event = rx.try_recv().unwrap();
    match event.kind {
        LedgerEventKind::FundShared {
            fund_share_id,
            amount,
            ..
        } => {
            assert_eq!(fund_share_id, share.id);
            assert_eq!(amount, Money::units(150));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    engine.reverse_fund(&admin(), share.id, None).await.unwrap();
    engine.delete_target(&admin(), alice.target.id).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec!["fund_reversed", "target_updated", "target_deleted"]
    );

    // failed operations publish nothing
    let _ = engine
        .share_fund(&admin(), ShareFundCmd::new("bob", "bob", Money::units(1)))
        .await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn progress_updated_event_carries_derived_values() {
    let (engine, bus) = engine_with_bus().await;
    let target = create_target(&engine, "alice", 1000).await.target;
    let mut rx = bus.subscribe();

    approve(&engine, target.id, 400).await;
    let _created = rx.try_recv().unwrap();
    let updated = rx.try_recv().unwrap();

    let json = serde_json::to_value(&updated).unwrap();
    assert_eq!(json["event"], "target_progress_updated");
    assert_eq!(json["action"], "approved");
    assert_eq!(json["status"], "approved");
    assert_eq!(json["total_progress"], "400.00");
    assert_eq!(json["net_amount"], "400.00");
    assert_eq!(json["progress_percentage"], "40.00");
    assert_eq!(json["remaining_amount"], "600.00");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let engine = engine_with_db().await;
    let missing = Uuid::new_v4();

    assert!(matches!(
        engine.target(missing).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        engine
            .review_progress(&admin(), missing, ReviewDecision::Approved)
            .await
            .unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        engine.reverse_fund(&admin(), missing, None).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(engine.current_target("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn amounts_past_the_ceiling_are_refused() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;
    let huge: Money = "90000000000000000.00".parse().unwrap();

    let err = engine
        .submit_progress(&admin(), SubmitProgressCmd::new(target.id, huge, day(2), "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_target(&admin(), CreateTargetCmd::new("bob", huge, day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .share_fund(&admin(), ShareFundCmd::new("alice", "bob", huge))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Many entries at the ceiling still sum and stay readable.
    for _ in 0..3 {
        let entry = engine
            .submit_progress(
                &admin(),
                SubmitProgressCmd::new(target.id, Money::MAX_AMOUNT, day(2), "alice"),
            )
            .await
            .unwrap();
        engine
            .review_progress(&admin(), entry.id, ReviewDecision::Approved)
            .await
            .unwrap();
    }
    let view = engine.target(target.id).await.unwrap().view;
    assert_eq!(view.total_progress.cents(), Money::MAX_AMOUNT.cents() * 3);
    assert_eq!(view.remaining_amount, Money::ZERO);
}

#[tokio::test]
async fn extension_past_the_ceiling_is_refused() {
    let engine = engine_with_db().await;
    let target = engine
        .create_target(&admin(), CreateTargetCmd::new("alice", Money::MAX_AMOUNT, day(1)))
        .await
        .unwrap()
        .target;
    engine
        .record_report_progress(
            &admin(),
            ReportProgressCmd::new("alice", Money::MAX_AMOUNT, day(2), "report-hook"),
        )
        .await
        .unwrap();

    let err = engine
        .extend_target(&admin(), target.id, Money::units(1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    let target = engine.target(target.id).await.unwrap().target;
    assert_eq!(target.status, TargetStatus::Active);
    assert_eq!(target.target_amount, Money::MAX_AMOUNT);
}

#[tokio::test]
async fn employees_attribute_progress_only_to_themselves() {
    let engine = engine_with_db().await;
    let target = create_target(&engine, "alice", 1000).await.target;
    let alice = Actor::employee("alice");

    let err = engine
        .submit_progress(
            &alice,
            SubmitProgressCmd::new(target.id, Money::units(10), day(2), "report-hook"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let entry = engine
        .submit_progress(
            &alice,
            SubmitProgressCmd::new(target.id, Money::units(10), day(2), "alice"),
        )
        .await
        .unwrap();
    assert_eq!(entry.source_user_id, "alice");
    assert_eq!(engine.list_progress(target.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn exceeded_deadline_is_a_conflict_and_commits_nothing() {
    let db = connect().await;
    let engine = Engine::builder()
        .database(db.clone())
        .tx_timeout(Duration::from_millis(50))
        .build()
        .await
        .unwrap();

    // Hold a write transaction so the engine's attempt cannot finish in time.
    let blocker = db.begin().await.unwrap();
    blocker.execute_unprepared("DELETE FROM targets").await.unwrap();

    let err = engine
        .create_target(&admin(), CreateTargetCmd::new("alice", Money::units(100), day(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    blocker.rollback().await.unwrap();
    assert!(engine.list_targets("alice").await.unwrap().is_empty());
    assert!(engine.current_target("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn racing_reviewers_decide_an_entry_once() {
    let db = connect().await;
    // Separate engines share no lock registry; only the conditional update
    // keeps the decision single.
    let first = Arc::new(Engine::builder().database(db.clone()).build().await.unwrap());
    let second = Arc::new(Engine::builder().database(db).build().await.unwrap());
    let target = create_target(&first, "alice", 1000).await.target;
    let entry = first
        .submit_progress(
            &admin(),
            SubmitProgressCmd::new(target.id, Money::units(100), day(2), "alice"),
        )
        .await
        .unwrap();
    let entry_id = entry.id;

    let handles: Vec<_> = [
        (first, ReviewDecision::Approved),
        (Arc::clone(&second), ReviewDecision::Rejected),
    ]
    .into_iter()
    .map(|(engine, decision)| {
        tokio::spawn(async move { engine.review_progress(&admin(), entry_id, decision).await })
    })
    .collect();

    let mut decided = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => decided.push(outcome.entry.status),
            Err(EngineError::State(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(decided.len(), 1);

    let entries = second.list_progress(target.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, decided[0]);
}

#[tokio::test]
async fn concurrent_creates_open_one_target() {
    let engine = Arc::new(engine_with_db().await);

    let handles: Vec<_> = [1000, 2000]
        .into_iter()
        .map(|amount| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .create_target(
                        &admin(),
                        CreateTargetCmd::new("alice", Money::units(amount), day(1)),
                    )
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(EngineError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(engine.list_targets("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn builder_requires_a_database() {
    let err = Engine::builder().build().await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
