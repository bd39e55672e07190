//! Scenario: closing the session discards late results
//!
//! # Invariant under test
//! Closing does not cancel a write already issued; it runs to completion on
//! the backend. Its result is discarded: neither commit nor rollback touches
//! the session, and a `Discarded` event is recorded.

use std::sync::Arc;

use stk_backend::BackendError;
use stk_controller::{InventorySession, Phase, SaveOutcome, SessionEvent};
use stk_reconcile::ValidationLimits;
use stk_testkit::{option_level_item, session_for, ITEM_ID};

#[tokio::test]
async fn late_success_after_close_is_discarded() {
    let (backend, mut session) = session_for(option_level_item(&[("small", 4), ("large", 6)]));

    session.set_quantity("small", 2).unwrap();
    let plan = session.begin_save(None).unwrap();
    session.close();

    let result = plan.dispatch(backend.as_ref()).await;
    assert!(result.is_ok(), "the write itself still completes");
    assert_eq!(session.finish_save(plan, result), SaveOutcome::Discarded);

    assert_eq!(session.phase(), Phase::Closed);
    assert_eq!(
        session.events().last(),
        Some(&SessionEvent::Discarded {
            option_ids: vec!["small".to_string()]
        })
    );
    // Server applied it; the closed session did not move its baseline.
    assert_eq!(
        backend.inner().snapshot(ITEM_ID).await.unwrap().option_groups[0]
            .option("small")
            .unwrap()
            .stock_quantity,
        2
    );
    assert_eq!(session.edit("small").unwrap().original, 4);
}

#[tokio::test]
async fn late_failure_after_close_is_discarded() {
    let (_backend, mut session) = session_for(option_level_item(&[("small", 4), ("large", 6)]));

    session.set_quantity("small", 2).unwrap();
    let plan = session.begin_save(None).unwrap();
    session.close();

    let outcome = session.finish_save(
        plan,
        Err(BackendError::Transport("connection reset".to_string())),
    );
    assert_eq!(outcome, SaveOutcome::Discarded);
    assert!(session.edit("small").unwrap().error.is_none());
}

#[tokio::test]
async fn plan_from_another_session_is_discarded() {
    let item = option_level_item(&[("small", 4), ("large", 6)]);
    let (backend, mut first) = session_for(item.clone());
    let mut second =
        InventorySession::from_snapshot(Arc::clone(&backend), item, ValidationLimits::default());

    first.set_quantity("small", 3).unwrap();
    let plan = first.begin_save(None).unwrap();
    let result = plan.dispatch(backend.as_ref()).await;

    assert_eq!(second.finish_save(plan, result), SaveOutcome::Discarded);
    assert_eq!(second.edit("small").unwrap().original, 4);
}

#[tokio::test]
async fn closed_session_refuses_further_work() {
    let (backend, mut session) = session_for(option_level_item(&[("small", 4), ("large", 6)]));
    session.close();

    assert!(session.set_quantity("small", 1).is_err());
    assert!(session.refresh().await.is_err());
    assert!(session.adjust_item_stock(20, None).await.is_err());
    assert!(backend.calls().await.is_empty());
}
