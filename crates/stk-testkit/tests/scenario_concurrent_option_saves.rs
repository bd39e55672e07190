//! Scenario: writes to different options may overlap; one per option
//!
//! # Invariant under test
//! Targeted saves of different options can be in flight together and resolve
//! in any order without clobbering each other's optimistic values. An option
//! already carried by an in-flight write cannot be planned again until that
//! write resolves.

use stk_backend::BackendError;
use stk_controller::{Phase, SaveOutcome, SaveRejected};
use stk_testkit::{option_level_item, session_for};

#[tokio::test]
async fn different_options_resolve_out_of_order() {
    let (backend, mut session) = session_for(option_level_item(&[("small", 4), ("large", 6)]));

    session.set_quantity("small", 3).unwrap();
    session.set_quantity("large", 9).unwrap();
    let small_plan = session.begin_save_option("small", None).unwrap();
    let large_plan = session.begin_save_option("large", None).unwrap();
    assert_eq!(session.phase(), Phase::Saving);

    // Large resolves first; small's optimistic value must survive the
    // server group that comes back with it.
    let large_result = large_plan.dispatch(backend.as_ref()).await;
    assert!(session.finish_save(large_plan, large_result).is_committed());
    assert_eq!(session.phase(), Phase::Saving);
    let group = session.tracked_group().unwrap();
    assert_eq!(group.option("small").unwrap().stock_quantity, 3);
    assert_eq!(group.option("large").unwrap().stock_quantity, 9);
    assert!(session.edit("small").unwrap().loading);

    let small_result = small_plan.dispatch(backend.as_ref()).await;
    assert!(session.finish_save(small_plan, small_result).is_committed());
    assert_eq!(session.phase(), Phase::Committed);
    assert!(!session.edits().has_changes());
}

#[tokio::test]
async fn busy_option_cannot_be_planned_twice() {
    let (_backend, mut session) = session_for(option_level_item(&[("small", 4), ("large", 6)]));

    session.set_quantity("small", 3).unwrap();
    let _in_flight = session.begin_save_option("small", None).unwrap();

    session.set_quantity("small", 2).unwrap();
    assert_eq!(
        session.begin_save_option("small", None).unwrap_err(),
        SaveRejected::OptionBusy {
            option_id: "small".to_string()
        }
    );
    session.set_quantity("large", 7).unwrap();
    assert_eq!(
        session.begin_save(None).unwrap_err(),
        SaveRejected::OptionBusy {
            option_id: "small".to_string()
        }
    );
    // Other options remain saveable on their own.
    assert!(session.begin_save_option("large", None).is_ok());
}

#[tokio::test]
async fn one_failure_does_not_roll_back_the_other_write() {
    let (backend, mut session) = session_for(option_level_item(&[("small", 4), ("large", 6)]));

    session.set_quantity("small", 3).unwrap();
    session.set_quantity("large", 9).unwrap();
    let small_plan = session.begin_save_option("small", None).unwrap();
    let large_plan = session.begin_save_option("large", None).unwrap();

    let outcome = session.finish_save(
        small_plan,
        Err(BackendError::Api {
            status: 500,
            message: "boom".to_string(),
        }),
    );
    assert!(matches!(outcome, SaveOutcome::RolledBack { .. }));
    // Still waiting on large.
    assert_eq!(session.phase(), Phase::Saving);
    assert_eq!(
        session.tracked_group().unwrap().option("small").unwrap().stock_quantity,
        4
    );
    assert_eq!(
        session.tracked_group().unwrap().option("large").unwrap().stock_quantity,
        9
    );

    let result = large_plan.dispatch(backend.as_ref()).await;
    assert!(session.finish_save(large_plan, result).is_committed());
    assert_eq!(session.phase(), Phase::Committed);
    assert!(session.edit("small").unwrap().changed);
    assert!(!session.edit("large").unwrap().changed);
}
