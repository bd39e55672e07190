//! stk-controller
//!
//! Reconciliation controller: the stateful half of option-level stock
//! reconciliation. One [`InventorySession`] per open editor, with the backend
//! injected. The session is the only layer that performs I/O; the distributor
//! and validator it calls are pure.
//!
//! Saves are two-phase so writes to different options can be in flight at
//! once: [`InventorySession::begin_save`] → [`SavePlan::dispatch`] →
//! [`InventorySession::finish_save`]. [`InventorySession::save`] composes the
//! three for the common case.

mod edit;
mod event;
mod plan;
mod session;

pub use edit::{EditSet, OptionEdit};
pub use event::{Phase, SaveRejected, SessionError, SessionEvent, WriteFailure};
pub use plan::{PlannedWrite, SaveOutcome, SavePlan};
pub use session::{AdjustOutcome, InventorySession};
