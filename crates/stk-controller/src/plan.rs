//! Save plans.
//!
//! A [`SavePlan`] can only be produced by a session that passed the save gate,
//! and it already holds the revert snapshots for the options it writes.
//! Fields are private, so a plan cannot be forged to skip validation.

use stk_backend::{BackendError, InventoryBackend};
use stk_schemas::{OptionBulkWrite, OptionSingleWrite, OptionSnapshot, OptionWriteResponse, QuantityMap};
use uuid::Uuid;

/// The backend call a plan will make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedWrite {
    /// Exactly one option changed.
    Single { option_id: String, quantity: i64 },
    /// Two or more changed. Carries only the changed options.
    Bulk { quantities: QuantityMap },
}

#[derive(Debug, Clone)]
pub struct SavePlan {
    pub(crate) session_id: Uuid,
    pub(crate) seq: u64,
    pub(crate) group_id: String,
    pub(crate) write: PlannedWrite,
    pub(crate) reason: String,
    pub(crate) reason_required: bool,
    /// Pre-edit snapshots of every option in `write`, restored on failure.
    pub(crate) revert: Vec<OptionSnapshot>,
}

impl SavePlan {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn write(&self) -> &PlannedWrite {
        &self.write
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Set when the change was significant (the reason is logged for audit).
    pub fn reason_required(&self) -> bool {
        self.reason_required
    }

    pub fn option_ids(&self) -> Vec<String> {
        self.revert.iter().map(|o| o.id.clone()).collect()
    }

    /// `option_id -> quantity` being written.
    pub fn quantities(&self) -> QuantityMap {
        match &self.write {
            PlannedWrite::Single {
                option_id,
                quantity,
            } => [(option_id.as_str(), *quantity)].into_iter().collect(),
            PlannedWrite::Bulk { quantities } => quantities.clone(),
        }
    }

    /// Issue the planned write. Runs to completion; hand the result to
    /// [`crate::InventorySession::finish_save`].
    pub async fn dispatch<B>(&self, backend: &B) -> Result<OptionWriteResponse, BackendError>
    where
        B: InventoryBackend + ?Sized,
    {
        match &self.write {
            PlannedWrite::Single {
                option_id,
                quantity,
            } => {
                let write = OptionSingleWrite {
                    quantity: *quantity,
                    reason: self.reason.clone(),
                };
                backend
                    .update_single_option_quantity(&self.group_id, option_id, &write)
                    .await
            }
            PlannedWrite::Bulk { quantities } => {
                let write = OptionBulkWrite {
                    quantities: quantities.clone(),
                    reason: self.reason.clone(),
                };
                backend.update_option_quantities(&self.group_id, &write).await
            }
        }
    }
}

/// Result of [`crate::InventorySession::finish_save`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Committed {
        option_ids: Vec<String>,
        message: String,
    },
    RolledBack {
        option_ids: Vec<String>,
        error: crate::WriteFailure,
    },
    /// The session closed (or the plan belongs to another session).
    Discarded,
}

impl SaveOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SaveOutcome::Committed { .. })
    }
}
