use std::fmt;

use stk_backend::BackendError;
use stk_reconcile::{DistributeError, StockDrift};
use stk_schemas::QuantityMap;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Session state.
///
/// ```text
/// Idle ──edit──► Editing ──begin_save──► Saving ──┬─► Committed
///   ▲               │                            └─► RolledBack
///   └──edit back────┘        (any edit from Committed/RolledBack → Editing|Idle)
/// ```
///
/// `Closed` is terminal: results of writes still in flight are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Editing,
    Saving,
    Committed,
    RolledBack,
    Closed,
}

// ---------------------------------------------------------------------------
// SaveRejected
// ---------------------------------------------------------------------------

/// Why a save was refused before any backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRejected {
    Closed,
    NoTrackedGroup,
    UnknownOption { option_id: String },
    /// No option differs from its baseline.
    NothingToSave,
    /// Critical validation findings.
    Invalid { critical_count: usize },
    /// A write carrying this option is still in flight.
    OptionBusy { option_id: String },
}

impl fmt::Display for SaveRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveRejected::Closed => write!(f, "session is closed"),
            SaveRejected::NoTrackedGroup => write!(f, "item has no tracked option group"),
            SaveRejected::UnknownOption { option_id } => {
                write!(f, "unknown option: {option_id}")
            }
            SaveRejected::NothingToSave => write!(f, "no changes to save"),
            SaveRejected::Invalid { critical_count } => write!(
                f,
                "cannot save: {critical_count} critical error(s) must be fixed first"
            ),
            SaveRejected::OptionBusy { option_id } => {
                write!(f, "option {option_id} is still saving")
            }
        }
    }
}

impl std::error::Error for SaveRejected {}

// ---------------------------------------------------------------------------
// WriteFailure
// ---------------------------------------------------------------------------

/// A backend write that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteFailure {
    Backend(BackendError),
    /// Transport succeeded but the response lacked a group or a message.
    Unconfirmed,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteFailure::Backend(e) => write!(f, "{e}"),
            WriteFailure::Unconfirmed => {
                write!(f, "backend did not confirm the write")
            }
        }
    }
}

impl std::error::Error for WriteFailure {}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Closed,
    UnknownOption { option_id: String },
    Rejected(SaveRejected),
    /// Menu-level paths refuse to run over unsaved or in-flight option edits.
    PendingEdits,
    InvalidTotal { total: i64 },
    Distribute(DistributeError),
    Backend(BackendError),
    Write(WriteFailure),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Closed => write!(f, "session is closed"),
            SessionError::UnknownOption { option_id } => {
                write!(f, "unknown option: {option_id}")
            }
            SessionError::Rejected(r) => write!(f, "save rejected: {r}"),
            SessionError::PendingEdits => {
                write!(f, "save or discard option edits before adjusting item stock")
            }
            SessionError::InvalidTotal { total } => {
                write!(f, "item stock cannot be negative ({total})")
            }
            SessionError::Distribute(e) => write!(f, "redistribution failed: {e}"),
            SessionError::Backend(e) => write!(f, "{e}"),
            SessionError::Write(e) => write!(f, "write failed: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<BackendError> for SessionError {
    fn from(e: BackendError) -> Self {
        SessionError::Backend(e)
    }
}

impl From<DistributeError> for SessionError {
    fn from(e: DistributeError) -> Self {
        SessionError::Distribute(e)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Outcome notifications for the presentation layer. The session appends;
/// the caller drains and owns any display timing.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Committed {
        option_ids: Vec<String>,
        message: String,
    },
    RolledBack {
        option_ids: Vec<String>,
        error: WriteFailure,
    },
    SaveRejected(SaveRejected),
    Redistributed {
        group_id: String,
        changes: QuantityMap,
        message: String,
    },
    DriftDetected(StockDrift),
    /// A write resolved after the session closed; its result was ignored.
    Discarded {
        option_ids: Vec<String>,
    },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Committed { message, .. } => write!(f, "{message}"),
            SessionEvent::RolledBack { option_ids, error } => write!(
                f,
                "failed to save {}: {error}; changes reverted",
                option_ids.join(", ")
            ),
            SessionEvent::SaveRejected(r) => write!(f, "{r}"),
            SessionEvent::Redistributed { message, .. } => write!(f, "{message}"),
            SessionEvent::DriftDetected(drift) => match drift {
                StockDrift::Mismatch {
                    aggregate,
                    option_total,
                    ..
                } => write!(
                    f,
                    "item stock ({aggregate}) does not match option total ({option_total})"
                ),
                _ => write!(f, "item stock matches option total"),
            },
            SessionEvent::Discarded { option_ids } => {
                write!(f, "ignored late result for {}", option_ids.join(", "))
            }
        }
    }
}
