//! stk-backend
//!
//! Seam to the remote inventory backend. The backend owns persistence; this
//! crate only moves snapshots and writes across the boundary.
//!
//! - [`InventoryBackend`]: async trait over the four operations.
//! - [`HttpBackend`]: REST/JSON adapter (reqwest).
//! - [`MemoryBackend`]: deterministic in-process backend for demos and tests.

use std::fmt;
use std::sync::Arc;

use stk_schemas::{ItemSnapshot, ItemUpdate, OptionBulkWrite, OptionSingleWrite, OptionWriteResponse};

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::MemoryBackend;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Network failure, timeout, or client construction failure.
    Transport(String),
    /// The backend answered with a non-success status.
    Api { status: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// Unknown item, group, or option.
    NotFound { kind: &'static str, id: String },
}

impl BackendError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        BackendError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transport(msg) => write!(f, "transport error: {msg}"),
            BackendError::Api { status, message } => {
                write!(f, "backend error status={status}: {message}")
            }
            BackendError::Decode(msg) => write!(f, "decode error: {msg}"),
            BackendError::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
        }
    }
}

impl std::error::Error for BackendError {}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Remote inventory backend contract.
///
/// Option writes return the raw response; whether it counts as a success is
/// decided by [`OptionWriteResponse::confirmed`], not by the transport.
#[async_trait::async_trait]
pub trait InventoryBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_item(&self, item_id: &str) -> Result<ItemSnapshot, BackendError>;

    async fn update_item(
        &self,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<ItemSnapshot, BackendError>;

    async fn update_single_option_quantity(
        &self,
        group_id: &str,
        option_id: &str,
        write: &OptionSingleWrite,
    ) -> Result<OptionWriteResponse, BackendError>;

    async fn update_option_quantities(
        &self,
        group_id: &str,
        write: &OptionBulkWrite,
    ) -> Result<OptionWriteResponse, BackendError>;
}

#[async_trait::async_trait]
impl<B: InventoryBackend + ?Sized> InventoryBackend for Arc<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn get_item(&self, item_id: &str) -> Result<ItemSnapshot, BackendError> {
        (**self).get_item(item_id).await
    }

    async fn update_item(
        &self,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<ItemSnapshot, BackendError> {
        (**self).update_item(item_id, update).await
    }

    async fn update_single_option_quantity(
        &self,
        group_id: &str,
        option_id: &str,
        write: &OptionSingleWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        (**self)
            .update_single_option_quantity(group_id, option_id, write)
            .await
    }

    async fn update_option_quantities(
        &self,
        group_id: &str,
        write: &OptionBulkWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        (**self).update_option_quantities(group_id, write).await
    }
}
