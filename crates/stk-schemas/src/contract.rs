//! Request / response shapes for the inventory backend's write operations.

use serde::{Deserialize, Serialize};

use crate::{OptionGroupSnapshot, QuantityMap};

/// Partial update of a menu item's aggregate stock fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damaged_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of `UpdateSingleOptionQuantity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSingleWrite {
    pub quantity: i64,
    pub reason: String,
}

/// Body of `UpdateOptionQuantities`. Carries only the options being written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionBulkWrite {
    pub quantities: QuantityMap,
    pub reason: String,
}

/// Raw response of either option write operation.
///
/// Both fields are optional on the wire; see [`OptionWriteResponse::confirmed`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionWriteResponse {
    #[serde(default)]
    pub group: Option<OptionGroupSnapshot>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A write the backend positively acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedWrite {
    pub group: OptionGroupSnapshot,
    pub message: String,
}

impl OptionWriteResponse {
    /// Success requires a group AND a non-empty message. Anything less is a
    /// failed write, even if the transport call itself succeeded.
    pub fn confirmed(self) -> Option<ConfirmedWrite> {
        match (self.group, self.message) {
            (Some(group), Some(message)) if !message.trim().is_empty() => {
                Some(ConfirmedWrite { group, message })
            }
            _ => None,
        }
    }
}
