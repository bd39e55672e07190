//! Aggregate vs option-level drift.
//!
//! Under option-level tracking the menu item's aggregate stock should equal
//! the sum of the tracked group's option quantities. Divergence is detected
//! and reported here; whether to redistribute is the caller's decision.

use stk_schemas::{ItemSnapshot, QuantityMap, StockMode};

use crate::{distribute, DistributeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StockDrift {
    /// Item is not option-level tracked; there is nothing to compare.
    NotApplicable,
    InSync {
        total: i64,
    },
    Mismatch {
        aggregate: i64,
        option_total: i128,
        /// `aggregate - option_total`.
        delta: i128,
    },
}

impl StockDrift {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, StockDrift::Mismatch { .. })
    }
}

pub fn detect_drift(item: &ItemSnapshot) -> StockDrift {
    match item.stock_mode() {
        StockMode::OptionLevel { quantities, .. } => {
            let option_total = quantities.total();
            let aggregate = item.stock_quantity;
            if option_total == i128::from(aggregate) {
                StockDrift::InSync { total: aggregate }
            } else {
                StockDrift::Mismatch {
                    aggregate,
                    option_total,
                    delta: i128::from(aggregate) - option_total,
                }
            }
        }
        _ => StockDrift::NotApplicable,
    }
}

/// Redistribution of a new aggregate across the tracked group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedistributionPlan {
    pub group_id: String,
    /// Full post-redistribution quantities (sums to `target`).
    pub allocation: QuantityMap,
    /// Only the options whose quantity actually changes.
    pub changes: QuantityMap,
}

/// Plan spreading `target` across the item's tracked group.
///
/// `Ok(None)` when the item is not option-level tracked or the group already
/// sums to `target`.
pub fn plan_redistribution(
    item: &ItemSnapshot,
    target: i64,
) -> Result<Option<RedistributionPlan>, DistributeError> {
    let StockMode::OptionLevel {
        group_id,
        quantities,
    } = item.stock_mode()
    else {
        return Ok(None);
    };
    if quantities.total() == i128::from(target) {
        return Ok(None);
    }

    let allocation = distribute(target, &quantities)?;
    let changes = allocation.changed_from(&quantities);
    Ok(Some(RedistributionPlan {
        group_id,
        allocation,
        changes,
    }))
}
