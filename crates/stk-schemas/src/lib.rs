//! stk-schemas
//!
//! Shared data model for option-level stock reconciliation: menu items,
//! option groups, options, the ordered quantity map, and the request /
//! response shapes exchanged with the inventory backend.
//!
//! Plain data + small derived helpers. No IO.

mod contract;
mod item;
mod quantities;

pub use contract::{ConfirmedWrite, ItemUpdate, OptionBulkWrite, OptionSingleWrite, OptionWriteResponse};
pub use item::{ItemSnapshot, OptionGroupSnapshot, OptionSnapshot, StockMode, TrackingType};
pub use quantities::QuantityMap;
