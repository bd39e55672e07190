//! stk-testkit
//!
//! Test doubles and fixtures for the reconciliation scenarios under `tests/`.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};

use stk_controller::InventorySession;
use stk_reconcile::ValidationLimits;
use stk_schemas::{ItemSnapshot, OptionGroupSnapshot, OptionSnapshot, TrackingType};

mod scripted;

pub use scripted::{BackendCall, Fault, ScriptedBackend};

pub const ITEM_ID: &str = "lemonade";
pub const GROUP_ID: &str = "size";

/// Tracked item `lemonade` with one tracked group `size`. Option names are the
/// ids capitalised; `low_stock_threshold` on the group is 2.
pub fn fixture_item(tracking: TrackingType, aggregate: i64, options: &[(&str, i64)]) -> ItemSnapshot {
    let mut group = OptionGroupSnapshot {
        id: GROUP_ID.to_string(),
        name: "Size".to_string(),
        min_select: 1,
        max_select: 1,
        inventory_tracking_enabled: true,
        tracking_priority: Some(1),
        low_stock_threshold: Some(2),
        options: options
            .iter()
            .map(|(id, q)| OptionSnapshot::new(*id, capitalise(id), *q))
            .collect(),
    };
    group.refresh_availability();

    ItemSnapshot {
        id: ITEM_ID.to_string(),
        name: "Lemonade".to_string(),
        stock_quantity: aggregate,
        damaged_quantity: 0,
        low_stock_threshold: None,
        enable_stock_tracking: true,
        inventory_tracking_type: tracking,
        option_groups: vec![group],
    }
}

/// Option-level item whose aggregate equals the option total.
pub fn option_level_item(options: &[(&str, i64)]) -> ItemSnapshot {
    let total = options.iter().map(|(_, q)| *q).sum::<i64>();
    fixture_item(TrackingType::OptionLevel, total, options)
}

/// Mark `damaged` units of an option as damaged and refresh availability.
pub fn with_damaged(mut item: ItemSnapshot, option_id: &str, damaged: i64) -> ItemSnapshot {
    for group in &mut item.option_groups {
        if let Some(opt) = group.option_mut(option_id) {
            opt.damaged_quantity = damaged;
        }
        group.refresh_availability();
    }
    item
}

/// Backend seeded with `item` plus a session opened on the same snapshot.
pub fn session_for(
    item: ItemSnapshot,
) -> (Arc<ScriptedBackend>, InventorySession<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new([item.clone()]));
    let session =
        InventorySession::from_snapshot(Arc::clone(&backend), item, ValidationLimits::default());
    (backend, session)
}

pub fn load_item_json(path: &str) -> Result<ItemSnapshot> {
    let s = fs::read_to_string(path).with_context(|| format!("read item snapshot: {path}"))?;
    let item: ItemSnapshot = serde_json::from_str(&s).context("parse item snapshot json")?;
    Ok(item)
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_is_option_level_tracked_and_in_sync() {
        let item = option_level_item(&[("small", 4), ("large", 6)]);
        assert_eq!(item.stock_quantity, 10);
        assert_eq!(item.tracked_group().unwrap().option("large").unwrap().name, "Large");
    }

    #[test]
    fn item_json_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item.json");
        let item = with_damaged(option_level_item(&[("small", 4)]), "small", 3);
        fs::write(&path, serde_json::to_string(&item).unwrap()).unwrap();

        let loaded = load_item_json(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded, item);
        assert!(loaded.tracked_group().unwrap().options[0].is_low_stock);
    }
}
