//! Commands that never touch the backend.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use stk_backend::MemoryBackend;
use stk_config::EngineConfig;
use stk_controller::InventorySession;
use stk_schemas::{ItemSnapshot, QuantityMap};

use super::split_assignment;

pub fn distribute(target: i64, current: &[String]) -> Result<()> {
    let mut quantities = QuantityMap::new();
    for raw in current {
        let (id, value) = split_assignment(raw)?;
        let q: i64 = value
            .parse()
            .with_context(|| format!("quantity for '{id}' is not an integer: '{value}'"))?;
        quantities.insert(id, q);
    }

    let allocation = stk_reconcile::distribute(target, &quantities)?;
    println!("{}", serde_json::to_string(&allocation)?);
    Ok(())
}

/// Run the proposed values through a session over an in-memory copy of the
/// item, so the report is exactly what an interactive save would see.
pub fn validate(cfg: &EngineConfig, item_path: &str, set: &[String]) -> Result<()> {
    let raw = std::fs::read_to_string(item_path)
        .with_context(|| format!("read item snapshot failed: {item_path}"))?;
    let item: ItemSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("item snapshot is not valid JSON: {item_path}"))?;

    let backend = Arc::new(MemoryBackend::with_items([item.clone()]));
    let mut session = InventorySession::from_snapshot(backend, item, cfg.validation.clone());
    if session.tracked_group().is_none() {
        bail!("item '{}' has no inventory-tracked option group", session.item().id);
    }
    for raw in set {
        let (id, value) = split_assignment(raw)?;
        session.set_quantity_input(id, value)?;
    }

    let report = session.validation();
    println!("{}", serde_json::to_string_pretty(report)?);
    if !report.is_valid {
        bail!(
            "validation failed: {} critical finding(s)",
            report.critical_count()
        );
    }
    Ok(())
}

pub fn config_hash(paths: &[String]) -> Result<()> {
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = stk_config::load_layered_yaml(&refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

pub fn audit_merge(menu_item_path: &str, option_path: &str) -> Result<()> {
    let menu_item = stk_audit::read_jsonl(menu_item_path)?;
    let option = stk_audit::read_jsonl(option_path)?;
    for record in stk_audit::merge_streams(&menu_item, &option) {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}
