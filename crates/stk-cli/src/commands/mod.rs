pub mod item;
pub mod offline;

use anyhow::{Context, Result};
use stk_config::EngineConfig;
use stk_reconcile::StockDrift;

/// No `--config` means defaults for every key.
pub fn load_engine_config(paths: &[String]) -> Result<EngineConfig> {
    if paths.is_empty() {
        return Ok(EngineConfig::default());
    }
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    stk_config::load_layered_yaml(&refs)?
        .engine()
        .context("config did not extract into engine settings")
}

/// Split `id=value` on the first `=`.
pub(crate) fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    let (id, value) = raw
        .split_once('=')
        .with_context(|| format!("expected option_id=value, got '{raw}'"))?;
    let id = id.trim();
    anyhow::ensure!(!id.is_empty(), "empty option id in '{raw}'");
    Ok((id, value.trim()))
}

pub(crate) fn drift_json(drift: &StockDrift) -> serde_json::Value {
    match drift {
        StockDrift::NotApplicable => serde_json::json!({ "status": "not_applicable" }),
        StockDrift::InSync { total } => serde_json::json!({ "status": "in_sync", "total": total }),
        StockDrift::Mismatch {
            aggregate,
            option_total,
            delta,
        } => serde_json::json!({
            "status": "mismatch",
            "aggregate": aggregate,
            // i128 has no JSON number mapping; these always fit i64 in practice.
            "option_total": option_total.to_string(),
            "delta": delta.to_string(),
        }),
    }
}
