//! Commands against the configured inventory backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use stk_backend::HttpBackend;
use stk_config::EngineConfig;
use stk_controller::InventorySession;
use tracing::info;

use super::drift_json;

fn backend(cfg: &EngineConfig) -> Result<Arc<HttpBackend>> {
    let http = HttpBackend::new(
        &cfg.backend.base_url,
        Duration::from_secs(cfg.backend.timeout_secs),
        cfg.backend.token(),
    )
    .context("backend client init failed")?;
    Ok(Arc::new(http))
}

async fn open(cfg: &EngineConfig, id: &str) -> Result<InventorySession<HttpBackend>> {
    let session = InventorySession::open(backend(cfg)?, id, cfg.validation.clone())
        .await
        .with_context(|| format!("load item '{id}' failed"))?;
    Ok(session)
}

pub async fn show(cfg: &EngineConfig, id: &str) -> Result<()> {
    let session = open(cfg, id).await?;
    let drift = stk_reconcile::detect_drift(session.item());
    let out = serde_json::json!({
        "item": session.item(),
        "tracked_group": session.tracked_group().map(|g| g.id.as_str()),
        "drift": drift_json(&drift),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub async fn adjust(cfg: &EngineConfig, id: &str, total: i64, reason: Option<&str>) -> Result<()> {
    let mut session = open(cfg, id).await?;
    let outcome = session.adjust_item_stock(total, reason).await?;
    info!(item_id = %id, item_stock = outcome.item_stock, "adjust complete");

    let out = serde_json::json!({
        "item_stock": outcome.item_stock,
        "redistributed": outcome.redistribution.as_ref().map(|p| &p.changes),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    session.close();
    Ok(())
}

pub async fn sync(cfg: &EngineConfig, id: &str, reason: Option<&str>) -> Result<()> {
    let mut session = open(cfg, id).await?;
    let plan = session.sync_options_to_item_total(reason).await?;
    let out = serde_json::json!({
        "item_stock": session.item().stock_quantity,
        "redistributed": plan.as_ref().map(|p| &p.changes),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    session.close();
    Ok(())
}
