//! Deterministic in-process inventory backend.
//!
//! Behaves like the real backend for the operations the controller uses:
//! - writes reject negative quantities and quantities below `damaged_quantity`
//!   (status 422) and unknown ids (`NotFound`);
//! - every write recomputes derived availability for the touched group;
//! - writes to an item's tracked group under option-level tracking keep the
//!   item's aggregate stock equal to the group total.
//!
//! No randomness, no timestamps. Messages are stable strings.

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use stk_schemas::{
    ItemSnapshot, ItemUpdate, OptionBulkWrite, OptionSingleWrite, OptionWriteResponse,
    QuantityMap, StockMode,
};

use crate::{BackendError, InventoryBackend};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<BTreeMap<String, ItemSnapshot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = ItemSnapshot>) -> Self {
        let items = items
            .into_iter()
            .map(|mut it| {
                for g in &mut it.option_groups {
                    g.refresh_availability();
                }
                (it.id.clone(), it)
            })
            .collect();
        Self {
            items: Mutex::new(items),
        }
    }

    pub async fn insert(&self, item: ItemSnapshot) {
        self.items.lock().await.insert(item.id.clone(), item);
    }

    /// Current stored state (test setup / assertions).
    pub async fn snapshot(&self, item_id: &str) -> Option<ItemSnapshot> {
        self.items.lock().await.get(item_id).cloned()
    }

    async fn write_options(
        &self,
        group_id: &str,
        quantities: &QuantityMap,
    ) -> Result<OptionWriteResponse, BackendError> {
        let mut items = self.items.lock().await;
        let item = items
            .values_mut()
            .find(|it| it.option_groups.iter().any(|g| g.id == group_id))
            .ok_or_else(|| BackendError::not_found("option group", group_id))?;
        let group = item
            .option_groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| BackendError::not_found("option group", group_id))?;

        // Check everything before touching anything: a write is all or nothing.
        for (option_id, quantity) in quantities.iter() {
            let opt = group
                .option(option_id)
                .ok_or_else(|| BackendError::not_found("option", option_id))?;
            check_quantity(quantity, opt.damaged_quantity)?;
        }
        for (option_id, quantity) in quantities.iter() {
            if let Some(opt) = group.option_mut(option_id) {
                opt.stock_quantity = quantity;
            }
        }
        group.refresh_availability();
        let written = group.clone();

        sync_aggregate(item);

        Ok(OptionWriteResponse {
            group: Some(written),
            message: Some(format!(
                "Stock updated for {} option(s)",
                quantities.len()
            )),
        })
    }
}

fn check_quantity(quantity: i64, damaged: i64) -> Result<(), BackendError> {
    if quantity < 0 {
        return Err(BackendError::Api {
            status: 422,
            message: "stock_quantity must be >= 0".to_string(),
        });
    }
    if quantity < damaged {
        return Err(BackendError::Api {
            status: 422,
            message: format!("stock_quantity must be >= damaged_quantity ({damaged})"),
        });
    }
    Ok(())
}

fn sync_aggregate(item: &mut ItemSnapshot) {
    if let StockMode::OptionLevel { quantities, .. } = item.stock_mode() {
        item.stock_quantity = i64::try_from(quantities.total()).unwrap_or(i64::MAX);
    }
}

#[async_trait::async_trait]
impl InventoryBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_item(&self, item_id: &str) -> Result<ItemSnapshot, BackendError> {
        self.items
            .lock()
            .await
            .get(item_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("menu item", item_id))
    }

    async fn update_item(
        &self,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<ItemSnapshot, BackendError> {
        let mut items = self.items.lock().await;
        let item = items
            .get_mut(item_id)
            .ok_or_else(|| BackendError::not_found("menu item", item_id))?;

        let stock = update.stock_quantity.unwrap_or(item.stock_quantity);
        let damaged = update.damaged_quantity.unwrap_or(item.damaged_quantity);
        if damaged < 0 {
            return Err(BackendError::Api {
                status: 422,
                message: "damaged_quantity must be >= 0".to_string(),
            });
        }
        check_quantity(stock, damaged)?;

        item.stock_quantity = stock;
        item.damaged_quantity = damaged;
        if update.low_stock_threshold.is_some() {
            item.low_stock_threshold = update.low_stock_threshold;
        }
        Ok(item.clone())
    }

    async fn update_single_option_quantity(
        &self,
        group_id: &str,
        option_id: &str,
        write: &OptionSingleWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        let single: QuantityMap = [(option_id, write.quantity)].into_iter().collect();
        self.write_options(group_id, &single).await
    }

    async fn update_option_quantities(
        &self,
        group_id: &str,
        write: &OptionBulkWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        self.write_options(group_id, &write.quantities).await
    }
}
