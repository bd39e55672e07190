use std::collections::VecDeque;

use tokio::sync::Mutex;

use stk_backend::{BackendError, InventoryBackend, MemoryBackend};
use stk_schemas::{
    ItemSnapshot, ItemUpdate, OptionBulkWrite, OptionSingleWrite, OptionWriteResponse, QuantityMap,
};

/// Every call the backend saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    GetItem {
        item_id: String,
    },
    UpdateItem {
        item_id: String,
        update: ItemUpdate,
    },
    UpdateSingle {
        group_id: String,
        option_id: String,
        quantity: i64,
        reason: String,
    },
    UpdateBulk {
        group_id: String,
        quantities: QuantityMap,
        reason: String,
    },
}

impl BackendCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, BackendCall::GetItem { .. })
    }
}

/// Injected outcome for the next option write.
#[derive(Debug, Clone)]
pub enum Fault {
    Fail(BackendError),
    /// Transport succeeds, but the response carries neither group nor message.
    Unconfirmed,
}

/// [`MemoryBackend`] that records calls and can fail option writes on demand.
/// Faulted writes are recorded but not applied.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    inner: MemoryBackend,
    calls: Mutex<Vec<BackendCall>>,
    faults: Mutex<VecDeque<Fault>>,
}

impl ScriptedBackend {
    pub fn new(items: impl IntoIterator<Item = ItemSnapshot>) -> Self {
        Self {
            inner: MemoryBackend::with_items(items),
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(VecDeque::new()),
        }
    }

    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    pub async fn fail_next_write(&self, fault: Fault) {
        self.faults.lock().await.push_back(fault);
    }

    pub async fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().await.clone()
    }

    pub async fn write_calls(&self) -> Vec<BackendCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    async fn record(&self, call: BackendCall) {
        self.calls.lock().await.push(call);
    }

    async fn take_fault(&self) -> Option<Result<OptionWriteResponse, BackendError>> {
        self.faults.lock().await.pop_front().map(|f| match f {
            Fault::Fail(e) => Err(e),
            Fault::Unconfirmed => Ok(OptionWriteResponse::default()),
        })
    }
}

#[async_trait::async_trait]
impl InventoryBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn get_item(&self, item_id: &str) -> Result<ItemSnapshot, BackendError> {
        self.record(BackendCall::GetItem {
            item_id: item_id.to_string(),
        })
        .await;
        self.inner.get_item(item_id).await
    }

    async fn update_item(
        &self,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<ItemSnapshot, BackendError> {
        self.record(BackendCall::UpdateItem {
            item_id: item_id.to_string(),
            update: update.clone(),
        })
        .await;
        self.inner.update_item(item_id, update).await
    }

    async fn update_single_option_quantity(
        &self,
        group_id: &str,
        option_id: &str,
        write: &OptionSingleWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        self.record(BackendCall::UpdateSingle {
            group_id: group_id.to_string(),
            option_id: option_id.to_string(),
            quantity: write.quantity,
            reason: write.reason.clone(),
        })
        .await;
        if let Some(faulted) = self.take_fault().await {
            return faulted;
        }
        self.inner
            .update_single_option_quantity(group_id, option_id, write)
            .await
    }

    async fn update_option_quantities(
        &self,
        group_id: &str,
        write: &OptionBulkWrite,
    ) -> Result<OptionWriteResponse, BackendError> {
        self.record(BackendCall::UpdateBulk {
            group_id: group_id.to_string(),
            quantities: write.quantities.clone(),
            reason: write.reason.clone(),
        })
        .await;
        if let Some(faulted) = self.take_fault().await {
            return faulted;
        }
        self.inner.update_option_quantities(group_id, write).await
    }
}
