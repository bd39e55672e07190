use serde::{Deserialize, Serialize};

use crate::QuantityMap;

// ---------------------------------------------------------------------------
// Tracking type
// ---------------------------------------------------------------------------

/// Where a menu item's stock is authoritatively tracked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingType {
    #[default]
    Manual,
    MenuItemLevel,
    OptionLevel,
}

impl TrackingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingType::Manual => "manual",
            TrackingType::MenuItemLevel => "menu_item_level",
            TrackingType::OptionLevel => "option_level",
        }
    }
}

// ---------------------------------------------------------------------------
// Option
// ---------------------------------------------------------------------------

/// A purchasable variant inside an option group.
///
/// `is_out_of_stock` / `is_low_stock` are derived; call
/// [`OptionSnapshot::refresh_availability`] after changing quantities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    pub id: String,
    pub name: String,
    pub stock_quantity: i64,
    #[serde(default)]
    pub damaged_quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub is_out_of_stock: bool,
    #[serde(default)]
    pub is_low_stock: bool,
}

impl OptionSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stock_quantity: i64) -> Self {
        let mut opt = Self {
            id: id.into(),
            name: name.into(),
            stock_quantity,
            damaged_quantity: 0,
            low_stock_threshold: None,
            is_out_of_stock: false,
            is_low_stock: false,
        };
        opt.refresh_availability(None);
        opt
    }

    /// Stock not withheld as damaged. Never negative.
    pub fn available_quantity(&self) -> i64 {
        (self.stock_quantity - self.damaged_quantity).max(0)
    }

    /// Recompute derived availability. The option's own threshold wins over
    /// the group-level one.
    pub fn refresh_availability(&mut self, group_threshold: Option<i64>) {
        let available = self.available_quantity();
        let threshold = self.low_stock_threshold.or(group_threshold);
        self.is_out_of_stock = available <= 0;
        self.is_low_stock = available > 0 && threshold.is_some_and(|t| available <= t);
    }
}

// ---------------------------------------------------------------------------
// Option group
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroupSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub min_select: u32,
    #[serde(default)]
    pub max_select: u32,
    #[serde(default)]
    pub inventory_tracking_enabled: bool,
    /// Lowest positive value marks the authoritative group.
    #[serde(default)]
    pub tracking_priority: Option<u32>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub options: Vec<OptionSnapshot>,
}

impl OptionGroupSnapshot {
    pub fn option(&self, option_id: &str) -> Option<&OptionSnapshot> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn option_mut(&mut self, option_id: &str) -> Option<&mut OptionSnapshot> {
        self.options.iter_mut().find(|o| o.id == option_id)
    }

    /// Current stock per option, in group order.
    pub fn quantities(&self) -> QuantityMap {
        self.options
            .iter()
            .map(|o| (o.id.as_str(), o.stock_quantity))
            .collect()
    }

    pub fn total_stock(&self) -> i128 {
        self.options
            .iter()
            .map(|o| i128::from(o.stock_quantity))
            .sum()
    }

    pub fn refresh_availability(&mut self) {
        let threshold = self.low_stock_threshold;
        for opt in &mut self.options {
            opt.refresh_availability(threshold);
        }
    }
}

// ---------------------------------------------------------------------------
// Menu item
// ---------------------------------------------------------------------------

/// Menu item as returned by `GetItem`: aggregate stock plus option groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub damaged_quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub enable_stock_tracking: bool,
    #[serde(default)]
    pub inventory_tracking_type: TrackingType,
    #[serde(default)]
    pub option_groups: Vec<OptionGroupSnapshot>,
}

impl ItemSnapshot {
    /// The single group acting as the authoritative option-level stock source.
    ///
    /// Among tracking-enabled groups: lowest positive `tracking_priority`,
    /// otherwise the first enabled group in declaration order.
    pub fn tracked_group(&self) -> Option<&OptionGroupSnapshot> {
        let enabled = || {
            self.option_groups
                .iter()
                .filter(|g| g.inventory_tracking_enabled)
        };
        enabled()
            .filter(|g| g.tracking_priority.is_some_and(|p| p > 0))
            .min_by_key(|g| g.tracking_priority)
            .or_else(|| enabled().next())
    }

    /// Replace the group with the same id (no-op if the item has none).
    pub fn replace_group(&mut self, group: OptionGroupSnapshot) {
        if let Some(slot) = self.option_groups.iter_mut().find(|g| g.id == group.id) {
            *slot = group;
        }
    }

    /// Single active representation of this item's stock.
    ///
    /// `OptionLevel` without a tracked group falls back to the item-level
    /// numbers; a disabled `enable_stock_tracking` flag means `Manual`.
    pub fn stock_mode(&self) -> StockMode {
        if !self.enable_stock_tracking {
            return StockMode::Manual;
        }
        match (self.inventory_tracking_type, self.tracked_group()) {
            (TrackingType::Manual, _) => StockMode::Manual,
            (TrackingType::OptionLevel, Some(group)) => StockMode::OptionLevel {
                group_id: group.id.clone(),
                quantities: group.quantities(),
            },
            (TrackingType::OptionLevel, None) | (TrackingType::MenuItemLevel, _) => {
                StockMode::MenuItemLevel {
                    quantity: self.stock_quantity,
                    damaged: self.damaged_quantity,
                    low_stock_threshold: self.low_stock_threshold,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stock mode
// ---------------------------------------------------------------------------

/// Exactly one stock representation is active at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StockMode {
    Manual,
    MenuItemLevel {
        quantity: i64,
        damaged: i64,
        low_stock_threshold: Option<i64>,
    },
    OptionLevel {
        group_id: String,
        quantities: QuantityMap,
    },
}

impl StockMode {
    pub fn is_option_level(&self) -> bool {
        matches!(self, StockMode::OptionLevel { .. })
    }
}
