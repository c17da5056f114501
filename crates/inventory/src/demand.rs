//! Trailing demand and the per-item stock position derived from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailsense_core::{CatalogItem, HistorySnapshot, ItemId};

/// Days in the long demand window; the daily sale rate is its average.
pub const LONG_WINDOW_DAYS: i64 = 30;
pub const SHORT_WINDOW_DAYS: i64 = 7;

/// Buffer applied to one month of demand for the recommended stock level.
const STOCK_BUFFER: f64 = 1.2;

/// Units sold per item over the trailing `days` window.
pub fn units_sold(history: &HistorySnapshot, days: i64) -> BTreeMap<ItemId, u64> {
    let mut units = BTreeMap::new();
    for line in history.counted_within(days) {
        *units.entry(line.item_id).or_insert(0) += line.quantity as u64;
    }
    units
}

/// Timestamp of the latest counted sale per item.
pub fn last_sales(history: &HistorySnapshot) -> BTreeMap<ItemId, DateTime<Utc>> {
    let mut last: BTreeMap<ItemId, DateTime<Utc>> = BTreeMap::new();
    for line in history.counted() {
        last.entry(line.item_id)
            .and_modify(|at| *at = (*at).max(line.created_at))
            .or_insert(line.created_at);
    }
    last
}

/// Demand statistics for one catalog item at `as_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPosition {
    pub item_id: ItemId,
    pub current_stock: i64,
    pub demand_7d: u64,
    pub demand_30d: u64,
    pub daily_rate: f64,
    /// `None` when nothing sells, i.e. stock never runs out.
    pub days_until_stockout: Option<f64>,
    pub recommended_stock: i64,
    pub rotation_rate: f64,
}

impl StockPosition {
    pub fn measure(item: &CatalogItem, demand_7d: u64, demand_30d: u64) -> Self {
        let current_stock = item.total_stock();
        let daily_rate = demand_30d as f64 / LONG_WINDOW_DAYS as f64;

        let days_until_stockout = (daily_rate > 0.0).then(|| current_stock as f64 / daily_rate);
        let recommended_stock = if demand_30d > 0 {
            (demand_30d as f64 * STOCK_BUFFER).floor() as i64
        } else {
            current_stock
        };
        let rotation_rate = if current_stock > 0 {
            demand_30d as f64 / current_stock as f64
        } else {
            0.0
        };

        Self {
            item_id: item.item_id,
            current_stock,
            demand_7d,
            demand_30d,
            daily_rate,
            days_until_stockout,
            recommended_stock,
            rotation_rate,
        }
    }

    /// Average weekly demand implied by the 30-day window.
    pub fn implied_weekly_demand(&self) -> f64 {
        self.daily_rate * SHORT_WINDOW_DAYS as f64
    }
}
