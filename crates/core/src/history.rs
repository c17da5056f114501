//! Read-only transaction history and catalog view consumed by every engine.
//!
//! The storefront owns these tables; the analytics engines only ever see an
//! immutable [`HistorySnapshot`] taken at a single instant (`as_of`).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsResult;
use crate::id::{CustomerId, ItemId, OrderId, VariantId};

/// Order lifecycle status as recorded by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Terminal, successful statuses. Only these rows feed the engines.
    pub fn is_counted(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Completed)
    }
}

/// One order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub item_id: ItemId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionEvent {
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Stock on hand for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStock {
    pub variant_id: VariantId,
    pub stock: i64,
}

/// Catalog entry with the attributes the engines encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub target_demographic: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    pub price: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub stock_by_variant: Vec<VariantStock>,
}

fn default_active() -> bool {
    true
}

impl CatalogItem {
    /// Stock summed across variants. Negative variant counts are treated as empty.
    pub fn total_stock(&self) -> i64 {
        self.stock_by_variant.iter().map(|v| v.stock.max(0)).sum()
    }
}

/// Registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub registered_at: DateTime<Utc>,
}

/// One counted order reassembled from its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub total: f64,
    pub quantity: u64,
    /// Distinct items in the order.
    pub items: BTreeSet<ItemId>,
    /// Item of every line, in input order; repeats are kept.
    pub lines: Vec<ItemId>,
}

/// Immutable view of the storefront tables at instant `as_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub as_of: DateTime<Utc>,
    #[serde(default)]
    pub transactions: Vec<TransactionEvent>,
    #[serde(default)]
    pub catalog: Vec<CatalogItem>,
    #[serde(default)]
    pub customers: Vec<CustomerRecord>,
}

impl HistorySnapshot {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            transactions: Vec::new(),
            catalog: Vec::new(),
            customers: Vec::new(),
        }
    }

    pub fn as_of_date(&self) -> NaiveDate {
        self.as_of.date_naive()
    }

    /// Lines whose order reached a counted status and that are not in the future.
    pub fn counted(&self) -> impl Iterator<Item = &TransactionEvent> + '_ {
        let as_of = self.as_of;
        self.transactions
            .iter()
            .filter(move |t| t.status.is_counted() && t.created_at <= as_of)
    }

    /// Counted lines inside the trailing window `(as_of - days, as_of]`.
    pub fn counted_within(&self, days: i64) -> impl Iterator<Item = &TransactionEvent> + '_ {
        let start = self.as_of - Duration::days(days);
        self.counted().filter(move |t| t.created_at > start)
    }

    /// Counted orders keyed by id (deterministic ordering).
    ///
    /// An order's timestamp is the earliest line timestamp; lines of one order
    /// normally share it.
    pub fn counted_orders(&self) -> BTreeMap<OrderId, OrderSummary> {
        let mut orders: BTreeMap<OrderId, OrderSummary> = BTreeMap::new();
        for line in self.counted() {
            let entry = orders.entry(line.order_id).or_insert_with(|| OrderSummary {
                order_id: line.order_id,
                customer_id: line.customer_id,
                created_at: line.created_at,
                total: 0.0,
                quantity: 0,
                items: BTreeSet::new(),
                lines: Vec::new(),
            });
            entry.total += line.line_total();
            entry.quantity += line.quantity as u64;
            entry.items.insert(line.item_id);
            entry.lines.push(line.item_id);
            if line.created_at < entry.created_at {
                entry.created_at = line.created_at;
            }
        }
        orders
    }

    /// Active catalog items sorted by id, one entry per id.
    ///
    /// When the catalog repeats an id the first active entry wins.
    pub fn active_items(&self) -> Vec<&CatalogItem> {
        let mut items: Vec<&CatalogItem> = self.catalog.iter().filter(|c| c.active).collect();
        items.sort_by_key(|c| c.item_id);
        items.dedup_by_key(|c| c.item_id);
        items
    }

    pub fn customer(&self, customer_id: CustomerId) -> Option<&CustomerRecord> {
        self.customers.iter().find(|c| c.customer_id == customer_id)
    }
}

/// Source of history snapshots (the storefront's relational store).
pub trait HistoryReader: Send + Sync {
    fn snapshot(&self) -> AnalyticsResult<HistorySnapshot>;
}

impl<R> HistoryReader for std::sync::Arc<R>
where
    R: HistoryReader + ?Sized,
{
    fn snapshot(&self) -> AnalyticsResult<HistorySnapshot> {
        (**self).snapshot()
    }
}
