//! Per-customer RFM features.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailsense_core::{AnalyticsError, AnalyticsResult, CustomerId, HistorySnapshot};

/// Recency reported for a customer without counted orders.
pub const NO_ORDER_RECENCY_DAYS: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeatures {
    pub recency_days: f64,
    pub frequency: f64,
    pub monetary: f64,
    pub avg_order_value: f64,
    pub days_since_registration: f64,
    pub purchase_frequency_monthly: f64,
}

impl CustomerFeatures {
    pub const NAMES: [&'static str; 6] = [
        "recency_days",
        "frequency",
        "monetary",
        "avg_order_value",
        "days_since_registration",
        "purchase_frequency_monthly",
    ];

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.recency_days,
            self.frequency,
            self.monetary,
            self.avg_order_value,
            self.days_since_registration,
            self.purchase_frequency_monthly,
        ]
    }

    pub fn has_orders(&self) -> bool {
        self.frequency > 0.0
    }

    /// `avg_order_value × monthly frequency × horizon`; zero without orders.
    pub fn lifetime_value(&self, horizon_months: f64) -> f64 {
        if !self.has_orders() {
            return 0.0;
        }
        self.avg_order_value * self.purchase_frequency_monthly * horizon_months
    }
}

#[derive(Debug, Default)]
struct OrderTotals {
    count: u32,
    spent: f64,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl OrderTotals {
    fn record(&mut self, at: DateTime<Utc>, total: f64) {
        self.count += 1;
        self.spent += total;
        self.first = Some(self.first.map_or(at, |f| f.min(at)));
        self.last = Some(self.last.map_or(at, |l| l.max(at)));
    }
}

fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_days().max(0) as f64
}

fn build(history: &HistorySnapshot, customer_id: CustomerId, totals: &OrderTotals) -> Option<CustomerFeatures> {
    let registered = history
        .customer(customer_id)
        .map(|c| c.registered_at)
        .or(totals.first)?;

    let frequency = totals.count as f64;
    let days_since_registration = whole_days(registered, history.as_of);
    let months_active = (days_since_registration / 30.0).max(1.0);

    Some(CustomerFeatures {
        recency_days: totals
            .last
            .map_or(NO_ORDER_RECENCY_DAYS, |last| whole_days(last, history.as_of)),
        frequency,
        monetary: totals.spent,
        avg_order_value: if totals.count > 0 { totals.spent / frequency } else { 0.0 },
        days_since_registration,
        purchase_frequency_monthly: frequency / months_active,
    })
}

fn totals_by_customer(history: &HistorySnapshot) -> BTreeMap<CustomerId, OrderTotals> {
    let mut totals: BTreeMap<CustomerId, OrderTotals> = BTreeMap::new();
    for order in history.counted_orders().values() {
        totals
            .entry(order.customer_id)
            .or_default()
            .record(order.created_at, order.total);
    }
    totals
}

/// Features for every customer with at least one counted order, by id.
pub fn qualifying_customers(history: &HistorySnapshot) -> Vec<(CustomerId, CustomerFeatures)> {
    totals_by_customer(history)
        .iter()
        .filter_map(|(id, totals)| build(history, *id, totals).map(|f| (*id, f)))
        .collect()
}

/// Features for one customer, with or without orders.
pub fn features_for(history: &HistorySnapshot, customer_id: CustomerId) -> AnalyticsResult<CustomerFeatures> {
    let mut totals = OrderTotals::default();
    for order in history.counted_orders().values() {
        if order.customer_id == customer_id {
            totals.record(order.created_at, order.total);
        }
    }
    build(history, customer_id, &totals)
        .ok_or_else(|| AnalyticsError::not_found(format!("customer {customer_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use retailsense_core::{CustomerRecord, ItemId, OrderId, OrderStatus, TransactionEvent};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn order(snapshot: &mut HistorySnapshot, order: u128, customer: u128, total: f64, days_ago: i64) {
        snapshot.transactions.push(TransactionEvent {
            order_id: OrderId::from_u128(order),
            customer_id: CustomerId::from_u128(customer),
            item_id: ItemId::from_u128(1),
            variant_id: None,
            quantity: 1,
            unit_price: total,
            status: OrderStatus::Delivered,
            created_at: as_of() - Duration::days(days_ago),
        });
    }

    #[test]
    fn rfm_values_follow_counted_orders() {
        let mut history = HistorySnapshot::new(as_of());
        history.customers.push(CustomerRecord {
            customer_id: CustomerId::from_u128(1),
            registered_at: as_of() - Duration::days(90),
        });
        order(&mut history, 1, 1, 100.0, 40);
        order(&mut history, 2, 1, 300.0, 10);

        let f = features_for(&history, CustomerId::from_u128(1)).unwrap();
        assert_eq!(f.recency_days, 10.0);
        assert_eq!(f.frequency, 2.0);
        assert_eq!(f.monetary, 400.0);
        assert_eq!(f.avg_order_value, 200.0);
        assert_eq!(f.days_since_registration, 90.0);
        assert!((f.purchase_frequency_monthly - 2.0 / 3.0).abs() < 1e-12);
        assert!((f.lifetime_value(24.0) - 200.0 * (2.0 / 3.0) * 24.0).abs() < 1e-9);
    }

    #[test]
    fn customer_without_orders_gets_sentinel_recency() {
        let mut history = HistorySnapshot::new(as_of());
        history.customers.push(CustomerRecord {
            customer_id: CustomerId::from_u128(7),
            registered_at: as_of() - Duration::days(5),
        });
        let f = features_for(&history, CustomerId::from_u128(7)).unwrap();
        assert_eq!(f.recency_days, NO_ORDER_RECENCY_DAYS);
        assert_eq!(f.frequency, 0.0);
        assert_eq!(f.lifetime_value(24.0), 0.0);
        assert!(qualifying_customers(&history).is_empty());
    }

    #[test]
    fn missing_record_falls_back_to_first_order() {
        let mut history = HistorySnapshot::new(as_of());
        order(&mut history, 1, 3, 50.0, 45);
        let f = features_for(&history, CustomerId::from_u128(3)).unwrap();
        assert_eq!(f.days_since_registration, 45.0);
        assert!((f.purchase_frequency_monthly - 1.0 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_customer_is_not_found() {
        let history = HistorySnapshot::new(as_of());
        assert!(matches!(
            features_for(&history, CustomerId::from_u128(9)),
            Err(AnalyticsError::NotFound(_))
        ));
    }
}
