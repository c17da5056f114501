//! Inventory Optimization Engine.
//!
//! Stateless: nothing is fitted or persisted. Every report is a pure function
//! of the snapshot and the [`InventorySettings`], so repeated calls against an
//! unchanged snapshot produce identical output.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use retailsense_core::stats::round_to;
use retailsense_core::{AnalyticsError, AnalyticsResult, CatalogItem, HistorySnapshot, ItemId};

use crate::alert::{AlertKind, AlertSummary, InventorySignal};
use crate::demand::{LONG_WINDOW_DAYS, SHORT_WINDOW_DAYS, StockPosition, last_sales, units_sold};

/// Days-since-last-sale reported for items that never sold.
pub const NEVER_SOLD_DAYS: i64 = 999;

const SAFETY_STOCK_FACTOR: f64 = 0.5;
const MONTHS_PER_YEAR: f64 = 12.0;

const SLOW_MOVER_ACTION: &str = "Consider a discount or promotion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub lead_time_days: u32,
    /// Fixed cost of placing one purchase order.
    pub order_cost: f64,
    /// Yearly holding cost as a fraction of the unit price.
    pub holding_cost_rate: f64,
    /// Purchase cost as a fraction of the unit price.
    pub purchase_cost_ratio: f64,
    pub slow_moving_days: u32,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            lead_time_days: 7,
            order_cost: 50.0,
            holding_cost_rate: 0.2,
            purchase_cost_ratio: 0.6,
            slow_moving_days: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAnalysis {
    pub total_items_analyzed: usize,
    pub alerts: Vec<InventorySignal>,
    pub summary: AlertSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderRecommendation {
    pub item_id: ItemId,
    pub name: String,
    pub current_stock: i64,
    pub reorder_point: i64,
    pub safety_stock: i64,
    pub recommended_order_quantity: i64,
    pub daily_demand: f64,
    pub lead_time_days: u32,
    pub estimated_cost: f64,
    pub priority: ReorderPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderPlan {
    pub recommendations: Vec<ReorderRecommendation>,
    pub total_recommendations: usize,
    pub estimated_total_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthStatus::Healthy
        } else if score >= 60.0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub total_items: usize,
    /// Low-stock and stockout-imminent items.
    pub low_stock: usize,
    pub overstock: usize,
    pub slow_moving: usize,
    /// Items without any alert.
    pub optimal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub health_score: f64,
    pub status: HealthStatus,
    pub metrics: HealthMetrics,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowMovingItem {
    pub item_id: ItemId,
    pub name: String,
    pub category: Option<String>,
    pub current_stock: i64,
    pub days_since_last_sale: i64,
    pub stock_value: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowMovingReport {
    pub threshold_days: u32,
    pub items: Vec<SlowMovingItem>,
    pub total_items: usize,
    pub total_stock_value: f64,
}

pub struct InventoryOptimizer {
    settings: InventorySettings,
}

impl Default for InventoryOptimizer {
    fn default() -> Self {
        Self::new(InventorySettings::default())
    }
}

impl InventoryOptimizer {
    pub fn new(settings: InventorySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    /// Stock position of every active item, sorted by id.
    pub fn positions<'a>(&self, history: &'a HistorySnapshot) -> Vec<(&'a CatalogItem, StockPosition)> {
        let short = units_sold(history, SHORT_WINDOW_DAYS);
        let long = units_sold(history, LONG_WINDOW_DAYS);
        history
            .active_items()
            .into_iter()
            .map(|item| {
                let d7 = short.get(&item.item_id).copied().unwrap_or(0);
                let d30 = long.get(&item.item_id).copied().unwrap_or(0);
                (item, StockPosition::measure(item, d7, d30))
            })
            .collect()
    }

    /// Classify every active item; at most one alert per item.
    ///
    /// Alerts are ordered by urgency (highest first), then by item id.
    pub fn analyze_all(&self, history: &HistorySnapshot) -> InventoryAnalysis {
        let today = history.as_of_date();
        let positions = self.positions(history);

        let mut alerts: Vec<InventorySignal> = positions
            .iter()
            .filter_map(|(item, position)| {
                let kind = AlertKind::classify(position)?;
                debug!(item_id = %item.item_id, alert = %kind, stock = position.current_stock, "inventory alert");
                Some(InventorySignal::from_position(
                    position,
                    kind,
                    &item.name,
                    item.category.as_deref(),
                    item.price,
                    today,
                ))
            })
            .collect();
        alerts.sort_by(|a, b| b.urgency.cmp(&a.urgency).then(a.item_id.cmp(&b.item_id)));

        let summary = AlertSummary::from_signals(&alerts);
        info!(
            items = positions.len(),
            alerts = summary.total_alerts,
            "inventory analysis complete"
        );
        InventoryAnalysis {
            total_items_analyzed: positions.len(),
            alerts,
            summary,
        }
    }

    /// Items at or below their reorder point, with EOQ-based order sizes.
    pub fn reorder_recommendations(&self, history: &HistorySnapshot) -> ReorderPlan {
        let lead_time = self.settings.lead_time_days as f64;
        let mut recommendations = Vec::new();

        for (item, position) in self.positions(history) {
            let daily = position.daily_rate;
            let safety_stock = daily * lead_time * SAFETY_STOCK_FACTOR;
            let reorder_point = daily * lead_time + safety_stock;
            let stock = position.current_stock as f64;
            if stock > reorder_point {
                continue;
            }

            let eoq = self.economic_order_quantity(position.demand_30d as f64, item.price);
            let quantity = (eoq.floor() as i64).max((reorder_point - stock).floor() as i64);
            let priority = if stock < safety_stock {
                ReorderPriority::High
            } else {
                ReorderPriority::Medium
            };

            recommendations.push(ReorderRecommendation {
                item_id: item.item_id,
                name: item.name.clone(),
                current_stock: position.current_stock,
                reorder_point: reorder_point.floor() as i64,
                safety_stock: safety_stock.floor() as i64,
                recommended_order_quantity: quantity,
                daily_demand: round_to(daily, 2),
                lead_time_days: self.settings.lead_time_days,
                estimated_cost: quantity as f64 * item.price * self.settings.purchase_cost_ratio,
                priority,
            });
        }

        recommendations.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.current_stock.cmp(&b.current_stock))
                .then(a.item_id.cmp(&b.item_id))
        });
        let estimated_total_cost = recommendations.iter().map(|r| r.estimated_cost).sum();
        info!(count = recommendations.len(), "reorder recommendations computed");

        ReorderPlan {
            total_recommendations: recommendations.len(),
            recommendations,
            estimated_total_cost,
        }
    }

    /// `sqrt(2·D·S/H)` over annualized 30-day demand; one month of demand when
    /// either the demand or the holding cost is zero.
    pub fn economic_order_quantity(&self, demand_30d: f64, price: f64) -> f64 {
        let annual_demand = demand_30d * MONTHS_PER_YEAR;
        let holding_cost = price * self.settings.holding_cost_rate;
        if holding_cost > 0.0 && annual_demand > 0.0 {
            (2.0 * annual_demand * self.settings.order_cost / holding_cost).sqrt()
        } else {
            demand_30d
        }
    }

    pub fn health_score(&self, history: &HistorySnapshot) -> HealthReport {
        let positions = self.positions(history);
        let total = positions.len();
        if total == 0 {
            return HealthReport {
                health_score: 100.0,
                status: HealthStatus::Healthy,
                metrics: HealthMetrics::default(),
                recommendations: health_recommendations(HealthStatus::Healthy, &HealthMetrics::default()),
            };
        }

        let mut metrics = HealthMetrics {
            total_items: total,
            ..Default::default()
        };
        for (_, position) in &positions {
            match AlertKind::classify(position) {
                Some(AlertKind::StockoutImminent | AlertKind::LowStock) => metrics.low_stock += 1,
                Some(AlertKind::Overstock) => metrics.overstock += 1,
                Some(AlertKind::SlowMoving) => metrics.slow_moving += 1,
                Some(AlertKind::HighDemand) => {}
                None => metrics.optimal += 1,
            }
        }

        let n = total as f64;
        let raw = 100.0
            - 30.0 * metrics.low_stock as f64 / n
            - 20.0 * metrics.overstock as f64 / n
            - 25.0 * metrics.slow_moving as f64 / n;
        let health_score = round_to(raw.max(0.0), 1);
        let status = HealthStatus::from_score(health_score);
        info!(score = health_score, status = %status, "inventory health scored");

        HealthReport {
            health_score,
            status,
            recommendations: health_recommendations(status, &metrics),
            metrics,
        }
    }

    /// In-stock items with no counted sales in the last `threshold_days`,
    /// stalest first.
    pub fn slow_moving_items(
        &self,
        history: &HistorySnapshot,
        threshold_days: u32,
    ) -> AnalyticsResult<SlowMovingReport> {
        if threshold_days == 0 {
            return Err(AnalyticsError::invalid_input("threshold_days must be at least 1"));
        }
        let recent = units_sold(history, threshold_days as i64);
        let last = last_sales(history);

        let mut items: Vec<SlowMovingItem> = history
            .active_items()
            .into_iter()
            .filter(|item| item.total_stock() > 0 && !recent.contains_key(&item.item_id))
            .map(|item| {
                let stock = item.total_stock();
                SlowMovingItem {
                    item_id: item.item_id,
                    name: item.name.clone(),
                    category: item.category.clone(),
                    current_stock: stock,
                    days_since_last_sale: last
                        .get(&item.item_id)
                        .map_or(NEVER_SOLD_DAYS, |at| (history.as_of - *at).num_days()),
                    stock_value: stock as f64 * item.price,
                    recommendation: SLOW_MOVER_ACTION.to_string(),
                }
            })
            .collect();
        items.sort_by(|a, b| {
            b.days_since_last_sale
                .cmp(&a.days_since_last_sale)
                .then(a.item_id.cmp(&b.item_id))
        });

        Ok(SlowMovingReport {
            threshold_days,
            total_items: items.len(),
            total_stock_value: items.iter().map(|i| i.stock_value).sum(),
            items,
        })
    }
}

fn health_recommendations(status: HealthStatus, metrics: &HealthMetrics) -> Vec<String> {
    let mut out = Vec::new();
    if status == HealthStatus::Critical {
        out.push("URGENT: review inventory immediately".to_string());
    }
    if metrics.low_stock > 0 {
        out.push(format!("Restock {} low-stock items", metrics.low_stock));
    }
    if metrics.overstock > 0 {
        out.push(format!("Consider promotions for {} overstocked items", metrics.overstock));
    }
    if metrics.slow_moving > 0 {
        out.push(format!("Apply a clearance strategy to {} slow-moving items", metrics.slow_moving));
    }
    if out.is_empty() {
        out.push("Inventory is in good shape. Keep monitoring.".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use retailsense_core::{CustomerId, OrderId, OrderStatus, TransactionEvent, VariantId, VariantStock};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    fn item(id: u128, stock: i64, price: f64) -> CatalogItem {
        CatalogItem {
            item_id: ItemId::from_u128(id),
            name: format!("item-{id}"),
            category: Some("apparel".into()),
            brand: None,
            target_demographic: None,
            season: None,
            price,
            active: true,
            stock_by_variant: vec![VariantStock {
                variant_id: VariantId::from_u128(id),
                stock,
            }],
        }
    }

    fn sell(history: &mut HistorySnapshot, item: u128, quantity: u32, days_ago: i64) {
        let n = history.transactions.len() as u128;
        history.transactions.push(TransactionEvent {
            order_id: OrderId::from_u128(1_000 + n),
            customer_id: CustomerId::from_u128(1),
            item_id: ItemId::from_u128(item),
            variant_id: None,
            quantity,
            unit_price: 10.0,
            status: OrderStatus::Completed,
            created_at: as_of() - Duration::days(days_ago),
        });
    }

    /// Spread `d30` units over the month with `d7` of them in the last week.
    fn demand(history: &mut HistorySnapshot, item: u128, d7: u32, d30: u32) {
        if d7 > 0 {
            sell(history, item, d7, 1);
        }
        if d30 > d7 {
            sell(history, item, d30 - d7, 20);
        }
    }

    #[test]
    fn scenario_d_stockout_imminent() {
        let mut history = HistorySnapshot::new(as_of());
        history.catalog.push(item(1, 3, 25.0));
        demand(&mut history, 1, 21, 90);

        let analysis = InventoryOptimizer::default().analyze_all(&history);
        assert_eq!(analysis.total_items_analyzed, 1);
        let alert = &analysis.alerts[0];
        assert_eq!(alert.alert_kind, AlertKind::StockoutImminent);
        assert_eq!(alert.urgency, 5);
        assert_eq!(alert.daily_rate, 3.0);
        assert_eq!(alert.days_until_stockout, Some(1));
        assert_eq!(alert.projected_stockout_date, NaiveDate::from_ymd_opt(2024, 6, 2));
        assert_eq!(analysis.summary.stock_value_at_risk, 75.0);
    }

    #[test]
    fn repeated_catalog_id_gets_one_alert() {
        let mut history = HistorySnapshot::new(as_of());
        history.catalog.push(item(1, 3, 25.0));
        history.catalog.push(item(1, 3, 25.0));
        demand(&mut history, 1, 21, 90);

        let analysis = InventoryOptimizer::default().analyze_all(&history);
        assert_eq!(analysis.total_items_analyzed, 1);
        assert_eq!(analysis.alerts.len(), 1);
        assert_eq!(analysis.summary.total_alerts, 1);
    }

    #[test]
    fn alerts_sorted_by_urgency_then_id() {
        let mut history = HistorySnapshot::new(as_of());
        history.catalog.push(item(1, 40, 5.0)); // slow
        history.catalog.push(item(2, 3, 5.0)); // stockout
        history.catalog.push(item(3, 30, 5.0)); // low
        history.catalog.push(item(4, 100, 5.0)); // overstock
        demand(&mut history, 2, 21, 90);
        demand(&mut history, 3, 7, 90);
        demand(&mut history, 4, 7, 30);

        let analysis = InventoryOptimizer::default().analyze_all(&history);
        let kinds: Vec<AlertKind> = analysis.alerts.iter().map(|a| a.alert_kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::StockoutImminent,
                AlertKind::LowStock,
                AlertKind::Overstock,
                AlertKind::SlowMoving
            ]
        );
        assert_eq!(analysis.summary.by_kind.len(), 4);
    }

    #[test]
    fn inactive_items_are_ignored() {
        let mut history = HistorySnapshot::new(as_of());
        let mut retired = item(1, 3, 10.0);
        retired.active = false;
        history.catalog.push(retired);
        demand(&mut history, 1, 21, 90);

        let optimizer = InventoryOptimizer::default();
        assert_eq!(optimizer.analyze_all(&history).total_items_analyzed, 0);
        assert!(optimizer.reorder_recommendations(&history).recommendations.is_empty());
    }

    #[test]
    fn reorder_point_and_eoq() {
        let mut history = HistorySnapshot::new(as_of());
        // 3/day: safety 10.5, reorder point 31.5
        history.catalog.push(item(1, 5, 20.0));
        history.catalog.push(item(2, 20, 20.0));
        history.catalog.push(item(3, 200, 20.0));
        for id in 1..=3 {
            demand(&mut history, id, 21, 90);
        }

        let plan = InventoryOptimizer::default().reorder_recommendations(&history);
        assert_eq!(plan.total_recommendations, 2);

        let first = &plan.recommendations[0];
        assert_eq!(first.item_id, ItemId::from_u128(1));
        assert_eq!(first.priority, ReorderPriority::High);
        assert_eq!(first.reorder_point, 31);
        assert_eq!(first.safety_stock, 10);
        // EOQ = sqrt(2 * 1080 * 50 / 4) = 164.3
        assert_eq!(first.recommended_order_quantity, 164);
        assert!((first.estimated_cost - 164.0 * 20.0 * 0.6).abs() < 1e-9);

        let second = &plan.recommendations[1];
        assert_eq!(second.priority, ReorderPriority::Medium);
        assert!((plan.estimated_total_cost - 2.0 * 164.0 * 12.0).abs() < 1e-9);
    }

    #[test]
    fn eoq_falls_back_to_monthly_demand() {
        let optimizer = InventoryOptimizer::default();
        assert_eq!(optimizer.economic_order_quantity(45.0, 0.0), 45.0);
        assert_eq!(optimizer.economic_order_quantity(0.0, 10.0), 0.0);
    }

    #[test]
    fn zero_stock_without_demand_is_still_flagged_for_reorder() {
        let mut history = HistorySnapshot::new(as_of());
        history.catalog.push(item(1, 0, 10.0));
        let plan = InventoryOptimizer::default().reorder_recommendations(&history);
        assert_eq!(plan.total_recommendations, 1);
        assert_eq!(plan.recommendations[0].recommended_order_quantity, 0);
        assert_eq!(plan.recommendations[0].priority, ReorderPriority::Medium);
    }

    #[test]
    fn empty_catalog_is_healthy() {
        let report = InventoryOptimizer::default().health_score(&HistorySnapshot::new(as_of()));
        assert_eq!(report.health_score, 100.0);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn health_penalties_and_buckets() {
        let mut history = HistorySnapshot::new(as_of());
        history.catalog.push(item(1, 3, 5.0)); // stockout
        history.catalog.push(item(2, 40, 5.0)); // slow
        history.catalog.push(item(3, 100, 5.0)); // overstock
        history.catalog.push(item(4, 40, 5.0)); // optimal
        demand(&mut history, 1, 21, 90);
        demand(&mut history, 3, 7, 30);
        demand(&mut history, 4, 10, 40);

        let report = InventoryOptimizer::default().health_score(&history);
        // 100 - 7.5 - 5 - 6.25
        assert_eq!(report.health_score, 81.3);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(
            report.metrics,
            HealthMetrics {
                total_items: 4,
                low_stock: 1,
                overstock: 1,
                slow_moving: 1,
                optimal: 1
            }
        );
        assert_eq!(report.recommendations.len(), 3);
    }

    #[test]
    fn only_slow_movers_is_a_warning() {
        let mut history = HistorySnapshot::new(as_of());
        for id in 1..=2 {
            history.catalog.push(item(id, 40, 5.0));
        }
        let report = InventoryOptimizer::default().health_score(&history);
        // both slow: 100 - 25
        assert_eq!(report.health_score, 75.0);
        assert_eq!(report.status, HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(59.9), HealthStatus::Critical);
    }

    #[test]
    fn slow_movers_sorted_by_staleness() {
        let mut history = HistorySnapshot::new(as_of());
        history.catalog.push(item(1, 5, 10.0));
        history.catalog.push(item(2, 8, 10.0));
        history.catalog.push(item(3, 8, 10.0));
        history.catalog.push(item(4, 0, 10.0));
        sell(&mut history, 1, 2, 90);
        sell(&mut history, 3, 2, 10);

        let report = InventoryOptimizer::default().slow_moving_items(&history, 60).unwrap();
        let ids: Vec<ItemId> = report.items.iter().map(|i| i.item_id).collect();
        assert_eq!(ids, vec![ItemId::from_u128(2), ItemId::from_u128(1)]);
        assert_eq!(report.items[0].days_since_last_sale, NEVER_SOLD_DAYS);
        assert_eq!(report.items[1].days_since_last_sale, 90);
        assert_eq!(report.total_stock_value, 130.0);
    }

    #[test]
    fn slow_movers_reject_zero_threshold() {
        let history = HistorySnapshot::new(as_of());
        assert!(matches!(
            InventoryOptimizer::default().slow_moving_items(&history, 0),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let mut history = HistorySnapshot::new(as_of());
        for id in 1..=6u128 {
            history.catalog.push(item(id, (id as i64) * 7, 3.5 * id as f64));
            demand(&mut history, id, id as u32 * 2, id as u32 * 11);
        }
        let optimizer = InventoryOptimizer::default();

        let a = serde_json::to_string(&optimizer.analyze_all(&history)).unwrap();
        let b = serde_json::to_string(&optimizer.analyze_all(&history)).unwrap();
        assert_eq!(a, b);
        let a = serde_json::to_string(&optimizer.reorder_recommendations(&history)).unwrap();
        let b = serde_json::to_string(&optimizer.reorder_recommendations(&history)).unwrap();
        assert_eq!(a, b);
        let a = serde_json::to_string(&optimizer.health_score(&history)).unwrap();
        let b = serde_json::to_string(&optimizer.health_score(&history)).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn each_item_gets_at_most_one_alert_in_urgency_order(
            specs in proptest::collection::vec((0i64..300, 0u32..60, 0u32..120), 1..12)
        ) {
            let mut history = HistorySnapshot::new(as_of());
            for (i, (stock, d7, extra)) in specs.iter().enumerate() {
                let id = i as u128 + 1;
                history.catalog.push(item(id, *stock, 9.0));
                demand(&mut history, id, *d7, d7 + extra);
            }
            let optimizer = InventoryOptimizer::default();
            let analysis = optimizer.analyze_all(&history);

            let mut seen = std::collections::BTreeSet::new();
            for alert in &analysis.alerts {
                prop_assert!(seen.insert(alert.item_id));
                prop_assert_eq!(alert.urgency, alert.alert_kind.urgency());
            }
            for pair in analysis.alerts.windows(2) {
                prop_assert!(pair[0].urgency >= pair[1].urgency);
            }

            // Imminent stockouts are never reported as anything else.
            for (item, position) in optimizer.positions(&history) {
                if AlertKind::StockoutImminent.applies(&position) {
                    let alert = analysis.alerts.iter().find(|a| a.item_id == item.item_id);
                    prop_assert_eq!(alert.map(|a| a.alert_kind), Some(AlertKind::StockoutImminent));
                }
            }
        }
    }
}
