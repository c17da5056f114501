//! Alert classification for a single stock position.

use core::fmt;
use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use retailsense_core::ItemId;
use retailsense_core::stats::round_to;

use crate::demand::StockPosition;

const STOCKOUT_IMMINENT_DAYS: f64 = 7.0;
const LOW_STOCK_DAYS: f64 = 14.0;
const DEMAND_SPIKE_RATIO: f64 = 1.5;
const OVERSTOCK_RATIO: f64 = 2.0;
const SLOW_ROTATION: f64 = 0.1;
const SLOW_MIN_STOCK: i64 = 10;

/// Kinds of inventory risk, declared in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    StockoutImminent,
    LowStock,
    HighDemand,
    Overstock,
    SlowMoving,
}

impl AlertKind {
    pub const PRIORITY: [AlertKind; 5] = [
        AlertKind::StockoutImminent,
        AlertKind::LowStock,
        AlertKind::HighDemand,
        AlertKind::Overstock,
        AlertKind::SlowMoving,
    ];

    pub fn urgency(&self) -> u8 {
        match self {
            AlertKind::StockoutImminent => 5,
            AlertKind::LowStock | AlertKind::HighDemand => 4,
            AlertKind::Overstock => 3,
            AlertKind::SlowMoving => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::StockoutImminent => "stockout_imminent",
            AlertKind::LowStock => "low_stock",
            AlertKind::HighDemand => "high_demand",
            AlertKind::Overstock => "overstock",
            AlertKind::SlowMoving => "slow_moving",
        }
    }

    /// Whether the kind's condition holds for `position`, ignoring priority.
    pub fn applies(&self, p: &StockPosition) -> bool {
        match self {
            AlertKind::StockoutImminent => p
                .days_until_stockout
                .is_some_and(|d| d < STOCKOUT_IMMINENT_DAYS && p.current_stock > 0),
            AlertKind::LowStock => p.days_until_stockout.is_some_and(|d| d < LOW_STOCK_DAYS),
            AlertKind::HighDemand => p.demand_7d as f64 > DEMAND_SPIKE_RATIO * p.implied_weekly_demand(),
            AlertKind::Overstock => p.current_stock as f64 > OVERSTOCK_RATIO * p.recommended_stock as f64,
            AlertKind::SlowMoving => p.rotation_rate < SLOW_ROTATION && p.current_stock > SLOW_MIN_STOCK,
        }
    }

    /// First kind in priority order whose condition holds.
    pub fn classify(position: &StockPosition) -> Option<AlertKind> {
        Self::PRIORITY.into_iter().find(|kind| kind.applies(position))
    }

    /// Kinds whose stock is valued as at risk in the summary.
    pub fn is_shortage(&self) -> bool {
        matches!(self, AlertKind::StockoutImminent | AlertKind::LowStock)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alert raised by an inventory analysis. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySignal {
    pub item_id: ItemId,
    pub name: String,
    pub category: Option<String>,
    pub alert_kind: AlertKind,
    pub urgency: u8,
    pub current_stock: i64,
    pub recommended_stock: i64,
    pub demand_7d: u64,
    pub demand_30d: u64,
    pub daily_rate: f64,
    pub days_until_stockout: Option<i64>,
    pub projected_stockout_date: Option<NaiveDate>,
    pub rotation_rate: f64,
    pub price: f64,
}

impl InventorySignal {
    pub fn from_position(
        position: &StockPosition,
        kind: AlertKind,
        name: &str,
        category: Option<&str>,
        price: f64,
        today: NaiveDate,
    ) -> Self {
        let whole_days = position.days_until_stockout.map(|d| d.max(0.0).floor() as i64);
        Self {
            item_id: position.item_id,
            name: name.to_string(),
            category: category.map(str::to_string),
            alert_kind: kind,
            urgency: kind.urgency(),
            current_stock: position.current_stock,
            recommended_stock: position.recommended_stock,
            demand_7d: position.demand_7d,
            demand_30d: position.demand_30d,
            daily_rate: round_to(position.daily_rate, 2),
            days_until_stockout: whole_days,
            projected_stockout_date: whole_days.map(|d| today + Duration::days(d)),
            rotation_rate: round_to(position.rotation_rate, 3),
            price,
        }
    }

    pub fn stock_value(&self) -> f64 {
        self.current_stock as f64 * self.price
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub by_kind: BTreeMap<AlertKind, usize>,
    pub by_urgency: BTreeMap<u8, usize>,
    pub stock_value_at_risk: f64,
}

impl AlertSummary {
    pub fn from_signals(signals: &[InventorySignal]) -> Self {
        let mut summary = AlertSummary {
            total_alerts: signals.len(),
            ..Default::default()
        };
        for signal in signals {
            *summary.by_kind.entry(signal.alert_kind).or_insert(0) += 1;
            *summary.by_urgency.entry(signal.urgency).or_insert(0) += 1;
            if signal.alert_kind.is_shortage() {
                summary.stock_value_at_risk += signal.stock_value();
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(stock: i64, d7: u64, d30: u64) -> StockPosition {
        let rate = d30 as f64 / 30.0;
        StockPosition {
            item_id: ItemId::from_u128(1),
            current_stock: stock,
            demand_7d: d7,
            demand_30d: d30,
            daily_rate: rate,
            days_until_stockout: (rate > 0.0).then(|| stock as f64 / rate),
            recommended_stock: if d30 > 0 { (d30 as f64 * 1.2).floor() as i64 } else { stock },
            rotation_rate: if stock > 0 { d30 as f64 / stock as f64 } else { 0.0 },
        }
    }

    #[test]
    fn priority_cascade() {
        assert_eq!(AlertKind::classify(&position(3, 21, 90)), Some(AlertKind::StockoutImminent));
        // 10 days of cover
        assert_eq!(AlertKind::classify(&position(30, 7, 90)), Some(AlertKind::LowStock));
        // out of stock with demand: zero days left but nothing on hand
        assert_eq!(AlertKind::classify(&position(0, 7, 30)), Some(AlertKind::LowStock));
        assert_eq!(AlertKind::classify(&position(50, 20, 30)), Some(AlertKind::HighDemand));
        assert_eq!(AlertKind::classify(&position(100, 7, 30)), Some(AlertKind::Overstock));
        assert_eq!(AlertKind::classify(&position(40, 0, 0)), Some(AlertKind::SlowMoving));
        assert_eq!(AlertKind::classify(&position(40, 10, 40)), None);
        assert_eq!(AlertKind::classify(&position(0, 0, 0)), None);
    }

    #[test]
    fn overstock_outranks_slow_moving() {
        // rotation 0.05 and stock far above two months' demand
        let p = position(200, 2, 10);
        assert!(AlertKind::SlowMoving.applies(&p));
        assert_eq!(AlertKind::classify(&p), Some(AlertKind::Overstock));
    }

    #[test]
    fn urgency_never_increases_along_priority() {
        for pair in AlertKind::PRIORITY.windows(2) {
            assert!(pair[0].urgency() >= pair[1].urgency());
        }
    }

    #[test]
    fn signal_projects_stockout_date() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let p = position(10, 7, 60);
        let s = InventorySignal::from_position(&p, AlertKind::StockoutImminent, "Cap", None, 12.5, today);
        assert_eq!(s.days_until_stockout, Some(5));
        assert_eq!(s.projected_stockout_date, NaiveDate::from_ymd_opt(2024, 5, 15));
        assert_eq!(s.stock_value(), 125.0);
    }

    #[test]
    fn summary_counts_and_values_shortages() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let signals = vec![
            InventorySignal::from_position(&position(3, 21, 90), AlertKind::StockoutImminent, "a", None, 10.0, today),
            InventorySignal::from_position(&position(30, 7, 90), AlertKind::LowStock, "b", None, 2.0, today),
            InventorySignal::from_position(&position(40, 0, 0), AlertKind::SlowMoving, "c", None, 100.0, today),
        ];
        let summary = AlertSummary::from_signals(&signals);
        assert_eq!(summary.total_alerts, 3);
        assert_eq!(summary.by_kind[&AlertKind::LowStock], 1);
        assert_eq!(summary.by_urgency[&5], 1);
        assert_eq!(summary.by_urgency.get(&3), None);
        assert_eq!(summary.stock_value_at_risk, 90.0);
    }
}
