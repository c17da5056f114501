//! Daily sales aggregation and per-day feature engineering.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use retailsense_core::HistorySnapshot;
use retailsense_core::stats::{mean, stddev_sample};

/// One calendar day that carried counted sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub revenue: f64,
    pub quantity: u64,
    pub order_count: u32,
    pub avg_order_value: f64,
}

/// Aggregate counted orders placed inside `(as_of - window_days, as_of]`
/// into one row per day, sorted by date.
pub fn aggregate_daily(history: &HistorySnapshot, window_days: i64) -> Vec<DailySales> {
    let start = history.as_of - Duration::days(window_days);
    let mut days: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();

    for order in history.counted_orders().values() {
        if order.created_at <= start {
            continue;
        }
        let date = order.created_at.date_naive();
        let day = days.entry(date).or_insert_with(|| DailySales {
            date,
            revenue: 0.0,
            quantity: 0,
            order_count: 0,
            avg_order_value: 0.0,
        });
        day.revenue += order.total;
        day.quantity += order.quantity;
        day.order_count += 1;
    }

    days.into_values()
        .map(|mut d| {
            d.avg_order_value = if d.order_count > 0 {
                d.revenue / d.order_count as f64
            } else {
                0.0
            };
            d
        })
        .collect()
}

/// Fixed-shape feature record for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayFeatures {
    pub month: f64,
    pub day_of_month: f64,
    pub day_of_week: f64,
    pub day_of_year: f64,
    pub iso_week: f64,
    pub quarter: f64,
    pub is_weekend: f64,
    pub order_count: f64,
    pub avg_order_value: f64,
    pub revenue_7d_mean: f64,
    pub revenue_30d_mean: f64,
    pub revenue_7d_std: f64,
    pub revenue_30d_std: f64,
    pub revenue_lag_1: f64,
    pub revenue_lag_7: f64,
    pub revenue_lag_30: f64,
}

impl DayFeatures {
    pub const NAMES: [&'static str; 16] = [
        "month",
        "day_of_month",
        "day_of_week",
        "day_of_year",
        "iso_week",
        "quarter",
        "is_weekend",
        "order_count",
        "avg_order_value",
        "revenue_7d_mean",
        "revenue_30d_mean",
        "revenue_7d_std",
        "revenue_30d_std",
        "revenue_lag_1",
        "revenue_lag_7",
        "revenue_lag_30",
    ];

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.month,
            self.day_of_month,
            self.day_of_week,
            self.day_of_year,
            self.iso_week,
            self.quarter,
            self.is_weekend,
            self.order_count,
            self.avg_order_value,
            self.revenue_7d_mean,
            self.revenue_30d_mean,
            self.revenue_7d_std,
            self.revenue_30d_std,
            self.revenue_lag_1,
            self.revenue_lag_7,
            self.revenue_lag_30,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_vec().iter().all(|x| x.is_finite())
    }

    fn from_parts(calendar: CalendarParts, history: HistoryParts) -> Self {
        Self {
            month: calendar.month,
            day_of_month: calendar.day_of_month,
            day_of_week: calendar.day_of_week,
            day_of_year: calendar.day_of_year,
            iso_week: calendar.iso_week,
            quarter: calendar.quarter,
            is_weekend: calendar.is_weekend,
            order_count: history.order_count,
            avg_order_value: history.avg_order_value,
            revenue_7d_mean: history.revenue_7d_mean,
            revenue_30d_mean: history.revenue_30d_mean,
            revenue_7d_std: history.revenue_7d_std,
            revenue_30d_std: history.revenue_30d_std,
            revenue_lag_1: history.revenue_lag_1,
            revenue_lag_7: history.revenue_lag_7,
            revenue_lag_30: history.revenue_lag_30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CalendarParts {
    month: f64,
    day_of_month: f64,
    day_of_week: f64,
    day_of_year: f64,
    iso_week: f64,
    quarter: f64,
    is_weekend: f64,
}

fn calendar(date: NaiveDate) -> CalendarParts {
    let dow = date.weekday().num_days_from_monday();
    CalendarParts {
        month: date.month() as f64,
        day_of_month: date.day() as f64,
        day_of_week: dow as f64,
        day_of_year: date.ordinal() as f64,
        iso_week: date.iso_week().week() as f64,
        quarter: ((date.month() - 1) / 3 + 1) as f64,
        is_weekend: if dow >= 5 { 1.0 } else { 0.0 },
    }
}

/// History-derived inputs (everything that is not a calendar part).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryParts {
    pub order_count: f64,
    pub avg_order_value: f64,
    pub revenue_7d_mean: f64,
    pub revenue_30d_mean: f64,
    pub revenue_7d_std: f64,
    pub revenue_30d_std: f64,
    pub revenue_lag_1: f64,
    pub revenue_lag_7: f64,
    pub revenue_lag_30: f64,
}

impl HistoryParts {
    /// Flat stand-in used when there is no recent history to derive from.
    pub const DEFAULT: HistoryParts = HistoryParts {
        order_count: 5.0,
        avg_order_value: 100.0,
        revenue_7d_mean: 500.0,
        revenue_30d_mean: 500.0,
        revenue_7d_std: 50.0,
        revenue_30d_std: 50.0,
        revenue_lag_1: 500.0,
        revenue_lag_7: 500.0,
        revenue_lag_30: 500.0,
    };

    /// Summarize a recent window of days. Every future day shares these values.
    pub fn from_recent(recent: &[DailySales]) -> Option<Self> {
        if recent.is_empty() {
            return None;
        }
        let revenue: Vec<f64> = recent.iter().map(|d| d.revenue).collect();
        let orders: Vec<f64> = recent.iter().map(|d| d.order_count as f64).collect();
        let aov: Vec<f64> = recent.iter().map(|d| d.avg_order_value).collect();
        let n = revenue.len();

        Some(Self {
            order_count: mean(&orders),
            avg_order_value: mean(&aov),
            revenue_7d_mean: mean(tail(&revenue, 7)),
            revenue_30d_mean: mean(&revenue),
            revenue_7d_std: stddev_sample(tail(&revenue, 7)),
            revenue_30d_std: stddev_sample(tail(&revenue, 30)),
            revenue_lag_1: revenue[n - 1],
            revenue_lag_7: if n >= 7 { revenue[n - 7] } else { 0.0 },
            revenue_lag_30: if n >= 30 { revenue[n - 30] } else { 0.0 },
        })
    }

    pub fn is_finite(&self) -> bool {
        [
            self.order_count,
            self.avg_order_value,
            self.revenue_7d_mean,
            self.revenue_30d_mean,
            self.revenue_7d_std,
            self.revenue_30d_std,
            self.revenue_lag_1,
            self.revenue_lag_7,
            self.revenue_lag_30,
        ]
        .iter()
        .all(|x| x.is_finite())
    }
}

fn tail(xs: &[f64], n: usize) -> &[f64] {
    &xs[xs.len().saturating_sub(n)..]
}

/// Feature row for a future date from shared history-derived inputs.
pub fn future_features(date: NaiveDate, history: &HistoryParts) -> DayFeatures {
    DayFeatures::from_parts(calendar(date), *history)
}

/// Training features, one per input row. Rolling windows include the row
/// itself (min one point); lags are row shifts filled with zero.
pub fn build_features(days: &[DailySales]) -> Vec<DayFeatures> {
    let revenue: Vec<f64> = days.iter().map(|d| d.revenue).collect();

    days.iter()
        .enumerate()
        .map(|(i, day)| {
            let w7 = &revenue[(i + 1).saturating_sub(7)..=i];
            let w30 = &revenue[(i + 1).saturating_sub(30)..=i];
            let lag = |k: usize| if i >= k { revenue[i - k] } else { 0.0 };

            DayFeatures::from_parts(
                calendar(day.date),
                HistoryParts {
                    order_count: day.order_count as f64,
                    avg_order_value: day.avg_order_value,
                    revenue_7d_mean: mean(w7),
                    revenue_30d_mean: mean(w30),
                    revenue_7d_std: stddev_sample(w7),
                    revenue_30d_std: stddev_sample(w30),
                    revenue_lag_1: lag(1),
                    revenue_lag_7: lag(7),
                    revenue_lag_30: lag(30),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(date: NaiveDate, revenue: f64) -> DailySales {
        DailySales {
            date,
            revenue,
            quantity: 1,
            order_count: 2,
            avg_order_value: revenue / 2.0,
        }
    }

    fn days(n: usize) -> Vec<DailySales> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| day(start + Duration::days(i as i64), (i + 1) as f64))
            .collect()
    }

    #[test]
    fn calendar_parts_follow_iso_conventions() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        let f = future_features(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap(), &HistoryParts::DEFAULT);
        assert_eq!(f.day_of_week, 0.0);
        assert_eq!(f.iso_week, 1.0);
        assert_eq!(f.quarter, 4.0);
        assert_eq!(f.day_of_year, 365.0);
        assert_eq!(f.is_weekend, 0.0);

        let sat = future_features(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), &HistoryParts::DEFAULT);
        assert_eq!(sat.is_weekend, 1.0);
    }

    #[test]
    fn rolling_windows_include_current_row() {
        let features = build_features(&days(10));
        assert_eq!(features[0].revenue_7d_mean, 1.0);
        assert_eq!(features[0].revenue_7d_std, 0.0);
        // rows 4..=10 -> mean 7
        assert_eq!(features[9].revenue_7d_mean, 7.0);
        assert_eq!(features[9].revenue_30d_mean, 5.5);
    }

    #[test]
    fn lags_are_row_shifts_filled_with_zero() {
        let features = build_features(&days(40));
        assert_eq!(features[0].revenue_lag_1, 0.0);
        assert_eq!(features[1].revenue_lag_1, 1.0);
        assert_eq!(features[6].revenue_lag_7, 0.0);
        assert_eq!(features[7].revenue_lag_7, 1.0);
        assert_eq!(features[35].revenue_lag_30, 6.0);
    }

    #[test]
    fn recent_summary_uses_tail_positions() {
        let recent = days(30);
        let parts = HistoryParts::from_recent(&recent).unwrap();
        assert_eq!(parts.revenue_lag_1, 30.0);
        assert_eq!(parts.revenue_lag_7, 24.0);
        assert_eq!(parts.revenue_lag_30, 1.0);
        assert_eq!(parts.revenue_7d_mean, 27.0);
        assert_eq!(parts.revenue_30d_mean, 15.5);
        assert!(HistoryParts::from_recent(&[]).is_none());
    }

    #[test]
    fn feature_vector_matches_names() {
        let f = build_features(&days(3));
        assert_eq!(f[0].to_vec().len(), DayFeatures::NAMES.len());
    }
}
