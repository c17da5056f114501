//! Read-only overview combining one panel per engine.
//!
//! Panels fail independently: a panel whose source is unavailable (model not
//! trained, history unreadable) is reported with `available = false` and
//! zeroed figures instead of failing the whole summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailsense_forecast::SalesForecast;
use retailsense_inventory::{HealthStatus, InventoryAnalysis, HealthReport};
use retailsense_segmentation::{Segment, SegmentationState};

/// Next-30-day totals above this multiple of the next-7-day total read as rising.
const RISING_RATIO: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesTrend {
    Rising,
    Stable,
    #[serde(rename = "n/a")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPanel {
    pub available: bool,
    pub next_7_days: f64,
    pub next_30_days: f64,
    pub trend: SalesTrend,
}

impl SalesPanel {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            next_7_days: 0.0,
            next_30_days: 0.0,
            trend: SalesTrend::Unavailable,
        }
    }

    /// Built from a 30-day forecast; the 7-day figure is its first week.
    pub fn from_forecast(forecast: &SalesForecast) -> Self {
        let next_7_days: f64 = forecast.points.iter().take(7).map(|p| p.predicted_value).sum();
        let next_30_days = forecast.summary.total_revenue;
        let trend = if next_30_days > RISING_RATIO * next_7_days {
            SalesTrend::Rising
        } else {
            SalesTrend::Stable
        };
        Self {
            available: true,
            next_7_days,
            next_30_days,
            trend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPanel {
    pub available: bool,
    pub total_alerts: usize,
    pub critical_alerts: usize,
    pub health_score: f64,
    pub health_status: Option<HealthStatus>,
}

impl InventoryPanel {
    /// Alerts at or above this urgency count as critical.
    pub const CRITICAL_URGENCY: u8 = 5;

    pub fn unavailable() -> Self {
        Self {
            available: false,
            total_alerts: 0,
            critical_alerts: 0,
            health_score: 0.0,
            health_status: None,
        }
    }

    pub fn from_reports(analysis: &InventoryAnalysis, health: &HealthReport) -> Self {
        Self {
            available: true,
            total_alerts: analysis.summary.total_alerts,
            critical_alerts: analysis
                .alerts
                .iter()
                .filter(|a| a.urgency >= Self::CRITICAL_URGENCY)
                .count(),
            health_score: health.health_score,
            health_status: Some(health.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPanel {
    pub available: bool,
    pub total_customers: usize,
    pub segments: BTreeMap<Segment, usize>,
    pub vip_customers: usize,
    pub at_risk_customers: usize,
}

impl CustomerPanel {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            total_customers: 0,
            segments: BTreeMap::new(),
            vip_customers: 0,
            at_risk_customers: 0,
        }
    }

    pub fn from_state(state: &SegmentationState) -> Self {
        let segments = state.segment_counts();
        Self {
            available: true,
            total_customers: state.assignments.len(),
            vip_customers: segments.get(&Segment::Vip).copied().unwrap_or(0),
            at_risk_customers: segments.get(&Segment::AtRisk).copied().unwrap_or(0),
            segments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityPanel {
    pub available: bool,
    pub indexed_items: usize,
    pub mean_similarity: f64,
}

impl AffinityPanel {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            indexed_items: 0,
            mean_similarity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub sales: SalesPanel,
    pub inventory: InventoryPanel,
    pub customers: CustomerPanel,
    pub affinity: AffinityPanel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use retailsense_core::ArtifactId;
    use retailsense_forecast::{ForecastPoint, ForecastSummary, ModelKind};

    fn forecast(values: &[f64]) -> SalesForecast {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points: Vec<ForecastPoint> = values
            .iter()
            .enumerate()
            .map(|(i, v)| ForecastPoint {
                date: start + chrono::Duration::days(i as i64),
                predicted_value: *v,
                predicted_quantity: 1,
                confidence_lower: v * 0.85,
                confidence_upper: v * 1.15,
            })
            .collect();
        let total: f64 = values.iter().sum();
        SalesForecast {
            artifact_id: ArtifactId::from_u128(1),
            model_kind: ModelKind::Linear,
            summary: ForecastSummary {
                days: points.len(),
                total_revenue: total,
                avg_daily_revenue: total / points.len() as f64,
                total_quantity: points.len() as u64,
            },
            points,
        }
    }

    #[test]
    fn flat_forecast_is_rising_over_a_month() {
        // 30 flat days: 30x > 4 * 7x
        let panel = SalesPanel::from_forecast(&forecast(&[100.0; 30]));
        assert_eq!(panel.next_7_days, 700.0);
        assert_eq!(panel.next_30_days, 3000.0);
        assert_eq!(panel.trend, SalesTrend::Rising);
    }

    #[test]
    fn front_loaded_forecast_is_stable() {
        let mut values = vec![1000.0; 7];
        values.extend(std::iter::repeat_n(10.0, 23));
        let panel = SalesPanel::from_forecast(&forecast(&values));
        assert_eq!(panel.trend, SalesTrend::Stable);
    }

    #[test]
    fn unavailable_trend_serializes_as_na() {
        let value = serde_json::to_value(SalesPanel::unavailable()).unwrap();
        assert_eq!(value["trend"], "n/a");
        assert_eq!(value["available"], false);
    }
}
