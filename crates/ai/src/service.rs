//! Call-boundary facade over the four engines.
//!
//! Every call takes a fresh snapshot from the [`HistoryReader`], so results
//! always reflect the history at call time. Training calls report failures in
//! a [`TrainingReport`]; prediction and analysis calls return
//! `AnalyticsResult` and emit a [`PredictionRecord`] on success.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, error, info, warn};

use retailsense_affinity::{
    AffinitySettings, AffinityTrainParams, CrossSellOpportunity, ProductAffinityEngine, Recommendation,
};
use retailsense_core::{
    AnalyticsError, AnalyticsResult, ArtifactId, ArtifactStore, CustomerId, Estimate, HistoryReader,
    HistorySnapshot, ItemId, ModelType, TrainedModelArtifact,
};
use retailsense_forecast::{
    ForecastSettings, ModelKind, SalesForecast, SalesForecastEngine, SalesTrainParams,
};
use retailsense_inventory::{
    HealthReport, InventoryAnalysis, InventoryOptimizer, InventorySettings, ReorderPlan, SlowMovingReport,
};
use retailsense_segmentation::{
    CustomerSegmentationEngine, SegmentAssignment, SegmentationSettings, SegmentationTrainParams,
};

use crate::dashboard::{AffinityPanel, CustomerPanel, DashboardSummary, InventoryPanel, SalesPanel};
use crate::report::{PredictionRecord, TrainingLogEntry, TrainingReport};
use crate::sink::InsightSink;

/// Forecast horizon used by the dashboard's sales panel.
const DASHBOARD_HORIZON_DAYS: u32 = 30;

/// Tunables for every engine, grouped the way they appear in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub forecast: ForecastSettings,
    pub affinity: AffinitySettings,
    pub segmentation: SegmentationSettings,
    pub inventory: InventorySettings,
}

pub struct AnalyticsService<S, R, K> {
    reader: R,
    sink: K,
    forecast: SalesForecastEngine<Arc<S>>,
    affinity: ProductAffinityEngine<Arc<S>>,
    segmentation: CustomerSegmentationEngine<Arc<S>>,
    inventory: InventoryOptimizer,
}

impl<S, R, K> AnalyticsService<S, R, K>
where
    S: ArtifactStore,
    R: HistoryReader,
    K: InsightSink,
{
    pub fn new(store: Arc<S>, reader: R, sink: K, settings: EngineSettings) -> Self {
        Self {
            reader,
            sink,
            forecast: SalesForecastEngine::new(store.clone(), settings.forecast),
            affinity: ProductAffinityEngine::new(store.clone(), settings.affinity),
            segmentation: CustomerSegmentationEngine::new(store, settings.segmentation),
            inventory: InventoryOptimizer::new(settings.inventory),
        }
    }

    pub fn forecast_engine(&self) -> &SalesForecastEngine<Arc<S>> {
        &self.forecast
    }

    pub fn affinity_engine(&self) -> &ProductAffinityEngine<Arc<S>> {
        &self.affinity
    }

    pub fn segmentation_engine(&self) -> &CustomerSegmentationEngine<Arc<S>> {
        &self.segmentation
    }

    pub fn inventory_optimizer(&self) -> &InventoryOptimizer {
        &self.inventory
    }

    // ---- training ----

    /// Train the forecaster with `model_kind`, or the configured kind.
    pub fn train_sales_forecast(&self, model_kind: Option<ModelKind>) -> TrainingReport {
        let params = SalesTrainParams::from_settings(self.forecast.settings());
        let params = match model_kind {
            Some(kind) => params.with_model_kind(kind),
            None => params,
        };
        self.run_training(ModelType::SalesForecast, |history| self.forecast.train(history, &params))
    }

    pub fn train_product_affinity(&self) -> TrainingReport {
        let params = AffinityTrainParams::from_settings(self.affinity.settings());
        self.run_training(ModelType::ProductAffinity, |history| self.affinity.train(history, &params))
    }

    /// Train the segmenter with `cluster_count` clusters, or the configured count.
    pub fn train_customer_segmentation(&self, cluster_count: Option<usize>) -> TrainingReport {
        let params = SegmentationTrainParams::from_settings(self.segmentation.settings());
        let params = match cluster_count {
            Some(k) => params.with_cluster_count(k),
            None => params,
        };
        self.run_training(ModelType::CustomerSegmentation, |history| {
            self.segmentation.train(history, &params)
        })
    }

    fn run_training<T>(
        &self,
        model_type: ModelType,
        train: impl FnOnce(&HistorySnapshot) -> AnalyticsResult<TrainedModelArtifact<T>>,
    ) -> TrainingReport {
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcome = self.reader.snapshot().and_then(|history| train(&history));
        let report = match outcome {
            Ok(artifact) => {
                info!(
                    model_type = %model_type,
                    artifact_id = %artifact.id,
                    samples = artifact.training_sample_size,
                    "training succeeded"
                );
                TrainingReport::succeeded(model_type, artifact.id, artifact.training_sample_size)
                    .with_metrics(artifact.quality_metrics)
            }
            Err(e) => {
                if is_data_condition(&e) {
                    warn!(model_type = %model_type, reason = %e, "training skipped");
                } else {
                    error!(model_type = %model_type, error = %e, "training failed");
                }
                TrainingReport::failed(model_type, e.to_string())
            }
        }
        .with_duration_ms(elapsed_ms(clock));

        self.sink
            .record_training(TrainingLogEntry::from_report(&report, started_at));
        report
    }

    // ---- prediction ----

    /// Forecast `days_ahead` days, or the configured default horizon.
    pub fn predict_sales(&self, days_ahead: Option<u32>) -> AnalyticsResult<Estimate<SalesForecast>> {
        let days_ahead = days_ahead.unwrap_or(self.forecast.settings().default_days_ahead);
        let clock = Instant::now();
        let history = self.reader.snapshot()?;
        let forecast = self.forecast.predict(&history, days_ahead)?;
        self.emit(
            "predict_sales",
            Some(ModelType::SalesForecast),
            Some(forecast.value().artifact_id),
            json!({ "days_ahead": days_ahead }),
            &forecast,
            clock,
        );
        Ok(forecast)
    }

    pub fn recommend_products(&self, item_id: ItemId, top_n: usize) -> AnalyticsResult<Estimate<Vec<Recommendation>>> {
        let clock = Instant::now();
        let history = self.reader.snapshot()?;
        let recommendations = self.affinity.recommend(&history, item_id, top_n)?;
        self.emit(
            "recommend_products",
            Some(ModelType::ProductAffinity),
            None,
            json!({ "item_id": item_id, "top_n": top_n }),
            &recommendations,
            clock,
        );
        Ok(recommendations)
    }

    pub fn cross_sell_opportunities(&self) -> AnalyticsResult<Vec<CrossSellOpportunity>> {
        let clock = Instant::now();
        let opportunities = self.affinity.cross_sell_candidates()?;
        self.emit(
            "cross_sell_opportunities",
            Some(ModelType::ProductAffinity),
            None,
            JsonValue::Null,
            &opportunities,
            clock,
        );
        Ok(opportunities)
    }

    pub fn segment_customer(&self, customer_id: CustomerId) -> AnalyticsResult<SegmentAssignment> {
        let clock = Instant::now();
        let history = self.reader.snapshot()?;
        let assignment = self.segmentation.predict_for_customer(&history, customer_id)?;
        self.emit(
            "segment_customer",
            Some(ModelType::CustomerSegmentation),
            None,
            json!({ "customer_id": customer_id }),
            &assignment,
            clock,
        );
        Ok(assignment)
    }

    pub fn segment_all_customers(&self) -> AnalyticsResult<Vec<SegmentAssignment>> {
        let clock = Instant::now();
        let history = self.reader.snapshot()?;
        let assignments = self.segmentation.segment_all(&history)?;
        self.emit(
            "segment_all_customers",
            Some(ModelType::CustomerSegmentation),
            None,
            JsonValue::Null,
            &assignments,
            clock,
        );
        Ok(assignments)
    }

    // ---- inventory ----

    pub fn analyze_inventory(&self) -> AnalyticsResult<InventoryAnalysis> {
        let clock = Instant::now();
        let analysis = self.inventory.analyze_all(&self.reader.snapshot()?);
        self.emit("analyze_inventory", None, None, JsonValue::Null, &analysis, clock);
        Ok(analysis)
    }

    pub fn reorder_recommendations(&self) -> AnalyticsResult<ReorderPlan> {
        let clock = Instant::now();
        let plan = self.inventory.reorder_recommendations(&self.reader.snapshot()?);
        self.emit("reorder_recommendations", None, None, JsonValue::Null, &plan, clock);
        Ok(plan)
    }

    pub fn inventory_health(&self) -> AnalyticsResult<HealthReport> {
        let clock = Instant::now();
        let report = self.inventory.health_score(&self.reader.snapshot()?);
        self.emit("inventory_health", None, None, JsonValue::Null, &report, clock);
        Ok(report)
    }

    /// Slow movers over `threshold_days`, or the configured threshold.
    pub fn slow_moving_items(&self, threshold_days: Option<u32>) -> AnalyticsResult<SlowMovingReport> {
        let threshold_days = threshold_days.unwrap_or(self.inventory.settings().slow_moving_days);
        let clock = Instant::now();
        let report = self
            .inventory
            .slow_moving_items(&self.reader.snapshot()?, threshold_days)?;
        self.emit(
            "slow_moving_items",
            None,
            None,
            json!({ "threshold_days": threshold_days }),
            &report,
            clock,
        );
        Ok(report)
    }

    // ---- dashboard ----

    pub fn dashboard_summary(&self) -> DashboardSummary {
        let history = self.reader.snapshot();
        if let Err(e) = &history {
            warn!(error = %e, "history unavailable for dashboard");
        }
        let history = history.ok();

        let sales = history
            .as_ref()
            .and_then(|h| panel("sales", self.forecast.predict(h, DASHBOARD_HORIZON_DAYS)))
            .map_or_else(SalesPanel::unavailable, |f| SalesPanel::from_forecast(f.value()));

        let inventory = history.as_ref().map_or_else(InventoryPanel::unavailable, |h| {
            InventoryPanel::from_reports(&self.inventory.analyze_all(h), &self.inventory.health_score(h))
        });

        let customers = panel("customers", self.segmentation.load())
            .map_or_else(CustomerPanel::unavailable, |a| CustomerPanel::from_state(&a.fitted_state));

        let affinity = panel("affinity", self.affinity.model_overview()).map_or_else(
            AffinityPanel::unavailable,
            |(_, indexed_items, mean_similarity)| AffinityPanel {
                available: true,
                indexed_items,
                mean_similarity,
            },
        );

        DashboardSummary {
            generated_at: Utc::now(),
            sales,
            inventory,
            customers,
            affinity,
        }
    }

    fn emit<T: Serialize>(
        &self,
        operation: &str,
        model_type: Option<ModelType>,
        artifact_id: Option<ArtifactId>,
        input: JsonValue,
        result: &T,
        clock: Instant,
    ) {
        let result = match serde_json::to_value(result) {
            Ok(value) => value,
            Err(e) => {
                warn!(operation, error = %e, "prediction record not encodable");
                return;
            }
        };
        debug!(operation, "prediction recorded");
        self.sink.record_prediction(PredictionRecord {
            operation: operation.to_string(),
            model_type,
            artifact_id,
            input,
            result,
            execution_time_ms: elapsed_ms(clock),
            created_at: Utc::now(),
        });
    }
}

/// Expected outcomes of thin or degenerate data, as opposed to faults.
fn is_data_condition(e: &AnalyticsError) -> bool {
    matches!(
        e,
        AnalyticsError::InsufficientData(_) | AnalyticsError::NoSimilarityData | AnalyticsError::InvalidInput(_)
    )
}

fn panel<T>(name: &str, source: AnalyticsResult<T>) -> Option<T> {
    source
        .map_err(|e| debug!(panel = name, reason = %e, "dashboard panel unavailable"))
        .ok()
}

fn elapsed_ms(clock: Instant) -> u64 {
    clock.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, RwLock};

    use chrono::{DateTime, Duration, TimeZone};
    use retailsense_core::{CatalogItem, CustomerRecord, OrderId, OrderStatus, TransactionEvent};

    use crate::report::TrainingStatus;

    #[derive(Default)]
    struct MapStore(RwLock<HashMap<ModelType, Vec<u8>>>);

    impl ArtifactStore for MapStore {
        fn save(&self, model_type: ModelType, blob: &[u8]) -> AnalyticsResult<()> {
            self.0.write().unwrap().insert(model_type, blob.to_vec());
            Ok(())
        }

        fn load(&self, model_type: ModelType) -> AnalyticsResult<Option<Vec<u8>>> {
            Ok(self.0.read().unwrap().get(&model_type).cloned())
        }
    }

    struct SwapReader(RwLock<HistorySnapshot>);

    impl HistoryReader for SwapReader {
        fn snapshot(&self) -> AnalyticsResult<HistorySnapshot> {
            Ok(self.0.read().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        training: Mutex<Vec<TrainingLogEntry>>,
        predictions: Mutex<Vec<PredictionRecord>>,
    }

    impl InsightSink for RecordingSink {
        fn record_training(&self, entry: TrainingLogEntry) {
            self.training.lock().unwrap().push(entry);
        }

        fn record_prediction(&self, record: PredictionRecord) {
            self.predictions.lock().unwrap().push(record);
        }
    }

    type TestService = AnalyticsService<MapStore, Arc<SwapReader>, Arc<RecordingSink>>;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    /// Eight customers with increasing order counts and spend.
    fn customers_history() -> HistorySnapshot {
        let mut history = HistorySnapshot::new(as_of());
        history.catalog.push(CatalogItem {
            item_id: ItemId::from_u128(1),
            name: "Tote".into(),
            category: None,
            brand: None,
            target_demographic: None,
            season: None,
            price: 30.0,
            active: true,
            stock_by_variant: Vec::new(),
        });
        let mut order = 0u128;
        for c in 1..=8u128 {
            history.customers.push(CustomerRecord {
                customer_id: CustomerId::from_u128(c),
                registered_at: as_of() - Duration::days(200),
            });
            for n in 0..c {
                order += 1;
                history.transactions.push(TransactionEvent {
                    order_id: OrderId::from_u128(order),
                    customer_id: CustomerId::from_u128(c),
                    item_id: ItemId::from_u128(1),
                    variant_id: None,
                    quantity: 1,
                    unit_price: 40.0 * c as f64,
                    status: OrderStatus::Delivered,
                    created_at: as_of() - Duration::days((c * 11 + n as u128 * 3) as i64),
                });
            }
        }
        history
    }

    fn service(history: HistorySnapshot) -> (TestService, Arc<SwapReader>, Arc<RecordingSink>) {
        let reader = Arc::new(SwapReader(RwLock::new(history)));
        let sink = Arc::new(RecordingSink::default());
        let service = AnalyticsService::new(
            Arc::new(MapStore::default()),
            reader.clone(),
            sink.clone(),
            EngineSettings::default(),
        );
        (service, reader, sink)
    }

    #[test]
    fn failed_retrain_keeps_previous_artifact() {
        let (service, reader, sink) = service(customers_history());

        let first = service.train_customer_segmentation(Some(3));
        assert!(first.success, "{:?}", first.error);
        let first_id = first.artifact_id.unwrap();

        *reader.0.write().unwrap() = HistorySnapshot::new(as_of());
        let second = service.train_customer_segmentation(Some(3));
        assert!(!second.success);
        assert!(second.artifact_id.is_none());
        assert!(second.error.as_deref().unwrap().contains("insufficient data"));

        assert_eq!(service.segmentation_engine().load().unwrap().id, first_id);

        let log = sink.training.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].status, TrainingStatus::Completed);
        assert_eq!(log[0].records_processed, 8);
        assert_eq!(log[1].status, TrainingStatus::Failed);
    }

    #[test]
    fn zero_clusters_is_reported_not_raised() {
        let (service, _, _) = service(customers_history());
        let report = service.train_customer_segmentation(Some(0));
        assert!(!report.success);
        assert!(report.error.unwrap().contains("invalid input"));
    }

    #[test]
    fn predictions_are_recorded() {
        let (service, _, sink) = service(customers_history());
        assert!(service.train_customer_segmentation(Some(3)).success);

        let assignment = service.segment_customer(CustomerId::from_u128(8)).unwrap();
        assert_eq!(assignment.customer_id, CustomerId::from_u128(8));
        service.inventory_health().unwrap();

        let records = sink.predictions.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].operation, "segment_customer");
        assert_eq!(records[0].model_type, Some(ModelType::CustomerSegmentation));
        assert_eq!(records[1].operation, "inventory_health");
        assert_eq!(records[1].model_type, None);
    }

    #[test]
    fn failed_predictions_are_not_recorded() {
        let (service, _, sink) = service(customers_history());
        assert!(matches!(
            service.predict_sales(Some(7)),
            Err(AnalyticsError::ModelNotTrained(ModelType::SalesForecast))
        ));
        assert!(sink.predictions.lock().unwrap().is_empty());
    }

    #[test]
    fn dashboard_degrades_per_panel() {
        let (service, _, _) = service(customers_history());
        assert!(service.train_customer_segmentation(Some(3)).success);

        let summary = service.dashboard_summary();
        assert!(!summary.sales.available);
        assert!(!summary.affinity.available);
        assert!(summary.inventory.available);
        assert!(summary.customers.available);
        assert_eq!(summary.customers.total_customers, 8);
        assert_eq!(summary.customers.segments.values().sum::<usize>(), 8);
    }
}
