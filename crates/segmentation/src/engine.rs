//! Customer Segmentation Engine.
//!
//! Customers are clustered on standardized RFM features; independently, each
//! customer (and each cluster's average profile) is labeled by the segment
//! rule cascade.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use retailsense_core::stats::mean;
use retailsense_core::{
    AnalyticsError, AnalyticsResult, ArtifactStore, CustomerId, HistorySnapshot, ModelType,
    Readiness, StandardScaler, TrainedModelArtifact, Trainer, TrainingRun, load_artifact,
    train_and_store,
};

use crate::features::{CustomerFeatures, features_for, qualifying_customers};
use crate::kmeans::{KMeans, KMeansParams, silhouette_score};
use crate::segment::Segment;

/// Qualifying customers required regardless of the requested cluster count.
pub const MIN_CUSTOMERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationSettings {
    pub cluster_count: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    pub seed: u64,
    pub ltv_horizon_months: f64,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            cluster_count: 6,
            restarts: 10,
            max_iterations: 300,
            seed: 42,
            ltv_horizon_months: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationTrainParams {
    pub cluster_count: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

impl SegmentationTrainParams {
    pub fn from_settings(settings: &SegmentationSettings) -> Self {
        Self {
            cluster_count: settings.cluster_count,
            restarts: settings.restarts,
            max_iterations: settings.max_iterations,
            seed: settings.seed,
        }
    }

    pub fn with_cluster_count(mut self, cluster_count: usize) -> Self {
        self.cluster_count = cluster_count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub size: usize,
    pub avg_recency: f64,
    pub avg_frequency: f64,
    pub avg_monetary: f64,
    pub avg_order_value: f64,
    pub avg_purchase_frequency: f64,
    pub name: Segment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAssignment {
    pub customer_id: CustomerId,
    pub cluster_id: usize,
    pub segment_label: Segment,
    pub characteristics: CustomerFeatures,
    pub lifetime_value_estimate: f64,
    pub recommended_actions: Vec<String>,
}

/// Fitted state persisted in the `customer_segmentation` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationState {
    pub scaler: StandardScaler,
    pub kmeans: KMeans,
    pub profiles: Vec<ClusterProfile>,
    pub assignments: Vec<SegmentAssignment>,
}

impl SegmentationState {
    /// Number of assigned customers per segment label.
    pub fn segment_counts(&self) -> BTreeMap<Segment, usize> {
        let mut counts = BTreeMap::new();
        for a in &self.assignments {
            *counts.entry(a.segment_label).or_insert(0) += 1;
        }
        counts
    }
}

pub struct CustomerSegmentationEngine<S> {
    store: S,
    settings: SegmentationSettings,
}

impl<S: ArtifactStore> CustomerSegmentationEngine<S> {
    pub fn new(store: S, settings: SegmentationSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &SegmentationSettings {
        &self.settings
    }

    pub fn train(
        &self,
        history: &HistorySnapshot,
        params: &SegmentationTrainParams,
    ) -> AnalyticsResult<TrainedModelArtifact<SegmentationState>> {
        if params.cluster_count == 0 {
            return Err(AnalyticsError::invalid_input("cluster_count must be at least 1"));
        }
        train_and_store(self, &self.store, history, params)
    }

    pub fn load(&self) -> AnalyticsResult<TrainedModelArtifact<SegmentationState>> {
        load_artifact(&self.store, ModelType::CustomerSegmentation)
    }

    /// Assign one customer with the stored model. Customers without counted
    /// orders are still scored (recency takes the no-order sentinel).
    pub fn predict_for_customer(
        &self,
        history: &HistorySnapshot,
        customer_id: CustomerId,
    ) -> AnalyticsResult<SegmentAssignment> {
        let artifact = self.load()?;
        let features = features_for(history, customer_id)?;
        let assignment = self.assign(&artifact.fitted_state, customer_id, features)?;
        debug!(
            customer_id = %customer_id,
            cluster_id = assignment.cluster_id,
            segment = %assignment.segment_label,
            "customer segmented"
        );
        Ok(assignment)
    }

    /// Re-assign every qualifying customer with the stored model.
    pub fn segment_all(&self, history: &HistorySnapshot) -> AnalyticsResult<Vec<SegmentAssignment>> {
        let artifact = self.load()?;
        let assignments = qualifying_customers(history)
            .into_iter()
            .map(|(id, f)| self.assign(&artifact.fitted_state, id, f))
            .collect::<AnalyticsResult<Vec<_>>>()?;
        info!(artifact_id = %artifact.id, customers = assignments.len(), "customers segmented");
        Ok(assignments)
    }

    fn assign(
        &self,
        state: &SegmentationState,
        customer_id: CustomerId,
        features: CustomerFeatures,
    ) -> AnalyticsResult<SegmentAssignment> {
        let scaled = state.scaler.transform_row(&features.to_vec())?;
        let cluster_id = state.kmeans.predict(&scaled);
        Ok(assignment(customer_id, cluster_id, features, self.settings.ltv_horizon_months))
    }
}

fn assignment(
    customer_id: CustomerId,
    cluster_id: usize,
    features: CustomerFeatures,
    horizon_months: f64,
) -> SegmentAssignment {
    let segment = Segment::classify(features.recency_days, features.frequency, features.monetary);
    SegmentAssignment {
        customer_id,
        cluster_id,
        segment_label: segment,
        characteristics: features,
        lifetime_value_estimate: features.lifetime_value(horizon_months),
        recommended_actions: segment.recommended_actions().iter().map(|s| s.to_string()).collect(),
    }
}

fn profiles(features: &[CustomerFeatures], labels: &[usize], k: usize) -> Vec<ClusterProfile> {
    (0..k)
        .filter_map(|cluster_id| {
            let members: Vec<&CustomerFeatures> = features
                .iter()
                .zip(labels)
                .filter(|(_, l)| **l == cluster_id)
                .map(|(f, _)| f)
                .collect();
            if members.is_empty() {
                return None;
            }
            let avg = |get: fn(&CustomerFeatures) -> f64| {
                let values: Vec<f64> = members.iter().map(|f| get(f)).collect();
                mean(&values)
            };
            let avg_recency = avg(|f: &CustomerFeatures| f.recency_days);
            let avg_frequency = avg(|f: &CustomerFeatures| f.frequency);
            let avg_monetary = avg(|f: &CustomerFeatures| f.monetary);
            Some(ClusterProfile {
                cluster_id,
                size: members.len(),
                avg_recency,
                avg_frequency,
                avg_monetary,
                avg_order_value: avg(|f: &CustomerFeatures| f.avg_order_value),
                avg_purchase_frequency: avg(|f: &CustomerFeatures| f.purchase_frequency_monthly),
                name: Segment::classify(avg_recency, avg_frequency, avg_monetary),
            })
        })
        .collect()
}

impl<S: ArtifactStore> Trainer for CustomerSegmentationEngine<S> {
    type Params = SegmentationTrainParams;
    type State = SegmentationState;

    fn model_type(&self) -> ModelType {
        ModelType::CustomerSegmentation
    }

    fn can_train(&self, history: &HistorySnapshot, params: &SegmentationTrainParams) -> Readiness {
        let required = MIN_CUSTOMERS.max(params.cluster_count);
        let found = qualifying_customers(history).len();
        if found < required {
            Readiness::not_ready(format!(
                "need at least {required} customers with completed orders for {} clusters, found {found}",
                params.cluster_count
            ))
        } else {
            Readiness::Ready
        }
    }

    fn fit(
        &self,
        history: &HistorySnapshot,
        params: &SegmentationTrainParams,
    ) -> AnalyticsResult<TrainingRun<SegmentationState>> {
        if params.cluster_count == 0 {
            return Err(AnalyticsError::invalid_input("cluster_count must be at least 1"));
        }
        let customers = qualifying_customers(history);
        let features: Vec<CustomerFeatures> = customers.iter().map(|(_, f)| *f).collect();
        let rows: Vec<Vec<f64>> = features.iter().map(CustomerFeatures::to_vec).collect();

        let scaler = StandardScaler::fit(&rows)?;
        let scaled = scaler.transform(&rows)?;
        let kmeans = KMeans::fit(
            &scaled,
            KMeansParams {
                k: params.cluster_count,
                restarts: params.restarts,
                max_iterations: params.max_iterations,
                seed: params.seed,
            },
        )?;
        let labels = kmeans.labels(&scaled);
        let silhouette = silhouette_score(&scaled, &labels);
        let profiles = profiles(&features, &labels, params.cluster_count);

        let assignments: Vec<SegmentAssignment> = customers
            .iter()
            .zip(&labels)
            .map(|((id, f), cluster)| assignment(*id, *cluster, *f, self.settings.ltv_horizon_months))
            .collect();

        info!(
            customers = customers.len(),
            clusters = params.cluster_count,
            inertia = kmeans.inertia,
            silhouette,
            "customer clusters fitted"
        );

        let cluster_sizes: BTreeMap<String, usize> =
            profiles.iter().map(|p| (p.cluster_id.to_string(), p.size)).collect();
        let cluster_names: BTreeMap<String, Segment> =
            profiles.iter().map(|p| (p.cluster_id.to_string(), p.name)).collect();
        let metrics = json!({
            "n_clusters": params.cluster_count,
            "n_customers": customers.len(),
            "inertia": kmeans.inertia,
            "silhouette_score": silhouette,
            "iterations": kmeans.iterations,
            "cluster_sizes": cluster_sizes,
            "cluster_names": cluster_names,
            "cluster_profiles": profiles,
        });

        Ok(TrainingRun {
            training_sample_size: customers.len(),
            state: SegmentationState {
                scaler,
                kmeans,
                profiles,
                assignments,
            },
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::NO_ORDER_RECENCY_DAYS;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use retailsense_core::{CustomerRecord, ItemId, OrderId, OrderStatus, TransactionEvent};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::RwLock;

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

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    struct Builder {
        history: HistorySnapshot,
        next_order: u128,
    }

    impl Builder {
        fn new() -> Self {
            Self {
                history: HistorySnapshot::new(as_of()),
                next_order: 1,
            }
        }

        fn customer(mut self, id: u128, registered_days_ago: i64) -> Self {
            self.history.customers.push(CustomerRecord {
                customer_id: CustomerId::from_u128(id),
                registered_at: as_of() - Duration::days(registered_days_ago),
            });
            self
        }

        /// `count` orders of `amount`, the most recent `recency` days ago.
        fn orders(mut self, customer: u128, count: u32, amount: f64, recency: i64) -> Self {
            for k in 0..count {
                self.history.transactions.push(TransactionEvent {
                    order_id: OrderId::from_u128(self.next_order),
                    customer_id: CustomerId::from_u128(customer),
                    item_id: ItemId::from_u128(1),
                    variant_id: None,
                    quantity: 1,
                    unit_price: amount,
                    status: OrderStatus::Completed,
                    created_at: as_of() - Duration::days(recency + k as i64 * 3),
                });
                self.next_order += 1;
            }
            self
        }
    }

    fn engine() -> CustomerSegmentationEngine<MapStore> {
        CustomerSegmentationEngine::new(MapStore::default(), SegmentationSettings::default())
    }

    fn params(k: usize) -> SegmentationTrainParams {
        SegmentationTrainParams::from_settings(&SegmentationSettings::default()).with_cluster_count(k)
    }

    fn mixed_customers() -> HistorySnapshot {
        Builder::new()
            .customer(1, 400)
            .orders(1, 8, 300.0, 5)
            .customer(2, 300)
            .orders(2, 5, 80.0, 20)
            .customer(3, 200)
            .orders(3, 1, 40.0, 30)
            .customer(4, 500)
            .orders(4, 2, 60.0, 250)
            .customer(5, 365)
            .orders(5, 1, 25.0, 120)
            .customer(6, 20)
            .orders(6, 1, 90.0, 10)
            .customer(7, 100)
            .orders(7, 4, 150.0, 15)
            .customer(99, 30)
            .history
    }

    #[test]
    fn scenario_c_zero_order_customer_is_excluded_but_scorable() {
        let engine = engine();
        let history = mixed_customers();
        let artifact = engine.train(&history, &params(3)).unwrap();

        let assigned: BTreeSet<CustomerId> = artifact
            .fitted_state
            .assignments
            .iter()
            .map(|a| a.customer_id)
            .collect();
        assert_eq!(assigned.len(), 7);
        assert!(!assigned.contains(&CustomerId::from_u128(99)));

        let lonely = engine.predict_for_customer(&history, CustomerId::from_u128(99)).unwrap();
        assert_eq!(lonely.characteristics.recency_days, NO_ORDER_RECENCY_DAYS);
        assert!(matches!(lonely.segment_label, Segment::New | Segment::Inactive));
        assert!(lonely.cluster_id < 3);
        assert_eq!(lonely.lifetime_value_estimate, 0.0);
    }

    #[test]
    fn vip_customer_gets_label_ltv_and_actions() {
        let engine = engine();
        let history = mixed_customers();
        engine.train(&history, &params(3)).unwrap();

        let vip = engine.predict_for_customer(&history, CustomerId::from_u128(1)).unwrap();
        assert_eq!(vip.segment_label, Segment::Vip);
        assert_eq!(vip.recommended_actions.len(), 4);
        let f = vip.characteristics;
        let expected = f.avg_order_value * f.purchase_frequency_monthly * 24.0;
        assert!((vip.lifetime_value_estimate - expected).abs() < 1e-9);
    }

    #[test]
    fn too_few_customers_is_insufficient() {
        let history = Builder::new()
            .orders(1, 1, 10.0, 1)
            .orders(2, 1, 10.0, 1)
            .orders(3, 1, 10.0, 1)
            .history;
        assert!(matches!(
            engine().train(&history, &params(2)),
            Err(AnalyticsError::InsufficientData(_))
        ));
        // more clusters than qualifying customers
        assert!(matches!(
            engine().train(&mixed_customers(), &params(8)),
            Err(AnalyticsError::InsufficientData(_))
        ));
    }

    #[test]
    fn zero_clusters_is_invalid_input() {
        assert!(matches!(
            engine().train(&mixed_customers(), &params(0)),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn unknown_customer_is_not_found() {
        let engine = engine();
        let history = mixed_customers();
        engine.train(&history, &params(3)).unwrap();
        assert!(matches!(
            engine.predict_for_customer(&history, CustomerId::from_u128(12345)),
            Err(AnalyticsError::NotFound(_))
        ));
    }

    #[test]
    fn segment_all_matches_training_assignments() {
        let engine = engine();
        let history = mixed_customers();
        let artifact = engine.train(&history, &params(3)).unwrap();
        let again = engine.segment_all(&history).unwrap();
        assert_eq!(again, artifact.fitted_state.assignments);
    }

    #[test]
    fn metrics_report_quality_and_profiles() {
        let artifact = engine().train(&mixed_customers(), &params(3)).unwrap();
        let m = &artifact.quality_metrics;
        assert!(m["inertia"].as_f64().unwrap() >= 0.0);
        let s = m["silhouette_score"].as_f64().unwrap();
        assert!((-1.0..=1.0).contains(&s));
        let total: usize = artifact.fitted_state.profiles.iter().map(|p| p.size).sum();
        assert_eq!(total, 7);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn every_customer_gets_one_cluster_in_range(
            customers in prop::collection::vec((1u32..10, 5.0f64..500.0, 0i64..400), 6..20),
            k in 1usize..6,
        ) {
            let mut b = Builder::new();
            for (i, (count, amount, recency)) in customers.iter().enumerate() {
                b = b.customer(i as u128 + 1, 400 + *recency).orders(i as u128 + 1, *count, *amount, *recency);
            }
            let history = b.history;

            let engine = engine();
            let artifact = engine.train(&history, &params(k)).unwrap();
            let assignments = &artifact.fitted_state.assignments;
            prop_assert_eq!(assignments.len(), customers.len());
            let ids: BTreeSet<CustomerId> = assignments.iter().map(|a| a.customer_id).collect();
            prop_assert_eq!(ids.len(), customers.len());
            for a in assignments {
                prop_assert!(a.cluster_id < k);
                prop_assert!(Segment::ALL.contains(&a.segment_label));
            }
        }
    }
}
