//! Product Affinity Engine: hybrid similarity model and recommendations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use retailsense_core::{
    AnalyticsError, AnalyticsResult, ArtifactId, ArtifactStore, CatalogItem, Estimate,
    HistorySnapshot, ItemId, ModelType, Readiness, TrainedModelArtifact, Trainer, TrainingRun,
    load_artifact, train_and_store,
};

use crate::similarity::{ContentFeatures, ItemIndex, SimilarityMatrix, co_purchase_matrix, content_matrix};

/// Score given to every popularity-fallback recommendation.
pub const POPULARITY_SCORE: f64 = 0.5;
pub const POPULARITY_REASON: &str = "popular_item";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinitySettings {
    pub co_purchase_weight: f64,
    pub content_weight: f64,
    pub cross_sell_threshold: f64,
    pub cross_sell_per_item: usize,
    pub cross_sell_limit: usize,
}

impl Default for AffinitySettings {
    fn default() -> Self {
        Self {
            co_purchase_weight: 0.7,
            content_weight: 0.3,
            cross_sell_threshold: 0.3,
            cross_sell_per_item: 3,
            cross_sell_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityTrainParams {
    pub co_purchase_weight: f64,
    pub content_weight: f64,
}

impl AffinityTrainParams {
    pub fn from_settings(settings: &AffinitySettings) -> Self {
        Self {
            co_purchase_weight: settings.co_purchase_weight,
            content_weight: settings.content_weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    Hybrid,
    CoPurchase,
    Content,
}

/// Fitted state persisted in the `product_affinity` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityState {
    pub index: ItemIndex,
    pub similarity: SimilarityMatrix,
    pub method: SimilarityMethod,
}

/// Directed, ranked similarity from a source item to a recommended one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityEdge {
    pub source_item: ItemId,
    pub target_item: ItemId,
    pub score: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub edge: AffinityEdge,
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSellOpportunity {
    pub item_a: ItemId,
    pub item_b: ItemId,
    pub score: f64,
}

pub struct ProductAffinityEngine<S> {
    store: S,
    settings: AffinitySettings,
}

impl<S: ArtifactStore> ProductAffinityEngine<S> {
    pub fn new(store: S, settings: AffinitySettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &AffinitySettings {
        &self.settings
    }

    pub fn train(
        &self,
        history: &HistorySnapshot,
        params: &AffinityTrainParams,
    ) -> AnalyticsResult<TrainedModelArtifact<AffinityState>> {
        train_and_store(self, &self.store, history, params)
    }

    pub fn load(&self) -> AnalyticsResult<TrainedModelArtifact<AffinityState>> {
        load_artifact(&self.store, ModelType::ProductAffinity)
    }

    /// Top `top_n` items most similar to `item_id`.
    ///
    /// Items outside the trained index get the popularity ranking instead,
    /// tagged as a fallback. Items no longer active are skipped.
    pub fn recommend(
        &self,
        history: &HistorySnapshot,
        item_id: ItemId,
        top_n: usize,
    ) -> AnalyticsResult<Estimate<Vec<Recommendation>>> {
        if top_n == 0 {
            return Err(AnalyticsError::invalid_input("top_n must be at least 1"));
        }
        let artifact = self.load()?;
        let state = &artifact.fitted_state;
        let catalog = active_catalog(history);

        let Some(row) = state.index.position(item_id) else {
            warn!(item_id = %item_id, "item not in affinity index, using popularity ranking");
            return Ok(Estimate::fallback(
                popular_items(history, item_id, top_n),
                POPULARITY_REASON,
            ));
        };

        let recommendations: Vec<Recommendation> = state
            .similarity
            .ranked_neighbors(row)
            .into_iter()
            .filter_map(|(col, score)| {
                let target = state.index.id(col);
                catalog.get(&target).map(|item| (item, score))
            })
            .take(top_n)
            .enumerate()
            .map(|(i, (item, score))| Recommendation {
                edge: AffinityEdge {
                    source_item: item_id,
                    target_item: item.item_id,
                    score,
                    rank: i + 1,
                },
                name: item.name.clone(),
                price: item.price,
                reason: None,
            })
            .collect();

        debug!(
            artifact_id = %artifact.id,
            item_id = %item_id,
            returned = recommendations.len(),
            "recommendations produced"
        );
        Ok(Estimate::predicted(recommendations))
    }

    /// Strongest pairs across the whole index: each item's best neighbours
    /// above the threshold, ranked globally and capped.
    pub fn cross_sell_candidates(&self) -> AnalyticsResult<Vec<CrossSellOpportunity>> {
        let artifact = self.load()?;
        Ok(cross_sell(&artifact.fitted_state, &self.settings))
    }

    /// Mean cell of the stored matrix and number of indexed items.
    pub fn model_overview(&self) -> AnalyticsResult<(ArtifactId, usize, f64)> {
        let artifact = self.load()?;
        let state = &artifact.fitted_state;
        Ok((artifact.id, state.index.len(), state.similarity.mean()))
    }
}

fn cross_sell(state: &AffinityState, settings: &AffinitySettings) -> Vec<CrossSellOpportunity> {
    let mut out = Vec::new();
    for row in 0..state.index.len() {
        for (col, score) in state
            .similarity
            .ranked_neighbors(row)
            .into_iter()
            .take(settings.cross_sell_per_item)
        {
            if score > settings.cross_sell_threshold {
                out.push(CrossSellOpportunity {
                    item_a: state.index.id(row),
                    item_b: state.index.id(col),
                    score,
                });
            }
        }
    }
    out.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.item_a.cmp(&b.item_a))
            .then(a.item_b.cmp(&b.item_b))
    });
    out.truncate(settings.cross_sell_limit);
    out
}

fn active_catalog(history: &HistorySnapshot) -> BTreeMap<ItemId, &CatalogItem> {
    history.active_items().into_iter().map(|i| (i.item_id, i)).collect()
}

/// Active items by number of counted orders containing them, ties by id.
pub fn popular_items(history: &HistorySnapshot, exclude: ItemId, top_n: usize) -> Vec<Recommendation> {
    let mut order_counts: BTreeMap<ItemId, usize> = BTreeMap::new();
    for order in history.counted_orders().values() {
        for item in &order.items {
            *order_counts.entry(*item).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&CatalogItem, usize)> = history
        .active_items()
        .into_iter()
        .filter(|i| i.item_id != exclude)
        .map(|i| (i, order_counts.get(&i.item_id).copied().unwrap_or(0)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.item_id.cmp(&b.0.item_id)));

    ranked
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, (item, _))| Recommendation {
            edge: AffinityEdge {
                source_item: exclude,
                target_item: item.item_id,
                score: POPULARITY_SCORE,
                rank: i + 1,
            },
            name: item.name.clone(),
            price: item.price,
            reason: Some(POPULARITY_REASON.to_string()),
        })
        .collect()
}

impl<S: ArtifactStore> Trainer for ProductAffinityEngine<S> {
    type Params = AffinityTrainParams;
    type State = AffinityState;

    fn model_type(&self) -> ModelType {
        ModelType::ProductAffinity
    }

    fn can_train(&self, history: &HistorySnapshot, _params: &AffinityTrainParams) -> Readiness {
        let items = history.active_items().len();
        if items < 2 {
            Readiness::not_ready(format!("need at least 2 active catalog items, found {items}"))
        } else {
            Readiness::Ready
        }
    }

    fn fit(
        &self,
        history: &HistorySnapshot,
        params: &AffinityTrainParams,
    ) -> AnalyticsResult<TrainingRun<AffinityState>> {
        let items = history.active_items();
        let index = ItemIndex::new(items.iter().map(|i| i.item_id).collect());

        let orders = history.counted_orders();
        let co_purchase = co_purchase_matrix(&index, orders.values());
        if co_purchase.is_none() {
            warn!("no counted orders, co-purchase similarity unavailable");
        }

        // `active_items` is sorted and unique by id, matching the index order.
        let features: Vec<ContentFeatures> = items.iter().map(|i| ContentFeatures::from_item(i)).collect();
        let content = match content_matrix(&features) {
            Ok(m) => m,
            Err(err) => {
                warn!(error = %err, "content similarity unavailable");
                None
            }
        };

        let orders_analyzed = co_purchase.as_ref().map(|(_, n)| *n).unwrap_or(0);
        let (similarity, method) = match (co_purchase, content) {
            (Some((cp, _)), Some(ct)) => (
                SimilarityMatrix::blend(&cp, params.co_purchase_weight, &ct, params.content_weight)?,
                SimilarityMethod::Hybrid,
            ),
            (Some((cp, _)), None) => (cp, SimilarityMethod::CoPurchase),
            (None, Some(ct)) => (ct, SimilarityMethod::Content),
            (None, None) => return Err(AnalyticsError::NoSimilarityData),
        };

        if similarity.size() != index.len() {
            return Err(AnalyticsError::computation(format!(
                "similarity matrix is {0}x{0} but {1} items are indexed",
                similarity.size(),
                index.len()
            )));
        }

        let mean_similarity = similarity.mean();
        info!(
            items = index.len(),
            orders = orders_analyzed,
            method = ?method,
            "similarity model built"
        );

        let metrics = json!({
            "item_count": index.len(),
            "orders_analyzed": orders_analyzed,
            "mean_similarity": mean_similarity,
            "method": method,
        });
        let training_sample_size = index.len();

        Ok(TrainingRun {
            state: AffinityState {
                index,
                similarity,
                method,
            },
            training_sample_size,
            metrics,
        })
    }
}
