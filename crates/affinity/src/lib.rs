//! `retailsense-affinity`
//!
//! Product Affinity Engine. Blends a row-normalized co-purchase matrix with
//! content similarity over catalog attributes, then ranks neighbours per item.

pub mod engine;
pub mod similarity;

pub use engine::{
    AffinityEdge, AffinitySettings, AffinityState, AffinityTrainParams, CrossSellOpportunity,
    POPULARITY_REASON, POPULARITY_SCORE, ProductAffinityEngine, Recommendation, SimilarityMethod,
};
pub use similarity::{ContentFeatures, ItemIndex, SimilarityMatrix};
