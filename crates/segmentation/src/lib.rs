//! `retailsense-segmentation`
//!
//! Customer Segmentation Engine: RFM features, seeded k-means and the
//! six-label segment rule cascade with retention actions.

pub mod engine;
pub mod features;
pub mod kmeans;
pub mod segment;

pub use engine::{
    ClusterProfile, CustomerSegmentationEngine, MIN_CUSTOMERS, SegmentAssignment,
    SegmentationSettings, SegmentationState, SegmentationTrainParams,
};
pub use features::{CustomerFeatures, NO_ORDER_RECENCY_DAYS};
pub use kmeans::{KMeans, KMeansParams};
pub use segment::Segment;
