use crate::report::{PredictionRecord, TrainingLogEntry};

/// Destination for training logs and prediction records.
///
/// Kept apart from the artifact store: these rows are an audit trail for the
/// storefront's admin screens, not model state. Emission never fails the call
/// that produced the record.
pub trait InsightSink: Send + Sync {
    fn record_training(&self, entry: TrainingLogEntry);

    fn record_prediction(&self, record: PredictionRecord);
}

impl<K> InsightSink for std::sync::Arc<K>
where
    K: InsightSink + ?Sized,
{
    fn record_training(&self, entry: TrainingLogEntry) {
        (**self).record_training(entry)
    }

    fn record_prediction(&self, record: PredictionRecord) {
        (**self).record_prediction(record)
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardInsights;

impl InsightSink for DiscardInsights {
    fn record_training(&self, _entry: TrainingLogEntry) {}

    fn record_prediction(&self, _record: PredictionRecord) {}
}
