use std::sync::Mutex;

use retailsense_ai::{InsightSink, PredictionRecord, TrainingLogEntry};

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInsightSink {
    training: Mutex<Vec<TrainingLogEntry>>,
    predictions: Mutex<Vec<PredictionRecord>>,
}

impl InMemoryInsightSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn training_log(&self) -> Vec<TrainingLogEntry> {
        self.training.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn predictions(&self) -> Vec<PredictionRecord> {
        self.predictions.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl InsightSink for InMemoryInsightSink {
    fn record_training(&self, entry: TrainingLogEntry) {
        if let Ok(mut log) = self.training.lock() {
            log.push(entry);
        }
    }

    fn record_prediction(&self, record: PredictionRecord) {
        if let Ok(mut records) = self.predictions.lock() {
            records.push(record);
        }
    }
}
