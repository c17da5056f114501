use std::sync::RwLock;

use retailsense_core::{AnalyticsError, AnalyticsResult, HistoryReader, HistorySnapshot};

/// Holds one snapshot that tests can swap between calls.
#[derive(Debug)]
pub struct InMemoryHistory {
    snapshot: RwLock<HistorySnapshot>,
}

impl InMemoryHistory {
    pub fn new(snapshot: HistorySnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Replace the snapshot returned by subsequent reads.
    pub fn replace(&self, snapshot: HistorySnapshot) {
        if let Ok(mut current) = self.snapshot.write() {
            *current = snapshot;
        }
    }

    /// Apply an in-place edit to the held snapshot.
    pub fn update(&self, edit: impl FnOnce(&mut HistorySnapshot)) {
        if let Ok(mut current) = self.snapshot.write() {
            edit(&mut current);
        }
    }
}

impl HistoryReader for InMemoryHistory {
    fn snapshot(&self) -> AnalyticsResult<HistorySnapshot> {
        self.snapshot
            .read()
            .map(|s| s.clone())
            .map_err(|_| AnalyticsError::storage("history lock poisoned"))
    }
}
