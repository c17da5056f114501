//! Snapshot exported by the storefront as a single JSON document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use retailsense_core::{AnalyticsError, AnalyticsResult, HistoryReader, HistorySnapshot};

/// Reads `{as_of, transactions, catalog, customers}` from disk on every call.
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
    as_of: Option<DateTime<Utc>>,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            as_of: None,
        }
    }

    /// Evaluate the export as of `as_of` instead of the instant it records.
    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryReader for JsonFileHistory {
    fn snapshot(&self) -> AnalyticsResult<HistorySnapshot> {
        let bytes = fs::read(&self.path)
            .map_err(|e| AnalyticsError::storage(format!("read {}: {e}", self.path.display())))?;
        let mut snapshot: HistorySnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| AnalyticsError::storage(format!("parse {}: {e}", self.path.display())))?;
        if let Some(as_of) = self.as_of {
            snapshot.as_of = as_of;
        }
        debug!(
            path = %self.path.display(),
            transactions = snapshot.transactions.len(),
            items = snapshot.catalog.len(),
            "history loaded"
        );
        Ok(snapshot)
    }
}
