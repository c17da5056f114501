use std::collections::HashMap;
use std::sync::RwLock;

use retailsense_core::{AnalyticsError, AnalyticsResult, ArtifactStore, ModelType};

/// In-memory artifact slots for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    slots: RwLock<HashMap<ModelType, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model types that currently hold an artifact.
    pub fn occupied(&self) -> Vec<ModelType> {
        let mut out: Vec<ModelType> = match self.slots.read() {
            Ok(map) => map.keys().copied().collect(),
            Err(_) => return vec![],
        };
        out.sort();
        out
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn save(&self, model_type: ModelType, blob: &[u8]) -> AnalyticsResult<()> {
        let mut map = self
            .slots
            .write()
            .map_err(|_| AnalyticsError::storage("artifact store lock poisoned"))?;
        map.insert(model_type, blob.to_vec());
        Ok(())
    }

    fn load(&self, model_type: ModelType) -> AnalyticsResult<Option<Vec<u8>>> {
        let map = self
            .slots
            .read()
            .map_err(|_| AnalyticsError::storage("artifact store lock poisoned"))?;
        Ok(map.get(&model_type).cloned())
    }
}
