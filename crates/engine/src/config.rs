use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_BATCH_WELLS: usize = 25_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Largest batch a single operation may target.
    pub max_batch_wells: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_wells: DEFAULT_MAX_BATCH_WELLS,
        }
    }
}
