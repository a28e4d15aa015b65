pub mod config;
pub mod detect;
pub mod error;
pub mod missing;
pub mod mutate;
pub mod projection;
pub mod query;
pub mod snapshot;
pub mod validate;

pub use config::{DEFAULT_MAX_BATCH_WELLS, EngineConfig};
pub use detect::{CollisionMap, Detection};
pub use error::EngineError;
pub use mutate::MutationOutcome;
pub use projection::{IdentifierSource, OperationShape, Pin};
pub use snapshot::SnapshotToken;
pub use validate::{ValidateResponse, ValidationResult};

use wellguard_core::{OperationKind, ids::WellId};
use wellguard_storage::WellStore;

/// Collision validation and batch mutation over a well store.
///
/// Validation borrows the store immutably and mutation mutably, so the two
/// never interleave within one engine. Nothing closes the gap between a
/// validation and a later mutation except the [`SnapshotToken`] check.
pub struct Engine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: WellStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reject oversized batches before any store access.
    fn check_batch(&self, kind: OperationKind, wells: &[WellId]) -> Result<(), EngineError> {
        if wells.len() > self.config.max_batch_wells {
            return Err(EngineError::BatchTooLarge {
                kind,
                wells: wells.len(),
                max: self.config.max_batch_wells,
            });
        }
        Ok(())
    }
}
