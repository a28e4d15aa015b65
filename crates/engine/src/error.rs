use wellguard_core::{CoreError, OperationKind};
use wellguard_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("{kind} batch of {wells} wells exceeds the limit of {max}")]
    BatchTooLarge {
        kind: OperationKind,
        wells: usize,
        max: usize,
    },

    #[error("at most one scope_to_company operation may be validated per request")]
    DuplicateScopeOperation,

    #[error("{kind} targets changed since validation")]
    StaleSnapshot { kind: OperationKind },

    #[error("{kind} updated {applied} wells before a secondary update failed: {source}")]
    PartialMutation {
        kind: OperationKind,
        applied: usize,
        #[source]
        source: StorageError,
    },
}
