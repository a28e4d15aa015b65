use std::collections::BTreeSet;

use tracing::{info, warn};
use wellguard_core::{
    OperationKind,
    ids::WellId,
    operations::Operation,
    well::{DataSource, IdentifierField, Scope},
};
use wellguard_storage::{Projection, SideTablePatch, StorageError, WellPatch, WellStore};

use crate::Engine;
use crate::error::EngineError;
use crate::snapshot::SnapshotToken;

/// What a mutation changed. `changed_wells` is what downstream jobs need to
/// know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: OperationKind,
    pub mutated: usize,
    pub changed_wells: Vec<WellId>,
}

impl<S: WellStore> Engine<S> {
    /// Apply an operation. Nothing is re-validated: callers are expected to
    /// have run validation and decided how to treat what it reported. Passing
    /// the validation's snapshot token refuses the write if any target well
    /// changed since.
    pub fn apply(
        &mut self,
        operation: &Operation,
        expected: Option<&SnapshotToken>,
    ) -> Result<MutationOutcome, EngineError> {
        match operation {
            Operation::ScopeToCompany { wells } => self.scope_to_company(wells, expected),
            Operation::ChangeDataSource { wells, data_source } => {
                self.change_data_source(wells, *data_source, expected)
            }
            Operation::ChangeChosenIdentifier { wells, field } => {
                self.change_chosen_identifier(wells, *field, expected)
            }
        }
    }

    /// Move wells to company scope, then clear the scope copied onto their
    /// production records.
    pub fn scope_to_company(
        &mut self,
        wells: &[WellId],
        expected: Option<&SnapshotToken>,
    ) -> Result<MutationOutcome, EngineError> {
        let kind = OperationKind::ScopeToCompany;
        let targets = self.resolve_targets(kind, wells, expected)?;
        let patch = WellPatch {
            scope: Some(Scope::Company),
            ..Default::default()
        };
        self.apply_patch(kind, targets, &patch, |store, ids| {
            store.update_denormalized_scope(ids, Scope::Company)
        })
    }

    pub fn change_data_source(
        &mut self,
        wells: &[WellId],
        data_source: DataSource,
        expected: Option<&SnapshotToken>,
    ) -> Result<MutationOutcome, EngineError> {
        let kind = OperationKind::ChangeDataSource;
        let targets = self.resolve_targets(kind, wells, expected)?;
        let patch = WellPatch {
            data_source: Some(data_source),
            ..Default::default()
        };
        self.apply_patch(kind, targets, &patch, |store, ids| {
            store.update_side_table(
                ids,
                &SideTablePatch {
                    data_source: Some(data_source),
                    sync_chosen_identifier: false,
                },
            )
        })
    }

    /// Each well's own value in `field` becomes its chosen identifier, empty
    /// or not.
    pub fn change_chosen_identifier(
        &mut self,
        wells: &[WellId],
        field: IdentifierField,
        expected: Option<&SnapshotToken>,
    ) -> Result<MutationOutcome, EngineError> {
        let kind = OperationKind::ChangeChosenIdentifier;
        let targets = self.resolve_targets(kind, wells, expected)?;
        let patch = WellPatch {
            chosen_identifier: Some(field),
            ..Default::default()
        };
        self.apply_patch(kind, targets, &patch, |store, ids| {
            store.update_side_table(
                ids,
                &SideTablePatch {
                    data_source: None,
                    sync_chosen_identifier: true,
                },
            )
        })
    }

    /// Existing target ids, after checking the snapshot token if one was given.
    fn resolve_targets(
        &self,
        kind: OperationKind,
        wells: &[WellId],
        expected: Option<&SnapshotToken>,
    ) -> Result<Vec<WellId>, EngineError> {
        self.check_batch(kind, wells)?;
        let batch: BTreeSet<WellId> = wells.iter().copied().collect();
        let rows = self.store.find_wells_by_id(&batch, &Projection::ids_only())?;

        if let Some(expected) = expected {
            let current = SnapshotToken::of_rows(&rows);
            if current != *expected {
                warn!(%kind, wells = batch.len(), "refusing mutation of changed wells");
                return Err(EngineError::StaleSnapshot { kind });
            }
        }
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    fn apply_patch(
        &mut self,
        kind: OperationKind,
        targets: Vec<WellId>,
        patch: &WellPatch,
        secondary: impl FnOnce(&mut S, &[WellId]) -> Result<usize, StorageError>,
    ) -> Result<MutationOutcome, EngineError> {
        if targets.is_empty() {
            return Ok(MutationOutcome {
                kind,
                mutated: 0,
                changed_wells: targets,
            });
        }

        let mutated = self.store.update_wells(&targets, patch)?;
        if let Err(source) = secondary(&mut self.store, &targets) {
            warn!(%kind, applied = mutated, error = %source, "secondary update failed");
            return Err(EngineError::PartialMutation {
                kind,
                applied: mutated,
                source,
            });
        }

        info!(%kind, mutated, "applied bulk well mutation");
        Ok(MutationOutcome {
            kind,
            mutated,
            changed_wells: targets,
        })
    }
}
