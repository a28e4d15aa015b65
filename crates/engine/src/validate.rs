use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;
use wellguard_core::{
    ids::WellId,
    operations::{Operation, ValidateRequest},
};
use wellguard_storage::WellStore;

use crate::detect::{CollisionMap, detect};
use crate::error::EngineError;
use crate::missing::missing;
use crate::projection::OperationShape;
use crate::snapshot::SnapshotToken;
use crate::Engine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub collisions: CollisionMap,
    /// Present only for chosen-identifier changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_identifier: Option<Vec<WellId>>,
    pub snapshot: SnapshotToken,
}

impl ValidationResult {
    /// No collisions and no missing identifiers.
    pub fn is_clean(&self) -> bool {
        self.collisions.is_empty()
            && self
                .missing_identifier
                .as_ref()
                .is_none_or(|ids| ids.is_empty())
    }

    pub fn colliding_with(&self, well: WellId) -> &[WellId] {
        self.collisions.get(&well).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    #[serde(rename = "changeChosenIdentifierResults")]
    pub chosen_identifier: Vec<ValidationResult>,
    #[serde(rename = "changeDataSourceResults")]
    pub data_source: Vec<ValidationResult>,
    /// `None` when no scope change was requested.
    #[serde(rename = "scopeToCompanyResult")]
    pub scope_to_company: Option<ValidationResult>,
}

impl ValidateResponse {
    pub fn is_clean(&self) -> bool {
        self.chosen_identifier
            .iter()
            .chain(&self.data_source)
            .chain(&self.scope_to_company)
            .all(ValidationResult::is_clean)
    }
}

impl<S: WellStore> Engine<S> {
    /// Validate one operation against the current store contents.
    pub fn validate_operation(&self, operation: &Operation) -> Result<ValidationResult, EngineError> {
        self.check_batch(operation.kind(), operation.wells())?;
        let batch: BTreeSet<WellId> = operation.wells().iter().copied().collect();

        let missing_identifier = match operation {
            Operation::ChangeChosenIdentifier { field, .. } => {
                Some(missing(&self.store, &batch, *field)?)
            }
            _ => None,
        };
        let detection = detect(&self.store, &batch, &OperationShape::of(operation))?;

        Ok(ValidationResult {
            collisions: detection.collisions,
            missing_identifier,
            snapshot: detection.snapshot,
        })
    }

    /// Validate every operation independently. Operations do not see one
    /// another's effects, even when they target the same wells.
    pub fn validate(&self, operations: &[Operation]) -> Result<ValidateResponse, EngineError> {
        let mut scope_requested = false;
        for operation in operations {
            self.check_batch(operation.kind(), operation.wells())?;
            if matches!(operation, Operation::ScopeToCompany { .. }) {
                if scope_requested {
                    return Err(EngineError::DuplicateScopeOperation);
                }
                scope_requested = true;
            }
        }

        let mut response = ValidateResponse::default();
        for operation in operations {
            let result = self.validate_operation(operation)?;
            match operation {
                Operation::ScopeToCompany { .. } => response.scope_to_company = Some(result),
                Operation::ChangeDataSource { .. } => response.data_source.push(result),
                Operation::ChangeChosenIdentifier { .. } => {
                    response.chosen_identifier.push(result)
                }
            }
        }

        let colliding: usize = response
            .chosen_identifier
            .iter()
            .chain(&response.data_source)
            .chain(&response.scope_to_company)
            .map(|r| r.collisions.len())
            .sum();
        info!(
            operations = operations.len(),
            colliding_wells = colliding,
            clean = response.is_clean(),
            "validated bulk well operations"
        );
        Ok(response)
    }

    /// Decode and validate a wire request. Unknown field names are rejected
    /// before the store is touched.
    pub fn validate_request(&self, request: ValidateRequest) -> Result<ValidateResponse, EngineError> {
        let operations = request.into_operations()?;
        self.validate(&operations)
    }
}
