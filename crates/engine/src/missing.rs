use std::collections::BTreeSet;

use wellguard_core::{ids::WellId, well::IdentifierField};
use wellguard_storage::{IdentifierColumn, Projection, StorageError, WellStore};

/// Wells in `wells` whose `field` is null or empty. Unknown ids are not reported.
pub fn missing<S: WellStore + ?Sized>(
    store: &S,
    wells: &BTreeSet<WellId>,
    field: IdentifierField,
) -> Result<Vec<WellId>, StorageError> {
    let projection = Projection {
        identifier: Some(IdentifierColumn::Candidate(field)),
        ..Default::default()
    };
    Ok(store
        .find_wells_by_id(wells, &projection)?
        .into_iter()
        .filter(|row| row.identifier.is_none())
        .map(|row| row.id)
        .collect())
}
