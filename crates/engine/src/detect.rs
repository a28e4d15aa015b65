use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;
use wellguard_core::{
    ids::WellId,
    well::{DataSource, Scope},
};
use wellguard_storage::{StorageError, WellRow, WellStore};

use crate::projection::{OperationShape, Pin, Projections, build_projections};
use crate::query::{CollisionQueries, build_queries};
use crate::snapshot::SnapshotToken;

/// For each batch well with at least one collision, the sorted ids it collides with.
pub type CollisionMap = BTreeMap<WellId, Vec<WellId>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub collisions: CollisionMap,
    pub snapshot: SnapshotToken,
    /// How many requested wells exist in the store.
    pub resolved: usize,
}

/// Post-operation identity of a row. Pinned dimensions are left out: both
/// sides agree on them by construction of the candidate queries.
type IdentityKey<'a> = (Option<Scope>, Option<DataSource>, &'a str);

fn identity_key<'a>(shape: &OperationShape, row: &'a WellRow) -> Option<IdentityKey<'a>> {
    let identifier = row.identifier.as_deref().filter(|v| !v.is_empty())?;
    let scope = match shape.scope {
        Pin::Pinned(_) => None,
        Pin::Unpinned => row.scope,
    };
    let data_source = match shape.data_source {
        Pin::Pinned(_) => None,
        Pin::Unpinned => row.data_source,
    };
    Some((scope, data_source, identifier))
}

/// Flag every candidate whose post-operation identity equals a batch well's.
fn match_candidates(
    shape: &OperationShape,
    own: &[WellRow],
    candidates: &[WellRow],
    into: &mut BTreeMap<WellId, BTreeSet<WellId>>,
) {
    let mut groups: HashMap<IdentityKey<'_>, Vec<WellId>> = HashMap::new();
    for candidate in candidates {
        if let Some(key) = identity_key(shape, candidate) {
            groups.entry(key).or_default().push(candidate.id);
        }
    }

    for well in own {
        let Some(key) = identity_key(shape, well) else {
            continue;
        };
        let Some(group) = groups.get(&key) else {
            continue;
        };
        for &other in group {
            if other != well.id {
                into.entry(well.id).or_default().insert(other);
            }
        }
    }
}

/// Run both candidate lookups for rows already read with the own projection
/// and merge the results per well.
pub fn find_collisions<S: WellStore + ?Sized>(
    store: &S,
    shape: &OperationShape,
    own: &[WellRow],
    queries: &CollisionQueries,
    projections: &Projections,
) -> Result<CollisionMap, StorageError> {
    let external = store.find_wells(&queries.external, &projections.other)?;
    let internal = store.find_wells(&queries.internal, &projections.own)?;
    debug!(
        batch = own.len(),
        external = external.len(),
        internal = internal.len(),
        "fetched collision candidates"
    );

    let mut merged = BTreeMap::new();
    match_candidates(shape, own, &external, &mut merged);
    match_candidates(shape, own, &internal, &mut merged);

    Ok(merged
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(id, ids)| (id, ids.into_iter().collect()))
        .collect())
}

/// Detect, for every existing well in `wells`, which other wells would share
/// its `(scope, data source, chosen identifier)` once the operation applies.
///
/// Ids that do not resolve to a stored well are skipped.
pub fn detect<S: WellStore + ?Sized>(
    store: &S,
    wells: &BTreeSet<WellId>,
    shape: &OperationShape,
) -> Result<Detection, StorageError> {
    let projections = build_projections(shape);
    let own = store.find_wells_by_id(wells, &projections.own)?;
    let snapshot = SnapshotToken::of_rows(&own);
    if own.len() < wells.len() {
        debug!(
            requested = wells.len(),
            resolved = own.len(),
            "skipping unknown wells"
        );
    }
    if own.is_empty() {
        return Ok(Detection {
            collisions: CollisionMap::new(),
            snapshot,
            resolved: 0,
        });
    }

    let queries = build_queries(shape, wells, &own);
    let collisions = find_collisions(store, shape, &own, &queries, &projections)?;
    Ok(Detection {
        collisions,
        snapshot,
        resolved: own.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::IdentifierSource;
    use wellguard_core::{
        ids::ProjectId,
        operations::Operation,
        well::{IdentifierField, Well},
    };
    use wellguard_storage::{Predicate, Projection, SqliteStorage};

    fn add(
        store: &mut SqliteStorage,
        scope: Scope,
        source: DataSource,
        chosen: IdentifierField,
        candidates: &[(IdentifierField, &str)],
    ) -> Result<WellId, StorageError> {
        let well = Well::new(
            scope,
            source,
            chosen,
            candidates.iter().map(|(f, v)| (*f, v.to_string())),
        );
        store.insert_well(&well)?;
        Ok(well.id)
    }

    fn set(ids: &[WellId]) -> BTreeSet<WellId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn unchanged_pair_is_reported_against_standing_record() -> Result<(), StorageError> {
        let mut store = SqliteStorage::open_in_memory()?;
        let p = Scope::Project(ProjectId::new());
        let a = add(&mut store, p, DataSource::Internal, IdentifierField::Api10, &[(IdentifierField::Api10, "X")])?;
        let b = add(&mut store, p, DataSource::Internal, IdentifierField::Api10, &[(IdentifierField::Api10, "X")])?;

        let shape = OperationShape::of(&Operation::ChangeDataSource {
            wells: vec![a],
            data_source: DataSource::Internal,
        });
        let detection = detect(&store, &set(&[a]), &shape)?;
        assert_eq!(detection.collisions, CollisionMap::from([(a, vec![b])]));
        assert_eq!(detection.resolved, 1);
        Ok(())
    }

    #[test]
    fn different_scope_does_not_collide() -> Result<(), StorageError> {
        let mut store = SqliteStorage::open_in_memory()?;
        let a = add(&mut store, Scope::Project(ProjectId::new()), DataSource::Internal, IdentifierField::Api10, &[(IdentifierField::Api10, "X")])?;
        add(&mut store, Scope::Project(ProjectId::new()), DataSource::Other, IdentifierField::Api10, &[(IdentifierField::Api10, "X")])?;

        let shape = OperationShape::of(&Operation::ChangeDataSource {
            wells: vec![a],
            data_source: DataSource::Other,
        });
        assert!(detect(&store, &set(&[a]), &shape)?.collisions.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_ids_are_skipped() -> Result<(), StorageError> {
        let mut store = SqliteStorage::open_in_memory()?;
        let a = add(&mut store, Scope::Company, DataSource::Other, IdentifierField::Api10, &[(IdentifierField::Api10, "X")])?;
        let ghost = WellId::new();
        let shape = OperationShape::of(&Operation::ScopeToCompany { wells: vec![a, ghost] });
        let detection = detect(&store, &set(&[a, ghost]), &shape)?;
        assert_eq!(detection.resolved, 1);
        assert!(!detection.collisions.contains_key(&ghost));
        Ok(())
    }

    #[test]
    fn empty_batch_yields_empty_map() -> Result<(), StorageError> {
        let store = SqliteStorage::open_in_memory()?;
        let shape = OperationShape::of(&Operation::ScopeToCompany { wells: vec![] });
        let detection = detect(&store, &BTreeSet::new(), &shape)?;
        assert!(detection.collisions.is_empty());
        assert_eq!(detection.resolved, 0);
        Ok(())
    }

    #[test]
    fn internal_source_filter_does_not_change_pinned_results() -> Result<(), StorageError> {
        let mut store = SqliteStorage::open_in_memory()?;
        let p = Scope::Project(ProjectId::new());
        let a = add(&mut store, p, DataSource::Internal, IdentifierField::Api10, &[(IdentifierField::Api10, "X")])?;
        let b = add(&mut store, p, DataSource::External, IdentifierField::Api10, &[(IdentifierField::Api10, "X")])?;
        let c = add(&mut store, p, DataSource::Other, IdentifierField::Api10, &[(IdentifierField::Api10, "Y")])?;
        let batch = set(&[a, b, c]);

        let shape = OperationShape {
            scope: Pin::Unpinned,
            data_source: Pin::Pinned(DataSource::Other),
            identifier: IdentifierSource::Current,
        };
        let projections = build_projections(&shape);
        let own = store.find_wells_by_id(&batch, &projections.own)?;
        let queries = build_queries(&shape, &batch, &own);
        let shortcut = find_collisions(&store, &shape, &own, &queries, &projections)?;

        let sources: BTreeSet<DataSource> = store
            .find_wells_by_id(&batch, &Projection { data_source: true, ..Default::default() })?
            .into_iter()
            .filter_map(|r| r.data_source)
            .collect();
        let mut filtered = queries.clone();
        filtered.internal.data_source = Predicate::In(sources);
        let full = find_collisions(&store, &shape, &own, &filtered, &projections)?;

        assert_eq!(shortcut, full);
        assert_eq!(shortcut, CollisionMap::from([(a, vec![b]), (b, vec![a])]));
        Ok(())
    }
}
