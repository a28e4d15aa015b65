//! Engine output checked against a brute-force model of the post-operation
//! store, on both store implementations.

use std::collections::{BTreeMap, BTreeSet};

use proptest::collection::vec;
use proptest::prelude::*;

use wellguard_core::{
    ids::{ProjectId, WellId},
    operations::Operation,
    well::{DataSource, IdentifierField, Scope, Well},
};
use wellguard_engine::Engine;
use wellguard_harness::MemoryStore;
use wellguard_storage::{SqliteStorage, WellPatch, WellStore};

#[derive(Debug, Clone)]
struct WellSeed {
    scope: usize,
    source: usize,
    chosen_api12: bool,
    api10: Option<&'static str>,
    api12: Option<&'static str>,
}

#[derive(Debug, Clone)]
enum OpSeed {
    Scope,
    Source(usize),
    Field(bool),
}

fn identifier() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![Just(None), Just(Some("")), Just(Some("A")), Just(Some("B"))]
}

fn well_seed() -> impl Strategy<Value = WellSeed> {
    (0..3usize, 0..3usize, any::<bool>(), identifier(), identifier()).prop_map(
        |(scope, source, chosen_api12, api10, api12)| WellSeed {
            scope,
            source,
            chosen_api12,
            api10,
            api12,
        },
    )
}

fn op_seed() -> impl Strategy<Value = OpSeed> {
    prop_oneof![
        Just(OpSeed::Scope),
        (0..3usize).prop_map(OpSeed::Source),
        any::<bool>().prop_map(OpSeed::Field),
    ]
}

fn field_of(api12: bool) -> IdentifierField {
    if api12 {
        IdentifierField::Api12
    } else {
        IdentifierField::Api10
    }
}

fn build_wells(seeds: &[WellSeed]) -> Vec<Well> {
    let scopes = [
        Scope::Company,
        Scope::Project(ProjectId::new()),
        Scope::Project(ProjectId::new()),
    ];
    seeds
        .iter()
        .map(|seed| {
            let mut candidates = Vec::new();
            if let Some(v) = seed.api10 {
                candidates.push((IdentifierField::Api10, v.to_string()));
            }
            if let Some(v) = seed.api12 {
                candidates.push((IdentifierField::Api12, v.to_string()));
            }
            Well::new(
                scopes[seed.scope],
                DataSource::ALL[seed.source],
                field_of(seed.chosen_api12),
                candidates,
            )
        })
        .collect()
}

fn build_operation(op: &OpSeed, wells: Vec<WellId>) -> Operation {
    match op {
        OpSeed::Scope => Operation::ScopeToCompany { wells },
        OpSeed::Source(source) => Operation::ChangeDataSource {
            wells,
            data_source: DataSource::ALL[*source],
        },
        OpSeed::Field(api12) => Operation::ChangeChosenIdentifier {
            wells,
            field: field_of(*api12),
        },
    }
}

fn patch_for(operation: &Operation) -> WellPatch {
    match operation {
        Operation::ScopeToCompany { .. } => WellPatch {
            scope: Some(Scope::Company),
            ..Default::default()
        },
        Operation::ChangeDataSource { data_source, .. } => WellPatch {
            data_source: Some(*data_source),
            ..Default::default()
        },
        Operation::ChangeChosenIdentifier { field, .. } => WellPatch {
            chosen_identifier: Some(*field),
            ..Default::default()
        },
    }
}

type Sets = BTreeMap<WellId, BTreeSet<WellId>>;

/// Apply the operation to a copy of every well, then compare all pairs.
fn brute_force(wells: &[Well], operation: &Operation) -> Sets {
    let batch: BTreeSet<WellId> = operation.wells().iter().copied().collect();
    let patch = patch_for(operation);
    let after: Vec<Well> = wells
        .iter()
        .map(|w| {
            let mut w = w.clone();
            if batch.contains(&w.id) {
                patch.apply_to(&mut w);
            }
            w
        })
        .collect();

    let mut expected = Sets::new();
    for w in after.iter().filter(|w| batch.contains(&w.id)) {
        let Some(value) = w.chosen() else { continue };
        for other in &after {
            if other.id != w.id
                && other.scope == w.scope
                && other.data_source == w.data_source
                && other.chosen() == Some(value)
            {
                expected.entry(w.id).or_default().insert(other.id);
            }
        }
    }
    expected
}

fn check<S: WellStore>(
    mut store: S,
    wells: &[Well],
    operation: &Operation,
) -> Result<(), Box<dyn std::error::Error>> {
    for well in wells {
        store.insert_well(well)?;
    }
    let engine = Engine::new(store);
    let result = engine.validate_operation(operation)?;

    let actual: Sets = result
        .collisions
        .iter()
        .map(|(id, ids)| (*id, ids.iter().copied().collect()))
        .collect();
    assert_eq!(actual, brute_force(wells, operation));

    for (id, ids) in &actual {
        assert!(!ids.contains(id), "self collision for {id}");
        assert!(!ids.is_empty());
        for other in ids {
            if actual.contains_key(other) {
                assert!(actual[other].contains(id), "asymmetric collision inside batch");
            }
        }
    }

    let again = engine.validate_operation(operation)?;
    assert_eq!(again, result);

    if let Operation::ChangeChosenIdentifier { wells: batch, field } = operation {
        let flagged: BTreeSet<WellId> = result
            .missing_identifier
            .clone()
            .unwrap_or_default()
            .into_iter()
            .collect();
        for well in wells.iter().filter(|w| batch.contains(&w.id)) {
            assert_eq!(
                flagged.contains(&well.id),
                well.candidate(*field).is_none(),
                "missing-identifier mismatch for {}",
                well.id
            );
        }
    } else {
        assert_eq!(result.missing_identifier, None);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn detection_matches_brute_force(
        seeds in vec(well_seed(), 1..10),
        mask in vec(any::<bool>(), 10),
        op in op_seed(),
        with_ghost in any::<bool>(),
    ) {
        let wells = build_wells(&seeds);
        let mut targets: Vec<WellId> = wells
            .iter()
            .zip(&mask)
            .filter(|(_, selected)| **selected)
            .map(|(w, _)| w.id)
            .collect();
        if with_ghost {
            targets.push(WellId::new());
        }
        let operation = build_operation(&op, targets);

        let sqlite = SqliteStorage::open_in_memory()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        check(sqlite, &wells, &operation).map_err(|e| TestCaseError::fail(e.to_string()))?;
        check(MemoryStore::new(), &wells, &operation)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
    }
}
