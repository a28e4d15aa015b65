use std::collections::BTreeSet;

use wellguard_core::ids::WellId;
use wellguard_storage::{IdSet, IdentifierColumn, IdentifierFilter, Predicate, WellFilter, WellRow};

use crate::projection::{OperationShape, Pin};

/// Where collision candidates are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Standing wells outside the batch.
    External,
    /// Other wells inside the batch.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionQueries {
    pub external: WellFilter,
    pub internal: WellFilter,
}

/// Candidate predicate for one dimension.
///
/// A pinned dimension gives every batch member the same value, so inside the
/// batch agreement holds without a filter.
pub fn dimension_predicate<T: Ord + Clone>(
    pin: &Pin<T>,
    own_values: impl IntoIterator<Item = T>,
    context: Context,
) -> Predicate<T> {
    match (pin, context) {
        (Pin::Pinned(value), Context::External) => Predicate::Equals(value.clone()),
        (Pin::Pinned(_), Context::Internal) => Predicate::Any,
        (Pin::Unpinned, _) => Predicate::In(own_values.into_iter().collect()),
    }
}

/// Build the external and internal candidate filters for `batch`, given the
/// batch's own rows read with the own projection.
pub fn build_queries(
    shape: &OperationShape,
    batch: &BTreeSet<WellId>,
    own: &[WellRow],
) -> CollisionQueries {
    let identifiers: BTreeSet<String> = own.iter().filter_map(|r| r.identifier.clone()).collect();
    let query = |context: Context| WellFilter {
        ids: match context {
            Context::External => IdSet::Except(batch.clone()),
            Context::Internal => IdSet::Only(batch.clone()),
        },
        scope: dimension_predicate(&shape.scope, own.iter().filter_map(|r| r.scope), context),
        data_source: dimension_predicate(
            &shape.data_source,
            own.iter().filter_map(|r| r.data_source),
            context,
        ),
        identifier: Some(IdentifierFilter {
            column: match context {
                Context::External => IdentifierColumn::Chosen,
                Context::Internal => shape.identifier.own_column(),
            },
            predicate: Predicate::In(identifiers.clone()),
        }),
    };

    CollisionQueries {
        external: query(Context::External),
        internal: query(Context::Internal),
    }
}
