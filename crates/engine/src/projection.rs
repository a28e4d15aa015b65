//! Operation shapes and the fields each side of a collision check must read.
//!
//! A dimension pinned by the operation compares as a literal and is never
//! read; an unpinned dimension is read so wells can be grouped by their
//! existing value.

use wellguard_core::{
    operations::Operation,
    well::{DataSource, IdentifierField, Scope},
};
use wellguard_storage::{IdentifierColumn, Projection};

/// Whether an identity dimension is fixed by the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin<T> {
    Pinned(T),
    Unpinned,
}

impl<T> Pin<T> {
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Pinned(_))
    }
}

/// Where a batch well's post-operation identifier comes from. The identifier
/// is never pinned to a literal: a chosen-identifier change still takes each
/// well's own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierSource {
    /// The well keeps its current chosen identifier value.
    Current,
    /// The well's value in this candidate field becomes its chosen identifier.
    Candidate(IdentifierField),
}

impl IdentifierSource {
    pub fn own_column(&self) -> IdentifierColumn {
        match self {
            Self::Current => IdentifierColumn::Chosen,
            Self::Candidate(field) => IdentifierColumn::Candidate(*field),
        }
    }
}

/// The post-operation value of each identity dimension for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationShape {
    pub scope: Pin<Scope>,
    pub data_source: Pin<DataSource>,
    pub identifier: IdentifierSource,
}

impl OperationShape {
    pub fn of(operation: &Operation) -> Self {
        match operation {
            Operation::ScopeToCompany { .. } => Self {
                scope: Pin::Pinned(Scope::Company),
                data_source: Pin::Unpinned,
                identifier: IdentifierSource::Current,
            },
            Operation::ChangeDataSource { data_source, .. } => Self {
                scope: Pin::Unpinned,
                data_source: Pin::Pinned(*data_source),
                identifier: IdentifierSource::Current,
            },
            Operation::ChangeChosenIdentifier { field, .. } => Self {
                scope: Pin::Unpinned,
                data_source: Pin::Unpinned,
                identifier: IdentifierSource::Candidate(*field),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projections {
    /// Read from the batch's own wells (and from batch siblings).
    pub own: Projection,
    /// Read from candidate wells outside the batch, which keep their values.
    pub other: Projection,
}

pub fn build_projections(shape: &OperationShape) -> Projections {
    let scope = !shape.scope.is_pinned();
    let data_source = !shape.data_source.is_pinned();
    Projections {
        own: Projection {
            scope,
            data_source,
            identifier: Some(shape.identifier.own_column()),
        },
        other: Projection {
            scope,
            data_source,
            identifier: Some(IdentifierColumn::Chosen),
        },
    }
}
