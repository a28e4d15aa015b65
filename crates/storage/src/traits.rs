use std::collections::BTreeSet;

use wellguard_core::{
    ids::WellId,
    well::{present, DataSource, IdentifierField, Scope, Well},
};

use crate::error::StorageError;

/// Which stored column supplies the identifier dimension of a read or filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentifierColumn {
    /// The well's current chosen identifier value.
    Chosen,
    /// One of the candidate identifier fields.
    Candidate(IdentifierField),
}

impl IdentifierColumn {
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Chosen => "chosen_value",
            Self::Candidate(IdentifierField::InptId) => "inpt_id",
            Self::Candidate(IdentifierField::Api10) => "api10",
            Self::Candidate(IdentifierField::Api12) => "api12",
            Self::Candidate(IdentifierField::Api14) => "api14",
            Self::Candidate(IdentifierField::AriesId) => "aries_id",
            Self::Candidate(IdentifierField::PhdwinId) => "phdwin_id",
        }
    }

    pub fn read<'a>(&self, well: &'a Well) -> Option<&'a str> {
        match self {
            Self::Chosen => well.chosen(),
            Self::Candidate(field) => well.candidate(*field),
        }
    }
}

/// The fields to populate on each returned [`WellRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Projection {
    pub scope: bool,
    pub data_source: bool,
    pub identifier: Option<IdentifierColumn>,
}

impl Projection {
    /// Only `id` and `revision`.
    pub fn ids_only() -> Self {
        Self::default()
    }

    pub fn project(&self, well: &Well) -> WellRow {
        WellRow {
            id: well.id,
            revision: well.revision,
            scope: self.scope.then_some(well.scope),
            data_source: self.data_source.then_some(well.data_source),
            identifier: self
                .identifier
                .and_then(|column| column.read(well))
                .map(str::to_string),
        }
    }
}

/// A partially populated well, as returned by the `find_*` reads.
///
/// `identifier` is `None` both when it was not projected and when the stored
/// value is null or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellRow {
    pub id: WellId,
    pub revision: u64,
    pub scope: Option<Scope>,
    pub data_source: Option<DataSource>,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate<T> {
    Any,
    Equals(T),
    In(BTreeSet<T>),
}

impl<T: Ord> Predicate<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Equals(expected) => expected == value,
            Self::In(set) => set.contains(value),
        }
    }

    /// True when no value can satisfy the predicate.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, Self::In(set) if set.is_empty())
    }
}

impl<T> Default for Predicate<T> {
    fn default() -> Self {
        Self::Any
    }
}

impl Predicate<String> {
    /// Absent identifiers only pass an `Any` predicate.
    pub fn matches_str(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (_, None) => false,
            (Self::Equals(expected), Some(v)) => expected == v,
            (Self::In(set), Some(v)) => set.contains(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdSet {
    #[default]
    Any,
    Only(BTreeSet<WellId>),
    Except(BTreeSet<WellId>),
}

impl IdSet {
    pub fn matches(&self, id: &WellId) -> bool {
        match self {
            Self::Any => true,
            Self::Only(ids) => ids.contains(id),
            Self::Except(ids) => !ids.contains(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierFilter {
    pub column: IdentifierColumn,
    pub predicate: Predicate<String>,
}

/// Conjunction of an id restriction and one predicate per identity dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WellFilter {
    pub ids: IdSet,
    pub scope: Predicate<Scope>,
    pub data_source: Predicate<DataSource>,
    pub identifier: Option<IdentifierFilter>,
}

impl WellFilter {
    pub fn only(ids: BTreeSet<WellId>) -> Self {
        Self {
            ids: IdSet::Only(ids),
            ..Default::default()
        }
    }

    pub fn matches(&self, well: &Well) -> bool {
        self.ids.matches(&well.id)
            && self.scope.matches(&well.scope)
            && self.data_source.matches(&well.data_source)
            && self
                .identifier
                .as_ref()
                .is_none_or(|f| f.predicate.matches_str(f.column.read(well)))
    }

    /// True when the filter provably selects nothing, letting stores skip the read.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(&self.ids, IdSet::Only(ids) if ids.is_empty())
            || self.scope.is_unsatisfiable()
            || self.data_source.is_unsatisfiable()
            || self
                .identifier
                .as_ref()
                .is_some_and(|f| f.predicate.is_unsatisfiable())
    }
}

/// Fields to set on every targeted well. `chosen_identifier` copies each
/// well's own value of that candidate field into `chosen_value`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WellPatch {
    pub scope: Option<Scope>,
    pub data_source: Option<DataSource>,
    pub chosen_identifier: Option<IdentifierField>,
}

impl WellPatch {
    pub fn is_empty(&self) -> bool {
        self.scope.is_none() && self.data_source.is_none() && self.chosen_identifier.is_none()
    }

    pub fn apply_to(&self, well: &mut Well) {
        if let Some(scope) = self.scope {
            well.scope = scope;
        }
        if let Some(data_source) = self.data_source {
            well.data_source = data_source;
        }
        if let Some(field) = self.chosen_identifier {
            well.chosen_field = field;
            well.chosen_value = well.candidates.get(&field).cloned();
        }
        well.revision += 1;
    }
}

/// Fields mirrored onto the ownership side table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SideTablePatch {
    pub data_source: Option<DataSource>,
    /// Copy the well's current `chosen_value` onto its ownership record.
    pub sync_chosen_identifier: bool,
}

impl SideTablePatch {
    pub fn is_empty(&self) -> bool {
        self.data_source.is_none() && !self.sync_chosen_identifier
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRecord {
    pub well_id: WellId,
    pub data_source: DataSource,
    pub chosen_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionRecord {
    pub record_id: i64,
    pub well_id: WellId,
    pub scope: Scope,
}

/// The record store. Reads return rows ordered by well id.
pub trait WellStore {
    fn insert_well(&mut self, well: &Well) -> Result<(), StorageError>;

    fn get_well(&self, well_id: WellId) -> Result<Option<Well>, StorageError>;

    fn well_count(&self) -> Result<u64, StorageError>;

    fn find_wells(
        &self,
        filter: &WellFilter,
        projection: &Projection,
    ) -> Result<Vec<WellRow>, StorageError>;

    fn find_wells_by_id(
        &self,
        ids: &BTreeSet<WellId>,
        projection: &Projection,
    ) -> Result<Vec<WellRow>, StorageError> {
        self.find_wells(&WellFilter::only(ids.clone()), projection)
    }

    /// Returns the number of wells updated. Bumps `revision` on each.
    fn update_wells(&mut self, ids: &[WellId], patch: &WellPatch) -> Result<usize, StorageError>;

    /// Create the ownership record for a well, mirroring its current values.
    fn attach_ownership(&mut self, well_id: WellId) -> Result<(), StorageError>;

    fn get_ownership(&self, well_id: WellId) -> Result<Option<OwnershipRecord>, StorageError>;

    fn update_side_table(
        &mut self,
        ids: &[WellId],
        patch: &SideTablePatch,
    ) -> Result<usize, StorageError>;

    /// Create a production record carrying the well's current scope.
    fn insert_production_record(&mut self, well_id: WellId) -> Result<i64, StorageError>;

    fn get_production_records(
        &self,
        well_id: WellId,
    ) -> Result<Vec<ProductionRecord>, StorageError>;

    fn update_denormalized_scope(
        &mut self,
        well_ids: &[WellId],
        scope: Scope,
    ) -> Result<usize, StorageError>;
}

/// Shared empty-or-null normalization for stores reading raw text columns.
pub fn normalize_identifier(value: Option<String>) -> Option<String> {
    present(value.as_deref())?;
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use wellguard_core::ids::ProjectId;

    fn well(scope: Scope, source: DataSource, api10: &str) -> Well {
        Well::new(
            scope,
            source,
            IdentifierField::Api10,
            [(IdentifierField::Api10, api10.to_string())],
        )
    }

    #[test]
    fn filter_is_a_conjunction() {
        let project = ProjectId::new();
        let w = well(Scope::Project(project), DataSource::Internal, "111");
        let mut filter = WellFilter {
            scope: Predicate::Equals(Scope::Project(project)),
            data_source: Predicate::In(BTreeSet::from([DataSource::Internal, DataSource::Other])),
            identifier: Some(IdentifierFilter {
                column: IdentifierColumn::Chosen,
                predicate: Predicate::In(BTreeSet::from(["111".to_string()])),
            }),
            ..Default::default()
        };
        assert!(filter.matches(&w));

        filter.data_source = Predicate::Equals(DataSource::External);
        assert!(!filter.matches(&w));
    }

    #[test]
    fn id_sets_include_and_exclude() {
        let w = well(Scope::Company, DataSource::Other, "1");
        let ids = BTreeSet::from([w.id]);
        assert!(WellFilter::only(ids.clone()).matches(&w));
        let except = WellFilter {
            ids: IdSet::Except(ids),
            ..Default::default()
        };
        assert!(!except.matches(&w));
    }

    #[test]
    fn absent_identifier_only_passes_any() {
        let w = well(Scope::Company, DataSource::Other, "");
        let any = WellFilter {
            identifier: Some(IdentifierFilter {
                column: IdentifierColumn::Chosen,
                predicate: Predicate::Any,
            }),
            ..Default::default()
        };
        assert!(any.matches(&w));
        let set = WellFilter {
            identifier: Some(IdentifierFilter {
                column: IdentifierColumn::Chosen,
                predicate: Predicate::In(BTreeSet::from([String::new()])),
            }),
            ..Default::default()
        };
        assert!(!set.matches(&w));
    }

    #[test]
    fn empty_in_set_is_unsatisfiable() {
        let filter = WellFilter {
            data_source: Predicate::In(BTreeSet::new()),
            ..Default::default()
        };
        assert!(filter.is_unsatisfiable());
        assert!(WellFilter::only(BTreeSet::new()).is_unsatisfiable());
        assert!(!WellFilter::default().is_unsatisfiable());
    }

    #[test]
    fn projection_populates_only_requested_fields() {
        let w = well(Scope::Company, DataSource::External, "42");
        let row = Projection {
            data_source: true,
            identifier: Some(IdentifierColumn::Candidate(IdentifierField::Api10)),
            ..Default::default()
        }
        .project(&w);
        assert_eq!(row.scope, None);
        assert_eq!(row.data_source, Some(DataSource::External));
        assert_eq!(row.identifier.as_deref(), Some("42"));

        let bare = Projection::ids_only().project(&w);
        assert_eq!(bare.id, w.id);
        assert_eq!(bare.identifier, None);
    }

    #[test]
    fn patch_copies_candidate_into_chosen_value() {
        let mut w = Well::new(
            Scope::Company,
            DataSource::Internal,
            IdentifierField::Api10,
            [
                (IdentifierField::Api10, "10".to_string()),
                (IdentifierField::Api14, "14".to_string()),
            ],
        );
        WellPatch {
            chosen_identifier: Some(IdentifierField::Api14),
            ..Default::default()
        }
        .apply_to(&mut w);
        assert_eq!(w.chosen_field, IdentifierField::Api14);
        assert_eq!(w.chosen(), Some("14"));
        assert_eq!(w.revision, 1);
    }

    #[test]
    fn normalize_drops_empty_text() {
        assert_eq!(normalize_identifier(Some(String::new())), None);
        assert_eq!(normalize_identifier(Some("x".into())), Some("x".to_string()));
        assert_eq!(normalize_identifier(None), None);
    }
}
