use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;
use crate::ids::{ProjectId, WellId};

/// Ownership partition of a well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Company-level well, not owned by any project.
    Company,
    Project(ProjectId),
}

impl Scope {
    pub fn project(&self) -> Option<ProjectId> {
        match self {
            Self::Company => None,
            Self::Project(id) => Some(*id),
        }
    }

    pub fn from_project(project: Option<ProjectId>) -> Self {
        match project {
            Some(id) => Self::Project(id),
            None => Self::Company,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Internal,
    External,
    Other,
}

impl DataSource {
    pub const ALL: [DataSource; 3] = [Self::Internal, Self::External, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            "other" => Ok(Self::Other),
            _ => Err(CoreError::InvalidDataSource(s.to_string())),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The candidate fields that may supply a well's chosen identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IdentifierField {
    #[serde(rename = "inptID")]
    InptId,
    #[serde(rename = "api10")]
    Api10,
    #[serde(rename = "api12")]
    Api12,
    #[serde(rename = "api14")]
    Api14,
    #[serde(rename = "aries_id")]
    AriesId,
    #[serde(rename = "phdwin_id")]
    PhdwinId,
}

impl IdentifierField {
    pub const ALL: [IdentifierField; 6] = [
        Self::InptId,
        Self::Api10,
        Self::Api12,
        Self::Api14,
        Self::AriesId,
        Self::PhdwinId,
    ];

    /// Schema name, as used on the wire and in stored `chosen_field` values.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InptId => "inptID",
            Self::Api10 => "api10",
            Self::Api12 => "api12",
            Self::Api14 => "api14",
            Self::AriesId => "aries_id",
            Self::PhdwinId => "phdwin_id",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| CoreError::InvalidFieldName(s.to_string()))
    }
}

impl fmt::Display for IdentifierField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes an identifier value: empty strings count as absent.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A complete well record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Well {
    pub id: WellId,
    pub scope: Scope,
    pub data_source: DataSource,
    pub chosen_field: IdentifierField,
    pub chosen_value: Option<String>,
    pub candidates: BTreeMap<IdentifierField, String>,
    pub revision: u64,
}

impl Well {
    /// Build a fresh well whose chosen value mirrors `chosen_field`.
    pub fn new(
        scope: Scope,
        data_source: DataSource,
        chosen_field: IdentifierField,
        candidates: impl IntoIterator<Item = (IdentifierField, String)>,
    ) -> Self {
        let candidates: BTreeMap<_, _> = candidates.into_iter().collect();
        let chosen_value = candidates.get(&chosen_field).cloned();
        Self {
            id: WellId::new(),
            scope,
            data_source,
            chosen_field,
            chosen_value,
            candidates,
            revision: 0,
        }
    }

    pub fn candidate(&self, field: IdentifierField) -> Option<&str> {
        present(self.candidates.get(&field).map(String::as_str))
    }

    pub fn chosen(&self) -> Option<&str> {
        present(self.chosen_value.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_roundtrip() {
        for field in IdentifierField::ALL {
            assert_eq!(IdentifierField::parse(field.as_str()).unwrap(), field);
        }
    }

    #[test]
    fn unknown_field_name_is_rejected() {
        let err = IdentifierField::parse("api11").unwrap_err();
        assert!(matches!(err, CoreError::InvalidFieldName(name) if name == "api11"));
    }

    #[test]
    fn wire_names_match_schema_names() {
        let json = serde_json::to_string(&IdentifierField::InptId).unwrap();
        assert_eq!(json, "\"inptID\"");
        let source: DataSource = serde_json::from_str("\"external\"").unwrap();
        assert_eq!(source, DataSource::External);
    }

    #[test]
    fn new_well_mirrors_chosen_field() {
        let well = Well::new(
            Scope::Company,
            DataSource::Internal,
            IdentifierField::Api14,
            [
                (IdentifierField::Api10, "4200000001".to_string()),
                (IdentifierField::Api14, "42000000010000".to_string()),
            ],
        );
        assert_eq!(well.chosen(), Some("42000000010000"));
        assert_eq!(well.candidate(IdentifierField::Api10), Some("4200000001"));
        assert_eq!(well.candidate(IdentifierField::AriesId), None);
    }

    #[test]
    fn empty_candidate_counts_as_absent() {
        let well = Well::new(
            Scope::Company,
            DataSource::Other,
            IdentifierField::Api10,
            [(IdentifierField::Api10, String::new())],
        );
        assert_eq!(well.chosen(), None);
        assert_eq!(well.candidate(IdentifierField::Api10), None);
    }

    #[test]
    fn scope_project_roundtrip() {
        let project = ProjectId::new();
        assert_eq!(Scope::from_project(Some(project)).project(), Some(project));
        assert_eq!(Scope::from_project(None), Scope::Company);
    }
}
