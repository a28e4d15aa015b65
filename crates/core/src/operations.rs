use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::ids::WellId;
use crate::well::{DataSource, IdentifierField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    ScopeToCompany,
    ChangeDataSource,
    ChangeChosenIdentifier,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScopeToCompany => "scope_to_company",
            Self::ChangeDataSource => "change_data_source",
            Self::ChangeChosenIdentifier => "change_chosen_identifier",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bulk mutation over a batch of wells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ScopeToCompany {
        wells: Vec<WellId>,
    },
    ChangeDataSource {
        wells: Vec<WellId>,
        data_source: DataSource,
    },
    ChangeChosenIdentifier {
        wells: Vec<WellId>,
        field: IdentifierField,
    },
}

impl Operation {
    pub fn wells(&self) -> &[WellId] {
        match self {
            Self::ScopeToCompany { wells }
            | Self::ChangeDataSource { wells, .. }
            | Self::ChangeChosenIdentifier { wells, .. } => wells,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ScopeToCompany { .. } => OperationKind::ScopeToCompany,
            Self::ChangeDataSource { .. } => OperationKind::ChangeDataSource,
            Self::ChangeChosenIdentifier { .. } => OperationKind::ChangeChosenIdentifier,
        }
    }
}

// ============================================================================
// Wire request
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeToCompanyRequest {
    pub well_ids: Vec<WellId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeDataSourceRequest {
    pub well_ids: Vec<WellId>,
    pub data_source: DataSource,
}

/// `field` stays a plain string until conversion so that an unknown name
/// surfaces as `InvalidFieldName` rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeChosenIdentifierRequest {
    pub well_ids: Vec<WellId>,
    pub field: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_to_company: Option<ScopeToCompanyRequest>,
    #[serde(default)]
    pub change_data_source: Vec<ChangeDataSourceRequest>,
    #[serde(default)]
    pub change_chosen_identifier: Vec<ChangeChosenIdentifierRequest>,
}

impl ValidateRequest {
    /// Convert to typed operations: the scope operation (if any) first, then
    /// data-source changes, then chosen-identifier changes, each in request order.
    pub fn into_operations(self) -> Result<Vec<Operation>, CoreError> {
        let mut operations = Vec::with_capacity(
            self.change_data_source.len() + self.change_chosen_identifier.len() + 1,
        );
        if let Some(scope) = self.scope_to_company {
            operations.push(Operation::ScopeToCompany {
                wells: scope.well_ids,
            });
        }
        for change in self.change_data_source {
            operations.push(Operation::ChangeDataSource {
                wells: change.well_ids,
                data_source: change.data_source,
            });
        }
        for change in self.change_chosen_identifier {
            let field = IdentifierField::parse(&change.field)?;
            operations.push(Operation::ChangeChosenIdentifier {
                wells: change.well_ids,
                field,
            });
        }
        Ok(operations)
    }
}
