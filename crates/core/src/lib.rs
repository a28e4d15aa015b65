pub mod error;
pub mod ids;
pub mod operations;
pub mod well;

pub use error::CoreError;
pub use ids::*;
pub use operations::{Operation, OperationKind, ValidateRequest};
pub use well::{DataSource, IdentifierField, Scope, Well};
