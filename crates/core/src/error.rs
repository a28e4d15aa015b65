use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier field name: {0}")]
    InvalidFieldName(String),

    #[error("invalid data source: {0}")]
    InvalidDataSource(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
