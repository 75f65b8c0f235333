use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowseError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[cfg(feature = "grpc")]
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl BrowseError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BrowseError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BrowseError::Validation { .. })
    }
}

impl From<diesel::result::Error> for BrowseError {
    fn from(err: diesel::result::Error) -> Self {
        BrowseError::Database {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BrowseError {
    fn from(err: serde_json::Error) -> Self {
        BrowseError::Internal {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

#[cfg(feature = "grpc")]
impl From<BrowseError> for tonic::Status {
    fn from(err: BrowseError) -> Self {
        match err {
            BrowseError::Validation { .. } => tonic::Status::invalid_argument(err.to_string()),
            BrowseError::Config { .. } => tonic::Status::failed_precondition(err.to_string()),
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}

pub type BrowseResult<T> = Result<T, BrowseError>;
