//! Error handling for ragsync-indexer

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for ragsync-indexer operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {field}: {message}")]
    Configuration {
        field: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Failed to read file: {path}")]
    FileRead {
        path: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Ingestion request failed: {operation}: {message}")]
    Transport {
        operation: String,
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Vector database operation failed: {operation}")]
    VectorDb {
        operation: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Embedding operation failed: {message}")]
    Embedding {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl SyncError {
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration { field: field.into(), message: message.into(), source: None }
    }

    pub fn configuration_with_source(
        field: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn file_read_with_source(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::FileRead { path: path.into(), source: Some(Box::new(source)) }
    }

    /// A non-success status returned by the ingestion service
    pub fn transport_status(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: format!("status {status}: {}", body.into()),
            status: Some(status),
            source: None,
        }
    }

    /// The ingestion service could not be reached at all
    pub fn transport_with_source(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let source: BoxedSource = Box::new(source);
        Self::Transport {
            operation: operation.into(),
            message: source.to_string(),
            status: None,
            source: Some(source),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn vector_db(operation: impl Into<String>) -> Self {
        Self::VectorDb { operation: operation.into(), source: None }
    }

    pub fn vector_db_with_source(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::VectorDb { operation: operation.into(), source: Some(Box::new(source)) }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding { message: message.into(), source: None }
    }

    pub fn embedding_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Embedding { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Get the error code for HTTP responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::VectorDb { .. } => "VECTOR_DB_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Transport { .. } => 502,
            Self::Configuration { .. }
            | Self::FileRead { .. }
            | Self::VectorDb { .. }
            | Self::Embedding { .. } => 500,
        }
    }

    /// Whether the same request could succeed if sent again later.
    ///
    /// Nothing retries automatically; this only shapes how failures are
    /// logged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => status.is_none_or(|s| s >= 500),
            Self::VectorDb { .. } | Self::Embedding { .. } | Self::FileRead { .. } => true,
            Self::Configuration { .. } | Self::Validation { .. } => false,
        }
    }
}

/// Result type alias for ragsync-indexer operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<qdrant_client::QdrantError> for SyncError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Self::vector_db_with_source("Qdrant operation failed", err)
    }
}
