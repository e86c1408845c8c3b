use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

// Enum for handling application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Model error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Campaign error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Campaign store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("No active session")]
    NoActiveSession,
}

// Errors raised while loading the model or generating text.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Model is not available: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend answered with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

// Campaign selection failures. The display strings are shown to the user as is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Please select a campaign or create a new one.")]
    NothingSelected,

    #[error("Please select a campaign to delete.")]
    NoDeleteSelection,

    #[error("There is no deletion waiting for confirmation.")]
    NoPendingDeletion,

    #[error("Delete functionality not available in this context.")]
    DeleteUnavailable,

    #[error("Failed to delete campaign '{0}'.")]
    DeleteFailed(String),

    #[error("No campaign at position {0}.")]
    IndexOutOfRange(usize),

    #[error("Campaign selection is already closed.")]
    Closed,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Campaign not found: {0}")]
    NotFound(String),

    #[error("Campaign metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
