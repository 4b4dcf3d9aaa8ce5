use thiserror::Error;

#[derive(Debug, Error)]
pub enum CustfixError {
    #[error("not initialized: run 'custfix init'")]
    NotInitialized,

    #[error("document not found: {collection}/{id}")]
    DocumentNotFound { collection: String, id: String },

    #[error("invalid collection name '{0}': must be alphanumeric with '_' or '-'")]
    InvalidCollectionName(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CustfixError>;
