use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    #[error("no readings in the report window")]
    NoReportData,

    #[error("PDF conversion failed: {0}")]
    Pdf(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
