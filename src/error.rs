use thiserror::Error;

/// Errors surfaced by the library layers (API client, ledger, models).
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("CFBD_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status} for {endpoint}")]
    Api {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("Gave up on {endpoint} after {attempts} attempts")]
    RetriesExhausted { endpoint: String, attempts: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, CfbError>;
