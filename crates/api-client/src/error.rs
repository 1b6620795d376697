use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("The HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("The API request returned an error (HTTP {status}): {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
